//! Best-effort spectrum visualizer.  Playback never depends on it: every
//! failure here downgrades to `VisualizerStatus::Disabled`.

pub mod analyser;
pub mod tap;

use std::path::PathBuf;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::state::VisualizerStatus;
use crate::BroadcastMessage;

#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    Enabled(PathBuf),
    Disabled(String),
}

pub fn probe(has_surface: bool, ffmpeg: Option<PathBuf>) -> Capability {
    if !has_surface {
        return Capability::Disabled("no spectrum pane".to_string());
    }
    match ffmpeg {
        Some(path) => Capability::Enabled(path),
        None => Capability::Disabled("ffmpeg not found".to_string()),
    }
}

struct ActiveTap {
    url: String,
    cancel: CancellationToken,
}

/// Owns at most one PCM tap, following whatever the player is playing.
pub struct Visualizer {
    ffmpeg: Option<PathBuf>,
    status: VisualizerStatus,
    attached_once: bool,
    active: Option<ActiveTap>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    shutdown: CancellationToken,
}

impl Visualizer {
    pub fn new(broadcast_tx: broadcast::Sender<BroadcastMessage>, shutdown: CancellationToken) -> Self {
        Self {
            ffmpeg: None,
            status: VisualizerStatus::Pending,
            attached_once: false,
            active: None,
            broadcast_tx,
            shutdown,
        }
    }

    /// Apply the probe result.  Only the first call has an effect.
    pub fn start(&mut self, capability: Capability) -> VisualizerStatus {
        if self.status != VisualizerStatus::Pending {
            return self.status.clone();
        }
        self.status = match capability {
            Capability::Enabled(path) => {
                info!("visualizer: enabled with {:?}", path);
                self.ffmpeg = Some(path);
                VisualizerStatus::Enabled
            }
            Capability::Disabled(reason) => {
                info!("visualizer: disabled ({})", reason);
                VisualizerStatus::Disabled(reason)
            }
        };
        self.status.clone()
    }

    /// Tap `url`, or stop tapping when `None`.  Returns the new status when
    /// this call disabled the visualizer.
    pub fn follow(&mut self, url: Option<&str>) -> Option<VisualizerStatus> {
        if self.status != VisualizerStatus::Enabled {
            return None;
        }
        if self.active.as_ref().map(|t| t.url.as_str()) == url {
            return None;
        }
        self.detach();

        let url = url?;
        let ffmpeg = self.ffmpeg.clone()?;
        match tap::spawn_ffmpeg(&ffmpeg, url) {
            Ok(child) => {
                self.attached_once = true;
                let cancel = self.shutdown.child_token();
                tokio::spawn(tap::pump(child, self.broadcast_tx.clone(), cancel.clone()));
                self.active = Some(ActiveTap {
                    url: url.to_string(),
                    cancel,
                });
                None
            }
            Err(e) if !self.attached_once => {
                warn!("visualizer: first attach failed, disabling: {}", e);
                self.status = VisualizerStatus::Disabled(format!("tap failed: {}", e));
                Some(self.status.clone())
            }
            Err(e) => {
                warn!("visualizer: attach failed: {}", e);
                None
            }
        }
    }

    pub fn detach(&mut self) {
        if let Some(tap) = self.active.take() {
            tap.cancel.cancel();
        }
    }
}

impl Drop for Visualizer {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visualizer() -> Visualizer {
        let (tx, _) = broadcast::channel(4);
        Visualizer::new(tx, CancellationToken::new())
    }

    #[test]
    fn test_probe() {
        assert!(matches!(probe(false, Some("/bin/ffmpeg".into())), Capability::Disabled(_)));
        assert!(matches!(probe(true, None), Capability::Disabled(_)));
        assert_eq!(
            probe(true, Some("/bin/ffmpeg".into())),
            Capability::Enabled("/bin/ffmpeg".into())
        );
    }

    #[test]
    fn test_follow_is_inert_before_start() {
        let mut vis = visualizer();
        assert_eq!(vis.follow(Some("https://a")), None);
        assert_eq!(vis.follow(None), None);
    }

    #[test]
    fn test_start_is_one_shot() {
        let mut vis = visualizer();
        let status = vis.start(Capability::Disabled("no spectrum pane".into()));
        assert!(matches!(status, VisualizerStatus::Disabled(_)));
        let again = vis.start(Capability::Enabled("/bin/ffmpeg".into()));
        assert!(matches!(again, VisualizerStatus::Disabled(_)));
    }

    #[tokio::test]
    async fn test_first_spawn_failure_disables_for_good() {
        let mut vis = visualizer();
        vis.start(Capability::Enabled("/definitely/not/ffmpeg".into()));
        let changed = vis.follow(Some("https://a"));
        assert!(matches!(changed, Some(VisualizerStatus::Disabled(_))));
        assert_eq!(vis.follow(Some("https://b")), None);
        let status = vis.start(Capability::Enabled("/bin/ffmpeg".into()));
        assert!(matches!(status, VisualizerStatus::Disabled(_)));
    }
}
