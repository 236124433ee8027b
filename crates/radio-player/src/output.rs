//! The audio-output seam.  `PlayerCore` drives playback only through
//! [`AudioOutput`]; [`MpvOutput`] is the real implementation.

use std::future::Future;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::mpv::{MpvDriver, MpvEvent, MpvHandle, OBS_CORE_IDLE, OBS_ICY_TITLE, OBS_PAUSED_FOR_CACHE};

/// Asynchronous notifications from the output, mirroring media element events.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    Ended,
    Waiting,
    Stalled,
    Playing,
    CanPlay,
    Error(String),
    Metadata(Option<String>),
}

pub trait AudioOutput: Send + Sync + 'static {
    /// Replace the current source and start fetching it.  Does not unpause.
    fn load(&self, url: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn play(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn pause(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn volume(&self) -> impl Future<Output = f32> + Send;
    fn set_volume(&self, volume: f32) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn muted(&self) -> impl Future<Output = bool> + Send;
    fn set_muted(&self, muted: bool) -> impl Future<Output = anyhow::Result<()>> + Send;
    /// URL of the last loaded source.
    fn source(&self) -> Option<String>;
    fn media_title(&self) -> impl Future<Output = Option<String>> + Send;
}

pub struct MpvOutput {
    handle: MpvHandle,
    source: Mutex<Option<String>>,
    // owns the child; killed on drop
    driver: Mutex<MpvDriver>,
}

impl MpvOutput {
    /// Spawn mpv and start translating its events.  Fails when mpv cannot be
    /// found or its IPC socket never comes up.
    pub async fn spawn(initial_volume: f32) -> anyhow::Result<(Self, mpsc::Receiver<OutputEvent>)> {
        let mut driver = MpvDriver::new(initial_volume);
        let (mpv_tx, mpv_rx) = mpsc::channel::<MpvEvent>(256);
        let handle = driver.spawn_and_connect(mpv_tx).await?;
        handle.observe_properties().await;

        let (out_tx, out_rx) = mpsc::channel::<OutputEvent>(256);
        tokio::spawn(translate_events(mpv_rx, out_tx));

        Ok((
            Self {
                handle,
                source: Mutex::new(None),
                driver: Mutex::new(driver),
            },
            out_rx,
        ))
    }

    pub async fn shutdown(self) {
        self.handle.quit().await;
        if let Ok(mut driver) = self.driver.into_inner() {
            driver.kill().await;
        }
    }
}

impl AudioOutput for MpvOutput {
    async fn load(&self, url: &str) -> anyhow::Result<()> {
        self.handle.load_replace(url).await?;
        if let Ok(mut source) = self.source.lock() {
            *source = Some(url.to_string());
        }
        Ok(())
    }

    async fn play(&self) -> anyhow::Result<()> {
        self.handle.set_pause(false).await
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.handle.set_pause(true).await
    }

    async fn volume(&self) -> f32 {
        match self.handle.get_volume().await {
            Ok(v) => v,
            Err(e) => {
                warn!("mpv: volume query failed: {}", e);
                0.0
            }
        }
    }

    async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
        self.handle.set_volume(volume).await
    }

    async fn muted(&self) -> bool {
        self.handle.get_mute().await.unwrap_or(false)
    }

    async fn set_muted(&self, muted: bool) -> anyhow::Result<()> {
        self.handle.set_mute(muted).await
    }

    fn source(&self) -> Option<String> {
        self.source.lock().ok().and_then(|s| s.clone())
    }

    async fn media_title(&self) -> Option<String> {
        self.handle.icy_title().await
    }
}

async fn translate_events(mut rx: mpsc::Receiver<MpvEvent>, tx: mpsc::Sender<OutputEvent>) {
    while let Some(evt) = rx.recv().await {
        for out in translate(&evt) {
            if tx.send(out).await.is_err() {
                return;
            }
        }
    }
    debug!("mpv event translator exiting");
}

/// Map one mpv event onto zero or more output events.
pub fn translate(evt: &MpvEvent) -> Vec<OutputEvent> {
    if let Some((id, data)) = evt.as_property_change() {
        return match id {
            OBS_CORE_IDLE if data == &Value::Bool(false) => vec![OutputEvent::Playing],
            OBS_PAUSED_FOR_CACHE if data == &Value::Bool(true) => vec![OutputEvent::Stalled],
            OBS_ICY_TITLE => {
                let title = data.as_str().map(str::to_string);
                vec![OutputEvent::Metadata(title)]
            }
            _ => Vec::new(),
        };
    }

    match evt.event_name() {
        Some("start-file") => vec![OutputEvent::Waiting],
        Some("file-loaded") => vec![OutputEvent::CanPlay],
        Some("end-file") => match evt.str_field("reason") {
            Some("eof") => vec![OutputEvent::Ended],
            Some("error") => {
                let msg = evt
                    .str_field("file_error")
                    .map(|e| format!("Error playing audio: {}", e))
                    .unwrap_or_else(|| "Error playing audio".to_string());
                info!("mpv: end-file error: {}", msg);
                vec![OutputEvent::Error(msg), OutputEvent::Ended]
            }
            // stop / redirect / quit come from our own loadfile replace
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
