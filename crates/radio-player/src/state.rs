use std::sync::Arc;

use radio_core::directory::DirectorySource;
use radio_core::station::Station;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::BroadcastMessage;

pub const UNKNOWN_TRACK: &str = "Unknown";

/// Notifications observable by whoever embeds the player (toasts, HTTP).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "station", rename_all = "kebab-case")]
pub enum PlayerEvent {
    Play,
    Pause,
    StationChange(Station),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum VisualizerStatus {
    /// Not started yet (waiting for the start delay).
    Pending,
    Enabled,
    Disabled(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    /// Bumped on every update.
    pub rev: u64,
    pub stations: Vec<Station>,
    /// A copy, not an index: stays valid even if the list changes.
    pub selected: Option<Station>,
    /// Independent of `loading`; both can be true while a stream rebuffers.
    pub playing: bool,
    pub loading: bool,
    pub muted: bool,
    /// The user-configured volume.  Fades move the output's volume, not this.
    pub volume: f32,
    pub current_track: String,
    pub audio_initialized: bool,
    pub audio_error: Option<String>,
    pub directory_source: Option<DirectorySource>,
    pub visualizer: VisualizerStatus,
    pub last_event: Option<PlayerEvent>,
}

impl PlayerState {
    pub fn new(stations: Vec<Station>, volume: f32) -> Self {
        Self {
            rev: 1,
            stations,
            selected: None,
            playing: false,
            loading: false,
            muted: false,
            volume,
            current_track: UNKNOWN_TRACK.to_string(),
            audio_initialized: false,
            audio_error: None,
            directory_source: None,
            visualizer: VisualizerStatus::Pending,
            last_event: None,
        }
    }

    pub fn find_station(&self, url: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.url == url)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.stations.iter().position(|s| s.url == selected.url)
    }
}

/// Shared, lock-protected player state.  Every mutation goes through
/// [`StateManager::update`], which bumps `rev` and tells listeners.
pub struct StateManager {
    state: Arc<RwLock<PlayerState>>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl StateManager {
    pub fn new(initial: PlayerState, broadcast_tx: broadcast::Sender<BroadcastMessage>) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            broadcast_tx,
        }
    }

    pub async fn get_state(&self) -> PlayerState {
        self.state.read().await.clone()
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut PlayerState) -> R) -> R {
        let out = {
            let mut state = self.state.write().await;
            let out = f(&mut state);
            state.rev += 1;
            out
        };
        let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
        out
    }

    /// Record and emit a notification.  Fire-and-forget.
    pub async fn notify(&self, event: PlayerEvent) {
        tracing::info!("event: {:?}", event);
        let recorded = event.clone();
        self.update(|s| s.last_event = Some(recorded)).await;
        let _ = self.broadcast_tx.send(BroadcastMessage::Notification(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.broadcast_tx.subscribe()
    }
}
