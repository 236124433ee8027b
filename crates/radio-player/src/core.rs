/// PlayerCore: single-owner loop for playback.
///
/// Owns the audio output exclusively.  The TUI and the HTTP API talk to it
/// through a `PlayerHandle` (an mpsc sender of `PlayerCommand`s); state is
/// published through the shared `StateManager`, which broadcasts
/// `StateUpdated` after every mutation.
///
/// Commands run one at a time.  A station switch awaits its fades inline, so
/// while it runs newer commands queue up; the only thing that can reach into
/// a running switch is the `SwitchTickets` counter, which the sender bumps
/// for every switch request.  A switch that notices a newer ticket abandons
/// itself between phases, so the last request wins.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use radio_core::config::Config;
use radio_core::directory::Resolved;
use radio_core::settings::{self, KeyValueStore, PersistedSettings};
use radio_core::station::Station;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::output::{AudioOutput, OutputEvent};
use crate::state::{PlayerEvent, StateManager, UNKNOWN_TRACK};
use crate::visualizer::{self, Visualizer};

const FADE_STEPS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    TogglePlay,
    ToggleMute,
    ChangeStation { url: String, ticket: u64 },
    ChangeVolume(f32),
    AddStation(Station),
    Shutdown,
}

/// Generation counter for station switches.
#[derive(Debug, Clone, Default)]
pub struct SwitchTickets(Arc<AtomicU64>);

impl SwitchTickets {
    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}

/// Cloneable sender side of the core.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
    tickets: SwitchTickets,
}

impl PlayerHandle {
    pub fn new(tx: mpsc::Sender<PlayerCommand>, tickets: SwitchTickets) -> Self {
        Self { tx, tickets }
    }

    async fn send(&self, cmd: PlayerCommand) {
        if self.tx.send(cmd).await.is_err() {
            warn!("player core is gone, command dropped");
        }
    }

    pub async fn toggle_play(&self) {
        self.send(PlayerCommand::TogglePlay).await;
    }

    pub async fn toggle_mute(&self) {
        self.send(PlayerCommand::ToggleMute).await;
    }

    pub async fn change_station(&self, url: impl Into<String>) {
        let ticket = self.tickets.issue();
        self.send(PlayerCommand::ChangeStation {
            url: url.into(),
            ticket,
        })
        .await;
    }

    pub async fn change_volume(&self, volume: f32) {
        self.send(PlayerCommand::ChangeVolume(volume)).await;
    }

    pub async fn add_station(&self, station: Station) {
        self.send(PlayerCommand::AddStation(station)).await;
    }

    pub async fn shutdown(&self) {
        self.send(PlayerCommand::Shutdown).await;
    }
}

#[derive(Debug, Clone)]
pub struct CoreOptions {
    pub fade: Duration,
    pub metadata_poll: Duration,
    pub fallback_fade_target: f32,
    pub visualizer_surface: bool,
    pub visualizer_delay: Duration,
}

impl CoreOptions {
    pub fn from_config(config: &Config, visualizer_surface: bool) -> Self {
        Self {
            fade: Duration::from_millis(config.player.fade_ms),
            metadata_poll: Duration::from_secs(config.player.metadata_poll_secs.max(1)),
            fallback_fade_target: config.player.fallback_fade_target,
            visualizer_surface,
            visualizer_delay: Duration::from_millis(config.visualizer.start_delay_ms),
        }
    }
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), false)
    }
}

/// Volume to fade back in to after a switch.
pub fn fade_in_target(configured: f32, fallback: f32) -> f32 {
    let target = if configured > 0.0 { configured } else { fallback };
    target.clamp(0.0, 1.0)
}

pub struct PlayerCore<O: AudioOutput> {
    output: Option<O>,
    state: Arc<StateManager>,
    store: Arc<dyn KeyValueStore>,
    tickets: SwitchTickets,
    options: CoreOptions,
    visualizer: Visualizer,
    /// The output dropped its source (ended or errored); play must reload.
    needs_reload: bool,
}

impl<O: AudioOutput> PlayerCore<O> {
    pub fn new(
        state: Arc<StateManager>,
        store: Arc<dyn KeyValueStore>,
        tickets: SwitchTickets,
        options: CoreOptions,
        visualizer: Visualizer,
    ) -> Self {
        Self {
            output: None,
            state,
            store,
            tickets,
            options,
            visualizer,
            needs_reload: false,
        }
    }

    /// Startup sequence, then the command loop.  Returns the output so the
    /// caller can shut it down cleanly.
    pub async fn run(
        mut self,
        init: anyhow::Result<O>,
        mut events: Option<mpsc::Receiver<OutputEvent>>,
        directory: impl Future<Output = Resolved> + Send,
        mut commands: mpsc::Receiver<PlayerCommand>,
        cancel: CancellationToken,
    ) -> Option<O> {
        info!("PlayerCore: starting");
        self.initialize(init).await;
        self.apply_saved_settings().await;

        let resolved = tokio::select! {
            _ = cancel.cancelled() => return self.output.take(),
            resolved = directory => resolved,
        };
        self.load_directory(resolved).await;

        let visualizer_start = tokio::time::sleep(self.options.visualizer_delay);
        tokio::pin!(visualizer_start);
        let mut visualizer_armed = true;

        let mut poll = tokio::time::interval(self.options.metadata_poll);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("PlayerCore: cancelled");
                    break;
                }
                cmd = commands.recv() => match cmd {
                    None | Some(PlayerCommand::Shutdown) => {
                        info!("PlayerCore: shutdown");
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                },
                Some(evt) = next_event(&mut events) => self.handle_output_event(evt).await,
                _ = poll.tick() => self.poll_metadata().await,
                _ = &mut visualizer_start, if visualizer_armed => {
                    visualizer_armed = false;
                    self.start_visualizer().await;
                }
            }
        }

        self.visualizer.detach();
        self.output.take()
    }

    pub async fn handle_command(&mut self, cmd: PlayerCommand) {
        debug!("PlayerCore: command {:?}", cmd);
        match cmd {
            PlayerCommand::TogglePlay => self.toggle_play().await,
            PlayerCommand::ToggleMute => self.toggle_mute().await,
            PlayerCommand::ChangeStation { url, ticket } => self.change_station(&url, ticket).await,
            PlayerCommand::ChangeVolume(v) => self.change_volume(v).await,
            PlayerCommand::AddStation(station) => self.add_station(station).await,
            PlayerCommand::Shutdown => {}
        }
    }

    pub async fn initialize(&mut self, result: anyhow::Result<O>) {
        match result {
            Ok(output) => {
                info!("Audio output ready");
                self.output = Some(output);
                self.state.update(|s| s.audio_initialized = true).await;
            }
            Err(e) => {
                error!("Failed to initialize audio: {:#}", e);
                self.output = None;
                self.state
                    .update(|s| {
                        s.audio_initialized = false;
                        s.audio_error = Some("Failed to initialize audio player".to_string());
                    })
                    .await;
            }
        }
    }

    pub async fn apply_saved_settings(&mut self) {
        let Some(output) = self.output.as_ref() else {
            return;
        };
        let saved = PersistedSettings::load(self.store.as_ref());

        let volume = match saved.volume {
            Some(v) => match output.set_volume(v).await {
                Ok(()) => v,
                Err(e) => {
                    warn!("Failed to apply saved volume: {}", e);
                    output.volume().await
                }
            },
            None => output.volume().await,
        };
        let muted = match saved.muted {
            Some(m) => match output.set_muted(m).await {
                Ok(()) => m,
                Err(e) => {
                    warn!("Failed to apply saved mute flag: {}", e);
                    output.muted().await
                }
            },
            None => output.muted().await,
        };

        self.state
            .update(|s| {
                s.volume = volume;
                s.muted = muted;
            })
            .await;
    }

    /// Install the resolved list, select the first entry and preload it.
    pub async fn load_directory(&mut self, resolved: Resolved) {
        let first = resolved.stations.first().cloned();
        self.state
            .update(|s| {
                s.stations = resolved.stations;
                s.directory_source = Some(resolved.source);
                if first.is_some() {
                    s.selected = first.clone();
                }
            })
            .await;

        if let (Some(output), Some(station)) = (self.output.as_ref(), first) {
            match output.load(&station.url).await {
                Ok(()) => {
                    self.needs_reload = false;
                    info!("Set initial station: {}", station.name);
                }
                Err(e) => warn!("Failed to preload {}: {}", station.name, e),
            }
        }
    }

    pub async fn handle_output_event(&mut self, evt: OutputEvent) {
        debug!("output event: {:?}", evt);
        match evt {
            OutputEvent::Ended => {
                self.needs_reload = true;
                self.state.update(|s| s.playing = false).await;
                self.sync_visualizer().await;
            }
            OutputEvent::Waiting | OutputEvent::Stalled => {
                self.state.update(|s| s.loading = true).await;
            }
            OutputEvent::Playing => {
                self.state
                    .update(|s| {
                        s.loading = false;
                        s.audio_error = None;
                    })
                    .await;
            }
            OutputEvent::CanPlay => {
                self.state.update(|s| s.loading = false).await;
            }
            OutputEvent::Error(msg) => {
                self.needs_reload = true;
                let msg = if msg.is_empty() {
                    "Error playing audio".to_string()
                } else {
                    msg
                };
                self.state
                    .update(|s| {
                        s.audio_error = Some(msg);
                        s.loading = false;
                    })
                    .await;
            }
            OutputEvent::Metadata(Some(title)) if !title.is_empty() => {
                self.state.update(|s| s.current_track = title).await;
            }
            OutputEvent::Metadata(_) => {}
        }
    }

    pub async fn poll_metadata(&mut self) {
        let Some(output) = self.output.as_ref() else {
            return;
        };
        let Some(title) = output.media_title().await.filter(|t| !t.is_empty()) else {
            return;
        };
        if self.state.get_state().await.current_track != title {
            debug!("metadata poll: {}", title);
            self.state.update(|s| s.current_track = title).await;
        }
    }

    pub async fn toggle_play(&mut self) {
        let Some(output) = self.output.as_ref() else {
            return;
        };
        let state = self.state.get_state().await;
        let Some(selected) = state.selected else {
            return;
        };

        if state.playing {
            info!("Pausing audio");
            if let Err(e) = output.pause().await {
                warn!("pause failed: {}", e);
            }
            self.state.update(|s| s.playing = false).await;
            self.state.notify(PlayerEvent::Pause).await;
        } else {
            info!("Attempting to play: {}", selected.url);
            if self.needs_reload || output.source().as_deref() != Some(selected.url.as_str()) {
                if let Err(e) = output.load(&selected.url).await {
                    warn!("load before play failed: {}", e);
                }
                self.needs_reload = false;
            }
            self.state.update(|s| s.audio_error = None).await;
            match output.play().await {
                Ok(()) => {
                    info!("Audio playback started");
                    self.state.update(|s| s.playing = true).await;
                    self.state.notify(PlayerEvent::Play).await;
                }
                Err(e) => {
                    error!("Audio playback failed: {}", e);
                    let msg = e.to_string();
                    let msg = if msg.is_empty() {
                        "Failed to play audio".to_string()
                    } else {
                        msg
                    };
                    self.state
                        .update(|s| {
                            s.audio_error = Some(msg);
                            s.playing = false;
                        })
                        .await;
                }
            }
        }
        self.sync_visualizer().await;
    }

    pub async fn toggle_mute(&mut self) {
        let Some(output) = self.output.as_ref() else {
            return;
        };
        let muted = !output.muted().await;
        if let Err(e) = output.set_muted(muted).await {
            error!("Error toggling mute: {}", e);
            return;
        }
        self.state.update(|s| s.muted = muted).await;
        settings::save_muted(self.store.as_ref(), muted);
    }

    pub async fn change_station(&mut self, url: &str, ticket: u64) {
        if self.output.is_none() {
            return;
        }
        if !self.tickets.is_current(ticket) {
            debug!("switch to {} superseded before start", url);
            return;
        }
        let state = self.state.get_state().await;
        let Some(station) = state.find_station(url).cloned() else {
            debug!("change_station: unknown url {}", url);
            return;
        };

        info!("Changing station to: {}", station.name);
        self.state.update(|s| s.audio_error = None).await;
        if let Err(e) = self
            .switch_to(&station, state.playing, state.volume, ticket)
            .await
        {
            error!("Error changing station: {:#}", e);
            self.state
                .update(|s| s.audio_error = Some("Error changing station".to_string()))
                .await;
        }
        self.sync_visualizer().await;
    }

    async fn switch_to(
        &mut self,
        station: &Station,
        was_playing: bool,
        configured_volume: f32,
        ticket: u64,
    ) -> anyhow::Result<()> {
        if was_playing {
            self.fade_volume(f32::NAN, 0.0, self.options.fade).await;
        }
        if !self.tickets.is_current(ticket) {
            debug!("switch to {} superseded after fade-out", station.name);
            return Ok(());
        }

        let output = self
            .output
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("audio output went away"))?;
        output.pause().await?;
        output.load(&station.url).await?;
        self.needs_reload = false;
        let selected = station.clone();
        self.state
            .update(|s| {
                s.selected = Some(selected);
                s.current_track = UNKNOWN_TRACK.to_string();
            })
            .await;

        if !self.tickets.is_current(ticket) {
            debug!("switch to {} superseded after load", station.name);
            return Ok(());
        }

        match output.play().await {
            Ok(()) => {
                self.state.update(|s| s.playing = true).await;
                let target = fade_in_target(configured_volume, self.options.fallback_fade_target);
                self.fade_volume(0.0, target, self.options.fade).await;
                if target != configured_volume {
                    // the output now plays at the fallback; keep state in step
                    settings::save_volume(self.store.as_ref(), target);
                    self.state.update(|s| s.volume = target).await;
                }
                self.state
                    .notify(PlayerEvent::StationChange(station.clone()))
                    .await;
            }
            Err(e) => {
                error!("Failed to play new station: {}", e);
                self.state
                    .update(|s| {
                        s.audio_error = Some("Failed to play this station".to_string());
                        s.playing = false;
                    })
                    .await;
            }
        }
        Ok(())
    }

    /// Values outside [0, 1] (or not numbers at all) are ignored.
    pub async fn change_volume(&mut self, volume: f32) {
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            debug!("ignoring volume {}", volume);
            return;
        }
        let Some(output) = self.output.as_ref() else {
            return;
        };
        if let Err(e) = output.set_volume(volume).await {
            error!("Error changing volume: {}", e);
            return;
        }
        settings::save_volume(self.store.as_ref(), volume);

        let unmute = volume > 0.0 && output.muted().await;
        if unmute {
            if let Err(e) = output.set_muted(false).await {
                warn!("unmute failed: {}", e);
            } else {
                settings::save_muted(self.store.as_ref(), false);
            }
        }
        self.state
            .update(|s| {
                s.volume = volume;
                if unmute {
                    s.muted = false;
                }
            })
            .await;
    }

    /// Linear ramp in `FADE_STEPS` steps.  A NaN `start` means "from the
    /// output's current volume".  Every applied value is clamped to [0, 1].
    pub async fn fade_volume(&self, start: f32, end: f32, duration: Duration) {
        let Some(output) = self.output.as_ref() else {
            return;
        };
        let start = if start.is_nan() {
            output.volume().await
        } else {
            start
        };
        let end = if end.is_nan() { start } else { end };
        let step_time = duration / FADE_STEPS;

        for step in 1..=FADE_STEPS {
            tokio::time::sleep(step_time).await;
            let value = if step == FADE_STEPS {
                end
            } else {
                start + (end - start) * (step as f32 / FADE_STEPS as f32)
            };
            if let Err(e) = output.set_volume(value.clamp(0.0, 1.0)).await {
                warn!("fade step {} failed: {}", step, e);
            }
        }
    }

    /// Append, select and preload a station.  Playback is not started.
    /// Without an output the station is still listed and selected.
    pub async fn add_station(&mut self, station: Station) {
        info!("Adding station: {}", station.name);
        let added = station.clone();
        self.state
            .update(|s| {
                s.stations.push(added.clone());
                s.selected = Some(added);
            })
            .await;

        let Some(output) = self.output.as_ref() else {
            return;
        };
        if let Err(e) = output.pause().await {
            warn!("pause before preload failed: {}", e);
        }
        match output.load(&station.url).await {
            Ok(()) => self.needs_reload = false,
            Err(e) => warn!("Failed to preload {}: {}", station.name, e),
        }
        self.state.update(|s| s.playing = false).await;
        self.sync_visualizer().await;
    }

    async fn start_visualizer(&mut self) {
        let capability = visualizer::probe(
            self.options.visualizer_surface,
            radio_core::platform::find_ffmpeg_binary(),
        );
        let status = self.visualizer.start(capability);
        self.state.update(|s| s.visualizer = status).await;
        self.sync_visualizer().await;
    }

    async fn sync_visualizer(&mut self) {
        let state = self.state.get_state().await;
        let url = state
            .selected
            .filter(|_| state.playing)
            .map(|station| station.url);
        if let Some(status) = self.visualizer.follow(url.as_deref()) {
            self.state.update(|s| s.visualizer = status).await;
        }
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<OutputEvent>>) -> Option<OutputEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PlayerState;
    use crate::BroadcastMessage;
    use radio_core::directory::DirectorySource;
    use radio_core::settings::{MemoryStore, MUTED_KEY, VOLUME_KEY};
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    #[derive(Debug, Default)]
    struct FakeInner {
        volume: f32,
        muted: bool,
        paused: bool,
        source: Option<String>,
        loads: Vec<String>,
        volume_log: Vec<f32>,
        play_error: Option<String>,
        title: Option<String>,
    }

    #[derive(Clone)]
    struct FakeOutput(Arc<Mutex<FakeInner>>);

    impl FakeOutput {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(FakeInner {
                volume: 1.0,
                paused: true,
                ..Default::default()
            })))
        }

        fn inner(&self) -> std::sync::MutexGuard<'_, FakeInner> {
            self.0.lock().unwrap()
        }
    }

    impl AudioOutput for FakeOutput {
        async fn load(&self, url: &str) -> anyhow::Result<()> {
            let mut inner = self.inner();
            inner.source = Some(url.to_string());
            inner.loads.push(url.to_string());
            Ok(())
        }

        async fn play(&self) -> anyhow::Result<()> {
            let mut inner = self.inner();
            if let Some(e) = inner.play_error.clone() {
                return Err(anyhow::anyhow!(e));
            }
            inner.paused = false;
            Ok(())
        }

        async fn pause(&self) -> anyhow::Result<()> {
            self.inner().paused = true;
            Ok(())
        }

        async fn volume(&self) -> f32 {
            self.inner().volume
        }

        async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
            let mut inner = self.inner();
            inner.volume = volume;
            inner.volume_log.push(volume);
            Ok(())
        }

        async fn muted(&self) -> bool {
            self.inner().muted
        }

        async fn set_muted(&self, muted: bool) -> anyhow::Result<()> {
            self.inner().muted = muted;
            Ok(())
        }

        fn source(&self) -> Option<String> {
            self.inner().source.clone()
        }

        async fn media_title(&self) -> Option<String> {
            self.inner().title.clone()
        }
    }

    struct Harness {
        core: PlayerCore<FakeOutput>,
        fake: FakeOutput,
        state: Arc<StateManager>,
        store: Arc<MemoryStore>,
        tickets: SwitchTickets,
        rx: broadcast::Receiver<BroadcastMessage>,
    }

    fn two_stations() -> Vec<Station> {
        vec![
            Station::new("DIGI FM", "https://a.example/digi"),
            Station::new("Europa FM", "https://b.example/europa"),
        ]
    }

    fn harness_with_store(store: MemoryStore) -> Harness {
        let (tx, rx) = broadcast::channel(256);
        let state = Arc::new(StateManager::new(PlayerState::new(Vec::new(), 1.0), tx.clone()));
        let store = Arc::new(store);
        let tickets = SwitchTickets::default();
        let core = PlayerCore::new(
            state.clone(),
            store.clone(),
            tickets.clone(),
            CoreOptions::default(),
            Visualizer::new(tx, CancellationToken::new()),
        );
        Harness {
            core,
            fake: FakeOutput::new(),
            state,
            store,
            tickets,
            rx,
        }
    }

    async fn ready_harness() -> Harness {
        let mut h = harness_with_store(MemoryStore::new());
        h.core.initialize(Ok(h.fake.clone())).await;
        h.core.apply_saved_settings().await;
        h.core
            .load_directory(Resolved {
                stations: two_stations(),
                source: DirectorySource::BuiltIn,
            })
            .await;
        h
    }

    fn notifications(rx: &mut broadcast::Receiver<BroadcastMessage>) -> Vec<PlayerEvent> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let BroadcastMessage::Notification(e) = msg {
                out.push(e);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_initialize_failure_is_fatal_and_silent() {
        let mut h = harness_with_store(MemoryStore::new());
        h.core.initialize(Err(anyhow::anyhow!("no mpv"))).await;
        let state = h.state.get_state().await;
        assert!(!state.audio_initialized);
        assert_eq!(
            state.audio_error.as_deref(),
            Some("Failed to initialize audio player")
        );

        h.core
            .load_directory(Resolved {
                stations: two_stations(),
                source: DirectorySource::BuiltIn,
            })
            .await;
        h.core.toggle_play().await;
        h.core.change_volume(0.5).await;
        let after = h.state.get_state().await;
        assert!(!after.playing);
        assert_eq!(after.volume, 1.0);
        assert!(h.store.get(VOLUME_KEY).is_none());
    }

    #[tokio::test]
    async fn test_add_station_without_output_still_lists_and_selects() {
        let mut h = harness_with_store(MemoryStore::new());
        h.core.initialize(Err(anyhow::anyhow!("no mpv"))).await;
        h.core
            .load_directory(Resolved {
                stations: two_stations(),
                source: DirectorySource::BuiltIn,
            })
            .await;

        h.core.add_station(Station::new("Kiss FM", "https://k.example/kiss")).await;
        let state = h.state.get_state().await;
        assert_eq!(state.stations.len(), 3);
        assert_eq!(state.selected.map(|s| s.name), Some("Kiss FM".to_string()));
        assert!(!state.playing);
    }

    #[tokio::test]
    async fn test_directory_selects_first_and_preloads_without_playing() {
        let h = ready_harness().await;
        let state = h.state.get_state().await;
        assert_eq!(state.selected.as_ref().map(|s| s.name.as_str()), Some("DIGI FM"));
        assert_eq!(state.directory_source, Some(DirectorySource::BuiltIn));
        assert!(!state.playing);
        assert_eq!(h.fake.inner().source.as_deref(), Some("https://a.example/digi"));
        assert!(h.fake.inner().paused);
    }

    #[tokio::test]
    async fn test_saved_volume_is_applied() {
        let mut h = harness_with_store(MemoryStore::with(&[(VOLUME_KEY, "0.42"), (MUTED_KEY, "true")]));
        h.core.initialize(Ok(h.fake.clone())).await;
        h.core.apply_saved_settings().await;
        assert_eq!(h.fake.inner().volume, 0.42);
        assert!(h.fake.inner().muted);
        let state = h.state.get_state().await;
        assert_eq!(state.volume, 0.42);
        assert!(state.muted);
    }

    #[tokio::test]
    async fn test_out_of_range_saved_volume_keeps_default() {
        let mut h = harness_with_store(MemoryStore::with(&[(VOLUME_KEY, "5"), (MUTED_KEY, "maybe")]));
        h.core.initialize(Ok(h.fake.clone())).await;
        h.core.apply_saved_settings().await;
        assert_eq!(h.fake.inner().volume, 1.0);
        assert!(h.fake.inner().volume_log.is_empty());
        assert!(!h.fake.inner().muted);
    }

    #[tokio::test]
    async fn test_change_volume_only_accepts_unit_range() {
        let mut h = ready_harness().await;
        for bad in [-0.1, 1.01, 5.0, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            h.core.change_volume(bad).await;
            assert_eq!(h.fake.inner().volume, 1.0, "volume {} must be ignored", bad);
            assert_eq!(h.state.get_state().await.volume, 1.0);
        }
        assert!(h.store.get(VOLUME_KEY).is_none());

        for good in [0.0, 0.3, 1.0] {
            h.core.change_volume(good).await;
            assert_eq!(h.fake.inner().volume, good);
            assert_eq!(h.state.get_state().await.volume, good);
            assert_eq!(h.store.get(VOLUME_KEY), Some(good.to_string()));
        }
    }

    #[tokio::test]
    async fn test_volume_up_unmutes_and_persists() {
        let mut h = ready_harness().await;
        h.core.toggle_mute().await;
        assert!(h.fake.inner().muted);
        assert_eq!(h.store.get(MUTED_KEY).as_deref(), Some("true"));

        h.core.change_volume(0.0).await;
        assert!(h.fake.inner().muted, "volume 0 keeps mute");

        h.core.change_volume(0.6).await;
        assert!(!h.fake.inner().muted);
        assert!(!h.state.get_state().await.muted);
        assert_eq!(h.store.get(MUTED_KEY).as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn test_toggle_mute_flips_and_persists() {
        let mut h = ready_harness().await;
        h.core.toggle_mute().await;
        h.core.toggle_mute().await;
        assert!(!h.fake.inner().muted);
        assert!(!h.state.get_state().await.muted);
        assert_eq!(h.store.get(MUTED_KEY).as_deref(), Some("false"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_ends_at_clamped_target() {
        let h = ready_harness().await;
        for (start, end, expected) in [
            (0.2, 0.9, 0.9),
            (0.5, 1.7, 1.0),
            (0.9, -3.0, 0.0),
            (f32::NAN, 0.0, 0.0),
            (-2.0, 0.4, 0.4),
        ] {
            h.fake.inner().volume_log.clear();
            let began = tokio::time::Instant::now();
            h.core
                .fade_volume(start, end, Duration::from_millis(300))
                .await;
            assert_eq!(h.fake.inner().volume, expected);
            let log = h.fake.inner().volume_log.clone();
            assert_eq!(log.len(), FADE_STEPS as usize);
            assert!(log.iter().all(|v| (0.0..=1.0).contains(v)));
            assert!(began.elapsed() >= Duration::from_millis(300));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_nan_start_uses_current_volume() {
        let h = ready_harness().await;
        h.fake.inner().volume = 0.5;
        h.core
            .fade_volume(f32::NAN, 1.0, Duration::from_millis(100))
            .await;
        let log = h.fake.inner().volume_log.clone();
        assert!((log[0] - 0.55).abs() < 1e-6);
        assert_eq!(*log.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_fade_without_output_returns_immediately() {
        let h = harness_with_store(MemoryStore::new());
        h.core
            .fade_volume(0.0, 1.0, Duration::from_secs(3600))
            .await;
    }

    #[tokio::test]
    async fn test_toggle_play_twice_returns_to_paused() {
        let mut h = ready_harness().await;
        h.core.toggle_play().await;
        assert!(h.state.get_state().await.playing);
        assert!(!h.fake.inner().paused);

        h.core.toggle_play().await;
        assert!(!h.state.get_state().await.playing);
        assert!(h.fake.inner().paused);
        assert_eq!(
            notifications(&mut h.rx),
            vec![PlayerEvent::Play, PlayerEvent::Pause]
        );
        // source already matched, so no reload happened
        assert_eq!(h.fake.inner().loads.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_play_without_selection_is_noop() {
        let mut h = harness_with_store(MemoryStore::new());
        h.core.initialize(Ok(h.fake.clone())).await;
        h.core.toggle_play().await;
        assert!(!h.state.get_state().await.playing);
        assert!(h.fake.inner().paused);
    }

    #[tokio::test]
    async fn test_play_rejection_surfaces_reason() {
        let mut h = ready_harness().await;
        h.state
            .update(|s| s.audio_error = Some("stale".to_string()))
            .await;
        h.fake.inner().play_error = Some("autoplay blocked".to_string());
        h.core.toggle_play().await;
        let state = h.state.get_state().await;
        assert!(!state.playing);
        assert_eq!(state.audio_error.as_deref(), Some("autoplay blocked"));
        assert!(notifications(&mut h.rx).is_empty());
    }

    #[tokio::test]
    async fn test_play_after_stream_end_reloads_source() {
        let mut h = ready_harness().await;
        h.core.toggle_play().await;
        h.core.handle_output_event(OutputEvent::Ended).await;
        assert!(!h.state.get_state().await.playing);

        h.core.toggle_play().await;
        assert!(h.state.get_state().await.playing);
        assert_eq!(h.fake.inner().loads.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_station_selects_and_resets_track() {
        let mut h = ready_harness().await;
        h.core.toggle_play().await;
        h.state
            .update(|s| s.current_track = "Some Song".to_string())
            .await;

        let ticket = h.tickets.issue();
        h.core
            .change_station("https://b.example/europa", ticket)
            .await;

        let state = h.state.get_state().await;
        assert_eq!(state.selected.as_ref().unwrap().name, "Europa FM");
        assert_eq!(state.current_track, UNKNOWN_TRACK);
        assert!(state.playing);
        assert_eq!(state.audio_error, None);
        assert_eq!(h.fake.inner().source.as_deref(), Some("https://b.example/europa"));
        // faded out to 0, then back in to the configured volume
        let log = h.fake.inner().volume_log.clone();
        assert_eq!(log.len(), 2 * FADE_STEPS as usize);
        assert_eq!(log[FADE_STEPS as usize - 1], 0.0);
        assert_eq!(*log.last().unwrap(), 1.0);

        let events = notifications(&mut h.rx);
        assert_eq!(
            events.last(),
            Some(&PlayerEvent::StationChange(Station::new(
                "Europa FM",
                "https://b.example/europa"
            )))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_in_uses_fallback_when_configured_volume_is_zero() {
        let mut h = ready_harness().await;
        h.core.change_volume(0.0).await;
        let ticket = h.tickets.issue();
        h.core
            .change_station("https://b.example/europa", ticket)
            .await;
        assert!((h.fake.inner().volume - 0.8).abs() < 1e-6);
        assert!((h.state.get_state().await.volume - 0.8).abs() < 1e-6);
        assert_eq!(h.store.get(VOLUME_KEY).as_deref(), Some("0.8"));
    }

    #[tokio::test]
    async fn test_unknown_station_is_noop() {
        let mut h = ready_harness().await;
        let ticket = h.tickets.issue();
        h.core.change_station("https://nowhere", ticket).await;
        let state = h.state.get_state().await;
        assert_eq!(state.selected.unwrap().name, "DIGI FM");
        assert_eq!(h.fake.inner().loads.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_station_play_failure() {
        let mut h = ready_harness().await;
        h.fake.inner().play_error = Some("403".to_string());
        let ticket = h.tickets.issue();
        h.core
            .change_station("https://b.example/europa", ticket)
            .await;
        let state = h.state.get_state().await;
        assert!(!state.playing);
        assert_eq!(
            state.audio_error.as_deref(),
            Some("Failed to play this station")
        );
        // selection still moved; no rollback
        assert_eq!(state.selected.unwrap().name, "Europa FM");
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_switch_is_abandoned() {
        let mut h = ready_harness().await;
        let first = h.tickets.issue();
        let second = h.tickets.issue();

        h.core.change_station("https://b.example/europa", first).await;
        assert_eq!(h.state.get_state().await.selected.unwrap().name, "DIGI FM");

        h.core.change_station("https://b.example/europa", second).await;
        assert_eq!(h.state.get_state().await.selected.unwrap().name, "Europa FM");
    }

    #[tokio::test]
    async fn test_add_station_appends_selects_and_preloads() {
        let mut h = ready_harness().await;
        let before = h.state.get_state().await.stations.len();
        h.core
            .add_station(Station::new("Kiss FM", "https://kiss.example/live"))
            .await;
        let state = h.state.get_state().await;
        assert_eq!(state.stations.len(), before + 1);
        assert_eq!(state.stations.last().unwrap().name, "Kiss FM");
        assert_eq!(state.selected.unwrap().name, "Kiss FM");
        assert!(!state.playing);
        assert_eq!(h.fake.inner().source.as_deref(), Some("https://kiss.example/live"));
        assert!(h.fake.inner().paused);
    }

    #[tokio::test]
    async fn test_output_events_update_flags() {
        let mut h = ready_harness().await;
        h.core.handle_output_event(OutputEvent::Waiting).await;
        assert!(h.state.get_state().await.loading);
        h.core.handle_output_event(OutputEvent::CanPlay).await;
        assert!(!h.state.get_state().await.loading);

        h.core.handle_output_event(OutputEvent::Stalled).await;
        h.core
            .handle_output_event(OutputEvent::Error(String::new()))
            .await;
        let state = h.state.get_state().await;
        assert!(!state.loading);
        assert_eq!(state.audio_error.as_deref(), Some("Error playing audio"));

        h.core.handle_output_event(OutputEvent::Playing).await;
        assert_eq!(h.state.get_state().await.audio_error, None);

        h.core
            .handle_output_event(OutputEvent::Metadata(Some("Artist - Song".into())))
            .await;
        h.core.handle_output_event(OutputEvent::Metadata(None)).await;
        assert_eq!(h.state.get_state().await.current_track, "Artist - Song");
    }

    #[tokio::test]
    async fn test_metadata_poll_copies_title() {
        let mut h = ready_harness().await;
        h.core.poll_metadata().await;
        assert_eq!(h.state.get_state().await.current_track, UNKNOWN_TRACK);

        h.fake.inner().title = Some("Live Set".to_string());
        h.core.poll_metadata().await;
        assert_eq!(h.state.get_state().await.current_track, "Live Set");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_last_switch_wins() {
        let h = harness_with_store(MemoryStore::new());
        let fake = h.fake.clone();
        let state = h.state.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let handle = PlayerHandle::new(cmd_tx, h.tickets.clone());
        let mut stations = two_stations();
        stations.push(Station::new("Radio ZU", "https://c.example/zu"));

        let task = tokio::spawn(h.core.run(
            Ok(fake.clone()),
            None,
            async move {
                Resolved {
                    stations,
                    source: DirectorySource::Local,
                }
            },
            cmd_rx,
            CancellationToken::new(),
        ));

        handle.toggle_play().await;
        handle.change_station("https://b.example/europa").await;
        handle.change_station("https://c.example/zu").await;
        handle.shutdown().await;
        assert!(task.await.unwrap().is_some());

        let s = state.get_state().await;
        assert_eq!(s.selected.unwrap().name, "Radio ZU");
        assert!(s.playing);
        assert_eq!(s.directory_source, Some(DirectorySource::Local));
        assert!(!fake.inner().loads.contains(&"https://b.example/europa".to_string()));
    }
}
