mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod focus;
mod http;
mod mpv;
mod output;
mod state;
mod theme;
mod visualizer;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use radio_core::config::Config;
use radio_core::directory::{parse_local_stations, StationDirectory};
use radio_core::settings::{FileStore, KeyValueStore};
use radio_core::theme::{ambient_prefers_dark, Theme};

/// What `PlayerCore` and the visualizer broadcast to the UI.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// `PlayerState` changed; receivers fetch it from the `StateManager`.
    StateUpdated,
    Notification(state::PlayerEvent),
    /// Mono f32 PCM in [-1, 1] for the spectrum.
    PcmChunk(Arc<Vec<f32>>),
}

#[derive(Debug, Parser)]
#[command(name = "radio-player", version, about = "Terminal internet radio player")]
struct Cli {
    /// Config file (default: <config dir>/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// light, dark, neon or cyberpunk
    #[arg(long)]
    theme: Option<Theme>,

    /// JSON file of `[{name, url, logo?}]` shown until the directory loads
    #[arg(long)]
    stations: Option<PathBuf>,

    /// Skip the spectrum pane and never spawn the PCM tap
    #[arg(long)]
    no_visualizer: bool,

    /// Prefer mpv/ffmpeg from PATH over bundled binaries
    #[arg(long)]
    use_system_deps: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    radio_core::platform::set_use_system_deps(cli.use_system_deps);

    let data_dir = radio_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("player.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; otherwise debug for us, quiet HTTP client internals.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("radio-player log: {}", log_path.display());
    tracing::info!("radio-player starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("config unreadable, using defaults: {}", e);
            Config::default()
        }),
    };
    let theme = Theme::resolve(cli.theme.or(config.ui.theme), ambient_prefers_dark());
    let visualizer_enabled = config.visualizer.enabled && !cli.no_visualizer;

    let initial_stations = match &cli.stations {
        Some(path) => {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_local_stations(&body).with_context(|| format!("parsing {}", path.display()))?
        }
        None => config.stations.initial.clone(),
    };

    // ── Shared state ─────────────────────────────────────────────────────────
    let (broadcast_tx, _) = broadcast::channel::<BroadcastMessage>(1024);
    let state_manager = Arc::new(state::StateManager::new(
        state::PlayerState::new(initial_stations, config.player.default_volume),
        broadcast_tx.clone(),
    ));
    // before anything can publish, so the UI misses no update
    let broadcast_rx = state_manager.subscribe();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.paths.settings_file));

    // ── Player core ──────────────────────────────────────────────────────────
    let (cmd_tx, cmd_rx) = mpsc::channel::<core::PlayerCommand>(256);
    let tickets = core::SwitchTickets::default();
    let handle = core::PlayerHandle::new(cmd_tx, tickets.clone());
    let cancel = CancellationToken::new();

    let player_core = core::PlayerCore::new(
        state_manager.clone(),
        store,
        tickets,
        core::CoreOptions::from_config(&config, visualizer_enabled),
        visualizer::Visualizer::new(broadcast_tx.clone(), cancel.child_token()),
    );
    let directory = StationDirectory::new(&config.directory);
    let default_volume = config.player.default_volume;
    let core_cancel = cancel.clone();
    let core_task = tokio::spawn(async move {
        let (init, events) = match output::MpvOutput::spawn(default_volume).await {
            Ok((out, events)) => (Ok(out), Some(events)),
            Err(e) => {
                tracing::error!("mpv unavailable: {:#}", e);
                (Err(e), None)
            }
        };
        player_core
            .run(init, events, directory.resolve(), cmd_rx, core_cancel)
            .await
    });

    // ── HTTP server ──────────────────────────────────────────────────────────
    let http_address = config.http.enabled.then(|| {
        http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            state_manager.clone(),
            handle.clone(),
        );
        format!("{}:{}", config.http.bind_address, config.http.port)
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let initial = state_manager.get_state().await;
    let app = app::App::new(
        state_manager,
        handle.clone(),
        initial,
        app::AppOptions {
            theme,
            spectrum_pane: visualizer_enabled,
            fft_size: config.visualizer.fft_size,
            smoothing: config.visualizer.smoothing,
            http_address,
        },
    );
    let ui_result = app.run(broadcast_rx).await;

    // ── Shutdown ─────────────────────────────────────────────────────────────
    handle.shutdown().await;
    cancel.cancel();
    match core_task.await {
        Ok(Some(output)) => output.shutdown().await,
        Ok(None) => {}
        Err(e) => tracing::error!("player core task failed: {}", e),
    }
    tracing::info!("radio-player stopped");

    ui_result
}
