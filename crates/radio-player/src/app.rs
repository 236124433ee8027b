//! App: the terminal front end.
//!
//! - `App` owns the components and an `AppState` snapshot they read from.
//! - Background tasks feed `AppMessage`s into one mpsc channel.
//! - The loop draws when something changed, then awaits the next message.
//! - Components answer input with `Vec<Action>`; player commands leave
//!   through the `PlayerHandle`.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use radio_core::theme::Theme;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        add_station_form::{AddStationForm, FORM_HEIGHT},
        header::{draw_header, HEADER_HEIGHT},
        spectrum::draw_spectrum,
        station_list::StationList,
        volume_bar::{draw_volume, stepped},
    },
    core::PlayerHandle,
    focus::FocusRing,
    state::{PlayerEvent, PlayerState, StateManager, VisualizerStatus},
    visualizer::analyser::Analyser,
    widgets::{
        alert::draw_alert,
        status_bar::{draw_status_bar, InputMode},
        toast::{Severity, ToastManager},
    },
    BroadcastMessage,
};

const FRAME_FPS: u64 = 25;
const MAX_DRAIN: usize = 256;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    StateUpdated(PlayerState),
    Notification(PlayerEvent),
    PcmChunk(Arc<Vec<f32>>),
}

/// Everything the UI needs that is not in `PlayerState`.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub theme: Theme,
    pub spectrum_pane: bool,
    pub fft_size: usize,
    pub smoothing: f32,
    pub http_address: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
struct PaneAreas {
    station_list: Rect,
    add_form: Rect,
}

pub struct App {
    state_manager: Arc<StateManager>,
    player: PlayerHandle,
    state: AppState,
    station_list: StationList,
    add_form: AddStationForm,
    focus: FocusRing,
    toast: ToastManager,
    alert: Option<String>,
    analyser: Analyser,
    areas: PaneAreas,
    should_quit: bool,
}

impl App {
    pub fn new(
        state_manager: Arc<StateManager>,
        player: PlayerHandle,
        initial: PlayerState,
        options: AppOptions,
    ) -> Self {
        let analyser = Analyser::new(options.fft_size, options.smoothing);
        let mut state = AppState::new(initial, options.theme, options.spectrum_pane);
        state.http_address = options.http_address;
        state.spectrum = vec![0.0; analyser.bin_count()];
        let mut station_list = StationList::new();
        station_list.sync(&state);
        Self {
            state_manager,
            player,
            state,
            station_list,
            add_form: AddStationForm::new(),
            focus: FocusRing::new(vec![ComponentId::StationList, ComponentId::AddStation]),
            toast: ToastManager::new(),
            alert: None,
            analyser,
            areas: PaneAreas::default(),
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, broadcast_rx: broadcast::Receiver<BroadcastMessage>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("terminal ready, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal, broadcast_rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
        terminal.show_cursor()?;
        info!("UI closed");
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ─────
        let bc_tx = tx.clone();
        let bc_state_manager = self.state_manager.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            BroadcastMessage::StateUpdated => {
                                AppMessage::StateUpdated(bc_state_manager.get_state().await)
                            }
                            BroadcastMessage::Notification(evt) => AppMessage::Notification(evt),
                            BroadcastMessage::PcmChunk(chunk) => AppMessage::PcmChunk(chunk),
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        drop(tx);

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut frame_tick = tokio::time::interval(Duration::from_millis(1000 / FRAME_FPS));
        frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }

            if self.should_quit {
                break;
            }

            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    let mut redraw = self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = frame_tick.tick() => {
                    needs_redraw = self.on_frame();
                }

                _ = toast_tick.tick() => {
                    let before = self.toast.len();
                    self.toast.tick();
                    needs_redraw = before != self.toast.len();
                }
            }
        }
        Ok(())
    }

    /// Returns true when the screen needs a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                for action in self.handle_key(key) {
                    self.dispatch(action).await;
                }
                self.state.filter = self.station_list.filter_text();
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                for action in self.handle_mouse(mouse) {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Resize(..)) => true,
            AppMessage::Event(_) => false,
            AppMessage::StateUpdated(player) => {
                self.on_state_updated(player);
                true
            }
            AppMessage::Notification(evt) => {
                self.on_notification(evt);
                true
            }
            AppMessage::PcmChunk(chunk) => {
                if self.state.is_visualizing() {
                    self.analyser.push_samples(&chunk);
                }
                false
            }
        }
    }

    // ── Player → UI ──────────────────────────────────────────────────────────

    fn on_state_updated(&mut self, player: PlayerState) {
        let prev = std::mem::replace(&mut self.state.player, player);
        let next = &self.state.player;

        if next.audio_error.is_some() && next.audio_error != prev.audio_error {
            if let Some(err) = &next.audio_error {
                self.toast.push(err.clone(), Severity::Error, Duration::from_secs(5));
            }
        }
        if let VisualizerStatus::Disabled(reason) = &next.visualizer {
            if prev.visualizer != next.visualizer {
                self.toast.warning(format!("visualizer off: {}", reason));
            }
        }
        if prev.directory_source != next.directory_source {
            if let Some(source) = next.directory_source {
                self.toast.info(format!("{} stations ({})", next.stations.len(), source.label()));
            }
        }

        self.station_list.sync(&self.state);
    }

    fn on_notification(&mut self, evt: PlayerEvent) {
        info!("player event: {:?}", evt);
        match evt {
            PlayerEvent::Play => self.toast.info("▶ playing"),
            PlayerEvent::Pause => self.toast.info("⏸ paused"),
            PlayerEvent::StationChange(station) => self.toast.success(format!("tuned to {}", station.name)),
        }
    }

    /// 25 Hz: refresh the spectrum from the analyser.
    fn on_frame(&mut self) -> bool {
        self.state.frame_count = self.state.frame_count.wrapping_add(1);
        if self.state.is_visualizing() {
            self.state.spectrum = self.analyser.normalized();
            return true;
        }
        if self.state.spectrum.iter().any(|v| *v > 0.0) {
            // decay to silence once playback stops
            self.analyser.reset();
            self.state.spectrum = self.analyser.normalized();
            return true;
        }
        self.state.player.loading
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if self.alert.is_some() {
            return match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => vec![Action::DismissAlert],
                _ => vec![],
            };
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Action::Quit];
        }
        match key.code {
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            _ => {}
        }

        if self.state.input_mode == InputMode::Normal {
            let volume = self.state.player.volume;
            match key.code {
                KeyCode::Char('q') => return vec![Action::Quit],
                KeyCode::Char(' ') => return vec![Action::TogglePlay],
                KeyCode::Char('m') => return vec![Action::ToggleMute],
                KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
                    return vec![Action::Volume(stepped(volume, true))]
                }
                KeyCode::Left | KeyCode::Char('-') => return vec![Action::Volume(stepped(volume, false))],
                KeyCode::Char('t') => return vec![Action::CycleTheme],
                KeyCode::Char('a') | KeyCode::Char('2') => {
                    return vec![Action::FocusPane(ComponentId::AddStation)]
                }
                KeyCode::Char('1') => return vec![Action::FocusPane(ComponentId::StationList)],
                _ => {}
            }
        }

        let focused = self.focus.current();
        let panes: [&mut dyn Component; 2] = [&mut self.station_list, &mut self.add_form];
        panes
            .into_iter()
            .find(|pane| Some(pane.id()) == focused)
            .map(|pane| pane.handle_key(key, &self.state))
            .unwrap_or_default()
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Vec<Action> {
        if self.alert.is_some() {
            return match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => vec![Action::DismissAlert],
                _ => vec![],
            };
        }

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height
        }

        let (col, row) = (mouse.column, mouse.row);
        let clicked = matches!(mouse.kind, MouseEventKind::Down(_));
        let mut actions = Vec::new();

        if hit(self.areas.station_list, col, row) {
            if clicked {
                actions.push(Action::FocusPane(ComponentId::StationList));
            }
            actions.extend(self.station_list.handle_mouse(mouse, self.areas.station_list, &self.state));
        } else if hit(self.areas.add_form, col, row) && clicked {
            actions.push(Action::FocusPane(ComponentId::AddStation));
        }
        actions
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        match action {
            Action::TogglePlay => self.player.toggle_play().await,
            Action::ToggleMute => self.player.toggle_mute().await,
            Action::ChangeStation(url) => self.player.change_station(url).await,
            Action::Volume(v) => self.player.change_volume(v).await,
            Action::AddStation(station) => {
                self.toast.success(format!("added {}", station.name));
                self.player.add_station(station).await;
                self.focus.set(ComponentId::StationList);
            }
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),
            Action::OpenFilter => self.focus.set(ComponentId::StationList),
            Action::CloseFilter => {}
            Action::ShowAlert(message) => self.alert = Some(message),
            Action::DismissAlert => self.alert = None,
            Action::CycleTheme => {
                let theme = self.state.theme.next();
                self.state.set_theme(theme);
                self.toast.info(format!("theme: {}", theme.name()));
            }
            Action::Quit => self.should_quit = true,
        }
        self.sync_input_mode();
    }

    fn sync_input_mode(&mut self) {
        self.state.input_mode = if self.alert.is_some() {
            InputMode::Alert
        } else if self.focus.is_focused(ComponentId::AddStation) {
            InputMode::Edit
        } else if self.station_list.is_searching() {
            InputMode::Filter
        } else {
            InputMode::Normal
        };
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(self.state.palette.base()), area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(6),
                Constraint::Length(1),
            ])
            .split(area);
        draw_header(frame, rows[0], &self.state);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[1]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(if self.state.spectrum_pane { 4 } else { 0 }),
                Constraint::Length(FORM_HEIGHT),
            ])
            .split(body[1]);

        self.areas = PaneAreas {
            station_list: body[0],
            add_form: right[2],
        };

        let list_focused = self.focus.is_focused(ComponentId::StationList);
        self.station_list.draw(frame, body[0], list_focused, &self.state);
        draw_volume(frame, right[0], &self.state);
        if self.state.spectrum_pane {
            draw_spectrum(frame, right[1], &self.state);
        }
        let form_focused = self.focus.is_focused(ComponentId::AddStation);
        self.add_form.draw(frame, right[2], form_focused, &self.state);

        draw_status_bar(frame, rows[2], &self.state);

        if let Some(message) = &self.alert {
            draw_alert(frame, area, message, &self.state.palette);
        }
        self.toast.draw(frame, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlayerCommand, SwitchTickets};
    use radio_core::station::Station;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> (App, mpsc::Receiver<PlayerCommand>) {
        let stations = vec![
            Station::new("DIGI FM", "https://a/digi"),
            Station::new("Radio ZU", "https://c/zu"),
        ];
        let initial = PlayerState::new(stations, 0.5);
        let (bc_tx, _) = broadcast::channel(16);
        let manager = Arc::new(StateManager::new(initial.clone(), bc_tx));
        let (tx, rx) = mpsc::channel(16);
        let options = AppOptions {
            theme: Theme::Dark,
            spectrum_pane: true,
            fft_size: 64,
            smoothing: 0.7,
            http_address: None,
        };
        (App::new(manager, PlayerHandle::new(tx, SwitchTickets::default()), initial, options), rx)
    }

    async fn press(app: &mut App, code: KeyCode) {
        for action in app.handle_key(key(code)) {
            app.dispatch(action).await;
        }
    }

    #[tokio::test]
    async fn test_space_toggles_play() {
        let (mut app, mut rx) = app();
        press(&mut app, KeyCode::Char(' ')).await;
        assert_eq!(rx.try_recv().ok(), Some(PlayerCommand::TogglePlay));
    }

    #[tokio::test]
    async fn test_volume_keys_send_stepped_volume() {
        let (mut app, mut rx) = app();
        press(&mut app, KeyCode::Right).await;
        assert_eq!(rx.try_recv().ok(), Some(PlayerCommand::ChangeVolume(0.55)));
        press(&mut app, KeyCode::Char('-')).await;
        assert_eq!(rx.try_recv().ok(), Some(PlayerCommand::ChangeVolume(0.45)));
    }

    #[tokio::test]
    async fn test_enter_tunes_with_fresh_ticket() {
        let (mut app, mut rx) = app();
        press(&mut app, KeyCode::Down).await;
        press(&mut app, KeyCode::Enter).await;
        match rx.try_recv() {
            Ok(PlayerCommand::ChangeStation { url, ticket }) => {
                assert_eq!(url, "https://c/zu");
                assert_eq!(ticket, 1);
            }
            other => panic!("expected ChangeStation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_typing_in_search_does_not_trigger_globals() {
        let (mut app, mut rx) = app();
        press(&mut app, KeyCode::Char('/')).await;
        assert_eq!(app.state.input_mode, InputMode::Filter);
        press(&mut app, KeyCode::Char('q')).await;
        press(&mut app, KeyCode::Char(' ')).await;
        assert!(!app.should_quit);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_form_shows_alert_until_dismissed() {
        let (mut app, mut rx) = app();
        press(&mut app, KeyCode::Char('a')).await;
        assert_eq!(app.state.input_mode, InputMode::Edit);
        for _ in 0..3 {
            press(&mut app, KeyCode::Down).await;
        }
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.alert.as_deref(), Some("Name and URL are required!"));
        assert_eq!(app.state.input_mode, InputMode::Alert);

        // swallowed while the alert is up
        press(&mut app, KeyCode::Char('q')).await;
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Enter).await;
        assert!(app.alert.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tab_cycles_focus_and_q_quits() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Tab).await;
        assert!(app.focus.is_focused(ComponentId::AddStation));
        press(&mut app, KeyCode::Tab).await;
        assert!(app.focus.is_focused(ComponentId::StationList));
        press(&mut app, KeyCode::Char('q')).await;
        assert!(app.should_quit);
    }

    #[test]
    fn test_state_update_resyncs_station_list() {
        let (mut app, _rx) = app();
        let mut player = app.state.player.clone();
        player.stations.push(Station::new("Kiss FM", "https://k/kiss"));
        app.on_state_updated(player);
        assert_eq!(app.station_list.list.items.len(), 3);
    }

    #[tokio::test]
    async fn test_search_text_reaches_status_bar() {
        let (mut app, _rx) = app();
        for c in ['/', 'Z', 'u'] {
            app.handle_message(AppMessage::Event(Event::Key(key(KeyCode::Char(c))))).await;
        }
        assert_eq!(app.state.filter, "zu");
        assert!(crate::widgets::status_bar::summary(&app.state).starts_with("filter \"zu\""));
    }

    #[test]
    fn test_spectrum_starts_with_one_bar_per_bin() {
        let (app, _rx) = app();
        assert_eq!(app.state.spectrum, vec![0.0; 32]);
    }

    #[test]
    fn test_spectrum_decays_after_stop() {
        let (mut app, _rx) = app();
        app.state.spectrum = vec![0.5; 32];
        assert!(app.on_frame());
        assert!(app.state.spectrum.iter().all(|v| *v < 0.5));
    }
}
