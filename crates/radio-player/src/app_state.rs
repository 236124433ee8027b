//! AppState: read-only data handed to components during render and input.
//!
//! Only the App event loop writes to it.

use radio_core::theme::Theme;

use crate::state::{PlayerState, VisualizerStatus};
use crate::theme::Palette;
use crate::widgets::status_bar::InputMode;

pub struct AppState {
    /// Last snapshot pulled from the `StateManager`.
    pub player: PlayerState,
    pub theme: Theme,
    pub palette: Palette,
    pub input_mode: InputMode,
    /// Normalised spectrum bins for the current frame.
    pub spectrum: Vec<f32>,
    /// Whether the layout has a spectrum pane at all.
    pub spectrum_pane: bool,
    pub http_address: Option<String>,
    /// Lowercased station search text, empty when not filtering.
    pub filter: String,
    pub frame_count: u64,
}

impl AppState {
    pub fn new(player: PlayerState, theme: Theme, spectrum_pane: bool) -> Self {
        Self {
            player,
            theme,
            palette: Palette::for_theme(theme),
            input_mode: InputMode::Normal,
            spectrum: Vec::new(),
            spectrum_pane,
            http_address: None,
            filter: String::new(),
            frame_count: 0,
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.palette = Palette::for_theme(theme);
    }

    /// Heading: the selected station's name, or a generic title.
    pub fn title(&self) -> &str {
        self.player
            .selected
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("Radio Player")
    }

    pub fn is_visualizing(&self) -> bool {
        self.spectrum_pane
            && self.player.playing
            && self.player.visualizer == VisualizerStatus::Enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radio_core::station::Station;

    #[test]
    fn test_title_falls_back_until_selected() {
        let mut state = AppState::new(PlayerState::new(Vec::new(), 1.0), Theme::Light, true);
        assert_eq!(state.title(), "Radio Player");
        state.player.selected = Some(Station::new("Europa FM", "https://b"));
        assert_eq!(state.title(), "Europa FM");
    }

    #[test]
    fn test_set_theme_swaps_palette() {
        let mut state = AppState::new(PlayerState::new(Vec::new(), 1.0), Theme::Light, true);
        state.set_theme(Theme::Neon);
        assert_eq!(state.palette, Palette::for_theme(Theme::Neon));
    }
}
