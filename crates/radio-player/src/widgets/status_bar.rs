//! Status bar: bottom line with input mode, key hints, directory source,
//! theme and visualizer status.

use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::AppState;
use crate::state::VisualizerStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
    /// Typing into the add-station form.
    Edit,
    /// A modal alert is open.
    Alert,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Filter => "FILTER",
            Self::Edit => "EDIT",
            Self::Alert => "ALERT",
        }
    }

    pub fn key_hints(self) -> &'static str {
        match self {
            Self::Normal => {
                "↑↓/jk select  Enter tune  Space play/pause  m mute  ←→ vol  / search  a add  t theme  Tab panes  q quit"
            }
            Self::Filter => "type to search  ↑↓ move  Enter keep  Esc clear/close",
            Self::Edit => "↑↓ field  Enter next/submit  Esc leave  Tab panes",
            Self::Alert => "Enter/Esc dismiss",
        }
    }
}

/// Right-hand summary: `[filter ·] source · theme · viz`.
pub fn summary(state: &AppState) -> String {
    let source = state
        .player
        .directory_source
        .map(|s| s.label())
        .unwrap_or("loading");
    let viz = match &state.player.visualizer {
        VisualizerStatus::Pending => "viz …".to_string(),
        VisualizerStatus::Enabled => "viz on".to_string(),
        VisualizerStatus::Disabled(reason) => format!("viz off ({})", reason),
    };
    let mut out = String::new();
    if !state.filter.is_empty() {
        out.push_str(&format!("filter \"{}\" · ", state.filter));
    }
    out.push_str(&format!("{} · {} · {}", source, state.theme.name(), viz));
    if let Some(addr) = &state.http_address {
        out.push_str(&format!(" · http {}", addr));
    }
    out
}

pub fn draw_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = &state.palette;
    let mode = state.input_mode;
    let right = summary(state);
    let right_w = right.chars().count() as u16 + 1;

    let left = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            palette.base().add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Span::raw(" "),
        Span::styled(mode.key_hints(), palette.secondary()),
    ]);
    frame.render_widget(Paragraph::new(left).style(palette.base()), area);

    if area.width > right_w + 20 {
        let right_area = Rect {
            x: area.x + area.width - right_w,
            width: right_w,
            ..area
        };
        frame.render_widget(
            Paragraph::new(Span::styled(right, palette.secondary())).style(palette.base()),
            right_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PlayerState;
    use radio_core::directory::DirectorySource;
    use radio_core::theme::Theme;

    #[test]
    fn test_summary_reflects_source_and_theme() {
        let mut state = AppState::new(PlayerState::new(Vec::new(), 1.0), Theme::Neon, true);
        assert_eq!(summary(&state), "loading · neon · viz …");

        state.player.directory_source = Some(DirectorySource::BuiltIn);
        state.player.visualizer = VisualizerStatus::Disabled("ffmpeg not found".into());
        state.http_address = Some("127.0.0.1:8990".into());
        assert_eq!(
            summary(&state),
            "built-in · neon · viz off (ffmpeg not found) · http 127.0.0.1:8990"
        );
    }

    #[test]
    fn test_summary_leads_with_active_filter() {
        let mut state = AppState::new(PlayerState::new(Vec::new(), 1.0), Theme::Dark, false);
        state.filter = "zu".into();
        assert!(summary(&state).starts_with("filter \"zu\" · loading · dark"));
    }
}
