//! Header: station title, transport state, current track and the last
//! audio error.  Not focusable.
//!
//! Row 1: play/pause glyph, buffering spinner, mute state.
//! Row 2: current track.
//! Row 3: audio error, when there is one.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::AppState;
use crate::theme::C_ERROR;
use crate::widgets::pane_chrome::{pane_chrome, Badge};

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

pub const HEADER_HEIGHT: u16 = 5;

pub fn transport_line(state: &AppState) -> Line<'static> {
    let palette = &state.palette;
    let player = &state.player;
    let strong = Style::default().fg(palette.fg).add_modifier(Modifier::BOLD);

    let mut spans = vec![if player.playing {
        Span::styled("⏸ playing", strong)
    } else {
        Span::styled("▶ stopped", strong)
    }];

    if player.loading {
        let frame = SPINNER_FRAMES[(state.frame_count / 3) as usize % SPINNER_FRAMES.len()];
        spans.push(Span::styled(format!("  {} buffering", frame), palette.secondary()));
    }

    spans.push(Span::raw("   "));
    spans.push(if player.muted {
        Span::styled("🔇 muted", strong)
    } else {
        Span::styled("🔊 sound on", palette.secondary())
    });

    if !player.audio_initialized && player.audio_error.is_none() {
        spans.push(Span::styled("   starting audio…", palette.secondary()));
    }
    Line::from(spans)
}

pub fn draw_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = &state.palette;
    let block = pane_chrome(
        state.title(),
        None,
        false,
        Some(Badge {
            text: state.theme.name(),
            color: palette.fg,
        }),
        palette,
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        transport_line(state),
        Line::from(vec![
            Span::styled("♪ ", palette.secondary()),
            Span::styled(state.player.current_track.clone(), Style::default().fg(palette.fg)),
        ]),
    ];
    if let Some(err) = &state.player.audio_error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD),
        )));
    }
    frame.render_widget(Paragraph::new(lines).style(palette.base()), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PlayerState;
    use radio_core::theme::Theme;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_transport_line_states() {
        let mut state = AppState::new(PlayerState::new(Vec::new(), 1.0), Theme::Dark, true);
        state.player.audio_initialized = true;
        assert_eq!(text(&transport_line(&state)), "▶ stopped   🔊 sound on");

        state.player.playing = true;
        state.player.loading = true;
        state.player.muted = true;
        let line = text(&transport_line(&state));
        assert!(line.starts_with("⏸ playing"));
        assert!(line.contains("buffering"));
        assert!(line.ends_with("🔇 muted"));
    }
}
