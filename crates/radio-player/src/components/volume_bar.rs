//! Volume slider.  Display only; the keys live in the App's global map.

use ratatui::{layout::Rect, style::Style, Frame};

use crate::app_state::AppState;
use crate::widgets::level_bar::draw_level;
use crate::widgets::pane_chrome::pane_chrome;

pub const VOLUME_STEP: f32 = 0.05;

/// One keyboard step up or down, kept on the 0.01 grid and inside [0, 1].
pub fn stepped(volume: f32, up: bool) -> f32 {
    let delta = if up { VOLUME_STEP } else { -VOLUME_STEP };
    (((volume + delta) * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

pub fn draw_volume(frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = &state.palette;
    let block = pane_chrome("volume", None, false, None, palette);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label = if state.player.muted { "🔇" } else { "🔊" };
    let bar_style = if state.player.muted {
        palette.secondary()
    } else {
        Style::default().fg(palette.fg)
    };
    draw_level(frame, inner, state.player.volume, label, bar_style, palette.secondary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_stay_in_range() {
        assert_eq!(stepped(0.5, true), 0.55);
        assert_eq!(stepped(0.98, true), 1.0);
        assert_eq!(stepped(0.02, false), 0.0);
        let mut v = 0.0;
        for _ in 0..20 {
            v = stepped(v, true);
        }
        assert_eq!(v, 1.0);
    }
}
