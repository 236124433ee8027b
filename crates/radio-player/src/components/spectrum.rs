//! Spectrum pane: one vertical bar per frequency bin, redrawn from scratch
//! every frame.
//!
//! Columns map onto bins proportionally (`bin = col * bins / width`), so a
//! bar is `width / bins` columns wide.  Heights use eighth blocks.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::app_state::AppState;
use crate::state::VisualizerStatus;
use crate::widgets::pane_chrome::{pane_chrome, Badge};

const EIGHTHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bar height per column, in eighths of a row.
pub fn column_heights(bins: &[f32], width: u16, height: u16) -> Vec<u16> {
    if bins.is_empty() {
        return vec![0; width as usize];
    }
    let max = height as f32 * 8.0;
    (0..width as usize)
        .map(|col| {
            let bin = col * bins.len() / width as usize;
            (bins[bin].clamp(0.0, 1.0) * max).round() as u16
        })
        .collect()
}

/// Text rows, top first.
pub fn render_rows(heights: &[u16], height: u16) -> Vec<String> {
    (0..height)
        .map(|row| {
            let floor = (height - 1 - row) * 8;
            heights
                .iter()
                .map(|&h| EIGHTHS[h.saturating_sub(floor).min(8) as usize])
                .collect()
        })
        .collect()
}

pub fn draw_spectrum(frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = &state.palette;
    let badge = match &state.player.visualizer {
        VisualizerStatus::Enabled if state.player.playing => None,
        VisualizerStatus::Enabled => Some(Badge {
            text: "idle",
            color: palette.secondary,
        }),
        VisualizerStatus::Pending => Some(Badge {
            text: "…",
            color: palette.secondary,
        }),
        VisualizerStatus::Disabled(_) => Some(Badge {
            text: "off",
            color: palette.secondary,
        }),
    };
    let block = pane_chrome("spectrum", None, false, badge, palette);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let heights = column_heights(&state.spectrum, inner.width, inner.height);
    let bar = Style::default().fg(palette.bars).bg(palette.bg);
    let lines: Vec<Line> = render_rows(&heights, inner.height)
        .into_iter()
        .map(|row| Line::from(Span::styled(row, bar)))
        .collect();
    frame.render_widget(Paragraph::new(lines).style(palette.base()), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_map_proportionally_to_bins() {
        let bins = [0.0, 0.25, 0.5, 1.0];
        // 8 columns, 2 per bin, 1 row = 8 eighths
        assert_eq!(column_heights(&bins, 8, 1), vec![0, 0, 2, 2, 4, 4, 8, 8]);
        // fewer columns than bins: sample every other bin
        assert_eq!(column_heights(&bins, 2, 1), vec![0, 4]);
    }

    #[test]
    fn test_empty_spectrum_is_blank() {
        let heights = column_heights(&[], 5, 2);
        assert_eq!(heights, vec![0; 5]);
        assert!(render_rows(&heights, 2).iter().all(|r| r.trim().is_empty()));
    }

    #[test]
    fn test_rows_stack_eighths() {
        // 12 eighths over two rows: top row half block, bottom row full
        let rows = render_rows(&[12, 0], 2);
        assert_eq!(rows, vec!["▄ ".to_string(), "█ ".to_string()]);
    }
}
