//! Smooth horizontal level bar (eighth-block resolution), used for volume.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// `level` in [0, 1] rendered over `width` cells.
pub fn bar_string(level: f32, width: usize) -> String {
    let eighths = (level.clamp(0.0, 1.0) * width as f32 * 8.0).round() as usize;
    let full = (eighths / 8).min(width);
    let partial = eighths % 8;

    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat('█').take(full));
    if full < width {
        bar.push(BLOCKS[partial]);
        bar.extend(std::iter::repeat(' ').take(width - full - 1));
    }
    bar
}

/// `label` on the left, the bar, then the percentage on the right.
pub fn draw_level(frame: &mut Frame, area: Rect, level: f32, label: &str, bar: Style, text: Style) {
    if area.width < 8 || area.height == 0 {
        return;
    }
    let pct = format!(" {:>3}%", (level.clamp(0.0, 1.0) * 100.0).round() as u32);
    let label_w = label.chars().count() + 1;
    let bar_w = (area.width as usize).saturating_sub(label_w + pct.len()).max(1);

    let line = Line::from(vec![
        Span::styled(format!("{} ", label), text),
        Span::styled(bar_string(level, bar_w), bar),
        Span::styled(pct, text),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
