//! Modal alert box.  While it is open the App routes every key here.

use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::{Palette, C_ERROR};

/// Centre a `width` × `height` box inside `area`.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

pub fn draw_alert(frame: &mut Frame, area: Rect, message: &str, palette: &Palette) {
    let width = (message.chars().count() as u16 + 6).clamp(24, 60);
    let rect = centered(area, width, 5);
    frame.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(ratatui::style::Style::default().fg(C_ERROR))
        .style(palette.base())
        .title(Span::styled(" alert ", palette.base().add_modifier(Modifier::BOLD)));

    let text = vec![
        Line::from(Span::styled(message, palette.base())),
        Line::from(Span::styled("[ OK ]", palette.base().add_modifier(Modifier::REVERSED))),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rect,
    );
}
