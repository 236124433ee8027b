//! PaneChrome: bordered pane with focus styling and an optional badge.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders},
};

use crate::theme::Palette;

/// Shown right-aligned in the pane's top border (e.g. "LIVE", "OFF").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

pub fn pane_chrome<'a>(
    title: &'a str,
    number_key: Option<char>,
    focused: bool,
    badge: Option<Badge<'a>>,
    palette: &Palette,
) -> Block<'a> {
    let title_style = if focused {
        Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)
    } else {
        palette.secondary()
    };

    let mut spans = Vec::new();
    if let Some(key) = number_key {
        spans.push(Span::styled(format!("[{}] ", key), palette.secondary()));
    }
    spans.push(Span::styled(title, title_style));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Thick
        } else {
            BorderType::Plain
        })
        .border_style(palette.border(focused))
        .style(palette.base())
        .title(Line::from(spans));

    match badge {
        Some(b) => block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}
