//! TextField: a single-line `tui-input` field used for the station filter
//! and the add-station form.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::Palette;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldAction {
    Changed(String),
    Submitted,
    Cancelled,
    None,
}

pub struct TextField {
    input: Input,
    active: bool,
    prefix: &'static str,
    placeholder: String,
}

impl TextField {
    pub fn new(prefix: &'static str, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            prefix,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Esc clears a non-empty field first; a second Esc cancels.
    pub fn handle_key(&mut self, key: KeyEvent) -> FieldAction {
        match key.code {
            KeyCode::Esc => {
                if self.input.value().is_empty() {
                    self.deactivate();
                    FieldAction::Cancelled
                } else {
                    self.input = Input::default();
                    FieldAction::Changed(String::new())
                }
            }
            KeyCode::Enter => FieldAction::Submitted,
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.input.value() == before {
                    FieldAction::None
                } else {
                    FieldAction::Changed(self.input.value().to_string())
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, palette: &Palette, show_cursor: bool) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let prefix_w = self.prefix.chars().count() as u16;
        let width = area.width.saturating_sub(prefix_w + 1) as usize;
        let scroll = self.input.visual_scroll(width);
        let value = self.input.value();

        let body = if value.is_empty() {
            Span::styled(self.placeholder.clone(), palette.secondary())
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(visible, Style::default().fg(palette.fg))
        };
        let line = Line::from(vec![Span::styled(self.prefix, palette.secondary()), body]);
        frame.render_widget(Paragraph::new(line).style(palette.input()), area);

        if show_cursor {
            let x = area.x + prefix_w + self.input.visual_cursor().saturating_sub(scroll) as u16;
            frame.set_cursor_position((x.min(area.x + area.width - 1), area.y));
        }
    }
}
