//! AddStationForm, the "Manage Stations" pane: name, stream URL, optional logo and an
//! `Add Station` button.
//!
//! Input is validated here, at the boundary.  An invalid submission raises
//! an alert and leaves the fields alone; a valid one emits `AddStation` and
//! clears them.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use radio_core::station::NewStation;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::{
        pane_chrome::pane_chrome,
        text_field::{FieldAction, TextField},
    },
};

const FIELD_COUNT: usize = 3;
const BUTTON: usize = FIELD_COUNT;

pub const FORM_HEIGHT: u16 = 6;

pub struct AddStationForm {
    fields: [TextField; FIELD_COUNT],
    /// 0..FIELD_COUNT are the fields, `BUTTON` is the button.
    cursor: usize,
}

impl AddStationForm {
    pub fn new() -> Self {
        Self {
            fields: [
                TextField::new("name  ", "Station Name"),
                TextField::new("url   ", "Stream URL"),
                TextField::new("logo  ", "Logo URL (optional)"),
            ],
            cursor: 0,
        }
    }

    pub fn values(&self) -> NewStation {
        NewStation {
            name: self.fields[0].text().to_string(),
            url: self.fields[1].text().to_string(),
            logo: self.fields[2].text().to_string(),
        }
    }

    fn clear(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
        self.cursor = 0;
    }

    fn submit(&mut self) -> Vec<Action> {
        match self.values().validate() {
            Ok(station) => {
                self.clear();
                vec![Action::AddStation(station)]
            }
            Err(e) => vec![Action::ShowAlert(e.to_string())],
        }
    }
}

impl Default for AddStationForm {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for AddStationForm {
    fn id(&self) -> ComponentId {
        ComponentId::AddStation
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                return vec![];
            }
            KeyCode::Down => {
                self.cursor = (self.cursor + 1).min(BUTTON);
                return vec![];
            }
            _ => {}
        }

        if self.cursor == BUTTON {
            return match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => self.submit(),
                KeyCode::Esc => vec![Action::FocusPane(ComponentId::StationList)],
                _ => vec![],
            };
        }

        match self.fields[self.cursor].handle_key(key) {
            FieldAction::Submitted => {
                self.cursor += 1;
                vec![]
            }
            FieldAction::Cancelled => vec![Action::FocusPane(ComponentId::StationList)],
            FieldAction::Changed(_) | FieldAction::None => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let palette = &state.palette;
        let block = pane_chrome("Manage Stations", Some('2'), focused, None, palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        for (i, field) in self.fields.iter().enumerate() {
            let row = inner.y + i as u16;
            if row >= inner.y + inner.height {
                return;
            }
            let field_area = Rect { y: row, height: 1, ..inner };
            field.draw(frame, field_area, palette, focused && self.cursor == i);
        }

        let button_row = inner.y + FIELD_COUNT as u16;
        if button_row < inner.y + inner.height {
            let style = if focused && self.cursor == BUTTON {
                palette.base().add_modifier(Modifier::REVERSED | Modifier::BOLD)
            } else {
                palette.base()
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled("[ Add Station ]", style))),
                Rect { y: button_row, height: 1, ..inner },
            );
        }
    }
}
