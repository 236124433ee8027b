//! StationList: the station picker, with a search bar.
//!
//! The search text is view state: typing narrows the visible rows through
//! `filter_stations`, the station list itself is never modified.  Enter tunes
//! the highlighted row.

use std::time::Instant;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use radio_core::station::{filter_stations, Station};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
        text_field::{FieldAction, TextField},
    },
};

pub struct StationList {
    pub list: ScrollableList<Station>,
    pub search: TextField,
    list_state: ListState,
    last_click: Option<(usize, Instant)>,
}

impl StationList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(filter_stations),
            search: TextField::new("/ ", "Search stations..."),
            list_state: ListState::default(),
            last_click: None,
        }
    }

    /// Pick up a new station list.  The cursor follows the selected station
    /// when the list itself changed.
    pub fn sync(&mut self, state: &AppState) {
        let stations = &state.player.stations;
        if self.list.items != *stations {
            self.list.set_items(stations.clone());
            if let Some(idx) = state.player.selected_index() {
                self.list.set_selected_by_original(idx);
            }
        }
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_active()
    }

    /// Lowercased search text (the filter applied to the rows).
    pub fn filter_text(&self) -> String {
        self.list.filter.to_lowercase()
    }

    fn tune_selected(&self) -> Vec<Action> {
        self.list
            .selected_item()
            .map(|s| vec![Action::ChangeStation(s.url.clone())])
            .unwrap_or_default()
    }

    fn render_item<'a>(&self, station: &'a Station, highlighted: bool, focused: bool, state: &AppState) -> ListItem<'a> {
        let palette = &state.palette;
        let is_selected = state
            .player
            .selected
            .as_ref()
            .is_some_and(|s| s.url == station.url);

        let marker = match (is_selected, state.player.playing) {
            (true, true) => "▶ ",
            (true, false) => "• ",
            _ => "  ",
        };
        let name_style = if is_selected {
            Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.fg)
        };
        let mut spans = vec![
            Span::styled(marker, Style::default().fg(palette.fg)),
            Span::styled(station.name.as_str(), name_style),
        ];
        if highlighted && station.logo.is_some() {
            spans.push(Span::styled("  ◆", palette.secondary()));
        }

        let item = ListItem::new(Line::from(spans));
        if highlighted {
            item.style(palette.selected(focused))
        } else {
            item
        }
    }
}

impl Default for StationList {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for StationList {
    fn id(&self) -> ComponentId {
        ComponentId::StationList
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if self.search.is_active() {
            match key.code {
                KeyCode::Up => {
                    self.list.select_up(1);
                    return vec![];
                }
                KeyCode::Down => {
                    self.list.select_down(1);
                    return vec![];
                }
                _ => {}
            }
            return match self.search.handle_key(key) {
                FieldAction::Changed(q) => {
                    self.list.set_filter(&q);
                    vec![]
                }
                FieldAction::Submitted => {
                    self.search.deactivate();
                    vec![Action::CloseFilter]
                }
                FieldAction::Cancelled => {
                    self.list.set_filter("");
                    vec![Action::CloseFilter]
                }
                FieldAction::None => vec![],
            };
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) { 5 } else { 1 };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter => return self.tune_selected(),
            KeyCode::Char('/') => {
                self.search.activate();
                return vec![Action::OpenFilter];
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        let row = event.row.saturating_sub(area.y + 1) as usize;
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let double = self
                    .last_click
                    .is_some_and(|(r, t)| r == row && t.elapsed().as_millis() < 400);
                if self.list.handle_click(row) && double {
                    self.last_click = None;
                    return self.tune_selected();
                }
                self.last_click = Some((row, Instant::now()));
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let palette = &state.palette;
        let count = format!("{}/{}", self.list.visible.len(), self.list.items.len());
        let block = pane_chrome(
            "stations",
            Some('1'),
            focused,
            Some(Badge {
                text: &count,
                color: palette.secondary,
            }),
            palette,
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let search_visible = self.search.is_active() || !self.list.filter.is_empty();
        let list_h = inner.height.saturating_sub(u16::from(search_visible));
        let list_area = Rect { height: list_h, ..inner };

        if state.player.stations.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  loading stations…", palette.secondary())),
                list_area,
            );
        } else if self.list.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no stations match", palette.secondary())),
                list_area,
            );
        } else {
            let height = list_h as usize;
            self.list.ensure_visible(height);
            let highlighted_row = self.list.selected_in_view();
            let items: Vec<ListItem> = self
                .list
                .visible_items(height)
                .into_iter()
                .enumerate()
                .map(|(row, (_, station))| self.render_item(station, row == highlighted_row, focused, state))
                .collect();
            self.list_state.select(Some(highlighted_row));
            frame.render_stateful_widget(List::new(items), list_area, &mut self.list_state);
        }

        if search_visible {
            let search_area = Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            };
            self.search
                .draw(frame, search_area, palette, focused && self.search.is_active());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PlayerState;
    use radio_core::theme::Theme;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_state() -> AppState {
        let stations = vec![
            Station::new("DIGI FM", "https://a/digi"),
            Station::new("Europa FM", "https://b/europa"),
            Station::new("Radio ZU", "https://c/zu"),
        ];
        let mut player = PlayerState::new(stations, 1.0);
        player.selected = Some(Station::new("DIGI FM", "https://a/digi"));
        AppState::new(player, Theme::Light, true)
    }

    #[test]
    fn test_enter_tunes_highlighted_row() {
        let state = app_state();
        let mut list = StationList::new();
        list.sync(&state);
        assert_eq!(list.handle_key(key(KeyCode::Down), &state), vec![]);
        assert_eq!(
            list.handle_key(key(KeyCode::Enter), &state),
            vec![Action::ChangeStation("https://b/europa".into())]
        );
    }

    #[test]
    fn test_search_narrows_rows_but_keeps_stations() {
        let state = app_state();
        let mut list = StationList::new();
        list.sync(&state);

        assert_eq!(list.handle_key(key(KeyCode::Char('/')), &state), vec![Action::OpenFilter]);
        for c in "ZU".chars() {
            list.handle_key(key(KeyCode::Char(c)), &state);
        }
        assert_eq!(list.filter_text(), "zu");
        assert_eq!(list.list.visible, vec![2]);
        assert_eq!(list.list.items.len(), 3);

        // Enter keeps the filter and leaves search mode; a second Enter tunes.
        assert_eq!(list.handle_key(key(KeyCode::Enter), &state), vec![Action::CloseFilter]);
        assert!(!list.is_searching());
        assert_eq!(
            list.handle_key(key(KeyCode::Enter), &state),
            vec![Action::ChangeStation("https://c/zu".into())]
        );
    }

    #[test]
    fn test_escape_clears_search() {
        let state = app_state();
        let mut list = StationList::new();
        list.sync(&state);
        list.handle_key(key(KeyCode::Char('/')), &state);
        list.handle_key(key(KeyCode::Char('q')), &state);
        assert!(list.list.is_empty());
        list.handle_key(key(KeyCode::Esc), &state);
        assert_eq!(list.list.visible.len(), 3);
        assert_eq!(list.handle_key(key(KeyCode::Esc), &state), vec![Action::CloseFilter]);
    }

    #[test]
    fn test_sync_follows_selected_station() {
        let mut state = app_state();
        state.player.selected = Some(Station::new("Radio ZU", "https://c/zu"));
        let mut list = StationList::new();
        list.sync(&state);
        assert_eq!(list.list.selected_item().map(|s| s.name.as_str()), Some("Radio ZU"));
    }
}
