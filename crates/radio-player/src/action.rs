//! Action enum: everything the UI can ask for.

use radio_core::station::Station;

/// Focusable panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    StationList,
    AddStation,
}

/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    TogglePlay,
    ToggleMute,
    /// Switch to the station with this URL.
    ChangeStation(String),
    Volume(f32),

    // ── Station management ───────────────────────────────────────────────────
    AddStation(Station),

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    OpenFilter,
    CloseFilter,

    // ── UI ───────────────────────────────────────────────────────────────────
    ShowAlert(String),
    DismissAlert,
    CycleTheme,
    Quit,
}
