use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Neon,
    Cyberpunk,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Light, Theme::Dark, Theme::Neon, Theme::Cyberpunk];

    pub fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Neon => "neon",
            Self::Cyberpunk => "cyberpunk",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Neon,
            Self::Neon => Self::Cyberpunk,
            Self::Cyberpunk => Self::Light,
        }
    }

    /// An explicit theme always wins.  Without one, a dark ambient preference
    /// upgrades the default light theme to dark.
    pub fn resolve(explicit: Option<Theme>, ambient_dark: bool) -> Self {
        match explicit {
            Some(theme) => theme,
            None if ambient_dark => Self::Dark,
            None => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown theme '{}' (light, dark, neon, cyberpunk)", s))
    }
}

/// Terminal equivalent of `prefers-color-scheme: dark`.
pub fn ambient_prefers_dark() -> bool {
    std::env::var("COLORFGBG")
        .ok()
        .map(|v| colorfgbg_is_dark(&v))
        .unwrap_or(false)
}

/// `COLORFGBG` is `fg;bg` (sometimes `fg;default;bg`).  Background indices
/// 0–6 and 8 are the dark half of the 16-colour palette.
pub fn colorfgbg_is_dark(value: &str) -> bool {
    value
        .rsplit(';')
        .next()
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .map(|bg| bg <= 6 || bg == 8)
        .unwrap_or(false)
}
