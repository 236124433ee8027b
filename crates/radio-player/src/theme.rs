//! Colour palettes for each `Theme` and the style helpers built on them.

use radio_core::theme::Theme;
use ratatui::style::{Color, Modifier, Style};

const fn hex(rgb: u32) -> Color {
    Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

// ── Fixed semantic colours (same in every theme) ─────────────────────────────

pub const C_ERROR: Color = hex(0xff3333);
pub const C_TOAST_INFO: Color = Color::Rgb(80, 160, 220);
pub const C_TOAST_SUCCESS: Color = Color::Rgb(80, 200, 120);
pub const C_TOAST_WARNING: Color = Color::Rgb(255, 184, 80);
pub const C_TOAST_ERROR: Color = Color::Rgb(255, 95, 95);

// ── Per-theme palette ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub border: Color,
    pub input_bg: Color,
    pub input_border: Color,
    pub secondary: Color,
    pub selection_bg: Color,
    /// Spectrum bars.
    pub bars: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                bg: hex(0xf9f9f9),
                fg: hex(0x000000),
                border: hex(0xcccccc),
                input_bg: hex(0xffffff),
                input_border: hex(0xcccccc),
                secondary: hex(0x666666),
                selection_bg: hex(0xe4e4e4),
                bars: hex(0x000000),
            },
            Theme::Dark => Self {
                bg: hex(0x121212),
                fg: hex(0xeeeeee),
                border: hex(0x333333),
                input_bg: hex(0x222222),
                input_border: hex(0x444444),
                secondary: hex(0x999999),
                selection_bg: hex(0x2a2a2a),
                bars: hex(0xffffff),
            },
            Theme::Neon => Self {
                bg: hex(0x0f0f0f),
                fg: hex(0x39ff14),
                border: hex(0x39ff14),
                input_bg: hex(0x0a0a0a),
                input_border: hex(0x39ff14),
                secondary: hex(0x1f8f0b),
                selection_bg: hex(0x1a3312),
                bars: hex(0x39ff14),
            },
            Theme::Cyberpunk => Self {
                bg: hex(0x1a1a2e),
                fg: hex(0xff00c8),
                border: hex(0xff00c8),
                input_bg: hex(0x10101c),
                input_border: hex(0xff00c8),
                secondary: hex(0x8a1470),
                selection_bg: hex(0x2d1f45),
                bars: hex(0xff00c8),
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn secondary(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn selected(&self, focused: bool) -> Style {
        let style = Style::default().bg(self.selection_bg).fg(self.fg);
        if focused {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn input(&self) -> Style {
        Style::default().fg(self.fg).bg(self.input_bg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_colours_follow_theme() {
        assert_eq!(Palette::for_theme(Theme::Neon).bars, Color::Rgb(0x39, 0xff, 0x14));
        assert_eq!(Palette::for_theme(Theme::Cyberpunk).bars, Color::Rgb(0xff, 0x00, 0xc8));
        assert_eq!(Palette::for_theme(Theme::Dark).bars, Color::Rgb(255, 255, 255));
        assert_eq!(Palette::for_theme(Theme::Light).bars, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_backgrounds_are_distinct() {
        let bgs: Vec<Color> = Theme::ALL.iter().map(|t| Palette::for_theme(*t).bg).collect();
        for (i, a) in bgs.iter().enumerate() {
            for b in &bgs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
