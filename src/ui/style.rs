//! Light and dark palettes.
//!
//! The whole screen is painted from one [`Palette`], chosen by the model's
//! `dark_mode` flag, so toggling the theme never leaves a pane in the other
//! mode.

use ratatui::style::{Color, Modifier, Style};

use crate::app::ToastLevel;

/// Colors for one display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub border: Color,
    pub accent: Color,
    pub danger: Color,
    pub bar_background: Color,
    pub bar_foreground: Color,
    pub cursor_background: Color,
    pub cursor_foreground: Color,
}

impl Palette {
    pub const fn dark() -> Self {
        Self {
            background: Color::Indexed(235),
            foreground: Color::Indexed(252),
            muted: Color::Indexed(243),
            border: Color::Indexed(240),
            accent: Color::Cyan,
            danger: Color::LightRed,
            bar_background: Color::Indexed(238),
            bar_foreground: Color::White,
            cursor_background: Color::Indexed(252),
            cursor_foreground: Color::Indexed(235),
        }
    }

    pub const fn light() -> Self {
        Self {
            background: Color::Indexed(255),
            foreground: Color::Indexed(235),
            muted: Color::Indexed(245),
            border: Color::Indexed(250),
            accent: Color::Indexed(25),
            danger: Color::Indexed(160),
            bar_background: Color::Indexed(253),
            bar_foreground: Color::Indexed(235),
            cursor_background: Color::Indexed(235),
            cursor_foreground: Color::Indexed(255),
        }
    }

    pub const fn for_mode(dark_mode: bool) -> Self {
        if dark_mode { Self::dark() } else { Self::light() }
    }

    /// Base style for pane contents.
    pub fn base(&self) -> Style {
        Style::default().bg(self.background).fg(self.foreground)
    }

    pub fn bar(&self) -> Style {
        Style::default().bg(self.bar_background).fg(self.bar_foreground)
    }

    pub fn gutter(&self) -> Style {
        self.base().fg(self.muted)
    }

    pub fn cursor(&self) -> Style {
        Style::default()
            .bg(self.cursor_background)
            .fg(self.cursor_foreground)
    }

    pub fn border(&self, is_error: bool) -> Style {
        self.base().fg(if is_error { self.danger } else { self.border })
    }

    /// Style of a tab label in a tab strip.
    pub fn tab(&self, active: bool, is_error: bool) -> Style {
        let color = if is_error { self.danger } else { self.accent };
        if active {
            self.base()
                .fg(color)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            self.base().fg(self.muted)
        }
    }

    pub fn toast(&self, level: ToastLevel) -> Style {
        match level {
            ToastLevel::Info => self.bar(),
            ToastLevel::Warning => Style::default().bg(Color::Yellow).fg(Color::Black),
            ToastLevel::Error => Style::default().bg(self.danger).fg(Color::White),
        }
    }
}
