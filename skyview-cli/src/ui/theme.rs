//! UI Theme Module - Consistent color palette and style helpers
//!
//! Provides a centralized theme system for the Skyview TUI with:
//! - Palette tokens (not hard-coded colors)
//! - StyleKit helpers for resource states
//! - Dark and high-contrast palettes, picked from the config file

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};

use skyview_core::config::ThemeName;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Muted text (disabled, placeholders)
    pub text_muted: Color,
    /// Accent color (highlights, focus)
    pub accent: Color,
    /// Success state (OK, *_COMPLETE, SUCCEEDED)
    pub success: Color,
    /// Warning state (in progress, insufficient data)
    pub warn: Color,
    /// Error state (ALARM, FAILED, rollbacks)
    pub error: Color,
    /// Info state (informational)
    pub info: Color,
    /// Search match highlight
    pub tertiary: Color,
    /// Selection background
    pub selection_bg: Color,
    /// Selection foreground
    pub selection_fg: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    /// VS Code-esque dark theme
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255), // Light blue
            success: Color::Rgb(78, 201, 176), // Teal green
            warn: Color::Rgb(220, 180, 100),   // Amber
            error: Color::Rgb(244, 135, 113),  // Coral red
            info: Color::Rgb(156, 220, 254),   // Light cyan
            tertiary: Color::Rgb(197, 134, 192), // Orchid
            selection_bg: Color::Rgb(38, 79, 120), // Dark blue
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120), // Soft orange
        }
    }

    /// High contrast theme variant
    pub fn high_contrast() -> Self {
        Self {
            panel_border: Color::White,
            text: Color::White,
            text_dim: Color::Rgb(200, 200, 200),
            text_muted: Color::Rgb(150, 150, 150),
            accent: Color::Cyan,
            success: Color::Green,
            warn: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            tertiary: Color::Magenta,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            key_hint: Color::Yellow,
        }
    }

    pub fn named(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::HighContrast => Self::high_contrast(),
        }
    }
}

/// Coarse classification of provider status strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateTone {
    Good,
    Pending,
    Bad,
    Neutral,
}

impl StateTone {
    /// Classify a provider status such as `UPDATE_ROLLBACK_COMPLETE`,
    /// `INSUFFICIENT_DATA` or `SUCCEEDED`.
    pub fn of(state: &str) -> Self {
        let s = state.to_ascii_uppercase();
        if s.contains("FAIL") || s.contains("ROLLBACK") || s == "ALARM" || s == "ABORTED" {
            Self::Bad
        } else if s.contains("PROGRESS")
            || s.contains("PENDING")
            || s == "RUNNING"
            || s == "INSUFFICIENT_DATA"
            || s == "UPDATING"
            || s == "CREATING"
        {
            Self::Pending
        } else if s.ends_with("COMPLETE")
            || s == "OK"
            || s == "SUCCEEDED"
            || s == "ACTIVE"
            || s == "AVAILABLE"
            || s == "ENABLED"
        {
            Self::Good
        } else {
            Self::Neutral
        }
    }
}

/// Theme configuration
#[derive(Clone, Debug)]
pub struct Theme {
    pub palette: Palette,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            palette: Palette::dark(),
        }
    }
}

impl Theme {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    // ========== StyleKit Helper Functions ==========

    /// Style for a provider status cell
    pub fn state_style(&self, state: &str) -> Style {
        let color = match StateTone::of(state) {
            StateTone::Good => self.palette.success,
            StateTone::Pending => self.palette.warn,
            StateTone::Bad => self.palette.error,
            StateTone::Neutral => self.palette.text,
        };
        Style::default().fg(color)
    }

    /// Style for page tabs
    pub fn tab_style(&self, active: bool) -> Style {
        if active {
            Style::default()
                .fg(self.palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.palette.text_dim)
        }
    }

    /// Style for key hints in footer
    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    /// Style for subtle borders
    pub fn subtle_border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    /// Style for focused borders
    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            self.focused_border_style()
        } else {
            self.subtle_border_style()
        }
    }

    /// Style for selected items
    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    /// Search hit
    pub fn highlight_style(&self) -> Style {
        Style::default()
            .fg(self.palette.tertiary)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn text_muted_style(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.palette.success)
    }

    pub fn warn_style(&self) -> Style {
        Style::default().fg(self.palette.warn)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.palette.error)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.palette.info)
    }

    /// Style for title text
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.palette.text)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for table headers
    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }
}

static THEME: OnceLock<Theme> = OnceLock::new();

/// Install the configured palette. Only the first call has an effect.
pub fn init_theme(name: ThemeName) {
    let _ = THEME.set(Theme::new(Palette::named(name)));
}

/// The process theme; dark until `init_theme` runs.
pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

/// Convenience re-exports for common use cases
pub mod styles {
    use super::*;

    pub fn state(state: &str) -> Style {
        theme().state_style(state)
    }

    pub fn tab(active: bool) -> Style {
        theme().tab_style(active)
    }

    pub fn key_hint() -> Style {
        theme().key_hint_style()
    }

    pub fn border(focused: bool) -> Style {
        theme().border_style(focused)
    }

    pub fn selection() -> Style {
        theme().selection_style()
    }

    pub fn highlight() -> Style {
        theme().highlight_style()
    }

    pub fn text() -> Style {
        theme().text_style()
    }

    pub fn text_dim() -> Style {
        theme().text_dim_style()
    }

    pub fn text_muted() -> Style {
        theme().text_muted_style()
    }

    pub fn accent() -> Style {
        theme().accent_style()
    }

    pub fn success() -> Style {
        theme().success_style()
    }

    pub fn warn() -> Style {
        theme().warn_style()
    }

    pub fn error() -> Style {
        theme().error_style()
    }

    pub fn info() -> Style {
        theme().info_style()
    }

    pub fn title() -> Style {
        theme().title_style()
    }

    pub fn header() -> Style {
        theme().header_style()
    }
}
