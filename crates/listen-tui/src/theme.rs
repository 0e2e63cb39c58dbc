//! Color palette and style constants for the listen TUI.

use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_ACCENT: Color = Color::Rgb(255, 95, 150);
pub const C_PLAYING: Color = Color::Rgb(80, 200, 120);
pub const C_PAUSED: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 80, 80);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_HEADER_BG: Color = Color::Rgb(210, 210, 225);
pub const C_HEADER_FG: Color = Color::Rgb(18, 18, 18);
pub const C_ALBUM: Color = Color::Rgb(80, 140, 200);
pub const C_ARTIST: Color = Color::Rgb(180, 120, 220);
pub const C_VOLUME_FILL: Color = Color::Rgb(120, 100, 200);
pub const C_VOLUME_EMPTY: Color = Color::Rgb(40, 40, 52);
pub const C_KEY_HINT: Color = Color::Rgb(90, 90, 115);

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_title() -> Style {
    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
}

pub fn style_header() -> Style {
    Style::default()
        .fg(C_HEADER_FG)
        .bg(C_HEADER_BG)
        .add_modifier(Modifier::BOLD)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}
