// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Light and dark palettes for the terminal UI

use crate::note::{Category, Difficulty, Status};
use crate::storage::ThemeMode;
use anyhow::{Context, Result};
use ratatui::style::{Color, Modifier, Style};
use std::str::FromStr;

/// Color definition supporting hex (#RRGGBB) or named colors.
#[derive(Debug, Clone)]
pub struct ColorDef(String);

impl ColorDef {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn to_ratatui_color(&self) -> Result<Color> {
        let s = self.0.trim();
        // ratatui has no "orange"
        let normalized = match s.to_lowercase().as_str() {
            "orange" => "yellow",
            _ => s,
        };
        Color::from_str(normalized).with_context(|| format!("Invalid color: {}", self.0))
    }
}

/// Resolved palette as ratatui styles.
#[derive(Clone)]
pub struct ResolvedTheme {
    pub mode: ThemeMode,
    pub background_style: Style,
    pub text_style: Style,
    pub muted_style: Style,
    pub border_style: Style,
    pub border_active_style: Style,
    pub header_style: Style,
    pub selected_style: Style,
    pub favorite_style: Style,
    pub search_match_style: Style,
    pub error_style: Style,
    pub success_style: Style,
    pub toolbar_active_style: Style,
}

impl ResolvedTheme {
    pub fn resolve(mode: ThemeMode, accent: &ColorDef) -> Result<Self> {
        let accent = accent.to_ratatui_color()?;
        let (bg, fg, muted) = match mode {
            ThemeMode::Dark => (Color::Black, Color::White, Color::DarkGray),
            ThemeMode::Light => (Color::White, Color::Black, Color::Gray),
        };
        Ok(Self {
            mode,
            background_style: Style::default().bg(bg).fg(fg),
            text_style: Style::default().fg(fg),
            muted_style: Style::default().fg(muted),
            border_style: Style::default().fg(muted),
            border_active_style: Style::default().fg(accent),
            header_style: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            selected_style: Style::default()
                .fg(bg)
                .bg(accent)
                .add_modifier(Modifier::BOLD),
            favorite_style: Style::default().fg(Color::Yellow),
            search_match_style: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            error_style: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            success_style: Style::default().fg(Color::Green),
            toolbar_active_style: Style::default()
                .fg(accent)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        })
    }

    pub fn category_style(&self, category: Category) -> Style {
        let color = match category {
            Category::Web => Color::Blue,
            Category::Crypto => Color::Magenta,
            Category::Forensics => Color::Green,
            Category::Reverse => Color::Yellow,
            Category::Pwn => Color::Red,
            Category::Misc => Color::Cyan,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn difficulty_style(&self, difficulty: Difficulty) -> Style {
        match difficulty {
            Difficulty::Easy => Style::default().fg(Color::Green),
            Difficulty::Medium => Style::default().fg(Color::Yellow),
            Difficulty::Hard => Style::default().fg(Color::Red),
        }
    }

    pub fn status_style(&self, status: Status) -> Style {
        if status.is_done() {
            self.success_style
        } else if status == Status::InProgress {
            Style::default().fg(Color::Yellow)
        } else {
            self.muted_style
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_def_parses_hex_and_names() {
        assert_eq!(
            ColorDef::new("#ff0000").to_ratatui_color().unwrap(),
            Color::Rgb(255, 0, 0)
        );
        assert_eq!(ColorDef::new("cyan").to_ratatui_color().unwrap(), Color::Cyan);
        assert_eq!(ColorDef::new("orange").to_ratatui_color().unwrap(), Color::Yellow);
        assert!(ColorDef::new("not-a-color").to_ratatui_color().is_err());
    }

    #[test]
    fn test_modes_swap_background() {
        let dark = ResolvedTheme::resolve(ThemeMode::Dark, &ColorDef::new("cyan")).unwrap();
        let light = ResolvedTheme::resolve(ThemeMode::Light, &ColorDef::new("cyan")).unwrap();
        assert_eq!(dark.background_style.bg, Some(Color::Black));
        assert_eq!(light.background_style.bg, Some(Color::White));
    }
}
