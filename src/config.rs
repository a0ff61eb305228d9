// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Configuration: data location, editor behaviour, keybindings

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::repository::SortOrder;
use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Editor behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo snapshots kept per open note.
    pub history_limit: usize,
    /// Pause before a save completes, in milliseconds. Zero disables it.
    pub save_delay_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            save_delay_ms: 500,
        }
    }
}

/// UI defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// "newest", "oldest", "title" or "category".
    pub default_sort: SortOrder,
    /// Accent color, hex (#RRGGBB) or a named color.
    pub accent: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_sort: SortOrder::Newest,
            accent: "cyan".to_string(),
        }
    }
}

/// Keybindings configuration (string form, e.g. "ctrl-s", "enter").
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    // Notes list
    pub quit: String,
    pub search: String,
    pub new_note: String,
    pub templates: String,
    pub delete: String,
    pub favorite: String,
    pub cycle_sort: String,
    pub next_category: String,
    pub prev_category: String,
    pub export: String,
    pub import: String,
    pub toggle_theme: String,
    pub help: String,
    // Generic
    pub escape: String,
    pub enter: String,
    pub backspace: String,
    pub move_up: String,
    pub move_down: String,
    pub move_up_alt: String,
    pub move_down_alt: String,
    // Editor
    pub editor_save: String,
    pub editor_next_field: String,
    pub editor_undo: String,
    pub editor_redo: String,
    pub editor_bold: String,
    pub editor_italic: String,
    pub editor_underline: String,
    pub editor_code: String,
    pub editor_heading: String,
    pub editor_list: String,
    pub editor_quote: String,
    pub editor_code_block: String,
    pub editor_strike: String,
    pub editor_numbered: String,
    pub editor_table: String,
    pub editor_align: String,
    pub editor_link: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            quit: "q".to_string(),
            search: "/".to_string(),
            new_note: "n".to_string(),
            templates: "t".to_string(),
            delete: "d".to_string(),
            favorite: "f".to_string(),
            cycle_sort: "s".to_string(),
            next_category: "]".to_string(),
            prev_category: "[".to_string(),
            export: "e".to_string(),
            import: "i".to_string(),
            toggle_theme: "ctrl-t".to_string(),
            help: "?".to_string(),
            escape: "esc".to_string(),
            enter: "enter".to_string(),
            backspace: "backspace".to_string(),
            move_up: "k".to_string(),
            move_down: "j".to_string(),
            move_up_alt: "up".to_string(),
            move_down_alt: "down".to_string(),
            editor_save: "ctrl-s".to_string(),
            editor_next_field: "tab".to_string(),
            editor_undo: "ctrl-z".to_string(),
            editor_redo: "ctrl-y".to_string(),
            editor_bold: "ctrl-b".to_string(),
            editor_italic: "alt-i".to_string(),
            editor_underline: "ctrl-u".to_string(),
            editor_code: "alt-c".to_string(),
            editor_heading: "alt-h".to_string(),
            editor_list: "alt-l".to_string(),
            editor_quote: "alt-q".to_string(),
            editor_code_block: "alt-p".to_string(),
            editor_strike: "alt-s".to_string(),
            editor_numbered: "alt-n".to_string(),
            editor_table: "alt-t".to_string(),
            editor_align: "alt-a".to_string(),
            editor_link: "alt-k".to_string(),
        }
    }
}

/// Parses a key string (e.g. "ctrl-s", "enter", "f1") into a KeyEvent.
pub fn parse_key_event(s: &str) -> Option<KeyEvent> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    // A lone "-" is the minus key, not a separator.
    let parts: Vec<&str> = if s == "-" { vec!["-"] } else { s.split('-').collect() };
    let (modifiers, key_part) = if parts.len() >= 2 {
        let mut mods = KeyModifiers::empty();
        for p in parts.iter().take(parts.len() - 1) {
            match *p {
                "ctrl" => mods.insert(KeyModifiers::CONTROL),
                "alt" => mods.insert(KeyModifiers::ALT),
                "shift" => mods.insert(KeyModifiers::SHIFT),
                _ => {}
            }
        }
        (mods, parts[parts.len() - 1])
    } else {
        (KeyModifiers::empty(), parts[0])
    };

    let code = match key_part {
        "enter" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "delete" => KeyCode::Delete,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        f if f.len() >= 2 && f.starts_with('f') => match f[1..].parse::<u8>() {
            Ok(n) if (1..=12).contains(&n) => KeyCode::F(n),
            _ => return None,
        },
        _ => {
            let mut chars = key_part.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };

    Some(KeyEvent::new(code, modifiers))
}

/// Returns true if the pressed key matches any of the given keys (code + modifiers only).
/// Shift is ignored for printable characters since terminals report it inconsistently.
pub fn key_matches(event: KeyEvent, keys: &[KeyEvent]) -> bool {
    keys.iter().any(|k| {
        if event.code != k.code {
            return false;
        }
        if let KeyCode::Char(_) = k.code {
            let strip = |m: KeyModifiers| m.difference(KeyModifiers::SHIFT);
            strip(event.modifiers) == strip(k.modifiers)
        } else {
            event.modifiers == k.modifiers
        }
    })
}

/// Resolved keybindings (parsed KeyEvents for fast comparison).
#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    pub quit: KeyEvent,
    pub search: KeyEvent,
    pub new_note: KeyEvent,
    pub templates: KeyEvent,
    pub delete: KeyEvent,
    pub favorite: KeyEvent,
    pub cycle_sort: KeyEvent,
    pub next_category: KeyEvent,
    pub prev_category: KeyEvent,
    pub export: KeyEvent,
    pub import: KeyEvent,
    pub toggle_theme: KeyEvent,
    pub help: KeyEvent,
    pub escape: KeyEvent,
    pub enter: KeyEvent,
    pub backspace: KeyEvent,
    pub move_up: KeyEvent,
    pub move_down: KeyEvent,
    pub move_up_alt: KeyEvent,
    pub move_down_alt: KeyEvent,
    pub editor_save: KeyEvent,
    pub editor_next_field: KeyEvent,
    pub editor_undo: KeyEvent,
    pub editor_redo: KeyEvent,
    pub editor_bold: KeyEvent,
    pub editor_italic: KeyEvent,
    pub editor_underline: KeyEvent,
    pub editor_code: KeyEvent,
    pub editor_heading: KeyEvent,
    pub editor_list: KeyEvent,
    pub editor_quote: KeyEvent,
    pub editor_code_block: KeyEvent,
    pub editor_strike: KeyEvent,
    pub editor_numbered: KeyEvent,
    pub editor_table: KeyEvent,
    pub editor_align: KeyEvent,
    pub editor_link: KeyEvent,
}

impl ResolvedKeys {
    pub fn from_config(keys: &KeysConfig) -> Self {
        fn parse_or(s: &str, code: KeyCode, mods: KeyModifiers) -> KeyEvent {
            parse_key_event(s).unwrap_or_else(|| {
                log::warn!("Invalid keybinding '{}', using default", s);
                KeyEvent::new(code, mods)
            })
        }
        let none = KeyModifiers::empty();
        let ctrl = KeyModifiers::CONTROL;
        let alt = KeyModifiers::ALT;

        Self {
            quit: parse_or(&keys.quit, KeyCode::Char('q'), none),
            search: parse_or(&keys.search, KeyCode::Char('/'), none),
            new_note: parse_or(&keys.new_note, KeyCode::Char('n'), none),
            templates: parse_or(&keys.templates, KeyCode::Char('t'), none),
            delete: parse_or(&keys.delete, KeyCode::Char('d'), none),
            favorite: parse_or(&keys.favorite, KeyCode::Char('f'), none),
            cycle_sort: parse_or(&keys.cycle_sort, KeyCode::Char('s'), none),
            next_category: parse_or(&keys.next_category, KeyCode::Char(']'), none),
            prev_category: parse_or(&keys.prev_category, KeyCode::Char('['), none),
            export: parse_or(&keys.export, KeyCode::Char('e'), none),
            import: parse_or(&keys.import, KeyCode::Char('i'), none),
            toggle_theme: parse_or(&keys.toggle_theme, KeyCode::Char('t'), ctrl),
            help: parse_or(&keys.help, KeyCode::Char('?'), none),
            escape: parse_or(&keys.escape, KeyCode::Esc, none),
            enter: parse_or(&keys.enter, KeyCode::Enter, none),
            backspace: parse_or(&keys.backspace, KeyCode::Backspace, none),
            move_up: parse_or(&keys.move_up, KeyCode::Char('k'), none),
            move_down: parse_or(&keys.move_down, KeyCode::Char('j'), none),
            move_up_alt: parse_or(&keys.move_up_alt, KeyCode::Up, none),
            move_down_alt: parse_or(&keys.move_down_alt, KeyCode::Down, none),
            editor_save: parse_or(&keys.editor_save, KeyCode::Char('s'), ctrl),
            editor_next_field: parse_or(&keys.editor_next_field, KeyCode::Tab, none),
            editor_undo: parse_or(&keys.editor_undo, KeyCode::Char('z'), ctrl),
            editor_redo: parse_or(&keys.editor_redo, KeyCode::Char('y'), ctrl),
            editor_bold: parse_or(&keys.editor_bold, KeyCode::Char('b'), ctrl),
            editor_italic: parse_or(&keys.editor_italic, KeyCode::Char('i'), alt),
            editor_underline: parse_or(&keys.editor_underline, KeyCode::Char('u'), ctrl),
            editor_code: parse_or(&keys.editor_code, KeyCode::Char('c'), alt),
            editor_heading: parse_or(&keys.editor_heading, KeyCode::Char('h'), alt),
            editor_list: parse_or(&keys.editor_list, KeyCode::Char('l'), alt),
            editor_quote: parse_or(&keys.editor_quote, KeyCode::Char('q'), alt),
            editor_code_block: parse_or(&keys.editor_code_block, KeyCode::Char('p'), alt),
            editor_strike: parse_or(&keys.editor_strike, KeyCode::Char('s'), alt),
            editor_numbered: parse_or(&keys.editor_numbered, KeyCode::Char('n'), alt),
            editor_table: parse_or(&keys.editor_table, KeyCode::Char('t'), alt),
            editor_align: parse_or(&keys.editor_align, KeyCode::Char('a'), alt),
            editor_link: parse_or(&keys.editor_link, KeyCode::Char('k'), alt),
        }
    }
}

/// Formats a key config string for display (e.g. "ctrl-s" -> "Ctrl+S").
pub fn key_display_string(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        return String::new();
    }
    if s == "-" {
        return "-".to_string();
    }
    let parts: Vec<&str> = s.split('-').collect();
    let (mods, key_part) = if parts.len() >= 2 {
        let mod_str: Vec<&str> = parts[..parts.len() - 1]
            .iter()
            .map(|p| match *p {
                "ctrl" => "Ctrl",
                "alt" => "Alt",
                "shift" => "Shift",
                other => other,
            })
            .collect();
        (mod_str.join("+"), parts[parts.len() - 1])
    } else {
        (String::new(), parts[0])
    };

    let key_display = match key_part.to_lowercase().as_str() {
        "enter" => "Enter".to_string(),
        "esc" | "escape" => "Esc".to_string(),
        "backspace" => "Backspace".to_string(),
        "tab" => "Tab".to_string(),
        "delete" => "Delete".to_string(),
        "space" => "Space".to_string(),
        "up" => "↑".to_string(),
        "down" => "↓".to_string(),
        "left" => "←".to_string(),
        "right" => "→".to_string(),
        _ => key_part.to_uppercase(),
    };

    if mods.is_empty() {
        key_display
    } else {
        format!("{}+{}", mods, key_display)
    }
}

/// Application configuration loaded from config.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the notes, theme and first-run slots.
    pub data_directory: String,
    /// Seed three example write-ups the first time the notes slot is created.
    pub seed_sample_notes: bool,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_directory = ProjectDirs::from("", "", "ctfnotes")
            .map(|d| d.data_dir().display().to_string())
            .unwrap_or_else(|| "~/.local/share/ctfnotes".to_string());
        Self {
            data_directory,
            seed_sample_notes: true,
            editor: EditorConfig::default(),
            ui: UiConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_directory)
    }
}

/// Returns the ctfnotes config directory (~/.config/ctfnotes).
/// Creates it if it does not exist.
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "ctfnotes")
        .context("Could not determine XDG config directory")?;
    let config_dir = dirs.config_dir().to_path_buf();
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    Ok(config_dir)
}

/// Load config from `path`, or ~/.config/ctfnotes/config.toml when `None`.
/// The default location gets a commented default file if missing.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let (config_path, explicit) = match path {
        Some(p) => (p, true),
        None => (ensure_config_dir()?.join("config.toml"), false),
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
        return parse_config(&content)
            .with_context(|| format!("Failed to parse config: {}", config_path.display()));
    }
    if explicit {
        anyhow::bail!("Config file not found: {}", config_path.display());
    }

    let default = Config::default();
    fs::write(&config_path, generate_default_config(&default))
        .with_context(|| format!("Failed to write default config: {}", config_path.display()))?;
    log::info!("Wrote default config to {}", config_path.display());
    Ok(default)
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

fn generate_default_config(config: &Config) -> String {
    let k = &config.keys;
    let e = &config.editor;
    let u = &config.ui;
    format!(
        r#"# ctfnotes configuration

# Where notes, theme preference and first-run state are stored
data_directory = "{}"

# Add three example write-ups the first time the notebook is created
seed_sample_notes = {}

[editor]
# Undo snapshots kept per open note
history_limit = {}
# Pause before a save completes (milliseconds, 0 disables)
save_delay_ms = {}

[ui]
# newest, oldest, title or category
default_sort = "{}"
# Hex (#RRGGBB) or named color
accent = "{}"

[keys]
# Notes list
quit = "{}"
search = "{}"
new_note = "{}"
templates = "{}"
delete = "{}"
favorite = "{}"
cycle_sort = "{}"
next_category = "{}"
prev_category = "{}"
export = "{}"
import = "{}"
toggle_theme = "{}"
help = "{}"
# Generic
escape = "{}"
enter = "{}"
backspace = "{}"
move_up = "{}"
move_down = "{}"
move_up_alt = "{}"
move_down_alt = "{}"
# Editor
editor_save = "{}"
editor_next_field = "{}"
editor_undo = "{}"
editor_redo = "{}"
editor_bold = "{}"
editor_italic = "{}"
editor_underline = "{}"
editor_code = "{}"
editor_heading = "{}"
editor_list = "{}"
editor_quote = "{}"
editor_code_block = "{}"
editor_strike = "{}"
editor_numbered = "{}"
editor_table = "{}"
editor_align = "{}"
editor_link = "{}"
"#,
        config.data_directory,
        config.seed_sample_notes,
        e.history_limit,
        e.save_delay_ms,
        u.default_sort,
        u.accent,
        k.quit,
        k.search,
        k.new_note,
        k.templates,
        k.delete,
        k.favorite,
        k.cycle_sort,
        k.next_category,
        k.prev_category,
        k.export,
        k.import,
        k.toggle_theme,
        k.help,
        k.escape,
        k.enter,
        k.backspace,
        k.move_up,
        k.move_down,
        k.move_up_alt,
        k.move_down_alt,
        k.editor_save,
        k.editor_next_field,
        k.editor_undo,
        k.editor_redo,
        k.editor_bold,
        k.editor_italic,
        k.editor_underline,
        k.editor_code,
        k.editor_heading,
        k.editor_list,
        k.editor_quote,
        k.editor_code_block,
        k.editor_strike,
        k.editor_numbered,
        k.editor_table,
        k.editor_align,
        k.editor_link,
    )
}

/// Resolves ~ in paths to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    if path.starts_with("~/") || path == "~" {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
        PathBuf::from(path.replacen('~', &home, 1))
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_event() {
        let k = parse_key_event("ctrl-s").unwrap();
        assert_eq!(k.code, KeyCode::Char('s'));
        assert_eq!(k.modifiers, KeyModifiers::CONTROL);

        assert_eq!(parse_key_event("Enter").unwrap().code, KeyCode::Enter);
        assert_eq!(parse_key_event("f5").unwrap().code, KeyCode::F(5));
        assert_eq!(parse_key_event("]").unwrap().code, KeyCode::Char(']'));
        assert_eq!(parse_key_event("-").unwrap().code, KeyCode::Char('-'));
        assert!(parse_key_event("f13").is_none());
        assert!(parse_key_event("nonsense").is_none());
        assert!(parse_key_event("").is_none());
    }

    #[test]
    fn test_key_matches_ignores_shift_on_chars() {
        let question = parse_key_event("?").unwrap();
        let pressed = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert!(key_matches(pressed, &[question]));

        let ctrl_z = parse_key_event("ctrl-z").unwrap();
        let plain_z = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::empty());
        assert!(!key_matches(plain_z, &[ctrl_z]));
    }

    #[test]
    fn test_key_display_string() {
        assert_eq!(key_display_string("ctrl-s"), "Ctrl+S");
        assert_eq!(key_display_string("alt-h"), "Alt+H");
        assert_eq!(key_display_string("down"), "↓");
        assert_eq!(key_display_string("/"), "/");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config(
            r#"
data_directory = "/tmp/ctf"

[editor]
history_limit = 10

[ui]
default_sort = "title"
"#,
        )
        .unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/ctf"));
        assert_eq!(config.editor.history_limit, 10);
        assert_eq!(config.editor.save_delay_ms, 500);
        assert_eq!(config.ui.default_sort, SortOrder::Title);
        assert!(config.seed_sample_notes);
        assert_eq!(config.keys.editor_save, "ctrl-s");
    }

    #[test]
    fn test_generated_default_config_parses() {
        let default = Config {
            data_directory: "/data".to_string(),
            ..Config::default()
        };
        let parsed = parse_config(&generate_default_config(&default)).unwrap();
        assert_eq!(parsed.data_directory, "/data");
        assert_eq!(parsed.keys.toggle_theme, default.keys.toggle_theme);
        assert_eq!(parsed.editor.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_expand_path_home() {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
        assert_eq!(expand_path("~/notes"), PathBuf::from(format!("{}/notes", home)));
        assert_eq!(expand_path("/abs"), PathBuf::from("/abs"));
    }
}
