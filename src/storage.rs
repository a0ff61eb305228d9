// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Key-value persistence port and its backings

use crate::error::{NoteError, NoteResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Slot holding the JSON array of notes.
pub const NOTES_KEY: &str = "ctfNotes";
/// Slot holding "dark" or "light".
pub const THEME_KEY: &str = "theme";
/// Slot set to "true" once the first-run shortcut help has been shown.
pub const SHORTCUTS_SHOWN_KEY: &str = "shortcutsShown";

/// Durable string slots addressed by fixed keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> NoteResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> NoteResult<()>;
}

/// One file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> NoteResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            NoteError::Storage(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> NoteResult<Option<String>> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NoteError::Storage(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> NoteResult<()> {
        let path = self.slot_path(key);
        // Write to a sibling first so a crash never leaves half a slot behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| {
            NoteError::Storage(format!("cannot write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            NoteError::Storage(format!("cannot replace {}: {}", path.display(), e))
        })?;
        Ok(())
    }
}

/// Volatile store for tests and `--ephemeral` sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
    /// When set, every `set` fails, mimicking a full disk.
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(mut self, key: &str, value: &str) -> Self {
        self.slots.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> NoteResult<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> NoteResult<()> {
        if self.fail_writes {
            return Err(NoteError::Storage("quota exceeded".to_string()));
        }
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> NoteResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> NoteResult<()> {
        (**self).set(key, value)
    }
}

/// Dark or light palette preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

/// Preferences that live next to the notes: theme and the first-run help flag.
pub struct Preferences<'a, S: KeyValueStore> {
    store: &'a mut S,
}

impl<'a, S: KeyValueStore> Preferences<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Only the literal "dark" selects the dark palette.
    pub fn theme(&self) -> ThemeMode {
        match self.store.get(THEME_KEY) {
            Ok(Some(v)) if v.trim() == "dark" => ThemeMode::Dark,
            Ok(_) => ThemeMode::Light,
            Err(e) => {
                log::warn!("Falling back to light theme: {}", e);
                ThemeMode::Light
            }
        }
    }

    pub fn set_theme(&mut self, mode: ThemeMode) -> NoteResult<()> {
        self.store.set(THEME_KEY, mode.as_str())
    }

    pub fn shortcuts_shown(&self) -> bool {
        matches!(self.store.get(SHORTCUTS_SHOWN_KEY), Ok(Some(v)) if !v.trim().is_empty())
    }

    pub fn mark_shortcuts_shown(&mut self) -> NoteResult<()> {
        self.store.set(SHORTCUTS_SHOWN_KEY, "true")
    }
}
