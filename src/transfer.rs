// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Import parsing, preview and export file naming

use crate::error::{NoteError, NoteResult};
use crate::note::Note;
use chrono::NaiveDate;
use serde_json::Value;

/// Titles listed in an import preview before collapsing the rest.
pub const PREVIEW_LIMIT: usize = 5;

/// What an import would bring in, shown before the merge is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPreview {
    pub total: usize,
    /// `title (category)` for the first few candidates.
    pub lines: Vec<String>,
    /// Candidates not listed in `lines`.
    pub remaining: usize,
}

impl ImportPreview {
    pub fn summary(&self) -> String {
        format!("Found {} notes to import", self.total)
    }
}

/// Parsed import payload: the preview plus the notes themselves.
#[derive(Debug, Clone)]
pub struct PendingImport {
    pub preview: ImportPreview,
    pub notes: Vec<Note>,
}

/// Parse pasted or uploaded text into notes ready for `import_merge`.
/// Anything but a non-empty JSON array of notes is a parse error.
pub fn parse_import(text: &str) -> NoteResult<PendingImport> {
    let text = text.trim();
    if text.is_empty() {
        return Err(NoteError::Parse("nothing to import".to_string()));
    }
    let value: Value = serde_json::from_str(text)?;
    match &value {
        Value::Array(items) if !items.is_empty() => {}
        Value::Array(_) => return Err(NoteError::Parse("the import list is empty".to_string())),
        _ => return Err(NoteError::Parse("expected a JSON array of notes".to_string())),
    }

    let notes: Vec<Note> = serde_json::from_value(value)?;
    let preview = preview_notes(&notes);
    Ok(PendingImport { preview, notes })
}

/// Category is required by the note schema, so only the title needs a fallback.
fn preview_notes(notes: &[Note]) -> ImportPreview {
    let lines = notes
        .iter()
        .take(PREVIEW_LIMIT)
        .map(|n| {
            let title = match n.title.trim() {
                "" => "Untitled",
                t => t,
            };
            format!("{} ({})", title, n.category.as_str())
        })
        .collect();
    ImportPreview {
        total: notes.len(),
        lines,
        remaining: notes.len().saturating_sub(PREVIEW_LIMIT),
    }
}

/// `ctf-notes-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("ctf-notes-{}.json", date.format("%Y-%m-%d"))
}
