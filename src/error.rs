// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Error taxonomy for the note core

use thiserror::Error;

/// Errors raised by the note repository, storage port and import pipeline.
#[derive(Debug, Error)]
pub enum NoteError {
    /// A required field was missing or blank.
    #[error("{field} is required")]
    Validation { field: &'static str },

    /// Operation on an id the repository does not hold.
    #[error("note not found: {0}")]
    NotFound(String),

    /// Malformed persisted or imported JSON.
    #[error("invalid note data: {0}")]
    Parse(String),

    /// The backing store refused a read or write.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl NoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NoteError::NotFound(_))
    }
}

impl From<serde_json::Error> for NoteError {
    fn from(e: serde_json::Error) -> Self {
        NoteError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for NoteError {
    fn from(e: std::io::Error) -> Self {
        NoteError::Storage(e.to_string())
    }
}

pub type NoteResult<T> = Result<T, NoteError>;
