// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Bounded undo/redo history over markup snapshots

/// Snapshots kept before the oldest is dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Linear undo/redo buffer.
///
/// `pos` is `None` while empty, otherwise an index into `entries`. Pushing
/// after an undo discards everything past `pos`; pushing a snapshot equal to
/// the current one is ignored.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    pos: Option<usize>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// A limit of zero is treated as one so the current state is always kept.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            pos: None,
            limit: limit.max(1),
        }
    }

    /// Record a new document state. Returns false when it duplicated the current one.
    pub fn push(&mut self, snapshot: &str) -> bool {
        if let Some(pos) = self.pos {
            if self.entries[pos] == snapshot {
                return false;
            }
            self.entries.truncate(pos + 1);
        } else {
            self.entries.clear();
        }

        self.entries.push(snapshot.to_string());
        let mut pos = self.entries.len() - 1;
        if self.entries.len() > self.limit {
            self.entries.remove(0);
            pos -= 1;
        }
        self.pos = Some(pos);
        log::debug!("History push, {} entries", self.entries.len());
        true
    }

    /// Step back. `None` means there is nothing to undo.
    pub fn undo(&mut self) -> Option<&str> {
        match self.pos {
            Some(pos) if pos > 0 => {
                self.pos = Some(pos - 1);
                Some(self.entries[pos - 1].as_str())
            }
            _ => None,
        }
    }

    /// Step forward. `None` means there is nothing to redo.
    pub fn redo(&mut self) -> Option<&str> {
        match self.pos {
            Some(pos) if pos + 1 < self.entries.len() => {
                self.pos = Some(pos + 1);
                Some(self.entries[pos + 1].as_str())
            }
            _ => None,
        }
    }

    /// Forget everything and start over from `current`.
    pub fn reset(&mut self, current: &str) {
        self.entries.clear();
        self.pos = None;
        self.push(current);
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.pos, Some(pos) if pos > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.pos, Some(pos) if pos + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&str> {
        self.pos.map(|pos| self.entries[pos].as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
