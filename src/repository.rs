// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Note repository: CRUD, filtering, sorting, merge-import, export

use crate::error::{NoteError, NoteResult};
use crate::note::{generate_id, CategoryFilter, Note, NoteDraft, NotePatch};
use crate::samples::sample_notes;
use crate::storage::{KeyValueStore, NOTES_KEY};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Source of "now" for timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// List ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
    Category,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Title => "title",
            SortOrder::Category => "category",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Newest => "Newest first",
            SortOrder::Oldest => "Oldest first",
            SortOrder::Title => "Title A-Z",
            SortOrder::Category => "Category",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortOrder::Newest => SortOrder::Oldest,
            SortOrder::Oldest => SortOrder::Title,
            SortOrder::Title => SortOrder::Category,
            SortOrder::Category => SortOrder::Newest,
        }
    }

    fn compare(&self, a: &Note, b: &Note) -> std::cmp::Ordering {
        match self {
            SortOrder::Newest => b.created.cmp(&a.created),
            SortOrder::Oldest => a.created.cmp(&b.created),
            SortOrder::Title => a
                .title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title)),
            SortOrder::Category => a.category.as_str().cmp(b.category.as_str()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "title" => Ok(SortOrder::Title),
            "category" => Ok(SortOrder::Category),
            other => Err(NoteError::Parse(format!("unknown sort order '{}'", other))),
        }
    }
}

/// Category and free-text filter for `list`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteFilter {
    pub category: CategoryFilter,
    pub search: String,
}

impl NoteFilter {
    pub fn all() -> Self {
        Self::default()
    }
}

/// Result of a merge-import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported_count: usize,
    pub skipped_count: usize,
}

/// Header counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteStats {
    pub total: usize,
    pub completed: usize,
    pub favorites: usize,
}

/// Owned note collection backed by a key-value store.
/// Notes are kept newest-first in insertion order; `index` maps id to position.
pub struct NoteRepository<S: KeyValueStore> {
    store: S,
    clock: Box<dyn Clock>,
    notes: Vec<Note>,
    index: HashMap<String, usize>,
    slot_was_empty: bool,
    persist_warning: Option<NoteError>,
}

impl<S: KeyValueStore> NoteRepository<S> {
    /// Restore the collection from the store, recovering from bad data as empty.
    pub fn open(store: S) -> Self {
        Self::open_with_clock(store, Box::new(SystemClock))
    }

    pub fn open_with_clock(store: S, clock: Box<dyn Clock>) -> Self {
        let (notes, slot_was_empty) = match store.get(NOTES_KEY) {
            Ok(Some(raw)) => match parse_notes(&raw) {
                Ok(notes) => (notes, false),
                Err(e) => {
                    log::error!("Stored notes are unreadable, starting empty: {}", e);
                    (Vec::new(), false)
                }
            },
            Ok(None) => (Vec::new(), true),
            Err(e) => {
                log::error!("Could not load notes, starting empty: {}", e);
                (Vec::new(), false)
            }
        };
        log::info!("Loaded {} notes", notes.len());

        let mut repo = Self {
            store,
            clock,
            notes,
            index: HashMap::new(),
            slot_was_empty,
            persist_warning: None,
        };
        repo.dedupe_loaded();
        repo.reindex();
        repo
    }

    /// Seed the starter notes if the notes slot has never been written.
    /// Returns true when samples were added.
    pub fn seed_samples_if_fresh(&mut self) -> bool {
        if !self.slot_was_empty {
            return false;
        }
        self.slot_was_empty = false;
        self.notes = sample_notes(self.clock.now());
        self.reindex();
        self.persist();
        log::info!("Seeded {} sample notes", self.notes.len());
        true
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.index.get(id).map(|&i| &self.notes[i])
    }

    /// Validate, stamp and prepend a new note.
    pub fn create(&mut self, draft: &NoteDraft) -> NoteResult<Note> {
        let valid = draft.validated()?;
        let now = self.clock.now();
        let mut id = generate_id(now);
        while self.index.contains_key(&id) {
            id = generate_id(now);
        }
        let note = valid.into_note(id, now);

        self.notes.insert(0, note.clone());
        self.reindex();
        self.persist();
        log::info!("Created note {} ({})", note.id, note.title);
        Ok(note)
    }

    /// Merge `patch` over the stored note and refresh `last_modified`.
    pub fn update(&mut self, id: &str, patch: &NotePatch) -> NoteResult<Note> {
        let pos = self.position(id)?;
        let mut next = patch.apply_to(&self.notes[pos])?;
        next.last_modified = self.clock.now().max(next.created);

        self.notes[pos] = next.clone();
        self.persist();
        log::info!("Updated note {}", id);
        Ok(next)
    }

    pub fn delete(&mut self, id: &str) -> NoteResult<()> {
        let pos = self.position(id)?;
        let removed = self.notes.remove(pos);
        self.reindex();
        self.persist();
        log::info!("Deleted note {} ({})", removed.id, removed.title);
        Ok(())
    }

    pub fn toggle_favorite(&mut self, id: &str) -> NoteResult<Note> {
        let pos = self.position(id)?;
        let note = &mut self.notes[pos];
        note.favorite = !note.favorite;
        let note = note.clone();
        self.persist();
        Ok(note)
    }

    /// Filtered, stably sorted copy of the collection.
    pub fn list(&self, filter: &NoteFilter, sort: SortOrder) -> Vec<Note> {
        let needle = filter.search.trim().to_lowercase();
        let mut out: Vec<Note> = self
            .notes
            .iter()
            .filter(|n| filter.category.matches(n.category))
            .filter(|n| n.matches_search(&needle))
            .cloned()
            .collect();
        out.sort_by(|a, b| sort.compare(a, b));
        out
    }

    /// Append candidates whose id is not present yet, in their given order.
    pub fn import_merge(&mut self, candidates: Vec<Note>) -> ImportOutcome {
        let mut seen: HashSet<String> = self.notes.iter().map(|n| n.id.clone()).collect();
        let total = candidates.len();
        let fresh: Vec<Note> = candidates
            .into_iter()
            .filter(|n| seen.insert(n.id.clone()))
            .collect();
        let imported_count = fresh.len();

        if imported_count > 0 {
            self.notes.extend(fresh);
            self.reindex();
            self.persist();
        }
        log::info!(
            "Imported {} notes, skipped {} duplicates",
            imported_count,
            total - imported_count
        );
        ImportOutcome {
            imported_count,
            skipped_count: total - imported_count,
        }
    }

    /// Pretty-printed JSON array of every note.
    pub fn export_all(&self) -> NoteResult<String> {
        Ok(serde_json::to_string_pretty(&self.notes)?)
    }

    pub fn stats(&self) -> NoteStats {
        NoteStats {
            total: self.notes.len(),
            completed: self.notes.iter().filter(|n| n.status.is_done()).count(),
            favorites: self.notes.iter().filter(|n| n.favorite).count(),
        }
    }

    /// Last persistence failure, cleared on read. Memory keeps the change either way.
    pub fn take_persist_warning(&mut self) -> Option<NoteError> {
        self.persist_warning.take()
    }

    fn position(&self, id: &str) -> NoteResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }

    fn reindex(&mut self) {
        self.index = self
            .notes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }

    fn dedupe_loaded(&mut self) {
        let mut seen = HashSet::new();
        let before = self.notes.len();
        self.notes.retain(|n| seen.insert(n.id.clone()));
        if self.notes.len() != before {
            log::warn!(
                "Dropped {} stored notes with duplicate ids",
                before - self.notes.len()
            );
        }
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.notes)
            .map_err(NoteError::from)
            .and_then(|json| self.store.set(NOTES_KEY, &json));
        if let Err(e) = result {
            log::error!("Failed to save notes: {}", e);
            self.persist_warning = Some(e);
        }
    }
}

/// Parse a JSON array of notes as stored or exported.
pub fn parse_notes(raw: &str) -> NoteResult<Vec<Note>> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{Category, Status};
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock advanced by hand.
    #[derive(Clone)]
    struct ManualClock(Rc<Cell<DateTime<Utc>>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Rc::new(Cell::new(
                Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            )))
        }

        fn advance(&self, secs: i64) {
            self.0.set(self.0.get() + Duration::seconds(secs));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    fn repo_with_clock() -> (NoteRepository<MemoryStore>, ManualClock) {
        let clock = ManualClock::new();
        let repo = NoteRepository::open_with_clock(MemoryStore::new(), Box::new(clock.clone()));
        (repo, clock)
    }

    fn draft(title: &str, category: Category, body: &str) -> NoteDraft {
        NoteDraft::from_markup(title, category, body)
    }

    fn note_with_id(id: &str, title: &str) -> Note {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Note {
            id: id.to_string(),
            title: title.to_string(),
            category: Category::Misc,
            tags: Vec::new(),
            content: "body".to_string(),
            content_html: "body".to_string(),
            difficulty: Default::default(),
            status: Default::default(),
            favorite: false,
            created: now,
            last_modified: now,
        }
    }

    #[test]
    fn test_create_then_list_contains_note() {
        let (mut repo, _) = repo_with_clock();
        let d = draft("Baby ROP", Category::Pwn, "<p>ret2win</p>").with_tags("rop, stack");
        let created = repo.create(&d).unwrap();

        let all = repo.list(&NoteFilter::all(), SortOrder::Newest);
        let matching: Vec<_> = all.iter().filter(|n| n.id == created.id).collect();
        assert_eq!(matching.len(), 1);
        let n = matching[0];
        assert_eq!(n.title, "Baby ROP");
        assert_eq!(n.category, Category::Pwn);
        assert_eq!(n.tags, vec!["rop", "stack"]);
        assert_eq!(n.content, "ret2win");
        assert!(!n.favorite);
        assert_eq!(n.created, n.last_modified);
    }

    #[test]
    fn test_create_rejects_blank_fields_without_side_effects() {
        let (mut repo, _) = repo_with_clock();
        let err = repo.create(&draft("   ", Category::Web, "x")).unwrap_err();
        assert!(matches!(err, NoteError::Validation { field: "title" }));
        let err = repo.create(&draft("T", Category::Web, "<p> </p>")).unwrap_err();
        assert!(matches!(err, NoteError::Validation { field: "content" }));
        assert!(repo.is_empty());
        assert_eq!(repo.store().get(NOTES_KEY).unwrap(), None);
    }

    #[test]
    fn test_create_prepends_and_persists() {
        let (mut repo, clock) = repo_with_clock();
        let first = repo.create(&draft("first", Category::Web, "a")).unwrap();
        clock.advance(1);
        let second = repo.create(&draft("second", Category::Web, "b")).unwrap();

        let stored = parse_notes(&repo.store().get(NOTES_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored[0].id, second.id);
        assert_eq!(stored[1].id, first.id);
    }

    #[test]
    fn test_update_keeps_created_and_bumps_last_modified() {
        let (mut repo, clock) = repo_with_clock();
        let note = repo.create(&draft("old", Category::Crypto, "body")).unwrap();
        clock.advance(30);

        let updated = repo.update(&note.id, &NotePatch::title("X")).unwrap();
        assert_eq!(updated.title, "X");
        assert_eq!(updated.created, note.created);
        assert!(updated.last_modified > note.last_modified);
        assert_eq!(updated.content, "body");
        assert_eq!(repo.get(&note.id).unwrap().title, "X");
    }

    #[test]
    fn test_update_with_frozen_clock_keeps_equal_timestamps() {
        let (mut repo, _) = repo_with_clock();
        let note = repo.create(&draft("t", Category::Misc, "b")).unwrap();
        let updated = repo
            .update(
                &note.id,
                &NotePatch {
                    status: Some(Status::Solved),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.last_modified, note.last_modified);
        assert_eq!(updated.status, Status::Solved);
    }

    #[test]
    fn test_update_invalid_patch_leaves_note_untouched() {
        let (mut repo, _) = repo_with_clock();
        let note = repo.create(&draft("keep", Category::Misc, "b")).unwrap();
        assert!(repo.update(&note.id, &NotePatch::title("")).is_err());
        assert_eq!(repo.get(&note.id).unwrap(), &note);
        assert!(repo.update("missing", &NotePatch::title("x")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_twice_signals_not_found() {
        let (mut repo, _) = repo_with_clock();
        let a = repo.create(&draft("a", Category::Web, "x")).unwrap();
        let b = repo.create(&draft("b", Category::Web, "y")).unwrap();

        repo.delete(&a.id).unwrap();
        let ids: Vec<_> = repo
            .list(&NoteFilter::all(), SortOrder::Newest)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![b.id.clone()]);
        assert!(repo.delete(&a.id).unwrap_err().is_not_found());
        // Index still resolves the survivor after the shift.
        assert_eq!(repo.get(&b.id).unwrap().title, "b");
    }

    #[test]
    fn test_toggle_favorite_flips_and_persists() {
        let (mut repo, _) = repo_with_clock();
        let n = repo.create(&draft("fav", Category::Web, "x")).unwrap();
        assert!(repo.toggle_favorite(&n.id).unwrap().favorite);
        assert_eq!(repo.stats().favorites, 1);
        assert!(!repo.toggle_favorite(&n.id).unwrap().favorite);
        let stored = parse_notes(&repo.store().get(NOTES_KEY).unwrap().unwrap()).unwrap();
        assert!(!stored[0].favorite);
    }

    #[test]
    fn test_search_is_case_insensitive_over_tags() {
        let (mut repo, _) = repo_with_clock();
        repo.create(&draft("Classic", Category::Crypto, "shift cipher").with_tags("rot13"))
            .unwrap();

        let hit = NoteFilter {
            search: "ROT".into(),
            ..Default::default()
        };
        assert_eq!(repo.list(&hit, SortOrder::Newest).len(), 1);

        let miss = NoteFilter {
            search: "zzz".into(),
            ..Default::default()
        };
        assert!(repo.list(&miss, SortOrder::Newest).is_empty());
    }

    #[test]
    fn test_category_filter_is_exact() {
        let (mut repo, _) = repo_with_clock();
        repo.create(&draft("w", Category::Web, "x")).unwrap();
        repo.create(&draft("c", Category::Crypto, "x")).unwrap();
        let filter = NoteFilter {
            category: CategoryFilter::Only(Category::Crypto),
            search: String::new(),
        };
        let titles: Vec<_> = repo
            .list(&filter, SortOrder::Newest)
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["c"]);
    }

    #[test]
    fn test_sort_orders() {
        let (mut repo, clock) = repo_with_clock();
        for (title, cat) in [
            ("Banana", Category::Web),
            ("apple", Category::Crypto),
            ("Cherry", Category::Forensics),
        ] {
            repo.create(&draft(title, cat, "x")).unwrap();
            clock.advance(10);
        }
        let titles = |sort| -> Vec<String> {
            repo.list(&NoteFilter::all(), sort)
                .into_iter()
                .map(|n| n.title)
                .collect()
        };
        assert_eq!(titles(SortOrder::Title), vec!["apple", "Banana", "Cherry"]);
        assert_eq!(titles(SortOrder::Newest), vec!["Cherry", "apple", "Banana"]);
        assert_eq!(titles(SortOrder::Oldest), vec!["Banana", "apple", "Cherry"]);
        assert_eq!(titles(SortOrder::Category), vec!["apple", "Cherry", "Banana"]);
    }

    #[test]
    fn test_list_does_not_reorder_collection() {
        let (mut repo, clock) = repo_with_clock();
        repo.create(&draft("b", Category::Web, "x")).unwrap();
        clock.advance(1);
        repo.create(&draft("a", Category::Web, "x")).unwrap();
        let _ = repo.list(&NoteFilter::all(), SortOrder::Oldest);
        let stored = parse_notes(&repo.store().get(NOTES_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored[0].title, "a");
    }

    #[test]
    fn test_import_merge_skips_existing_ids() {
        let (mut repo, _) = repo_with_clock();
        repo.import_merge(vec![note_with_id("a", "A"), note_with_id("b", "B")]);

        let outcome = repo.import_merge(vec![note_with_id("b", "B2"), note_with_id("c", "C")]);
        assert_eq!(outcome.imported_count, 1);
        assert_eq!(outcome.skipped_count, 1);
        assert_eq!(repo.len(), 3);
        assert_eq!(repo.get("b").unwrap().title, "B");
        assert_eq!(repo.get("c").unwrap().title, "C");
    }

    #[test]
    fn test_import_merge_appends_in_order_and_dedupes_batch() {
        let (mut repo, _) = repo_with_clock();
        let existing = repo.create(&draft("mine", Category::Web, "x")).unwrap();
        let outcome = repo.import_merge(vec![
            note_with_id("x", "X"),
            note_with_id("y", "Y"),
            note_with_id("x", "X again"),
        ]);
        assert_eq!(outcome.imported_count, 2);
        let stored = parse_notes(&repo.store().get(NOTES_KEY).unwrap().unwrap()).unwrap();
        let ids: Vec<_> = stored.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![existing.id.as_str(), "x", "y"]);
    }

    #[test]
    fn test_export_then_import_reproduces_notes() {
        let (mut repo, clock) = repo_with_clock();
        repo.create(&draft("one", Category::Reverse, "<p>ghidra</p>").with_tags("re"))
            .unwrap();
        clock.advance(5);
        let two = repo.create(&draft("two", Category::Pwn, "heap")).unwrap();
        repo.toggle_favorite(&two.id).unwrap();

        let exported = repo.export_all().unwrap();
        assert!(exported.contains("\n  {"));

        let mut fresh = NoteRepository::open(MemoryStore::new());
        let outcome = fresh.import_merge(parse_notes(&exported).unwrap());
        assert_eq!(outcome.imported_count, 2);
        assert_eq!(
            fresh.list(&NoteFilter::all(), SortOrder::Newest),
            repo.list(&NoteFilter::all(), SortOrder::Newest)
        );
    }

    #[test]
    fn test_corrupt_slot_recovers_empty() {
        let store = MemoryStore::new().with_slot(NOTES_KEY, "{not json");
        let mut repo = NoteRepository::open(store);
        assert!(repo.is_empty());
        assert!(!repo.seed_samples_if_fresh());
    }

    #[test]
    fn test_out_of_enum_category_is_rejected() {
        let raw = r#"[{"id":"1","title":"t","category":"stego","content":"c",
            "created":"2024-01-01T00:00:00.000Z","lastModified":"2024-01-01T00:00:00.000Z"}]"#;
        assert!(matches!(parse_notes(raw), Err(NoteError::Parse(_))));
    }

    #[test]
    fn test_reload_restores_collection() {
        let (mut repo, _) = repo_with_clock();
        let n = repo.create(&draft("persisted", Category::Misc, "x")).unwrap();
        let raw = repo.store().get(NOTES_KEY).unwrap().unwrap();

        let reopened = NoteRepository::open(MemoryStore::new().with_slot(NOTES_KEY, &raw));
        assert_eq!(reopened.get(&n.id), Some(&n));
    }

    #[test]
    fn test_seed_samples_only_on_fresh_slot() {
        let mut repo = NoteRepository::open(MemoryStore::new());
        assert!(repo.seed_samples_if_fresh());
        assert_eq!(repo.len(), 3);
        assert_eq!(repo.stats().completed, 2);
        assert!(!repo.seed_samples_if_fresh());

        let mut emptied = NoteRepository::open(MemoryStore::new().with_slot(NOTES_KEY, "[]"));
        assert!(!emptied.seed_samples_if_fresh());
        assert!(emptied.is_empty());
    }

    #[test]
    fn test_persist_failure_keeps_memory_and_warns() {
        let mut store = MemoryStore::new();
        store.fail_writes = true;
        let mut repo = NoteRepository::open(store);
        let n = repo.create(&draft("kept", Category::Web, "x")).unwrap();
        assert!(repo.get(&n.id).is_some());
        assert!(matches!(
            repo.take_persist_warning(),
            Some(NoteError::Storage(_))
        ));
        assert!(repo.take_persist_warning().is_none());
    }
}
