// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Note records and their closed vocabularies

use crate::error::{NoteError, NoteResult};
use crate::markup;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// Random characters appended to the time component of an id.
const ID_RANDOM_LEN: usize = 11;

/// Challenge category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Web,
    Crypto,
    Forensics,
    Reverse,
    Pwn,
    Misc,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Web => "web",
            Category::Crypto => "crypto",
            Category::Forensics => "forensics",
            Category::Reverse => "reverse",
            Category::Pwn => "pwn",
            Category::Misc => "misc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Web => "Web",
            Category::Crypto => "Crypto",
            Category::Forensics => "Forensics",
            Category::Reverse => "Reverse Engineering",
            Category::Pwn => "Pwn",
            Category::Misc => "Misc",
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Category::Web,
            Category::Crypto,
            Category::Forensics,
            Category::Reverse,
            Category::Pwn,
            Category::Misc,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| NoteError::Parse(format!("unknown category '{}'", s)))
    }
}

/// Category filter used by list views: everything, or one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Only(c) => c.label(),
        }
    }

    /// Filters in tab order: All, then each category.
    pub fn cycle() -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(Category::all().iter().copied().map(CategoryFilter::Only))
            .collect()
    }
}

impl FromStr for CategoryFilter {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn all() -> &'static [Difficulty] {
        &[Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
    }
}

impl FromStr for Difficulty {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::all()
            .iter()
            .copied()
            .find(|d| d.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| NoteError::Parse(format!("unknown difficulty '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Solved,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not-started",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
            Status::Solved => "solved",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
            Status::Solved => "Solved",
        }
    }

    /// Completed and solved both count as done in the statistics.
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Completed | Status::Solved)
    }

    pub fn all() -> &'static [Status] {
        &[
            Status::NotStarted,
            Status::InProgress,
            Status::Completed,
            Status::Solved,
        ]
    }
}

impl FromStr for Status {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::all()
            .iter()
            .copied()
            .find(|st| st.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| NoteError::Parse(format!("unknown status '{}'", s)))
    }
}

/// A single challenge write-up.
/// Field order here is the field order of exported JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
    #[serde(default)]
    pub content_html: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub favorite: bool,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Note {
    /// Case-insensitive substring match against title, plain-text content or any tag.
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Editor form payload for a new note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub category: Option<Category>,
    pub tags: Vec<String>,
    /// Plain text; derived from `content_html` when left empty.
    pub content: String,
    pub content_html: String,
    pub difficulty: Difficulty,
    pub status: Status,
}

impl NoteDraft {
    /// Draft whose plain text is extracted from the markup body.
    pub fn from_markup(title: &str, category: Category, content_html: &str) -> Self {
        Self {
            title: title.to_string(),
            category: Some(category),
            content: markup::plain_text(content_html),
            content_html: content_html.to_string(),
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = parse_tags(tags);
        self
    }

    pub fn with_meta(mut self, difficulty: Difficulty, status: Status) -> Self {
        self.difficulty = difficulty;
        self.status = status;
        self
    }

    /// Trimmed, validated fields ready to become a note.
    pub(crate) fn validated(&self) -> NoteResult<ValidDraft> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(NoteError::Validation { field: "title" });
        }
        let content = if self.content.trim().is_empty() {
            markup::plain_text(&self.content_html)
        } else {
            self.content.clone()
        };
        if content.trim().is_empty() {
            return Err(NoteError::Validation { field: "content" });
        }
        let content_html = if self.content_html.trim().is_empty() {
            markup::from_plain_text(&content)
        } else {
            self.content_html.clone()
        };
        let category = self.category.unwrap_or(Category::Misc);
        Ok(ValidDraft {
            title,
            category,
            tags: normalize_tags(&self.tags),
            content,
            content_html,
            difficulty: self.difficulty,
            status: self.status,
        })
    }
}

pub(crate) struct ValidDraft {
    pub title: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub content: String,
    pub content_html: String,
    pub difficulty: Difficulty,
    pub status: Status,
}

impl ValidDraft {
    pub fn into_note(self, id: String, now: DateTime<Utc>) -> Note {
        Note {
            id,
            title: self.title,
            category: self.category,
            tags: self.tags,
            content: self.content,
            content_html: self.content_html,
            difficulty: self.difficulty,
            status: self.status,
            favorite: false,
            created: now,
            last_modified: now,
        }
    }
}

/// Partial update merged over an existing note. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub content: Option<String>,
    pub content_html: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<Status>,
}

impl NotePatch {
    pub fn title(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    /// Patch carrying every editable field of a draft.
    pub fn from_draft(draft: &NoteDraft) -> Self {
        Self {
            title: Some(draft.title.clone()),
            category: draft.category,
            tags: Some(draft.tags.clone()),
            content: (!draft.content.trim().is_empty()).then(|| draft.content.clone()),
            content_html: Some(draft.content_html.clone()),
            difficulty: Some(draft.difficulty),
            status: Some(draft.status),
        }
    }

    /// The note this patch would produce. Does not touch timestamps.
    pub(crate) fn apply_to(&self, note: &Note) -> NoteResult<Note> {
        let mut next = note.clone();
        if let Some(title) = &self.title {
            next.title = title.trim().to_string();
        }
        if let Some(category) = self.category {
            next.category = category;
        }
        if let Some(tags) = &self.tags {
            next.tags = normalize_tags(tags);
        }
        match (&self.content, &self.content_html) {
            (Some(content), Some(html)) => {
                next.content = content.clone();
                next.content_html = html.clone();
            }
            (None, Some(html)) => {
                next.content = markup::plain_text(html);
                next.content_html = html.clone();
            }
            (Some(content), None) => {
                next.content = content.clone();
                next.content_html = markup::from_plain_text(content);
            }
            (None, None) => {}
        }
        if let Some(difficulty) = self.difficulty {
            next.difficulty = difficulty;
        }
        if let Some(status) = self.status {
            next.status = status;
        }

        if next.title.is_empty() {
            return Err(NoteError::Validation { field: "title" });
        }
        if next.content.trim().is_empty() {
            return Err(NoteError::Validation { field: "content" });
        }
        Ok(next)
    }
}

/// Split a comma-separated tag field into trimmed, unique, non-empty tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    let raw: Vec<String> = input.split(',').map(|t| t.to_string()).collect();
    normalize_tags(&raw)
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let t = tag.trim();
        if !t.is_empty() && !out.iter().any(|existing| existing == t) {
            out.push(t.to_string());
        }
    }
    out
}

/// Fresh opaque id: milliseconds since the epoch in base 36, then random base-36 characters.
pub fn generate_id(now: DateTime<Utc>) -> String {
    let mut millis = now.timestamp_millis().max(0) as u64;
    let mut time_part = Vec::new();
    loop {
        time_part.push(BASE36[(millis % 36) as usize]);
        millis /= 36;
        if millis == 0 {
            break;
        }
    }
    time_part.reverse();

    let mut rng = rand::thread_rng();
    let random_part = (0..ID_RANDOM_LEN).map(|_| BASE36[rng.gen_range(0..BASE36.len())]);

    time_part
        .into_iter()
        .chain(random_part)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_category_round_trip_names() {
        for c in Category::all() {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), *c);
        }
        assert!("stego".parse::<Category>().is_err());
        assert_eq!("ALL".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "pwn".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Pwn)
        );
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&Status::NotStarted).unwrap();
        assert_eq!(json, "\"not-started\"");
        assert!(Status::Solved.is_done());
        assert!(!Status::InProgress.is_done());
    }

    #[test]
    fn test_parse_tags_trims_and_dedups() {
        assert_eq!(
            parse_tags(" sql, injection,,sql , web "),
            vec!["sql", "injection", "web"]
        );
        assert!(parse_tags("  ,  ").is_empty());
    }

    #[test]
    fn test_generate_id_is_base36_and_unique() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let a = generate_id(now);
        let b = generate_id(now);
        assert_ne!(a, b);
        assert!(a.bytes().all(|c| BASE36.contains(&c)));
        assert!(a.len() > ID_RANDOM_LEN);
    }

    #[test]
    fn test_draft_validation() {
        let draft = NoteDraft::from_markup("  ", Category::Web, "<p>body</p>");
        assert!(matches!(
            draft.validated(),
            Err(NoteError::Validation { field: "title" })
        ));

        let draft = NoteDraft::from_markup("Title", Category::Web, "<p>  </p>");
        assert!(matches!(
            draft.validated(),
            Err(NoteError::Validation { field: "content" })
        ));

        let ok = NoteDraft::from_markup(" Title ", Category::Web, "<b>x</b>")
            .validated()
            .unwrap();
        assert_eq!(ok.title, "Title");
        assert_eq!(ok.content, "x");
    }

    #[test]
    fn test_patch_derives_plain_text_from_markup() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let note = NoteDraft::from_markup("T", Category::Misc, "old")
            .validated()
            .unwrap()
            .into_note("id1".into(), now);
        let patch = NotePatch {
            content_html: Some("<p>new <em>body</em></p>".into()),
            ..Default::default()
        };
        let next = patch.apply_to(&note).unwrap();
        assert_eq!(next.content, "new body");
        assert_eq!(next.title, "T");
        assert!(NotePatch::title(" ").apply_to(&note).is_err());
    }

    #[test]
    fn test_note_json_uses_camel_case_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let note = NoteDraft::from_markup("T", Category::Crypto, "<p>c</p>")
            .validated()
            .unwrap()
            .into_note("abc".into(), now);
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("contentHtml").is_some());
        assert!(value.get("lastModified").is_some());
        assert_eq!(value["category"], "crypto");
        assert_eq!(value["status"], "not-started");
    }
}
