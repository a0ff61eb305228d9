// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Application state for the terminal UI

use crate::config::{key_display_string, Config, ResolvedKeys};
use crate::editor::{
    Alignment, EditorSession, FormatCommand, InlineStyle, SelectionState, StructuredBlock,
};
use crate::error::NoteError;
use crate::note::{Category, CategoryFilter, Difficulty, Note, NoteDraft, NotePatch, Status};
use crate::repository::{NoteFilter, NoteRepository, NoteStats, SortOrder};
use crate::storage::{KeyValueStore, Preferences, ThemeMode};
use crate::surface::MarkupArea;
use crate::templates::Template;
use crate::theme::{ColorDef, ResolvedTheme};
use crate::transfer::{export_file_name, parse_import, PendingImport};
use anyhow::{Context, Result};
use chrono::Local;
use crossterm::event::KeyEvent;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tui_textarea::Input;

/// How long a status message stays in the footer.
const TOAST_DURATION: Duration = Duration::from_secs(3);

pub type Store = Box<dyn KeyValueStore>;

/// Which pane or popup has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    /// Typing into the search box.
    Search,
    Editor,
    /// Delete confirmation popup.
    ConfirmDelete,
    /// Template picker popup.
    Templates,
    /// Import: entering a file path.
    ImportPath,
    /// Import: reviewing what would be merged.
    ImportPreview,
    /// Editor: entering a link target.
    LinkUrl,
    /// Keyboard shortcut help.
    Help,
}

/// Field of the note form that receives input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Category,
    Tags,
    Difficulty,
    Status,
    Body,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Title => FormField::Category,
            FormField::Category => FormField::Tags,
            FormField::Tags => FormField::Difficulty,
            FormField::Difficulty => FormField::Status,
            FormField::Status => FormField::Body,
            FormField::Body => FormField::Title,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    until: Instant,
}

/// The note editor: form fields plus the rich-text body session.
pub struct NoteForm {
    /// `None` while drafting a new note.
    pub editing_id: Option<String>,
    pub title: String,
    pub category: Category,
    pub tags: String,
    pub difficulty: Difficulty,
    pub status: Status,
    pub field: FormField,
    pub session: EditorSession<MarkupArea>,
}

impl NoteForm {
    fn from_draft(draft: &NoteDraft, editing_id: Option<String>, history_limit: usize) -> Self {
        let mut session = EditorSession::new(MarkupArea::new(""), history_limit);
        session.open(&draft.content_html);
        Self {
            editing_id,
            title: draft.title.clone(),
            category: draft.category.unwrap_or(Category::Web),
            tags: draft.tags.join(", "),
            difficulty: draft.difficulty,
            status: draft.status,
            field: FormField::Title,
            session,
        }
    }

    fn from_note(note: &Note, history_limit: usize) -> Self {
        let draft = NoteDraft {
            title: note.title.clone(),
            category: Some(note.category),
            tags: note.tags.clone(),
            content: note.content.clone(),
            content_html: note.content_html.clone(),
            difficulty: note.difficulty,
            status: note.status,
        };
        Self::from_draft(&draft, Some(note.id.clone()), history_limit)
    }

    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft::from_markup(&self.title, self.category, &self.session.markup())
            .with_tags(&self.tags)
            .with_meta(self.difficulty, self.status)
    }

    pub fn selection_state(&self) -> SelectionState {
        self.session.selection_state()
    }

    /// Cycle the value of a choice field. `forward` picks the next option.
    fn cycle_choice(&mut self, forward: bool) {
        fn step<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
            let i = all.iter().position(|x| *x == current).unwrap_or(0);
            let n = all.len();
            all[if forward { (i + 1) % n } else { (i + n - 1) % n }]
        }
        match self.field {
            FormField::Category => self.category = step(Category::all(), self.category, forward),
            FormField::Difficulty => {
                self.difficulty = step(Difficulty::all(), self.difficulty, forward)
            }
            FormField::Status => self.status = step(Status::all(), self.status, forward),
            _ => {}
        }
    }
}

/// Main application state.
pub struct App {
    pub config: Config,
    pub resolved_keys: ResolvedKeys,
    pub theme: ResolvedTheme,
    pub repo: NoteRepository<Store>,
    pub focus: Focus,

    // Notes list
    pub filter: NoteFilter,
    pub sort: SortOrder,
    pub visible: Vec<Note>,
    pub selected: usize,
    pub stats: NoteStats,

    // Editor
    pub form: Option<NoteForm>,

    pub link_url: String,

    // Delete confirmation
    pub pending_delete: Option<String>,

    // Template picker
    pub template_filter: CategoryFilter,
    pub template_selected: usize,

    // Import
    pub import_path: String,
    pub pending_import: Option<PendingImport>,

    pub toast: Option<Toast>,
}

impl App {
    pub fn new(config: Config, store: Store) -> Result<Self> {
        let mut repo = NoteRepository::open(store);
        if config.seed_sample_notes {
            repo.seed_samples_if_fresh();
        }

        let (mode, first_run) = {
            let prefs = Preferences::new(repo.store_mut());
            (prefs.theme(), !prefs.shortcuts_shown())
        };
        let theme = ResolvedTheme::resolve(mode, &ColorDef::new(&config.ui.accent))
            .context("Invalid accent color in config")?;
        let resolved_keys = ResolvedKeys::from_config(&config.keys);
        let sort = config.ui.default_sort;

        let mut app = Self {
            config,
            resolved_keys,
            theme,
            repo,
            focus: if first_run { Focus::Help } else { Focus::List },
            filter: NoteFilter::all(),
            sort,
            visible: Vec::new(),
            selected: 0,
            stats: NoteStats::default(),
            form: None,
            link_url: String::new(),
            pending_delete: None,
            template_filter: CategoryFilter::All,
            template_selected: 0,
            import_path: String::new(),
            pending_import: None,
            toast: None,
        };
        app.refresh_view();
        Ok(app)
    }

    /// Display string for a configured key, e.g. "editor_save" -> "Ctrl+S".
    pub fn key_hint(&self, action: &str) -> String {
        let k = &self.config.keys;
        let s = match action {
            "quit" => &k.quit,
            "search" => &k.search,
            "new_note" => &k.new_note,
            "templates" => &k.templates,
            "delete" => &k.delete,
            "favorite" => &k.favorite,
            "cycle_sort" => &k.cycle_sort,
            "next_category" => &k.next_category,
            "prev_category" => &k.prev_category,
            "export" => &k.export,
            "import" => &k.import,
            "toggle_theme" => &k.toggle_theme,
            "help" => &k.help,
            "escape" => &k.escape,
            "enter" => &k.enter,
            "editor_save" => &k.editor_save,
            "editor_next_field" => &k.editor_next_field,
            "editor_undo" => &k.editor_undo,
            "editor_redo" => &k.editor_redo,
            "editor_bold" => &k.editor_bold,
            "editor_italic" => &k.editor_italic,
            "editor_underline" => &k.editor_underline,
            "editor_code" => &k.editor_code,
            "editor_heading" => &k.editor_heading,
            "editor_list" => &k.editor_list,
            "editor_quote" => &k.editor_quote,
            "editor_code_block" => &k.editor_code_block,
            "editor_strike" => &k.editor_strike,
            "editor_numbered" => &k.editor_numbered,
            "editor_table" => &k.editor_table,
            "editor_align" => &k.editor_align,
            "editor_link" => &k.editor_link,
            _ => return String::new(),
        };
        key_display_string(s)
    }

    // ----- status messages -----

    pub fn notify(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.toast = Some(Toast {
            text: text.into(),
            kind,
            until: Instant::now() + TOAST_DURATION,
        });
    }

    /// Drop an expired message. Called once per frame.
    pub fn tick_toast(&mut self) {
        if self.toast.as_ref().is_some_and(|t| Instant::now() >= t.until) {
            self.toast = None;
        }
    }

    /// After any mutation: warn if the store refused the write.
    fn check_persisted(&mut self) {
        if let Some(e) = self.repo.take_persist_warning() {
            self.notify(
                ToastKind::Warning,
                format!("Saved in memory only, may not survive a restart: {}", e),
            );
        }
    }

    // ----- notes list -----

    pub fn refresh_view(&mut self) {
        self.visible = self.repo.list(&self.filter, self.sort);
        self.stats = self.repo.stats();
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        if self.visible.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.visible.len() {
            self.selected = self.visible.len() - 1;
        }
    }

    fn select_id(&mut self, id: &str) {
        if let Some(i) = self.visible.iter().position(|n| n.id == id) {
            self.selected = i;
        }
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.visible.get(self.selected)
    }

    pub fn move_selection_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_selection_down(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.selected += 1;
        }
    }

    pub fn enter_search(&mut self) {
        self.focus = Focus::Search;
    }

    pub fn exit_search(&mut self) {
        self.focus = Focus::List;
    }

    /// Clear the search text and leave search mode.
    pub fn clear_search(&mut self) {
        self.filter.search.clear();
        self.focus = Focus::List;
        self.refresh_view();
    }

    pub fn search_add_char(&mut self, c: char) {
        self.filter.search.push(c);
        self.selected = 0;
        self.refresh_view();
    }

    pub fn search_backspace(&mut self) {
        self.filter.search.pop();
        self.refresh_view();
    }

    pub fn next_category(&mut self) {
        self.step_category(true);
    }

    pub fn prev_category(&mut self) {
        self.step_category(false);
    }

    fn step_category(&mut self, forward: bool) {
        let filters = CategoryFilter::cycle();
        let i = filters
            .iter()
            .position(|f| *f == self.filter.category)
            .unwrap_or(0);
        let n = filters.len();
        let next = if forward { (i + 1) % n } else { (i + n - 1) % n };
        self.filter.category = filters[next];
        self.selected = 0;
        self.refresh_view();
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.refresh_view();
        self.notify(ToastKind::Info, format!("Sorted: {}", self.sort.label()));
    }

    pub fn toggle_favorite_selected(&mut self) {
        let Some(id) = self.selected_note().map(|n| n.id.clone()) else {
            return;
        };
        match self.repo.toggle_favorite(&id) {
            Ok(note) => {
                let where_to = if note.favorite { "added to" } else { "removed from" };
                self.notify(ToastKind::Success, format!("Note {} favorites!", where_to));
            }
            Err(e) => self.report(e),
        }
        self.refresh_view();
        self.select_id(&id);
        self.check_persisted();
    }

    pub fn request_delete(&mut self) {
        if let Some(id) = self.selected_note().map(|n| n.id.clone()) {
            self.pending_delete = Some(id);
            self.focus = Focus::ConfirmDelete;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.focus = Focus::List;
    }

    pub fn confirm_delete(&mut self) {
        self.focus = Focus::List;
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        match self.repo.delete(&id) {
            Ok(()) => self.notify(ToastKind::Success, "Note deleted successfully!"),
            Err(e) => self.report(e),
        }
        self.refresh_view();
        self.check_persisted();
    }

    /// Surface a core error. Not-found means someone else already removed the
    /// note, so it is logged and otherwise ignored.
    fn report(&mut self, e: NoteError) {
        match e {
            NoteError::NotFound(id) => {
                log::warn!("Note {} no longer exists, nothing to do", id);
            }
            NoteError::Validation { .. } => {
                self.notify(ToastKind::Error, "Please fill in all required fields.");
            }
            other => {
                log::error!("{}", other);
                self.notify(ToastKind::Error, other.to_string());
            }
        }
    }

    // ----- editor -----

    pub fn open_new_note(&mut self) {
        let draft = NoteDraft {
            category: match self.filter.category {
                CategoryFilter::Only(c) => Some(c),
                CategoryFilter::All => None,
            },
            ..Default::default()
        };
        self.open_form(NoteForm::from_draft(&draft, None, self.config.editor.history_limit));
    }

    pub fn open_selected_note(&mut self) {
        let Some(note) = self.selected_note().cloned() else {
            return;
        };
        self.open_form(NoteForm::from_note(&note, self.config.editor.history_limit));
    }

    fn open_form(&mut self, form: NoteForm) {
        self.form = Some(form);
        self.focus = Focus::Editor;
    }

    /// Abandon the form and its undo history.
    pub fn close_editor(&mut self) {
        self.form = None;
        self.focus = Focus::List;
    }

    pub fn editor_next_field(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.field = form.field.next();
        }
    }

    pub fn editor_format(&mut self, command: FormatCommand) {
        if let Some(form) = self.form.as_mut() {
            if form.field == FormField::Body {
                form.session.format(&command);
            }
        }
    }

    /// Left, then center, then right, starting from the alignment at the cursor.
    pub fn editor_cycle_alignment(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let next = match form.selection_state().alignment {
            Alignment::Left => Alignment::Center,
            Alignment::Center => Alignment::Right,
            Alignment::Right => Alignment::Left,
        };
        self.editor_format(FormatCommand::Block(StructuredBlock::Align(next)));
    }

    pub fn open_link_prompt(&mut self) {
        if self.form.as_ref().is_some_and(|f| f.field == FormField::Body) {
            self.link_url.clear();
            self.focus = Focus::LinkUrl;
        }
    }

    pub fn cancel_link(&mut self) {
        self.focus = Focus::Editor;
    }

    /// Wrap the selection in a link to the entered URL. Blank input inserts nothing.
    pub fn confirm_link(&mut self) {
        self.focus = Focus::Editor;
        let url = self.link_url.trim().to_string();
        if !url.is_empty() {
            self.editor_format(FormatCommand::Inline(InlineStyle::Link(url)));
        }
    }

    pub fn editor_undo(&mut self) {
        if let Some(form) = self.form.as_mut() {
            if !form.session.undo() {
                self.notify(ToastKind::Info, "Nothing to undo");
            }
        }
    }

    pub fn editor_redo(&mut self) {
        if let Some(form) = self.form.as_mut() {
            if !form.session.redo() {
                self.notify(ToastKind::Info, "Nothing to redo");
            }
        }
    }

    /// Route a key to the focused form field.
    pub fn editor_input(&mut self, key: KeyEvent) {
        use crossterm::event::KeyCode;
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match form.field {
            FormField::Title | FormField::Tags => {
                let target = if form.field == FormField::Title {
                    &mut form.title
                } else {
                    &mut form.tags
                };
                match key.code {
                    KeyCode::Char(c) => target.push(c),
                    KeyCode::Backspace => {
                        target.pop();
                    }
                    KeyCode::Enter | KeyCode::Down => form.field = form.field.next(),
                    _ => {}
                }
            }
            FormField::Category | FormField::Difficulty | FormField::Status => match key.code {
                KeyCode::Right | KeyCode::Char(' ') | KeyCode::Char('l') => form.cycle_choice(true),
                KeyCode::Left | KeyCode::Char('h') => form.cycle_choice(false),
                KeyCode::Enter | KeyCode::Down => form.field = form.field.next(),
                _ => {}
            },
            FormField::Body => {
                let input: Input = key.into();
                if form.session.surface_mut().textarea.input(input) {
                    form.session.record_change();
                }
            }
        }
    }

    /// Create or update from the form. The form stays open on validation errors.
    pub fn save_editor(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let delay = self.config.editor.save_delay_ms;
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }

        let draft = form.to_draft();
        let result = match form.editing_id.clone() {
            Some(id) => self
                .repo
                .update(&id, &NotePatch::from_draft(&draft))
                .map(|n| (n, "Note updated successfully!")),
            None => self
                .repo
                .create(&draft)
                .map(|n| (n, "Note created successfully!")),
        };

        match result {
            Ok((note, message)) => {
                self.close_editor();
                self.refresh_view();
                self.select_id(&note.id);
                self.notify(ToastKind::Success, message);
            }
            Err(e) if e.is_not_found() => {
                self.report(e);
                self.close_editor();
                self.refresh_view();
            }
            Err(e) => self.report(e),
        }
        self.check_persisted();
    }

    // ----- templates -----

    pub fn open_templates(&mut self) {
        self.template_selected = 0;
        self.focus = Focus::Templates;
    }

    pub fn visible_templates(&self) -> Vec<&'static Template> {
        Template::list(self.template_filter)
    }

    pub fn template_move_up(&mut self) {
        self.template_selected = self.template_selected.saturating_sub(1);
    }

    pub fn template_move_down(&mut self) {
        if self.template_selected + 1 < self.visible_templates().len() {
            self.template_selected += 1;
        }
    }

    pub fn template_filter_step(&mut self, forward: bool) {
        let filters = CategoryFilter::cycle();
        let i = filters
            .iter()
            .position(|f| *f == self.template_filter)
            .unwrap_or(0);
        let n = filters.len();
        self.template_filter = filters[if forward { (i + 1) % n } else { (i + n - 1) % n }];
        self.template_selected = 0;
    }

    pub fn use_selected_template(&mut self) {
        let Some(template) = self.visible_templates().get(self.template_selected).copied() else {
            return;
        };
        self.open_form(NoteForm::from_draft(
            &template.to_draft(),
            None,
            self.config.editor.history_limit,
        ));
        self.notify(
            ToastKind::Success,
            format!("Template \"{}\" loaded!", template.title),
        );
    }

    // ----- export / import -----

    /// Write every note to `ctf-notes-<date>.json` in `dir`.
    pub fn export_notes(&mut self, dir: PathBuf) {
        let path = dir.join(export_file_name(Local::now().date_naive()));
        let result = self
            .repo
            .export_all()
            .map_err(anyhow::Error::from)
            .and_then(|json| {
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))
            });
        match result {
            Ok(()) => {
                log::info!("Exported notes to {}", path.display());
                self.notify(
                    ToastKind::Success,
                    format!("Notes exported to {}", path.display()),
                );
            }
            Err(e) => {
                log::error!("Export failed: {:#}", e);
                self.notify(ToastKind::Error, format!("Export failed: {}", e));
            }
        }
    }

    pub fn open_import(&mut self) {
        self.import_path.clear();
        self.pending_import = None;
        self.focus = Focus::ImportPath;
    }

    pub fn cancel_import(&mut self) {
        self.pending_import = None;
        self.focus = Focus::List;
    }

    /// Preview the import box contents. Text starting with `[` is taken as
    /// pasted JSON; anything else is a file path.
    pub fn load_import_file(&mut self) {
        if self.import_path.trim_start().starts_with('[') {
            let text = std::mem::take(&mut self.import_path);
            self.import_pasted_text(&text);
            return;
        }
        let path = crate::config::expand_path(&self.import_path);
        match fs::read_to_string(&path) {
            Ok(text) => self.preview_import(&text, &path.display().to_string()),
            Err(e) => self.notify(
                ToastKind::Error,
                format!("Cannot read {}: {}", path.display(), e),
            ),
        }
    }

    /// Preview notes pasted into the import box.
    pub fn import_pasted_text(&mut self, text: &str) {
        self.preview_import(text, "pasted text");
    }

    fn preview_import(&mut self, text: &str, source: &str) {
        match parse_import(text) {
            Ok(pending) => {
                self.pending_import = Some(pending);
                self.focus = Focus::ImportPreview;
            }
            Err(e) => {
                log::warn!("Rejected import from {}: {}", source, e);
                self.notify(ToastKind::Error, "Invalid JSON file!");
            }
        }
    }

    pub fn confirm_import(&mut self) {
        self.focus = Focus::List;
        let Some(pending) = self.pending_import.take() else {
            return;
        };
        let outcome = self.repo.import_merge(pending.notes);
        self.refresh_view();
        if outcome.imported_count > 0 {
            self.notify(
                ToastKind::Success,
                format!("Imported {} new notes!", outcome.imported_count),
            );
        } else {
            self.notify(ToastKind::Warning, "No new notes to import!");
        }
        self.check_persisted();
    }

    // ----- theme / help -----

    pub fn toggle_theme(&mut self) {
        let mode = self.theme.mode.toggled();
        match ResolvedTheme::resolve(mode, &ColorDef::new(&self.config.ui.accent)) {
            Ok(theme) => self.theme = theme,
            Err(e) => {
                self.notify(ToastKind::Error, e.to_string());
                return;
            }
        }
        if let Err(e) = Preferences::new(self.repo.store_mut()).set_theme(mode) {
            log::error!("Failed to save theme: {}", e);
        }
    }

    pub fn theme_mode(&self) -> ThemeMode {
        self.theme.mode
    }

    pub fn show_help(&mut self) {
        self.focus = Focus::Help;
    }

    pub fn dismiss_help(&mut self) {
        self.focus = Focus::List;
        if let Err(e) = Preferences::new(self.repo.store_mut()).mark_shortcuts_shown() {
            log::error!("Failed to record first-run help: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SHORTCUTS_SHOWN_KEY, THEME_KEY};
    use crossterm::event::{KeyCode, KeyModifiers};

    fn test_app() -> App {
        let mut config = Config::default();
        config.seed_sample_notes = false;
        config.editor.save_delay_ms = 0;
        let store = MemoryStore::new().with_slot(SHORTCUTS_SHOWN_KEY, "true");
        App::new(config, Box::new(store)).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        app.editor_input(KeyEvent::new(code, KeyModifiers::empty()));
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_first_run_shows_help_once() {
        let mut config = Config::default();
        config.seed_sample_notes = false;
        let mut app = App::new(config.clone(), Box::new(MemoryStore::new())).unwrap();
        assert_eq!(app.focus, Focus::Help);
        app.dismiss_help();
        assert_eq!(app.focus, Focus::List);
        assert!(Preferences::new(app.repo.store_mut()).shortcuts_shown());
    }

    #[test]
    fn test_create_note_through_form() {
        let mut app = test_app();
        app.open_new_note();
        type_str(&mut app, "Baby RSA");
        app.editor_next_field(); // category
        press(&mut app, KeyCode::Right); // web -> crypto
        app.editor_next_field(); // tags
        type_str(&mut app, "rsa, small-e");
        app.editor_next_field(); // difficulty
        app.editor_next_field(); // status
        app.editor_next_field(); // body
        type_str(&mut app, "cube root");
        app.save_editor();

        assert_eq!(app.focus, Focus::List);
        assert_eq!(app.visible.len(), 1);
        let note = &app.visible[0];
        assert_eq!(note.title, "Baby RSA");
        assert_eq!(note.category, Category::Crypto);
        assert_eq!(note.tags, vec!["rsa", "small-e"]);
        assert_eq!(note.content, "cube root");
    }

    #[test]
    fn test_save_with_blank_body_keeps_form_open() {
        let mut app = test_app();
        app.open_new_note();
        type_str(&mut app, "title only");
        app.save_editor();
        assert_eq!(app.focus, Focus::Editor);
        assert!(app.form.is_some());
        assert_eq!(app.toast.as_ref().map(|t| t.kind), Some(ToastKind::Error));
        assert!(app.visible.is_empty());
    }

    #[test]
    fn test_editor_undo_is_per_note() {
        let mut app = test_app();
        app.open_new_note();
        if let Some(form) = app.form.as_mut() {
            form.field = FormField::Body;
        }
        type_str(&mut app, "ab");
        app.editor_undo();
        assert_eq!(app.form.as_ref().unwrap().session.markup(), "a");
        app.editor_redo();
        assert_eq!(app.form.as_ref().unwrap().session.markup(), "ab");

        app.close_editor();
        app.open_new_note();
        assert!(!app.form.as_ref().unwrap().session.history().can_undo());
    }

    #[test]
    fn test_link_prompt_and_alignment() {
        let mut app = test_app();
        app.open_new_note();
        if let Some(form) = app.form.as_mut() {
            form.field = FormField::Body;
        }
        app.open_link_prompt();
        assert_eq!(app.focus, Focus::LinkUrl);
        app.link_url = "https://ctftime.org".to_string();
        app.confirm_link();
        assert_eq!(app.focus, Focus::Editor);
        assert!(app
            .form
            .as_ref()
            .unwrap()
            .session
            .markup()
            .contains("href=\"https://ctftime.org\""));

        app.editor_cycle_alignment();
        assert!(app
            .form
            .as_ref()
            .unwrap()
            .session
            .markup()
            .contains("text-align: center"));
    }

    #[test]
    fn test_template_prefills_editor() {
        let mut app = test_app();
        app.open_templates();
        app.template_filter_step(true); // web
        app.use_selected_template();
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.title, "SQL Injection");
        assert_eq!(form.category, Category::Web);
        assert!(form.session.markup().contains("Payloads:"));
    }

    #[test]
    fn test_delete_flow_and_missing_note() {
        let mut app = test_app();
        app.repo
            .create(&NoteDraft::from_markup("gone", Category::Misc, "x"))
            .unwrap();
        app.refresh_view();
        app.request_delete();
        assert_eq!(app.focus, Focus::ConfirmDelete);
        let id = app.pending_delete.clone().unwrap();
        app.confirm_delete();
        assert!(app.visible.is_empty());

        // A second delete of the same id is a quiet no-op.
        app.pending_delete = Some(id);
        app.confirm_delete();
        assert_eq!(app.focus, Focus::List);
    }

    #[test]
    fn test_filter_and_sort_controls() {
        let mut app = test_app();
        app.repo
            .create(&NoteDraft::from_markup("w", Category::Web, "x"))
            .unwrap();
        app.repo
            .create(&NoteDraft::from_markup("c", Category::Crypto, "x"))
            .unwrap();
        app.refresh_view();
        assert_eq!(app.visible.len(), 2);

        app.next_category(); // web
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.visible[0].title, "w");
        app.prev_category(); // all
        assert_eq!(app.visible.len(), 2);

        app.enter_search();
        app.search_add_char('C');
        assert_eq!(app.visible.len(), 1);
        app.clear_search();
        assert_eq!(app.visible.len(), 2);

        app.cycle_sort();
        assert_eq!(app.sort, SortOrder::Oldest);
    }

    #[test]
    fn test_toggle_theme_persists() {
        let mut app = test_app();
        assert_eq!(app.theme_mode(), ThemeMode::Light);
        app.toggle_theme();
        assert_eq!(app.theme_mode(), ThemeMode::Dark);
        assert_eq!(
            app.repo.store().get(THEME_KEY).unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn test_import_from_pasted_text() {
        let mut source = test_app();
        source
            .repo
            .create(&NoteDraft::from_markup("pasted", Category::Reverse, "x"))
            .unwrap();
        let json = source.repo.export_all().unwrap();

        let mut app = test_app();
        app.open_import();
        app.import_pasted_text(&json);
        assert_eq!(app.focus, Focus::ImportPreview);
        assert_eq!(
            app.pending_import.as_ref().unwrap().preview.lines,
            vec!["pasted (reverse)"]
        );
        app.confirm_import();
        assert_eq!(app.visible.len(), 1);

        // A single-line paste typed into the box is read as JSON, not a path.
        let mut typed = test_app();
        typed.open_import();
        typed.import_path = json.replace('\n', "");
        typed.load_import_file();
        assert_eq!(typed.focus, Focus::ImportPreview);

        let mut bad = test_app();
        bad.open_import();
        bad.import_pasted_text("[{\"id\": 1}]");
        assert_eq!(bad.focus, Focus::ImportPath);
        assert_eq!(bad.toast.as_ref().map(|t| t.kind), Some(ToastKind::Error));
    }

    #[test]
    fn test_import_and_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app();
        app.repo
            .create(&NoteDraft::from_markup("exported", Category::Pwn, "x"))
            .unwrap();
        app.export_notes(dir.path().to_path_buf());
        let file = dir
            .path()
            .join(export_file_name(Local::now().date_naive()));
        assert!(file.exists());

        let mut other = test_app();
        other.open_import();
        other.import_path = file.display().to_string();
        other.load_import_file();
        assert_eq!(other.focus, Focus::ImportPreview);
        assert_eq!(other.pending_import.as_ref().unwrap().preview.total, 1);
        other.confirm_import();
        assert_eq!(other.visible.len(), 1);
        assert_eq!(other.visible[0].title, "exported");

        // Importing the same file again adds nothing.
        other.open_import();
        other.import_path = file.display().to_string();
        other.load_import_file();
        other.confirm_import();
        assert_eq!(other.visible.len(), 1);
        assert_eq!(other.toast.as_ref().map(|t| t.kind), Some(ToastKind::Warning));
    }
}
