// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Non-interactive subcommands

use crate::app::Store;
use crate::markup::{self, PREVIEW_CHARS};
use crate::note::{Category, CategoryFilter, Difficulty, Note, NoteDraft, Status};
use crate::repository::{NoteFilter, NoteRepository, SortOrder};
use crate::templates::Template;
use crate::transfer::{export_file_name, parse_import};
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Subcommand;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List notes, newest first by default
    List {
        /// Category to show, or "all"
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,
        /// Case-insensitive text to match in title, content or tags
        #[arg(short, long)]
        search: Option<String>,
        /// newest, oldest, title or category
        #[arg(long)]
        sort: Option<SortOrder>,
    },
    /// Print one note
    Show { id: String },
    /// Create a note
    New {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "misc")]
        category: Category,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,
        #[arg(long, default_value = "not-started")]
        status: Status,
        /// Plain-text body
        #[arg(long, conflicts_with = "template")]
        content: Option<String>,
        /// Start from a template id (see `templates`)
        #[arg(long)]
        template: Option<String>,
    },
    /// Delete a note by id
    Delete { id: String },
    /// Toggle a note's favorite flag
    Favorite { id: String },
    /// Write all notes as JSON
    Export {
        /// Output file; defaults to ctf-notes-<date>.json in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge notes from a JSON export
    Import {
        /// JSON file, or "-" to read pasted text from stdin
        file: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List write-up templates
    Templates {
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,
    },
    /// Show note counts
    Stats,
}

pub fn run(command: Command, repo: &mut NoteRepository<Store>, default_sort: SortOrder) -> Result<()> {
    match command {
        Command::List {
            category,
            search,
            sort,
        } => {
            let filter = NoteFilter {
                category,
                search: search.unwrap_or_default(),
            };
            let notes = repo.list(&filter, sort.unwrap_or(default_sort));
            if notes.is_empty() {
                println!("No notes found.");
            }
            for note in &notes {
                print_summary(note);
            }
        }
        Command::Show { id } => {
            let note = repo
                .get(&id)
                .with_context(|| format!("No note with id {}", id))?;
            print_note(note);
        }
        Command::New {
            title,
            category,
            tags,
            difficulty,
            status,
            content,
            template,
        } => {
            let mut draft = match template {
                Some(tid) => {
                    let t = Template::get(&tid)
                        .with_context(|| format!("Unknown template: {}", tid))?;
                    t.to_draft()
                }
                None => NoteDraft::from_markup(
                    "",
                    category,
                    &markup::from_plain_text(&content.unwrap_or_default()),
                ),
            };
            draft.title = title;
            draft.category = Some(category);
            let draft = draft.with_tags(&tags).with_meta(difficulty, status);
            let note = repo.create(&draft)?;
            warn_if_unsaved(repo);
            println!("Created {}", note.id);
        }
        Command::Delete { id } => match repo.delete(&id) {
            Ok(()) => {
                warn_if_unsaved(repo);
                println!("Deleted {}", id);
            }
            Err(e) if e.is_not_found() => {
                log::warn!("Note {} no longer exists, nothing to delete", id);
                println!("{} is already deleted", id);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Favorite { id } => {
            let note = repo.toggle_favorite(&id)?;
            warn_if_unsaved(repo);
            println!(
                "{} {}",
                if note.favorite { "Favorited" } else { "Unfavorited" },
                note.title
            );
        }
        Command::Export { output } => {
            let path =
                output.unwrap_or_else(|| PathBuf::from(export_file_name(Local::now().date_naive())));
            let json = repo.export_all()?;
            fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Exported {} notes to {}", repo.len(), path.display());
            println!("Exported {} notes to {}", repo.len(), path.display());
        }
        Command::Import { file, yes } => {
            let text = read_import_text(&file, io::stdin().lock())?;
            let pending = parse_import(&text).context("Invalid JSON file")?;
            println!("{}", pending.preview.summary());
            for line in &pending.preview.lines {
                println!("  - {}", line);
            }
            if pending.preview.remaining > 0 {
                println!("  ... and {} more", pending.preview.remaining);
            }
            if !yes && !confirm("Import these notes?")? {
                println!("Import cancelled.");
                return Ok(());
            }
            let outcome = repo.import_merge(pending.notes);
            warn_if_unsaved(repo);
            if outcome.imported_count > 0 {
                println!(
                    "Imported {} new notes ({} skipped)",
                    outcome.imported_count, outcome.skipped_count
                );
            } else {
                println!("No new notes to import!");
            }
        }
        Command::Templates { category } => {
            for t in Template::list(category) {
                println!("{:<22} {:<10} {}", t.id, t.category.label(), t.description);
            }
        }
        Command::Stats => {
            let stats = repo.stats();
            println!("Total:     {}", stats.total);
            println!("Completed: {}", stats.completed);
            println!("Favorites: {}", stats.favorites);
        }
    }
    Ok(())
}

/// Read the import payload from `file`, or from `stdin` when `file` is "-".
fn read_import_text(file: &Path, mut stdin: impl Read) -> Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .context("Failed to read notes from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn warn_if_unsaved(repo: &mut NoteRepository<Store>) {
    if let Some(e) = repo.take_persist_warning() {
        eprintln!("warning: change kept in memory only: {}", e);
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer)? == 0 {
        bail!("No answer on stdin; pass --yes to import without asking");
    }
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_summary(note: &Note) {
    let star = if note.favorite { "★" } else { " " };
    println!(
        "{} {}  {}  [{}] {} / {}  {}",
        star,
        note.id,
        note.title,
        note.category.label(),
        note.difficulty.as_str(),
        note.status.label(),
        note.last_modified.format("%Y-%m-%d")
    );
    let snippet = markup::preview(&note.content_html, PREVIEW_CHARS).replace('\n', " ");
    if !snippet.is_empty() {
        println!("    {}", snippet);
    }
}

fn print_note(note: &Note) {
    println!("{}", note.title);
    println!("id:         {}", note.id);
    println!("category:   {}", note.category.label());
    println!("difficulty: {}", note.difficulty.as_str());
    println!("status:     {}", note.status.label());
    println!("favorite:   {}", note.favorite);
    if !note.tags.is_empty() {
        println!("tags:       {}", note.tags.join(", "));
    }
    println!("created:    {}", note.created.to_rfc3339());
    println!("modified:   {}", note.last_modified.to_rfc3339());
    println!();
    println!("{}", note.content);
}
