// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - A keyboard-driven notebook for CTF write-ups

mod app;
mod cli;
mod config;
mod editor;
mod error;
mod history;
mod markup;
mod note;
mod repository;
mod samples;
mod storage;
mod surface;
mod templates;
mod theme;
mod transfer;
mod ui;

use anyhow::{Context, Result};
use app::{App, Focus, Store};
use clap::Parser;
use config::{key_matches, Config};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use editor::{FormatCommand, InlineStyle, StructuredBlock};
use env_logger::{Env, Target};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use repository::NoteRepository;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use storage::{FileStore, MemoryStore};

#[derive(Parser, Debug)]
#[command(name = "ctfnotes")]
#[command(version)]
#[command(about = "A keyboard-driven notebook for CTF write-ups")]
struct CliArgs {
    /// Config file (default: ~/.config/ctfnotes/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep notes in memory only; nothing is read from or written to disk
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<cli::Command>,
}

fn open_store(config: &Config, ephemeral: bool) -> Result<Store> {
    if ephemeral {
        return Ok(Box::new(MemoryStore::new()));
    }
    let dir = config.data_dir();
    let store = FileStore::open(dir.clone())
        .with_context(|| format!("Failed to open data directory: {}", dir.display()))?;
    log::info!("Notes stored in {}", store.dir().display());
    Ok(Box::new(store))
}

/// CLI runs log to stderr; the TUI owns the terminal, so it logs to a file.
/// `RUST_LOG` overrides the default level either way.
fn init_logging(config: &Config, tui: bool, ephemeral: bool) -> Result<()> {
    let default_level = if tui { "info" } else { "warn" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    if tui && ephemeral {
        builder.filter_level(log::LevelFilter::Off);
    } else if tui {
        let dir = config.data_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        let path = dir.join("ctfnotes.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let poll_timeout = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;
        app.tick_toast();

        if !event::poll(poll_timeout)? {
            continue;
        }
        let key = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(Event::Paste(text)) => {
                match app.focus {
                    Focus::ImportPath => app.import_pasted_text(&text),
                    Focus::Search => text
                        .chars()
                        .filter(|c| !c.is_control())
                        .for_each(|c| app.search_add_char(c)),
                    Focus::LinkUrl => app.link_url.push_str(text.trim()),
                    _ => {}
                }
                continue;
            }
            _ => continue,
        };

        let k = app.resolved_keys.clone();

        match app.focus {
            Focus::Help => app.dismiss_help(),
            Focus::Search => {
                if key_matches(key, &[k.escape]) {
                    app.clear_search();
                } else if key_matches(key, &[k.enter]) {
                    app.exit_search();
                } else if key_matches(key, &[k.backspace]) {
                    app.search_backspace();
                } else if key_matches(key, &[k.move_up_alt]) {
                    app.move_selection_up();
                } else if key_matches(key, &[k.move_down_alt]) {
                    app.move_selection_down();
                } else if let KeyCode::Char(c) = key.code {
                    app.search_add_char(c);
                }
            }
            Focus::ConfirmDelete => {
                if key_matches(key, &[k.enter]) || key.code == KeyCode::Char('y') {
                    app.confirm_delete();
                } else if key_matches(key, &[k.escape]) || key.code == KeyCode::Char('n') {
                    app.cancel_delete();
                }
            }
            Focus::Templates => {
                if key_matches(key, &[k.escape]) {
                    app.focus = Focus::List;
                } else if key_matches(key, &[k.enter]) {
                    app.use_selected_template();
                } else if key_matches(key, &[k.move_up, k.move_up_alt]) {
                    app.template_move_up();
                } else if key_matches(key, &[k.move_down, k.move_down_alt]) {
                    app.template_move_down();
                } else if key_matches(key, &[k.next_category]) || key.code == KeyCode::Right {
                    app.template_filter_step(true);
                } else if key_matches(key, &[k.prev_category]) || key.code == KeyCode::Left {
                    app.template_filter_step(false);
                }
            }
            Focus::ImportPath => {
                if key_matches(key, &[k.escape]) {
                    app.cancel_import();
                } else if key_matches(key, &[k.enter]) {
                    app.load_import_file();
                } else if key_matches(key, &[k.backspace]) {
                    app.import_path.pop();
                } else if let KeyCode::Char(c) = key.code {
                    app.import_path.push(c);
                }
            }
            Focus::LinkUrl => {
                if key_matches(key, &[k.escape]) {
                    app.cancel_link();
                } else if key_matches(key, &[k.enter]) {
                    app.confirm_link();
                } else if key_matches(key, &[k.backspace]) {
                    app.link_url.pop();
                } else if let KeyCode::Char(c) = key.code {
                    app.link_url.push(c);
                }
            }
            Focus::ImportPreview => {
                if key_matches(key, &[k.enter]) {
                    app.confirm_import();
                } else if key_matches(key, &[k.escape]) {
                    app.cancel_import();
                }
            }
            Focus::Editor => {
                let command = if key_matches(key, &[k.editor_bold]) {
                    Some(FormatCommand::Inline(InlineStyle::Bold))
                } else if key_matches(key, &[k.editor_italic]) {
                    Some(FormatCommand::Inline(InlineStyle::Italic))
                } else if key_matches(key, &[k.editor_underline]) {
                    Some(FormatCommand::Inline(InlineStyle::Underline))
                } else if key_matches(key, &[k.editor_code]) {
                    Some(FormatCommand::Inline(InlineStyle::Code))
                } else if key_matches(key, &[k.editor_heading]) {
                    Some(FormatCommand::Block(StructuredBlock::Heading(2)))
                } else if key_matches(key, &[k.editor_list]) {
                    Some(FormatCommand::Block(StructuredBlock::BulletList))
                } else if key_matches(key, &[k.editor_quote]) {
                    Some(FormatCommand::Block(StructuredBlock::Blockquote))
                } else if key_matches(key, &[k.editor_code_block]) {
                    Some(FormatCommand::Block(StructuredBlock::CodeBlock))
                } else if key_matches(key, &[k.editor_strike]) {
                    Some(FormatCommand::Inline(InlineStyle::Strikethrough))
                } else if key_matches(key, &[k.editor_numbered]) {
                    Some(FormatCommand::Block(StructuredBlock::NumberedList))
                } else if key_matches(key, &[k.editor_table]) {
                    Some(FormatCommand::Block(StructuredBlock::Table { rows: 2, cols: 2 }))
                } else {
                    None
                };

                if let Some(command) = command {
                    app.editor_format(command);
                } else if key_matches(key, &[k.editor_align]) {
                    app.editor_cycle_alignment();
                } else if key_matches(key, &[k.editor_link]) {
                    app.open_link_prompt();
                } else if key_matches(key, &[k.editor_save]) {
                    app.save_editor();
                } else if key_matches(key, &[k.escape]) {
                    app.close_editor();
                } else if key_matches(key, &[k.editor_next_field]) {
                    app.editor_next_field();
                } else if key_matches(key, &[k.editor_undo]) {
                    app.editor_undo();
                } else if key_matches(key, &[k.editor_redo]) {
                    app.editor_redo();
                } else {
                    app.editor_input(key);
                }
            }
            Focus::List => {
                if key_matches(key, &[k.quit]) {
                    return Ok(());
                } else if key_matches(key, &[k.search]) {
                    app.enter_search();
                } else if key_matches(key, &[k.new_note]) {
                    app.open_new_note();
                } else if key_matches(key, &[k.templates]) {
                    app.open_templates();
                } else if key_matches(key, &[k.enter]) {
                    app.open_selected_note();
                } else if key_matches(key, &[k.delete]) {
                    app.request_delete();
                } else if key_matches(key, &[k.favorite]) {
                    app.toggle_favorite_selected();
                } else if key_matches(key, &[k.cycle_sort]) {
                    app.cycle_sort();
                } else if key_matches(key, &[k.next_category]) {
                    app.next_category();
                } else if key_matches(key, &[k.prev_category]) {
                    app.prev_category();
                } else if key_matches(key, &[k.export]) {
                    let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                    app.export_notes(dir);
                } else if key_matches(key, &[k.import]) {
                    app.open_import();
                } else if key_matches(key, &[k.toggle_theme]) {
                    app.toggle_theme();
                } else if key_matches(key, &[k.help]) {
                    app.show_help();
                } else if key_matches(key, &[k.move_up, k.move_up_alt]) {
                    app.move_selection_up();
                } else if key_matches(key, &[k.move_down, k.move_down_alt]) {
                    app.move_selection_down();
                } else if key_matches(key, &[k.escape]) && !app.filter.search.is_empty() {
                    app.clear_search();
                }
            }
        }
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = config::load_config(args.config)?;
    init_logging(&config, args.command.is_none(), args.ephemeral)?;

    let store = open_store(&config, args.ephemeral)?;

    if let Some(command) = args.command {
        let mut repo = NoteRepository::open(store);
        if config.seed_sample_notes {
            repo.seed_samples_if_fresh();
        }
        return cli::run(command, &mut repo, config.ui.default_sort);
    }

    let mut app = App::new(config, store)?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    log::info!("Started with {} notes", app.repo.len());
    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
    terminal.show_cursor()?;

    result
}
