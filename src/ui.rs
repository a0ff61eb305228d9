// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Drawing the notes list, editor and popups

use crate::app::{App, Focus, FormField, NoteForm, ToastKind};
use crate::history::History;
use crate::markup;
use crate::note::Note;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

/// Split `line` into spans, highlighting case-insensitive occurrences of `query`.
fn highlight_matches(line: &str, query: &str, base: Style, matched: Style) -> Line<'static> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Line::from(Span::styled(line.to_string(), base));
    }
    let chars: Vec<char> = line.chars().collect();
    let lower: Vec<char> = line.to_lowercase().chars().collect();
    let needle: Vec<char> = query.chars().collect();
    // Lowercasing can change the char count; fall back to plain text then.
    if lower.len() != chars.len() {
        return Line::from(Span::styled(line.to_string(), base));
    }

    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut i = 0;
    while i < chars.len() {
        if lower[i..].starts_with(&needle) {
            if !plain.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut plain), base));
            }
            let hit: String = chars[i..i + needle.len()].iter().collect();
            spans.push(Span::styled(hit, matched));
            i += needle.len();
        } else {
            plain.push(chars[i]);
            i += 1;
        }
    }
    if !plain.is_empty() {
        spans.push(Span::styled(plain, base));
    }
    Line::from(spans)
}

/// Center a rect within area with given size.
fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_width = area.width * percent_x / 100;
    let popup_height = area.height * percent_y / 100;
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;
    Rect {
        x: area.x + x,
        y: area.y + y,
        width: popup_width,
        height: popup_height,
    }
}

fn popup_block<'a>(app: &App, title: String) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(app.theme.border_active_style)
        .style(app.theme.background_style)
}

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    frame.render_widget(Block::default().style(app.theme.background_style), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(area);

    draw_header(frame, app, chunks[0]);
    draw_category_bar(frame, app, chunks[1]);

    match app.form.as_ref() {
        Some(form) if matches!(app.focus, Focus::Editor | Focus::LinkUrl) => {
            draw_editor(frame, app, form, chunks[2])
        }
        _ => {
            let main_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                .split(chunks[2]);
            draw_notes_list(frame, app, main_chunks[0]);
            draw_preview_pane(frame, app, main_chunks[1]);
        }
    }

    draw_footer(frame, app, chunks[3]);

    // Popups on top
    match app.focus {
        Focus::ConfirmDelete => draw_delete_popup(frame, app, area),
        Focus::Templates => draw_template_popup(frame, app, area),
        Focus::ImportPath => draw_import_path_popup(frame, app, area),
        Focus::ImportPreview => draw_import_preview_popup(frame, app, area),
        Focus::Help => draw_help_popup(frame, app, area),
        Focus::LinkUrl => draw_link_popup(frame, app, area),
        Focus::List | Focus::Search | Focus::Editor => {}
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.stats;
    let line = Line::from(vec![
        Span::styled("⚑ CTF Notes", app.theme.header_style),
        Span::styled("   Total ", app.theme.muted_style),
        Span::styled(stats.total.to_string(), app.theme.text_style),
        Span::styled("  Completed ", app.theme.muted_style),
        Span::styled(stats.completed.to_string(), app.theme.success_style),
        Span::styled("  Favorites ", app.theme.muted_style),
        Span::styled(stats.favorites.to_string(), app.theme.favorite_style),
        Span::styled(
            format!("   [{}]", app.theme_mode().as_str()),
            app.theme.muted_style,
        ),
    ]);
    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(app.theme.border_style),
    );
    frame.render_widget(header, area);
}

fn draw_category_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = crate::note::CategoryFilter::cycle()
        .into_iter()
        .map(|f| {
            let style = if f == app.filter.category {
                app.theme.selected_style
            } else {
                app.theme.muted_style
            };
            Span::styled(format!(" {} ", f.label()), style)
        })
        .collect();
    spans.push(Span::styled(
        format!("  sort: {}", app.sort.label()),
        app.theme.muted_style,
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn note_item<'a>(app: &App, note: &Note, selected: bool) -> ListItem<'a> {
    let title_style = if selected {
        app.theme.selected_style
    } else {
        app.theme.text_style
    };
    let star = if note.favorite { "★ " } else { "  " };
    let mut first = vec![Span::styled(star, app.theme.favorite_style)];
    first.extend(
        highlight_matches(
            &note.title,
            &app.filter.search,
            title_style,
            app.theme.search_match_style,
        )
        .spans,
    );

    let second = Line::from(vec![
        Span::styled("  ", app.theme.text_style),
        Span::styled(
            note.category.label().to_string(),
            app.theme.category_style(note.category),
        ),
        Span::styled(" · ", app.theme.muted_style),
        Span::styled(
            note.difficulty.as_str().to_string(),
            app.theme.difficulty_style(note.difficulty),
        ),
        Span::styled(" · ", app.theme.muted_style),
        Span::styled(
            note.status.label().to_string(),
            app.theme.status_style(note.status),
        ),
        Span::styled(
            format!("  {}", note.last_modified.format("%Y-%m-%d")),
            app.theme.muted_style,
        ),
    ]);

    let mut lines = vec![Line::from(first), second];
    if !note.tags.is_empty() {
        let tags = note
            .tags
            .iter()
            .map(|t| format!("#{}", t))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(Line::from(Span::styled(
            format!("  {}", tags),
            app.theme.muted_style,
        )));
    }
    ListItem::new(lines)
}

fn draw_notes_list(frame: &mut Frame, app: &App, area: Rect) {
    let border_style = match app.focus {
        Focus::List | Focus::Search => app.theme.border_active_style,
        _ => app.theme.border_style,
    };
    let title = format!(" Notes ({}) ", app.visible.len());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    if app.visible.is_empty() {
        let empty = Paragraph::new(format!(
            "No notes found. Press {} to create one or {} for a template.",
            app.key_hint("new_note"),
            app.key_hint("templates")
        ))
        .style(app.theme.muted_style.add_modifier(Modifier::ITALIC))
        .wrap(Wrap { trim: true })
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .visible
        .iter()
        .enumerate()
        .map(|(i, note)| note_item(app, note, i == app.selected))
        .collect();
    frame.render_widget(List::new(items).block(block), area);
}

fn draw_preview_pane(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Preview ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style);

    let Some(note) = app.selected_note() else {
        let placeholder = Paragraph::new("(Select a note to preview)")
            .style(app.theme.muted_style.add_modifier(Modifier::ITALIC))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(note.title.clone(), app.theme.header_style)),
        Line::from(Span::styled(
            format!(
                "Created {}  Modified {}",
                note.created.format("%Y-%m-%d %H:%M"),
                note.last_modified.format("%Y-%m-%d %H:%M")
            ),
            app.theme.muted_style,
        )),
        Line::from(""),
    ];
    let body = markup::plain_text(&note.content_html);
    lines.extend(body.lines().map(|l| {
        highlight_matches(
            l,
            &app.filter.search,
            app.theme.text_style,
            app.theme.search_match_style,
        )
    }));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn field_line<'a>(app: &App, form: &NoteForm, field: FormField, label: &str, value: String) -> Line<'a> {
    let label_style = if form.field == field {
        app.theme.toolbar_active_style
    } else {
        app.theme.muted_style
    };
    Line::from(vec![
        Span::styled(format!(" {:<11}", label), label_style),
        Span::styled(value, app.theme.text_style),
    ])
}

/// " undo:yes redo:no (3/50) ": snapshots held against the configured cap.
fn history_status(history: &History) -> String {
    let flag = |b: bool| if b { "yes" } else { "no" };
    format!(
        " undo:{} redo:{} ({}/{}) ",
        flag(history.can_undo()),
        flag(history.can_redo()),
        history.len(),
        history.limit()
    )
}

fn draw_editor(frame: &mut Frame, app: &App, form: &NoteForm, area: Rect) {
    let title = if form.editing_id.is_some() {
        " Edit Note "
    } else {
        " New Note "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(app.theme.border_active_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let choice = |s: &str| format!("‹ {} ›", s);
    let fields = vec![
        field_line(app, form, FormField::Title, "Title", form.title.clone()),
        field_line(
            app,
            form,
            FormField::Category,
            "Category",
            choice(form.category.label()),
        ),
        field_line(app, form, FormField::Tags, "Tags", form.tags.clone()),
        field_line(
            app,
            form,
            FormField::Difficulty,
            "Difficulty",
            choice(form.difficulty.as_str()),
        ),
        field_line(
            app,
            form,
            FormField::Status,
            "Status",
            choice(form.status.label()),
        ),
    ];
    frame.render_widget(Paragraph::new(fields), chunks[0]);

    // Toolbar reflects the formatting at the cursor.
    let state = form.selection_state();
    let toggles = [
        ("B", state.bold),
        ("I", state.italic),
        ("U", state.underline),
        ("S", state.strikethrough),
        ("</>", state.code),
    ];
    let mut toolbar: Vec<Span> = toggles
        .iter()
        .map(|(label, on)| {
            let style = if *on {
                app.theme.toolbar_active_style
            } else {
                app.theme.muted_style
            };
            Span::styled(format!(" {} ", label), style)
        })
        .collect();
    toolbar.push(Span::styled(
        format!(" align: {:?} ", state.alignment).to_lowercase(),
        app.theme.muted_style,
    ));
    toolbar.push(Span::styled(
        history_status(form.session.history()),
        app.theme.muted_style,
    ));
    frame.render_widget(Paragraph::new(Line::from(toolbar)), chunks[1]);

    let body_style = if form.field == FormField::Body {
        app.theme.border_active_style
    } else {
        app.theme.border_style
    };
    let body_block = Block::default()
        .title(" Content ")
        .borders(Borders::TOP)
        .border_style(body_style);
    let body_area = body_block.inner(chunks[2]);
    frame.render_widget(body_block, chunks[2]);
    frame.render_widget(&form.session.surface().textarea, body_area);
}

fn draw_delete_popup(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect(area, 50, 20);
    let block = popup_block(app, " Delete Note ".to_string());
    let inner = block.inner(popup_area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let title = app
        .pending_delete
        .as_deref()
        .and_then(|id| app.repo.get(id))
        .map(|n| n.title.as_str())
        .unwrap_or("this note");
    let lines = vec![
        Line::from(Span::styled(
            format!("Are you sure you want to delete \"{}\"?", title),
            app.theme.text_style,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y/Enter ", app.theme.error_style),
            Span::styled("delete", app.theme.text_style),
            Span::styled("  n/Esc ", app.theme.muted_style),
            Span::styled("cancel", app.theme.text_style),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_template_popup(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect(area, 60, 60);
    let block = popup_block(
        app,
        format!(" Templates │ {} ", app.template_filter.label()),
    );
    let inner = block.inner(popup_area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let templates = app.visible_templates();
    if templates.is_empty() {
        frame.render_widget(
            Paragraph::new("No templates for this category.").style(app.theme.muted_style),
            inner,
        );
        return;
    }

    let items: Vec<ListItem> = templates
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let style = if i == app.template_selected {
                app.theme.selected_style
            } else {
                app.theme.text_style
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(t.title, style),
                    Span::styled("  ", app.theme.text_style),
                    Span::styled(t.category.label(), app.theme.category_style(t.category)),
                ]),
                Line::from(Span::styled(
                    format!("  {}", t.description),
                    app.theme.muted_style,
                )),
            ])
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn draw_import_path_popup(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect(area, 60, 15);
    let block = popup_block(app, " Import Notes ".to_string());
    let inner = block.inner(popup_area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let content = Line::from(vec![
        Span::styled("JSON file or paste: ", app.theme.muted_style),
        Span::styled(app.import_path.as_str(), app.theme.header_style),
    ]);
    frame.render_widget(Paragraph::new(content), inner);
}

fn draw_link_popup(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect(area, 50, 15);
    let block = popup_block(app, " Insert Link ".to_string());
    let inner = block.inner(popup_area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let content = Line::from(vec![
        Span::styled("URL: ", app.theme.muted_style),
        Span::styled(app.link_url.as_str(), app.theme.header_style),
    ]);
    frame.render_widget(Paragraph::new(content), inner);
}

fn draw_import_preview_popup(frame: &mut Frame, app: &App, area: Rect) {
    let Some(pending) = app.pending_import.as_ref() else {
        return;
    };
    let popup_area = centered_rect(area, 60, 50);
    let block = popup_block(app, " Import Preview ".to_string());
    let inner = block.inner(popup_area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let preview = &pending.preview;
    let mut lines = vec![
        Line::from(Span::styled(preview.summary(), app.theme.header_style)),
        Line::from(""),
    ];
    lines.extend(
        preview
            .lines
            .iter()
            .map(|l| Line::from(Span::styled(format!("• {}", l), app.theme.text_style))),
    );
    if preview.remaining > 0 {
        lines.push(Line::from(Span::styled(
            format!("... and {} more", preview.remaining),
            app.theme.muted_style,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Enter ", app.theme.success_style),
        Span::styled("import", app.theme.text_style),
        Span::styled("  Esc ", app.theme.muted_style),
        Span::styled("cancel", app.theme.text_style),
    ]));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_help_popup(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect(area, 60, 80);
    let block = popup_block(app, " Keyboard Shortcuts ".to_string());
    let inner = block.inner(popup_area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let rows = [
        ("new_note", "New note"),
        ("templates", "New note from template"),
        ("enter", "Edit selected note"),
        ("search", "Search"),
        ("next_category", "Next category"),
        ("prev_category", "Previous category"),
        ("cycle_sort", "Change sort order"),
        ("favorite", "Toggle favorite"),
        ("delete", "Delete note"),
        ("export", "Export notes"),
        ("import", "Import notes"),
        ("toggle_theme", "Toggle light/dark"),
        ("editor_save", "Save note (editor)"),
        ("editor_next_field", "Next field (editor)"),
        ("editor_undo", "Undo (editor)"),
        ("editor_redo", "Redo (editor)"),
        ("editor_bold", "Bold"),
        ("editor_italic", "Italic"),
        ("editor_underline", "Underline"),
        ("editor_code", "Inline code"),
        ("editor_heading", "Heading"),
        ("editor_list", "Bullet list"),
        ("editor_quote", "Blockquote"),
        ("editor_code_block", "Code block"),
        ("editor_strike", "Strikethrough"),
        ("editor_numbered", "Numbered list"),
        ("editor_table", "Table"),
        ("editor_align", "Cycle alignment"),
        ("editor_link", "Insert link"),
        ("escape", "Close / cancel"),
        ("quit", "Quit"),
    ];
    let mut lines: Vec<Line> = rows
        .iter()
        .map(|(action, desc)| {
            Line::from(vec![
                Span::styled(format!("{:>12}  ", app.key_hint(action)), app.theme.header_style),
                Span::styled(*desc, app.theme.text_style),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press any key to close",
        app.theme.muted_style.add_modifier(Modifier::ITALIC),
    )));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let hint = |key: &str, label: &'static str| {
        vec![
            Span::styled(format!(" {} ", app.key_hint(key)), app.theme.muted_style),
            Span::styled(label, app.theme.header_style),
        ]
    };

    let (title, spans): (&str, Vec<Span>) = match app.focus {
        Focus::Search => (
            " Search ",
            [
                vec![
                    Span::styled("/ ", app.theme.muted_style),
                    Span::styled(app.filter.search.clone(), app.theme.header_style),
                ],
                hint("enter", "done"),
                hint("escape", "clear"),
            ]
            .concat(),
        ),
        Focus::Editor | Focus::LinkUrl => (
            " Editor ",
            [
                hint("editor_save", "save"),
                hint("editor_next_field", "next field"),
                hint("editor_undo", "undo"),
                hint("editor_redo", "redo"),
                hint("editor_bold", "bold"),
                hint("escape", "cancel"),
            ]
            .concat(),
        ),
        _ => (
            " Notes ",
            [
                hint("new_note", "new"),
                hint("templates", "template"),
                hint("search", "search"),
                hint("favorite", "favorite"),
                hint("delete", "delete"),
                hint("help", "help"),
                hint("quit", "quit"),
            ]
            .concat(),
        ),
    };

    let mut lines = vec![Line::from(spans)];
    if let Some(toast) = &app.toast {
        let style = match toast.kind {
            ToastKind::Success => app.theme.success_style,
            ToastKind::Error => app.theme.error_style,
            ToastKind::Warning => app.theme.favorite_style,
            ToastKind::Info => app.theme.text_style,
        };
        lines.push(Line::from(Span::styled(
            toast.text.clone(),
            style.add_modifier(Modifier::ITALIC),
        )));
    }

    let footer = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(app.theme.border_style),
    );
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_matches_is_case_insensitive() {
        let base = Style::default();
        let hit = Style::default().add_modifier(Modifier::BOLD);
        let line = highlight_matches("SQL injection via sql", "sql", base, hit);
        let texts: Vec<_> = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(texts, vec!["SQL", " injection via ", "sql"]);
        assert_eq!(line.spans[0].style, hit);
        assert_eq!(line.spans[1].style, base);
    }

    #[test]
    fn test_highlight_matches_empty_query() {
        let line = highlight_matches("plain", "  ", Style::default(), Style::default());
        assert_eq!(line.spans.len(), 1);
    }

    #[test]
    fn test_history_status_shows_cap() {
        let mut history = History::new(3);
        history.reset("a");
        history.push("b");
        assert_eq!(history_status(&history), " undo:yes redo:no (2/3) ");
        history.undo();
        assert_eq!(history_status(&history), " undo:no redo:yes (2/3) ");
    }

    #[test]
    fn test_centered_rect_stays_inside() {
        let area = Rect::new(0, 0, 100, 50);
        let r = centered_rect(area, 50, 20);
        assert_eq!(r, Rect::new(25, 20, 50, 10));
    }
}
