// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Rich-text editing session: formatting capability and undo/redo wiring

use crate::history::History;
use crate::markup;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(strong|b|em|i|u|s|strike|code)(?:\s[^>]*)?>").unwrap()
});
static CLOSE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(strong|b|em|i|u|s|strike|code)\s*>").unwrap());
static ALIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)text-align:\s*(left|center|right)").unwrap());

/// Inline formatting applied around the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Link(String),
}

impl InlineStyle {
    fn tags(&self) -> (String, String) {
        match self {
            InlineStyle::Bold => ("<strong>".into(), "</strong>".into()),
            InlineStyle::Italic => ("<em>".into(), "</em>".into()),
            InlineStyle::Underline => ("<u>".into(), "</u>".into()),
            InlineStyle::Strikethrough => ("<s>".into(), "</s>".into()),
            InlineStyle::Code => ("<code>".into(), "</code>".into()),
            InlineStyle::Link(url) => (
                format!("<a href=\"{}\">", markup::escape(url.trim())),
                "</a>".into(),
            ),
        }
    }

    /// Wrap already-marked-up text. An empty link keeps the URL as its text.
    pub fn wrap(&self, inner: &str) -> String {
        let (open, close) = self.tags();
        let inner = match self {
            InlineStyle::Link(url) if inner.is_empty() => markup::escape(url.trim()),
            _ => inner.to_string(),
        };
        format!("{}{}{}", open, inner, close)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    fn css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// Block-level structure inserted at the cursor, wrapping any selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredBlock {
    Align(Alignment),
    BulletList,
    NumberedList,
    /// Level 1 to 3.
    Heading(u8),
    Blockquote,
    CodeBlock,
    Table { rows: usize, cols: usize },
}

impl StructuredBlock {
    pub fn render(&self, selected: &str) -> String {
        match self {
            StructuredBlock::Align(a) => {
                format!("<div style=\"text-align: {}\">{}</div>", a.css(), selected)
            }
            StructuredBlock::BulletList => format!("<ul>{}</ul>", list_items(selected)),
            StructuredBlock::NumberedList => format!("<ol>{}</ol>", list_items(selected)),
            StructuredBlock::Heading(level) => {
                let level = (*level).clamp(1, 3);
                format!("<h{0}>{1}</h{0}>", level, selected)
            }
            StructuredBlock::Blockquote => format!("<blockquote>{}</blockquote>", selected),
            StructuredBlock::CodeBlock => format!("<pre><code>{}</code></pre>", selected),
            StructuredBlock::Table { rows, cols } => {
                let rows = (*rows).max(1);
                let cols = (*cols).max(1);
                let cell = "<td>&nbsp;</td>".repeat(cols);
                let body = format!("<tr>{}</tr>", cell).repeat(rows);
                format!("<table><tbody>{}</tbody></table>", body)
            }
        }
    }
}

fn list_items(selected: &str) -> String {
    let items: Vec<&str> = selected
        .lines()
        .flat_map(|l| l.split("<br>"))
        .filter(|l| !l.trim().is_empty())
        .collect();
    if items.is_empty() {
        return "<li></li>".to_string();
    }
    items.iter().map(|i| format!("<li>{}</li>", i.trim())).collect()
}

/// A user-level formatting intent as dispatched by the toolbar or a shortcut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Inline(InlineStyle),
    Block(StructuredBlock),
}

/// Formatting active at the cursor, used to highlight toolbar buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub alignment: Alignment,
}

impl SelectionState {
    /// Work out which tags are still open at the end of `prefix`.
    pub fn at_end_of(prefix: &str) -> Self {
        let mut depth: HashMap<String, i64> = HashMap::new();
        for c in OPEN_TAG_RE.captures_iter(prefix) {
            *depth.entry(c[1].to_lowercase()).or_default() += 1;
        }
        for c in CLOSE_TAG_RE.captures_iter(prefix) {
            *depth.entry(c[1].to_lowercase()).or_default() -= 1;
        }
        let open = |names: &[&str]| names.iter().any(|n| depth.get(*n).is_some_and(|d| *d > 0));

        let alignment = ALIGN_RE
            .captures_iter(prefix)
            .last()
            .and_then(|c| c.get(1))
            .map(|m| match m.as_str().to_lowercase().as_str() {
                "center" => Alignment::Center,
                "right" => Alignment::Right,
                _ => Alignment::Left,
            })
            .unwrap_or_default();

        Self {
            bold: open(&["strong", "b"]),
            italic: open(&["em", "i"]),
            underline: open(&["u"]),
            strikethrough: open(&["s", "strike"]),
            code: open(&["code"]),
            alignment,
        }
    }
}

/// Editable rich-text surface provided by the host UI.
/// The core never edits markup itself; it asks the surface and snapshots the result.
pub trait RichTextSurface {
    fn apply_inline_style(&mut self, style: &InlineStyle);
    fn insert_structured_block(&mut self, block: &StructuredBlock);
    fn query_selection_state(&self) -> SelectionState;
    /// Serialized document state.
    fn snapshot(&self) -> String;
    /// Replace the document with a snapshot.
    fn restore(&mut self, snapshot: &str);
}

/// One open document: the host surface plus its undo history.
pub struct EditorSession<S: RichTextSurface> {
    surface: S,
    history: History,
}

impl<S: RichTextSurface> EditorSession<S> {
    pub fn new(surface: S, history_limit: usize) -> Self {
        let mut session = Self {
            surface,
            history: History::new(history_limit),
        };
        let initial = session.surface.snapshot();
        session.history.reset(&initial);
        session
    }

    /// Load a document and drop the previous document's history.
    pub fn open(&mut self, markup: &str) {
        self.surface.restore(markup);
        self.history.reset(&self.surface.snapshot());
    }

    /// Snapshot after the host applied an edit. False if nothing changed.
    pub fn record_change(&mut self) -> bool {
        self.history.push(&self.surface.snapshot())
    }

    pub fn format(&mut self, command: &FormatCommand) {
        match command {
            FormatCommand::Inline(style) => self.surface.apply_inline_style(style),
            FormatCommand::Block(block) => self.surface.insert_structured_block(block),
        }
        self.record_change();
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo().map(str::to_string) {
            Some(snapshot) => {
                self.surface.restore(&snapshot);
                true
            }
            None => {
                log::debug!("Nothing to undo");
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo().map(str::to_string) {
            Some(snapshot) => {
                self.surface.restore(&snapshot);
                true
            }
            None => {
                log::debug!("Nothing to redo");
                false
            }
        }
    }

    pub fn selection_state(&self) -> SelectionState {
        self.surface.query_selection_state()
    }

    pub fn markup(&self) -> String {
        self.surface.snapshot()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Markup string with a byte-range selection.
    #[derive(Default)]
    struct FakeSurface {
        text: String,
        selection: Option<(usize, usize)>,
    }

    impl FakeSurface {
        fn type_text(&mut self, s: &str) {
            self.text.push_str(s);
            self.selection = None;
        }

        fn replace_selection(&mut self, f: impl FnOnce(&str) -> String) {
            let (start, end) = self.selection.unwrap_or((self.text.len(), self.text.len()));
            let replaced = f(&self.text[start..end]);
            self.text.replace_range(start..end, &replaced);
            self.selection = None;
        }
    }

    impl RichTextSurface for FakeSurface {
        fn apply_inline_style(&mut self, style: &InlineStyle) {
            self.replace_selection(|s| style.wrap(s));
        }

        fn insert_structured_block(&mut self, block: &StructuredBlock) {
            self.replace_selection(|s| block.render(s));
        }

        fn query_selection_state(&self) -> SelectionState {
            SelectionState::at_end_of(&self.text)
        }

        fn snapshot(&self) -> String {
            self.text.clone()
        }

        fn restore(&mut self, snapshot: &str) {
            self.text = snapshot.to_string();
            self.selection = None;
        }
    }

    #[test]
    fn test_format_selection_and_undo() {
        let mut session = EditorSession::new(FakeSurface::default(), 50);
        session.surface_mut().type_text("flag here");
        session.record_change();

        session.surface_mut().selection = Some((0, 4));
        session.format(&FormatCommand::Inline(InlineStyle::Bold));
        assert_eq!(session.markup(), "<strong>flag</strong> here");

        assert!(session.undo());
        assert_eq!(session.markup(), "flag here");
        assert!(session.undo());
        assert_eq!(session.markup(), "");
        assert!(!session.undo());

        assert!(session.redo());
        assert!(session.redo());
        assert_eq!(session.markup(), "<strong>flag</strong> here");
        assert!(!session.redo());
    }

    #[test]
    fn test_open_resets_history_between_documents() {
        let mut session = EditorSession::new(FakeSurface::default(), 50);
        session.surface_mut().type_text("note one edits");
        session.record_change();

        session.open("<p>note two</p>");
        assert_eq!(session.history().len(), 1);
        assert!(!session.undo());
        assert_eq!(session.markup(), "<p>note two</p>");
    }

    #[test]
    fn test_record_change_ignores_unchanged_document() {
        let mut session = EditorSession::new(FakeSurface::default(), 50);
        session.surface_mut().type_text("a");
        assert!(session.record_change());
        assert!(!session.record_change());
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_blocks_render() {
        assert_eq!(
            StructuredBlock::BulletList.render("one<br>two"),
            "<ul><li>one</li><li>two</li></ul>"
        );
        assert_eq!(StructuredBlock::Heading(7).render("T"), "<h3>T</h3>");
        assert_eq!(
            StructuredBlock::Table { rows: 1, cols: 2 }.render(""),
            "<table><tbody><tr><td>&nbsp;</td><td>&nbsp;</td></tr></tbody></table>"
        );
        assert_eq!(
            InlineStyle::Link("https://ctftime.org".into()).wrap(""),
            "<a href=\"https://ctftime.org\">https://ctftime.org</a>"
        );
    }

    #[test]
    fn test_selection_state_tracks_open_tags() {
        let state = SelectionState::at_end_of("<p><strong>bold <em>both");
        assert!(state.bold);
        assert!(state.italic);
        assert!(!state.underline);

        let state = SelectionState::at_end_of("<strong>x</strong> <s>y");
        assert!(!state.bold);
        assert!(state.strikethrough);

        let state = SelectionState::at_end_of("<div style=\"text-align: center\">t");
        assert_eq!(state.alignment, Alignment::Center);
    }

    #[test]
    fn test_selection_state_ignores_lookalike_tags() {
        // <br>, <span> and <section> share a first letter with tracked tags.
        let prefix = "<b>x</b><br><span>y</span><section><i>z";
        for _ in 0..3 {
            let state = SelectionState::at_end_of(prefix);
            assert!(!state.bold);
            assert!(!state.strikethrough);
            assert!(state.italic);
        }
        assert_eq!(
            SelectionState::at_end_of("<STRONG>loud"),
            SelectionState {
                bold: true,
                ..Default::default()
            }
        );
    }
}
