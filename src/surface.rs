// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - tui-textarea as the editable rich-text surface

use crate::editor::{InlineStyle, RichTextSurface, SelectionState, StructuredBlock};
use ratatui::style::{Modifier, Style};
use tui_textarea::{CursorMove, TextArea};

/// Markup body edited as raw text. The textarea's own undo is disabled;
/// undo/redo goes through `EditorSession`.
pub struct MarkupArea {
    pub textarea: TextArea<'static>,
}

impl MarkupArea {
    pub fn new(markup: &str) -> Self {
        Self {
            textarea: Self::build(markup, String::new()),
        }
    }

    /// Fresh textarea holding `markup` with the cursor at the end.
    fn build(markup: &str, yank: String) -> TextArea<'static> {
        let mut textarea = TextArea::new(markup.split('\n').map(str::to_string).collect());
        textarea.set_max_histories(0);
        textarea.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        textarea.set_cursor_line_style(Style::default());
        textarea.set_yank_text(yank);
        textarea.move_cursor(CursorMove::Bottom);
        textarea.move_cursor(CursorMove::End);
        textarea
    }

    /// Remove the selection (if any) and return its text. The yank buffer is left alone.
    fn take_selection(&mut self) -> String {
        if self.textarea.selection_range().is_none() {
            return String::new();
        }
        let yank = self.textarea.yank_text();
        let taken = if self.textarea.cut() {
            self.textarea.yank_text()
        } else {
            String::new()
        };
        self.textarea.set_yank_text(yank);
        taken
    }

    fn text_before_cursor(&self) -> String {
        let (row, col) = self.textarea.cursor();
        let lines = self.textarea.lines();
        let mut prefix: Vec<String> = lines.iter().take(row).cloned().collect();
        if let Some(line) = lines.get(row) {
            prefix.push(line.chars().take(col).collect());
        }
        prefix.join("\n")
    }
}

impl RichTextSurface for MarkupArea {
    fn apply_inline_style(&mut self, style: &InlineStyle) {
        let selected = self.take_selection();
        self.textarea.insert_str(style.wrap(&selected));
    }

    fn insert_structured_block(&mut self, block: &StructuredBlock) {
        let selected = self.take_selection();
        self.textarea.insert_str(block.render(&selected));
    }

    fn query_selection_state(&self) -> SelectionState {
        SelectionState::at_end_of(&self.text_before_cursor())
    }

    fn snapshot(&self) -> String {
        self.textarea.lines().join("\n")
    }

    fn restore(&mut self, snapshot: &str) {
        let yank = self.textarea.yank_text();
        self.textarea = Self::build(snapshot, yank);
    }
}
