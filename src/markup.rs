// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Plain-text extraction and previews for rich-text note bodies

use regex::Regex;
use std::sync::LazyLock;

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|blockquote|pre|tr|ul|ol|table)\s*>").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Characters shown in a note card preview before truncation.
pub const PREVIEW_CHARS: usize = 200;

/// Extract the readable text of a markup body.
/// Block-level closers and `<br>` become line breaks, every other tag is
/// dropped and the common entities are decoded.
pub fn plain_text(markup: &str) -> String {
    if !markup.contains('<') && !markup.contains('&') {
        return markup.to_string();
    }

    let with_breaks = BREAK_RE.replace_all(markup, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);

    let mut lines: Vec<&str> = decoded.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Escape text for inclusion in markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turn plain text (e.g. a template skeleton) into markup, one line per `<br>`.
pub fn from_plain_text(text: &str) -> String {
    text.lines().map(escape).collect::<Vec<_>>().join("<br>")
}

/// Single-paragraph preview for note cards, cut at `max_chars` with an ellipsis.
pub fn preview(markup: &str, max_chars: usize) -> String {
    let text = plain_text(markup);
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_inline_tags() {
        let html = "<p><strong>Challenge:</strong> use <code>UNION SELECT</code>.</p>";
        assert_eq!(plain_text(html), "Challenge: use UNION SELECT.");
    }

    #[test]
    fn test_plain_text_breaks_blocks() {
        let html = "<h3>Title</h3><ul><li>one</li><li>two</li></ul>";
        assert_eq!(plain_text(html), "Title\none\ntwo");
    }

    #[test]
    fn test_plain_text_decodes_entities() {
        assert_eq!(plain_text("a &lt;b&gt; &amp;&amp; c"), "a <b> && c");
        assert_eq!(plain_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_plain_text_passthrough() {
        assert_eq!(plain_text("just text"), "just text");
    }

    #[test]
    fn test_from_plain_text_escapes_and_joins() {
        assert_eq!(from_plain_text("a<b\nc"), "a&lt;b<br>c");
        assert_eq!(plain_text(&from_plain_text("x & y\nz")), "x & y\nz");
    }

    #[test]
    fn test_preview_truncates() {
        let body = "word ".repeat(100);
        let p = preview(&body, 20);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 23);
        assert_eq!(preview("<p>short</p>", 20), "short");
    }
}
