// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Sample write-ups seeded on first run

use crate::markup;
use crate::note::{Category, Difficulty, Note, Status};
use chrono::{DateTime, Duration, Utc};

struct Sample {
    id: &'static str,
    title: &'static str,
    category: Category,
    tags: &'static [&'static str],
    content_html: &'static str,
    difficulty: Difficulty,
    status: Status,
    favorite: bool,
    days_ago: i64,
}

const SAMPLES: &[Sample] = &[
    Sample {
        id: "sample1",
        title: "SQL Injection Example",
        category: Category::Web,
        tags: &["sql", "injection", "web", "example"],
        content_html: "<h3>SQL Injection Challenge</h3><p><strong>Challenge:</strong> Basic SQL injection using <code>UNION SELECT</code>.</p><p><em>Key Points:</em></p><ul><li>Always escape user input</li><li>Use parameterized queries</li><li>Test with <code>' OR 1=1--</code></li></ul><p><strong>Solution:</strong> Use <code>UNION SELECT</code> to extract data from other tables.</p>",
        difficulty: Difficulty::Medium,
        status: Status::Completed,
        favorite: false,
        days_ago: 1,
    },
    Sample {
        id: "sample2",
        title: "Caesar Cipher Decoder",
        category: Category::Crypto,
        tags: &["caesar", "cipher", "substitution", "classic"],
        content_html: "<h3>Caesar Cipher Analysis</h3><p><strong>Method:</strong> Shift each letter by a fixed number of positions.</p><p><em>Common Shifts:</em></p><ul><li>Shift 3: Classic Caesar</li><li>Shift 13: ROT13</li><li>Shift 25: Reverse alphabet</li></ul><p><strong>Tools:</strong> Use frequency analysis to verify the correct shift.</p><pre><code>def caesar_decrypt(text, shift):\n    result = \"\"\n    for char in text:\n        if char.isalpha():\n            result += chr((ord(char) - shift - 65) % 26 + 65)\n        else:\n            result += char\n    return result</code></pre>",
        difficulty: Difficulty::Easy,
        status: Status::Completed,
        favorite: true,
        days_ago: 2,
    },
    Sample {
        id: "sample3",
        title: "Memory Dump Analysis",
        category: Category::Forensics,
        tags: &["memory", "dump", "volatility", "ram"],
        content_html: "<h3>Memory Dump Forensics</h3><p><strong>Tool:</strong> Volatility Framework</p><p><em>Common Commands:</em></p><ol><li><code>imageinfo</code> - Get OS information</li><li><code>pslist</code> - List running processes</li><li><code>cmdline</code> - Show command line arguments</li><li><code>filescan</code> - Scan for files in memory</li></ol><p><strong>Workflow:</strong></p><blockquote>Start with imageinfo to identify the OS profile, then use pslist to see running processes, and finally examine suspicious processes with cmdline.</blockquote>",
        difficulty: Difficulty::Hard,
        status: Status::InProgress,
        favorite: false,
        days_ago: 3,
    },
];

/// The starter notes, newest first, dated relative to `now`.
pub fn sample_notes(now: DateTime<Utc>) -> Vec<Note> {
    SAMPLES
        .iter()
        .map(|s| {
            let at = now - Duration::days(s.days_ago);
            Note {
                id: s.id.to_string(),
                title: s.title.to_string(),
                category: s.category,
                tags: s.tags.iter().map(|t| t.to_string()).collect(),
                content: markup::plain_text(s.content_html),
                content_html: s.content_html.to_string(),
                difficulty: s.difficulty,
                status: s.status,
                favorite: s.favorite,
                created: at,
                last_modified: at,
            }
        })
        .collect()
}
