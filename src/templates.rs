// SPDX-License-Identifier: GPL-3.0-or-later
// ctfnotes - Write-up templates for new notes

use crate::markup;
use crate::note::{Category, CategoryFilter, NoteDraft};

/// Reusable note skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub title: &'static str,
    pub category: Category,
    pub description: &'static str,
    /// Plain-text body; placeholders are in brackets.
    pub content: &'static str,
}

const CATALOG: &[Template] = &[
    Template {
        id: "web-sql-injection",
        title: "SQL Injection",
        category: Category::Web,
        description: "Template for SQL injection challenges",
        content: "Challenge: [Describe the challenge]\n\nTools Used:\n- [List tools]\n\nPayloads:\n- [List payloads]\n\nSolution:\n[Explain the solution]\n\nLessons Learned:\n[Key takeaways]",
    },
    Template {
        id: "crypto-caesar",
        title: "Caesar Cipher",
        category: Category::Crypto,
        description: "Template for substitution cipher challenges",
        content: "Challenge: [Describe the challenge]\n\nCipher Type: [Caesar, ROT13, etc.]\n\nKey: [Shift value if known]\n\nTools Used:\n- [List tools]\n\nSolution:\n[Explain the solution]\n\nCode:\n[Any code used]",
    },
    Template {
        id: "forensics-memory",
        title: "Memory Analysis",
        category: Category::Forensics,
        description: "Template for memory dump analysis",
        content: "Challenge: [Describe the challenge]\n\nFile Type: [Memory dump format]\n\nTools Used:\n- Volatility\n- [Other tools]\n\nCommands:\n- imageinfo\n- pslist\n- [Other commands]\n\nFindings:\n[What you discovered]",
    },
    Template {
        id: "reverse-crackme",
        title: "Crackme",
        category: Category::Reverse,
        description: "Template for binary reversing challenges",
        content: "Challenge: [Describe the challenge]\n\nBinary: [Architecture, stripped?, protections]\n\nTools Used:\n- Ghidra\n- [Other tools]\n\nKey Functions:\n- [Address - purpose]\n\nSolution:\n[How the check was bypassed or the key derived]",
    },
    Template {
        id: "pwn-buffer-overflow",
        title: "Buffer Overflow",
        category: Category::Pwn,
        description: "Template for stack overflow exploitation",
        content: "Challenge: [Describe the challenge]\n\nProtections: [NX, PIE, canary, RELRO]\n\nOffset: [Bytes to return address]\n\nExploit:\n[Payload layout]\n\nFlag:\n[flag{...}]",
    },
    Template {
        id: "misc-osint",
        title: "OSINT / Misc",
        category: Category::Misc,
        description: "Template for puzzles and open-source intelligence",
        content: "Challenge: [Describe the challenge]\n\nLeads:\n- [Sources checked]\n\nDead Ends:\n- [What did not work]\n\nSolution:\n[Explain the solution]",
    },
];

impl Template {
    /// Every template in catalog order.
    pub fn all() -> &'static [Template] {
        CATALOG
    }

    /// Templates for one category, or all of them, in catalog order.
    pub fn list(filter: CategoryFilter) -> Vec<&'static Template> {
        CATALOG.iter().filter(|t| filter.matches(t.category)).collect()
    }

    pub fn get(id: &str) -> Option<&'static Template> {
        CATALOG.iter().find(|t| t.id == id)
    }

    /// Editor draft pre-filled from this template.
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft::from_markup(self.title, self.category, &markup::from_plain_text(self.content))
    }
}
