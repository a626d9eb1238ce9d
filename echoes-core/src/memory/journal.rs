//! Append-only journal of rounds with a rolling summary.
//!
//! Recent rounds are kept verbatim. Older rounds are condensed into one
//! digest line each and their detailed text is dropped, which keeps the
//! context sent to the narrator bounded no matter how long the game runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest narrative excerpt in a digest line, in characters.
const DIGEST_EXCERPT_CHARS: usize = 160;

/// Longest recorded choice in a digest line, in characters.
const DIGEST_CHOICE_CHARS: usize = 160;

/// Default bound on the rendered summary, in characters.
pub const DEFAULT_SUMMARY_CHARS: usize = 1200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JournalError {
    #[error("round {round} cannot follow round {last_round}")]
    OutOfOrder { round: u32, last_round: u32 },
}

/// One completed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub round: u32,
    pub narrative: String,
    pub choice: String,
}

impl JournalEntry {
    pub fn new(round: u32, narrative: impl Into<String>, choice: impl Into<String>) -> Self {
        Self {
            round,
            narrative: narrative.into(),
            choice: choice.into(),
        }
    }

    /// Condensed one-line form used in the rolling summary.
    pub fn digest(&self) -> String {
        let excerpt = cut_chars(first_sentence(&self.narrative), DIGEST_EXCERPT_CHARS);
        let mut line = format!("Round {}: {}", self.round, excerpt.trim());
        let choice = self.choice.trim();
        if !choice.is_empty() {
            let choice = cut_chars(choice, DIGEST_CHOICE_CHARS);
            line.push_str(&format!(" (chose: {})", choice.trim_end()));
        }
        line
    }
}

/// The first `max` characters of `text`.
fn cut_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            match chars.peek() {
                None => return text,
                Some((_, next)) if next.is_whitespace() => return &text[..idx + c.len_utf8()],
                _ => {}
            }
        }
    }
    text
}

/// Rolling digest of every round older than the recent window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    lines: Vec<String>,
    /// Rounds whose digest line was itself dropped to respect the bound.
    folded_rounds: u32,
    /// Highest round condensed so far; 0 when nothing has been condensed.
    through_round: u32,
    max_chars: usize,
}

impl Default for Summary {
    fn default() -> Self {
        Self::with_max_chars(DEFAULT_SUMMARY_CHARS)
    }
}

impl Summary {
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self {
            lines: Vec::new(),
            folded_rounds: 0,
            through_round: 0,
            max_chars: max_chars.max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.folded_rounds == 0
    }

    pub fn through_round(&self) -> u32 {
        self.through_round
    }

    fn push(&mut self, entry: &JournalEntry) {
        self.lines.push(entry.digest());
        self.through_round = self.through_round.max(entry.round);
        while self.lines.len() > 1 && self.rendered_chars() > self.max_chars {
            self.lines.remove(0);
            self.folded_rounds += 1;
        }
        let excess = self.rendered_chars().saturating_sub(self.max_chars);
        if excess > 0 {
            if let Some(last) = self.lines.last_mut() {
                let keep = last.chars().count().saturating_sub(excess);
                let cut = cut_chars(last, keep).to_string();
                *last = cut;
            }
        }
    }

    fn rendered_chars(&self) -> usize {
        self.render_full().chars().count()
    }

    /// The summary as prompt text, at most `max_chars` characters; empty
    /// when nothing has been condensed.
    pub fn render(&self) -> String {
        let full = self.render_full();
        cut_chars(&full, self.max_chars).to_string()
    }

    fn render_full(&self) -> String {
        let mut out = String::new();
        if self.folded_rounds > 0 {
            out.push_str(&format!(
                "({} earlier rounds condensed)",
                self.folded_rounds
            ));
        }
        for line in &self.lines {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
        }
        out
    }
}

/// The session's journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    last_round: u32,
    summary: Summary,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary_chars(max_chars: usize) -> Self {
        Self {
            summary: Summary::with_max_chars(max_chars),
            ..Self::default()
        }
    }

    pub(crate) fn from_parts(
        entries: Vec<JournalEntry>,
        last_round: u32,
        summary: Summary,
    ) -> Self {
        Self {
            entries,
            last_round,
            summary,
        }
    }

    /// Append a round. Rounds must strictly increase.
    pub fn append(&mut self, entry: JournalEntry) -> Result<(), JournalError> {
        if entry.round <= self.last_round {
            return Err(JournalError::OutOfOrder {
                round: entry.round,
                last_round: self.last_round,
            });
        }
        self.last_round = entry.round;
        self.entries.push(entry);
        Ok(())
    }

    /// Highest round ever appended, including condensed ones.
    pub fn last_round(&self) -> u32 {
        self.last_round
    }

    /// Rounds still held in full detail, oldest first.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// The last `n` detailed entries in chronological order.
    pub fn recent_window(&self, n: usize) -> RecentWindow<'_> {
        let start = self.entries.len().saturating_sub(n);
        RecentWindow {
            entries: &self.entries[start..],
        }
    }

    /// Condense every detailed entry with `round < older_than` into the
    /// summary and drop its detailed text.
    pub fn summarize(&mut self, older_than: u32) -> &Summary {
        let keep_from = self
            .entries
            .iter()
            .position(|e| e.round >= older_than)
            .unwrap_or(self.entries.len());
        let condensed: Vec<JournalEntry> = self.entries.drain(..keep_from).collect();
        for entry in &condensed {
            self.summary.push(entry);
        }
        &self.summary
    }

    /// Text for the `journal` command.
    pub fn review(&self) -> String {
        if self.entries.is_empty() && self.summary.is_empty() {
            return "No events recorded yet.".to_string();
        }
        let mut out = String::from("=== JOURNAL ===\n");
        if !self.summary.is_empty() {
            out.push_str("\n-- Earlier --\n");
            out.push_str(&self.summary.render());
            out.push('\n');
        }
        for entry in &self.entries {
            out.push_str(&format!("\nRound {}:\n{}\n", entry.round, entry.narrative.trim()));
            if !entry.choice.is_empty() {
                out.push_str(&format!("Your action: {}\n", entry.choice));
            }
        }
        out
    }
}

/// A borrowed, restartable view of the newest journal entries.
///
/// Iterating never copies entries; iterate again to start over.
#[derive(Debug, Clone, Copy)]
pub struct RecentWindow<'a> {
    entries: &'a [JournalEntry],
}

impl<'a> RecentWindow<'a> {
    pub fn iter(&self) -> std::slice::Iter<'a, JournalEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for RecentWindow<'a> {
    type Item = &'a JournalEntry;
    type IntoIter = std::slice::Iter<'a, JournalEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
