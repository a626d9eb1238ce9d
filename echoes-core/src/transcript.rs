//! The adventure log written when a game ends.

use crate::engine::RoundReport;
use crate::session::Session;

/// Rounds as they were played, for export.
///
/// Unlike the journal, nothing here is ever condensed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    rounds: Vec<(u32, String, String)>,
    epilogue: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the rounds a resumed session still holds in detail.
    ///
    /// Rounds already condensed into the journal summary are not recovered.
    pub fn resumed(session: &Session) -> Self {
        Self {
            rounds: session
                .journal
                .entries()
                .iter()
                .map(|e| (e.round, e.narrative.clone(), e.choice.clone()))
                .collect(),
            epilogue: None,
        }
    }

    /// Record a completed round; cancelled rounds carry no narrative and
    /// are skipped.
    pub fn record(&mut self, report: &RoundReport) {
        if report.narrative.is_empty() {
            return;
        }
        self.rounds.push((
            report.round,
            report.narrative.clone(),
            report.player_choice.clone(),
        ));
    }

    pub fn set_epilogue(&mut self, text: impl Into<String>) {
        self.epilogue = Some(text.into());
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn render(&self, session: &Session) -> String {
        let character = &session.character;
        let mut out = format!("=== ADVENTURE LOG: {} ===\n\n", character.name());
        out.push_str(&character.describe());
        out.push_str("\n\n");
        out.push_str(session.premise.trim());
        out.push_str("\n\n=== THE JOURNEY ===\n\n");

        for (round, narrative, action) in &self.rounds {
            out.push_str(&format!("--- Round {round} ---\n\n{}\n\n", narrative.trim()));
            if !action.is_empty() {
                out.push_str(&format!("Your action: {action}\n\n"));
            }
        }

        if let Some(epilogue) = &self.epilogue {
            out.push_str("=== EPILOGUE ===\n\n");
            out.push_str(epilogue.trim());
            out.push('\n');
        }
        out
    }

    /// File name for the log, e.g. `rosa_vance_1700000000.txt`.
    pub fn file_name(session: &Session, unix_secs: u64) -> String {
        let name: String = session
            .character
            .name()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{name}_{unix_secs}.txt")
    }
}
