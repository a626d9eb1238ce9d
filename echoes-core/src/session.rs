//! The session: one player's persistent playthrough.
//!
//! A `Session` is a plain value. Every engine operation takes it
//! explicitly, so there is no hidden "current game" anywhere in the
//! process and the whole state can be cloned, compared and persisted.

use crate::character::{Character, CharacterConfig};
use crate::memory::{
    Inventory, ItemId, Journal, NpcId, Relationships, DEFAULT_JOURNAL_SUMMARY_CHARS,
    DEFAULT_NPC_SUMMARY_CHARS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Number of choices the narrator offers each round.
pub const CHOICES_PER_ROUND: usize = 3;

/// Structural problems with a character or session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("character name is required")]
    EmptyName,

    #[error("character name is longer than {max} characters")]
    NameTooLong { max: usize },

    #[error("expected 1 to {max} traits, got {got}")]
    TraitCount { max: usize, got: usize },

    #[error("trait {0} chosen more than once")]
    DuplicateTrait(&'static str),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unknown {field}: {value:?}")]
    UnknownValue { field: &'static str, value: String },

    #[error("round {round} is past the story limit of {limit}")]
    RoundBeyondLimit { round: u32, limit: u32 },

    #[error("status {status} does not fit round {round}")]
    StatusMismatch { status: SessionStatus, round: u32 },

    #[error("journal round {round} is out of order or ahead of round {current}")]
    JournalOrder { round: u32, current: u32 },

    #[error("inventory id {0} is not unique")]
    DuplicateItem(ItemId),

    #[error("inventory id {id} was never issued (next id {next})")]
    UnissuedItem { id: ItemId, next: u32 },

    #[error("npc {0} appears more than once")]
    DuplicateNpc(NpcId),

    #[error("npc {0} was last seen after the current round")]
    NpcFromFuture(NpcId),

    #[error("more than three choices on offer")]
    TooManyChoices,

    #[error("malformed session data: {0}")]
    Malformed(String),
}

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::UnknownValue {
                field: "session id",
                value: s.to_string(),
            })
    }
}

/// How many rounds the story runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl StoryLength {
    pub fn round_limit(&self) -> u32 {
        match self {
            StoryLength::Short => 3,
            StoryLength::Medium => 10,
            StoryLength::Long => 20,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoryLength::Short => "Short",
            StoryLength::Medium => "Medium",
            StoryLength::Long => "Long",
        }
    }

    pub fn all() -> &'static [StoryLength] {
        &[StoryLength::Short, StoryLength::Medium, StoryLength::Long]
    }
}

impl FromStr for StoryLength {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(StoryLength::Short),
            "medium" => Ok(StoryLength::Medium),
            "long" => Ok(StoryLength::Long),
            _ => Err(ValidationError::UnknownValue {
                field: "story length",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Character creation pending.
    Setup,
    /// Rounds are being played.
    Active,
    /// Terminal; read-only.
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Setup => "setup",
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// The story-length limit was reached.
    RoundLimit,
    /// The player quit.
    PlayerQuit,
    /// The narrator closed the story.
    Epilogue,
    /// The player quit while a round was in flight.
    Cancelled,
}

impl EndReason {
    pub fn describe(&self) -> &'static str {
        match self {
            EndReason::RoundLimit => "the story reached its final round",
            EndReason::PlayerQuit => "the player ended the adventure",
            EndReason::Epilogue => "the narrator brought the story to a close",
            EndReason::Cancelled => "the adventure was abandoned mid-round",
        }
    }
}

/// Everything needed to start a new session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Character choices from character creation.
    pub character: CharacterConfig,

    /// How long the story runs.
    pub story_length: StoryLength,

    /// Story premise; the built-in wasteland premise when unset.
    pub premise: Option<String>,
}

impl SessionConfig {
    pub fn new(character: CharacterConfig) -> Self {
        Self {
            character,
            story_length: StoryLength::default(),
            premise: None,
        }
    }

    pub fn with_story_length(mut self, length: StoryLength) -> Self {
        self.story_length = length;
        self
    }

    pub fn with_premise(mut self, premise: impl Into<String>) -> Self {
        self.premise = Some(premise.into());
        self
    }
}

/// One player's playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub character: Character,
    pub story_length: StoryLength,
    /// Completed rounds; starts at 0.
    pub round: u32,
    pub status: SessionStatus,
    pub end_reason: Option<EndReason>,
    /// Static premise fixed at creation.
    pub premise: String,
    pub relationships: Relationships,
    pub inventory: Inventory,
    pub journal: Journal,
    /// Choices offered at the end of the last round.
    pub choices: Vec<String>,
}

impl Session {
    /// A new session in `Setup`, before the first round.
    pub fn new(
        character: Character,
        story_length: StoryLength,
        premise: impl Into<String>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            character,
            story_length,
            round: 0,
            status: SessionStatus::Setup,
            end_reason: None,
            premise: premise.into(),
            relationships: Relationships::new().with_summary_chars(DEFAULT_NPC_SUMMARY_CHARS),
            inventory: Inventory::new(),
            journal: Journal::with_summary_chars(DEFAULT_JOURNAL_SUMMARY_CHARS),
            choices: Vec::new(),
        }
    }

    /// Replace the summary bounds of a session that has no history yet.
    pub fn with_memory_bounds(
        mut self,
        npc_summary_chars: usize,
        journal_summary_chars: usize,
    ) -> Self {
        self.relationships = Relationships::new().with_summary_chars(npc_summary_chars);
        self.journal = Journal::with_summary_chars(journal_summary_chars);
        self
    }

    pub fn round_limit(&self) -> u32 {
        self.story_length.round_limit()
    }

    pub fn rounds_remaining(&self) -> u32 {
        self.round_limit().saturating_sub(self.round)
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    /// Setup → Active. Has no effect in any other state.
    pub fn activate(&mut self) -> bool {
        if self.status != SessionStatus::Setup {
            return false;
        }
        self.status = SessionStatus::Active;
        self.round = 0;
        true
    }

    /// Move to `Ended`. The first reason recorded wins.
    pub fn end(&mut self, reason: EndReason) {
        if self.status != SessionStatus::Ended {
            self.status = SessionStatus::Ended;
            self.end_reason = Some(reason);
        }
    }

    /// Check every structural invariant of the session.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.character.validate()?;

        let limit = self.round_limit();
        if self.round > limit {
            return Err(ValidationError::RoundBeyondLimit {
                round: self.round,
                limit,
            });
        }
        let status_fits = match self.status {
            SessionStatus::Setup => self.round == 0,
            SessionStatus::Active => self.round < limit,
            SessionStatus::Ended => true,
        };
        if !status_fits {
            return Err(ValidationError::StatusMismatch {
                status: self.status,
                round: self.round,
            });
        }

        let mut previous = self.journal.summary().through_round();
        for entry in self.journal.entries() {
            if entry.round <= previous || entry.round > self.journal.last_round() {
                return Err(ValidationError::JournalOrder {
                    round: entry.round,
                    current: self.round,
                });
            }
            previous = entry.round;
        }
        if self.journal.last_round() > self.round {
            return Err(ValidationError::JournalOrder {
                round: self.journal.last_round(),
                current: self.round,
            });
        }

        let mut ids = HashSet::new();
        for item in self.inventory.items() {
            if !ids.insert(item.id) {
                return Err(ValidationError::DuplicateItem(item.id));
            }
            if item.id.0 >= self.inventory.next_id() {
                return Err(ValidationError::UnissuedItem {
                    id: item.id,
                    next: self.inventory.next_id(),
                });
            }
        }

        let mut npcs = HashSet::new();
        for npc in self.relationships.iter() {
            if !npcs.insert(&npc.id) {
                return Err(ValidationError::DuplicateNpc(npc.id.clone()));
            }
            if npc.last_interaction_round > self.round {
                return Err(ValidationError::NpcFromFuture(npc.id.clone()));
            }
        }

        if self.choices.len() > CHOICES_PER_ROUND {
            return Err(ValidationError::TooManyChoices);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Background, Trait};
    use crate::memory::{Interaction, JournalEntry};

    fn character() -> Character {
        CharacterConfig::new()
            .name("Rosa")
            .background(Background::Cardiologist)
            .with_trait(Trait::Brave)
            .build()
            .unwrap()
    }

    fn active(length: StoryLength) -> Session {
        let mut session = Session::new(character(), length, "The rivers are gone.");
        session.activate();
        session
    }

    #[test]
    fn test_story_length_limits() {
        assert_eq!(StoryLength::Short.round_limit(), 3);
        assert_eq!(StoryLength::Medium.round_limit(), 10);
        assert_eq!(StoryLength::Long.round_limit(), 20);
        assert_eq!("LONG".parse::<StoryLength>().unwrap(), StoryLength::Long);
        assert!("epic".parse::<StoryLength>().is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut session = Session::new(character(), StoryLength::Short, "premise");
        assert_eq!(session.status, SessionStatus::Setup);
        assert!(session.activate());
        assert!(session.is_active());
        assert!(!session.activate());

        session.end(EndReason::PlayerQuit);
        session.end(EndReason::RoundLimit);
        assert!(session.is_ended());
        assert_eq!(session.end_reason, Some(EndReason::PlayerQuit));
    }

    #[test]
    fn test_valid_session_passes() {
        let mut session = active(StoryLength::Medium);
        session.round = 2;
        session.journal.append(JournalEntry::new(1, "a", "b")).unwrap();
        session.journal.append(JournalEntry::new(2, "c", "d")).unwrap();
        session.inventory.add("Flare", "", 1);
        session
            .relationships
            .apply_interaction(&Interaction::new("Mara"), 2);
        assert_eq!(session.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_round_past_limit() {
        let mut session = active(StoryLength::Short);
        session.round = 4;
        assert!(matches!(
            session.validate(),
            Err(ValidationError::RoundBeyondLimit { round: 4, limit: 3 })
        ));
    }

    #[test]
    fn test_rejects_active_at_limit() {
        let mut session = active(StoryLength::Short);
        session.round = 3;
        assert!(matches!(
            session.validate(),
            Err(ValidationError::StatusMismatch { .. })
        ));
        session.end(EndReason::RoundLimit);
        assert_eq!(session.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_journal_ahead_of_round() {
        let mut session = active(StoryLength::Medium);
        session.journal.append(JournalEntry::new(1, "a", "")).unwrap();
        assert!(matches!(
            session.validate(),
            Err(ValidationError::JournalOrder { .. })
        ));
    }

    #[test]
    fn test_rejects_too_many_choices() {
        let mut session = active(StoryLength::Medium);
        session.choices = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert_eq!(session.validate(), Err(ValidationError::TooManyChoices));
    }

    #[test]
    fn test_unknown_enum_is_rejected_by_serde() {
        let session = active(StoryLength::Short);
        let json = serde_json::to_string(&session)
            .unwrap()
            .replace("\"Short\"", "\"Epic\"");
        assert!(serde_json::from_str::<Session>(&json).is_err());
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
