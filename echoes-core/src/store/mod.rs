//! State store boundary.
//!
//! Stores keep a session as five logical tables keyed by session id:
//! sessions, characters, npc_relationships, inventory_items and
//! journal_entries. [`SessionRecord`] is one session's rows across those
//! tables; converting it back into a [`Session`] re-runs validation so a
//! damaged store can never hand the engine a broken session.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::character::Character;
use crate::memory::{
    Inventory, InventoryItem, Journal, JournalEntry, NpcRelationship, Relationships, Summary,
};
use crate::session::{EndReason, Session, SessionId, SessionStatus, StoryLength, ValidationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from state store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed persistence for sessions.
///
/// The engine owns its store exclusively for the duration of a round, so
/// writes take `&mut self`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch one session's rows.
    async fn get(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Replace one session's rows in a single write.
    async fn put(&mut self, record: SessionRecord) -> Result<(), StoreError>;

    /// Detailed journal entries for a session, oldest first.
    async fn journal(&self, id: SessionId) -> Result<Vec<JournalEntry>, StoreError>;

    /// NPC relationships for a session, in first-met order.
    async fn relationships(&self, id: SessionId) -> Result<Vec<NpcRelationship>, StoreError>;

    /// Inventory items for a session.
    async fn inventory(&self, id: SessionId) -> Result<Vec<InventoryItem>, StoreError>;

    /// Every stored session id.
    async fn list(&self) -> Result<Vec<SessionId>, StoreError>;
}

/// Row of the `sessions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: SessionId,
    pub story_length: StoryLength,
    pub round: u32,
    pub status: SessionStatus,
    pub end_reason: Option<EndReason>,
    pub premise: String,
    pub choices: Vec<String>,
    pub next_item_id: u32,
    pub npc_summary_chars: usize,
    pub journal_last_round: u32,
    pub summary: Summary,
}

/// All rows belonging to one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: SessionRow,
    pub character: Character,
    pub npc_relationships: Vec<NpcRelationship>,
    pub inventory_items: Vec<InventoryItem>,
    pub journal_entries: Vec<JournalEntry>,
}

impl SessionRecord {
    pub fn id(&self) -> SessionId {
        self.session.id
    }
}

impl From<&Session> for SessionRecord {
    fn from(s: &Session) -> Self {
        Self {
            session: SessionRow {
                id: s.id,
                story_length: s.story_length,
                round: s.round,
                status: s.status,
                end_reason: s.end_reason,
                premise: s.premise.clone(),
                choices: s.choices.clone(),
                next_item_id: s.inventory.next_id(),
                npc_summary_chars: s.relationships.summary_chars(),
                journal_last_round: s.journal.last_round(),
                summary: s.journal.summary().clone(),
            },
            character: s.character.clone(),
            npc_relationships: s.relationships.iter().cloned().collect(),
            inventory_items: s.inventory.items().to_vec(),
            journal_entries: s.journal.entries().to_vec(),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ValidationError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        let row = record.session;
        let session = Session {
            id: row.id,
            character: record.character,
            story_length: row.story_length,
            round: row.round,
            status: row.status,
            end_reason: row.end_reason,
            premise: row.premise,
            relationships: Relationships::from_parts(
                record.npc_relationships,
                row.npc_summary_chars,
            ),
            inventory: Inventory::from_parts(record.inventory_items, row.next_item_id),
            journal: Journal::from_parts(
                record.journal_entries,
                row.journal_last_round,
                row.summary,
            ),
            choices: row.choices,
        };
        session.validate()?;
        Ok(session)
    }
}
