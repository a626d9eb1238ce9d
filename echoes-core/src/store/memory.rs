//! In-memory state store.

use super::{SessionRecord, SessionRow, StateStore, StoreError};
use crate::character::Character;
use crate::memory::{InventoryItem, JournalEntry, NpcRelationship};
use crate::session::SessionId;
use async_trait::async_trait;
use std::collections::HashMap;

/// A state store that keeps its tables in memory.
///
/// Failures can be scheduled with [`MemoryStore::fail_next_puts`] and
/// [`MemoryStore::fail_next_gets`] to exercise the engine's recovery paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    sessions: HashMap<SessionId, SessionRow>,
    characters: HashMap<SessionId, Character>,
    npc_relationships: HashMap<SessionId, Vec<NpcRelationship>>,
    inventory_items: HashMap<SessionId, Vec<InventoryItem>>,
    journal_entries: HashMap<SessionId, Vec<JournalEntry>>,
    failing_puts: u32,
    failing_gets: u32,
    puts: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` writes fail as if the store were down.
    pub fn fail_next_puts(&mut self, n: u32) {
        self.failing_puts = n;
    }

    /// Make whole-session reads fail until reset with `0`.
    pub fn fail_next_gets(&mut self, n: u32) {
        self.failing_gets = n;
    }

    /// Number of successful writes so far.
    pub fn put_count(&self) -> u32 {
        self.puts
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Overwrite stored rows directly, skipping the engine.
    pub fn insert_raw(&mut self, record: SessionRecord) {
        let id = record.id();
        self.sessions.insert(id, record.session);
        self.characters.insert(id, record.character);
        self.npc_relationships.insert(id, record.npc_relationships);
        self.inventory_items.insert(id, record.inventory_items);
        self.journal_entries.insert(id, record.journal_entries);
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        if self.failing_gets > 0 {
            return Err(StoreError::Unavailable("scheduled read failure".to_string()));
        }
        let Some(row) = self.sessions.get(&id) else {
            return Ok(None);
        };
        let character = self
            .characters
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::Unavailable(format!("character row missing for {id}")))?;

        Ok(Some(SessionRecord {
            session: row.clone(),
            character,
            npc_relationships: self.npc_relationships.get(&id).cloned().unwrap_or_default(),
            inventory_items: self.inventory_items.get(&id).cloned().unwrap_or_default(),
            journal_entries: self.journal_entries.get(&id).cloned().unwrap_or_default(),
        }))
    }

    async fn put(&mut self, record: SessionRecord) -> Result<(), StoreError> {
        if self.failing_puts > 0 {
            self.failing_puts -= 1;
            return Err(StoreError::Unavailable("scheduled write failure".to_string()));
        }
        self.insert_raw(record);
        self.puts += 1;
        Ok(())
    }

    async fn journal(&self, id: SessionId) -> Result<Vec<JournalEntry>, StoreError> {
        Ok(self.journal_entries.get(&id).cloned().unwrap_or_default())
    }

    async fn relationships(&self, id: SessionId) -> Result<Vec<NpcRelationship>, StoreError> {
        Ok(self.npc_relationships.get(&id).cloned().unwrap_or_default())
    }

    async fn inventory(&self, id: SessionId) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(self.inventory_items.get(&id).cloned().unwrap_or_default())
    }

    async fn list(&self) -> Result<Vec<SessionId>, StoreError> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
