//! Narrative memory: who the player has met, what they carry, and what
//! has happened so far.
//!
//! ```text
//! ┌──────────────────────────── Session ────────────────────────────┐
//! │                                                                 │
//! │  ┌───────────────┐  ┌─────────────┐  ┌────────────────────────┐ │
//! │  │ Relationships │  │ Inventory   │  │ Journal                │ │
//! │  │ (npc → state) │  │ (id → item) │  │ recent entries + digest│ │
//! │  └───────────────┘  └─────────────┘  └────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod inventory;
mod journal;
mod relationship;

pub use inventory::{
    Inventory, InventoryItem, ItemId, MAX_ITEM_DESCRIPTION_CHARS, MAX_ITEM_NAME_CHARS,
};
pub use journal::{Journal, JournalEntry, JournalError, RecentWindow, Summary};
pub use relationship::{
    Affinity, Archetype, Interaction, NpcId, NpcRelationship, Relationships, UnknownArchetype,
    AFFINITY_MAX, AFFINITY_MIN,
};

pub(crate) use journal::DEFAULT_SUMMARY_CHARS as DEFAULT_JOURNAL_SUMMARY_CHARS;
pub(crate) use relationship::DEFAULT_SUMMARY_CHARS as DEFAULT_NPC_SUMMARY_CHARS;
