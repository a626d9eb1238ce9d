//! One JSON document per session on disk.

use super::{SessionRecord, SessionRow, StateStore, StoreError};
use crate::character::Character;
use crate::memory::{InventoryItem, JournalEntry, NpcRelationship};
use crate::session::SessionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Current save file version.
const SAVE_VERSION: u32 = 1;

/// On-disk layout; each table is its own section.
#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    version: u32,
    saved_at: String,
    sessions: SessionRow,
    characters: Character,
    npc_relationships: Vec<NpcRelationship>,
    inventory_items: Vec<InventoryItem>,
    journal_entries: Vec<JournalEntry>,
}

impl From<SavedSession> for SessionRecord {
    fn from(saved: SavedSession) -> Self {
        Self {
            session: saved.sessions,
            character: saved.characters,
            npc_relationships: saved.npc_relationships,
            inventory_items: saved.inventory_items,
            journal_entries: saved.journal_entries,
        }
    }
}

/// A state store writing `<dir>/<session-id>.json`.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `id`.
    pub fn path_for(&self, id: SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: SessionId) -> Result<Option<SavedSession>, StoreError> {
        let path = self.path_for(id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Check the version before committing to the full layout.
        #[derive(Deserialize)]
        struct Partial {
            version: u32,
        }
        let partial: Partial = serde_json::from_str(&content)?;
        if partial.version != SAVE_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.read(id).await?.map(SessionRecord::from))
    }

    async fn put(&mut self, record: SessionRecord) -> Result<(), StoreError> {
        let path = self.path_for(record.id());
        let saved = SavedSession {
            version: SAVE_VERSION,
            saved_at: unix_now(),
            sessions: record.session,
            characters: record.character,
            npc_relationships: record.npc_relationships,
            inventory_items: record.inventory_items,
            journal_entries: record.journal_entries,
        };
        let content = serde_json::to_string_pretty(&saved)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        tracing::debug!(path = %path.display(), "session written");
        Ok(())
    }

    async fn journal(&self, id: SessionId) -> Result<Vec<JournalEntry>, StoreError> {
        Ok(self
            .read(id)
            .await?
            .map(|s| s.journal_entries)
            .unwrap_or_default())
    }

    async fn relationships(&self, id: SessionId) -> Result<Vec<NpcRelationship>, StoreError> {
        Ok(self
            .read(id)
            .await?
            .map(|s| s.npc_relationships)
            .unwrap_or_default())
    }

    async fn inventory(&self, id: SessionId) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(self
            .read(id)
            .await?
            .map(|s| s.inventory_items)
            .unwrap_or_default())
    }

    async fn list(&self) -> Result<Vec<SessionId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<SessionId>().ok())
                {
                    ids.push(id);
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

/// Seconds since the Unix epoch, as text.
fn unix_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs().to_string()
}
