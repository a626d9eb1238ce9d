//! Loading, creating and saving sessions through a [`StateStore`].

use crate::session::{Session, SessionConfig, SessionId, ValidationError};
use crate::store::{SessionRecord, StateStore, StoreError};
use crate::template::DEFAULT_PREMISE;
use thiserror::Error;

/// Errors from the session repository.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("invalid session: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Memory bounds applied to newly created sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBounds {
    pub npc_summary_chars: usize,
    pub journal_summary_chars: usize,
}

/// The entity-model boundary: every session that enters or leaves the
/// engine passes structural validation here.
#[derive(Debug)]
pub struct SessionRepository<S> {
    store: S,
}

impl<S: StateStore> SessionRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Load and validate a stored session.
    pub async fn load(&self, id: SessionId) -> Result<Session, PersistError> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or(PersistError::NotFound(id))?;
        Ok(Session::try_from(record)?)
    }

    /// Build a new session in `Setup` from character-creation choices.
    ///
    /// Nothing is written; the engine persists the session once it is
    /// activated.
    pub fn create(
        &self,
        config: SessionConfig,
        bounds: MemoryBounds,
    ) -> Result<Session, PersistError> {
        let character = config.character.build()?;
        let premise = config
            .premise
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PREMISE.trim().to_string());
        let session = Session::new(character, config.story_length, premise)
            .with_memory_bounds(bounds.npc_summary_chars, bounds.journal_summary_chars);
        session.validate()?;
        Ok(session)
    }

    /// Validate and write a session.
    pub async fn persist(&mut self, session: &Session) -> Result<(), PersistError> {
        session.validate()?;
        self.store.put(SessionRecord::from(session)).await?;
        Ok(())
    }

    /// Ids of every stored session.
    pub async fn list(&self) -> Result<Vec<SessionId>, PersistError> {
        Ok(self.store.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Background, CharacterConfig, Trait};
    use crate::session::{SessionStatus, StoryLength};
    use crate::store::MemoryStore;

    fn bounds() -> MemoryBounds {
        MemoryBounds {
            npc_summary_chars: 100,
            journal_summary_chars: 500,
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new(
            CharacterConfig::new()
                .name("  Wren  ")
                .background(Background::EscapeRoomDesigner)
                .with_trait(Trait::Cunning),
        )
        .with_story_length(StoryLength::Short)
    }

    #[tokio::test]
    async fn test_create_persist_load() {
        let mut repo = SessionRepository::new(MemoryStore::new());
        let session = repo.create(config(), bounds()).unwrap();

        assert_eq!(session.status, SessionStatus::Setup);
        assert_eq!(session.character.name(), "Wren");
        assert_eq!(session.premise, DEFAULT_PREMISE.trim());
        assert_eq!(session.relationships.summary_chars(), 100);
        assert!(repo.store().is_empty());

        repo.persist(&session).await.unwrap();
        let loaded = repo.load(session.id).await.unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_character() {
        let repo = SessionRepository::new(MemoryStore::new());
        let bad = SessionConfig::new(CharacterConfig::new().name("Wren"));
        assert!(matches!(
            repo.create(bad, bounds()),
            Err(PersistError::Validation(ValidationError::MissingField(
                "background"
            )))
        ));
    }

    #[tokio::test]
    async fn test_load_missing() {
        let repo = SessionRepository::new(MemoryStore::new());
        let id = SessionId::new();
        assert!(matches!(repo.load(id).await, Err(PersistError::NotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn test_load_rejects_damaged_rows() {
        let mut repo = SessionRepository::new(MemoryStore::new());
        let mut session = repo.create(config(), bounds()).unwrap();
        session.activate();
        repo.persist(&session).await.unwrap();

        let mut record = repo.store().get(session.id).await.unwrap().unwrap();
        record.session.round = 9;
        repo.store_mut().insert_raw(record);

        assert!(matches!(
            repo.load(session.id).await,
            Err(PersistError::Validation(ValidationError::RoundBeyondLimit { .. }))
        ));
    }
}
