//! Narrative memory and context engine for an AI-narrated survival story.
//!
//! This crate provides:
//! - The session model: character, NPC relationships, inventory and journal
//! - A context synthesizer that keeps every prompt within a fixed budget
//! - A round state machine with atomic, validated commits
//! - In-memory and JSON-file state stores
//! - A Claude-backed generator and a scripted one for tests
//!
//! # Quick Start
//!
//! ```ignore
//! use echoes_core::{
//!     Background, CharacterConfig, ClaudeGenerator, EngineConfig, JsonFileStore,
//!     SessionConfig, StoryEngine, StoryLength, Trait,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default().with_env_overrides()?;
//!     let generator = ClaudeGenerator::from_env(&config)?;
//!     let store = JsonFileStore::open("saves").await?;
//!     let mut engine = StoryEngine::new(generator, store, config);
//!
//!     let character = CharacterConfig::new()
//!         .name("Rosa")
//!         .background(Background::BeetFarmer)
//!         .with_trait(Trait::Resourceful);
//!     let mut session = engine
//!         .begin(SessionConfig::new(character).with_story_length(StoryLength::Short))
//!         .await?;
//!
//!     let report = engine.play_round(&mut session, "I climb the water tower").await?;
//!     println!("{}", report.narrative);
//!     Ok(())
//! }
//! ```

pub mod character;
pub mod commands;
pub mod config;
pub mod context;
pub mod engine;
pub mod generation;
pub mod memory;
pub mod persist;
pub mod session;
pub mod store;
pub mod template;
pub mod testing;
pub mod transcript;

// Primary public API
pub use character::{Background, Character, CharacterConfig, Gender, Trait, TraitPolarity};
pub use commands::{Command, HELP_TEXT};
pub use config::{ConfigError, EngineConfig, TemplateOverrides};
pub use context::{ContextPayload, ContextSynthesizer};
pub use engine::{EngineError, RoundReport, StoryEngine};
pub use generation::{
    ClaudeGenerator, GenerationError, GenerationRequest, Generator, ParseError, RoundOutcome,
};
pub use memory::{Affinity, Archetype, Interaction, InventoryItem, JournalEntry, NpcId};
pub use persist::{PersistError, SessionRepository};
pub use session::{
    EndReason, Session, SessionConfig, SessionId, SessionStatus, StoryLength, ValidationError,
};
pub use store::{JsonFileStore, MemoryStore, StateStore, StoreError};
pub use template::{PromptTemplate, Templates, DEFAULT_PREMISE};
pub use testing::{ReplyBuilder, ScriptedGenerator, TestHarness};
pub use transcript::Transcript;
