//! Testing utilities for the story engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedGenerator` for deterministic replies without API calls
//! - `ReplyBuilder` for writing replies in the narrator's section format
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying session state

use crate::character::{Background, CharacterConfig, Trait};
use crate::config::EngineConfig;
use crate::engine::{EngineError, RoundReport, StoryEngine};
use crate::generation::{GenerationError, GenerationRequest, Generator};
use crate::session::{Session, SessionConfig, StoryLength};
use crate::store::{MemoryStore, SessionRecord, StateStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One scripted generation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Return this text.
    Reply(String),
    /// Fail with a service error.
    Fail { message: String, transient: bool },
    /// Never answer; the engine's timeout or a cancellation must step in.
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Scripted>,
    requests: Vec<GenerationRequest>,
}

/// A generator that plays back scripted results in order.
///
/// Clones share one script, so a test can keep a handle after moving the
/// generator into an engine.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    script: Arc<Mutex<Script>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply.
    pub fn push_reply(&self, text: impl Into<String>) -> &Self {
        self.lock().queue.push_back(Scripted::Reply(text.into()));
        self
    }

    /// Queue a non-transient service failure.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.lock().queue.push_back(Scripted::Fail {
            message: message.into(),
            transient: false,
        });
        self
    }

    /// Queue a transient service failure.
    pub fn push_transient_failure(&self, message: impl Into<String>) -> &Self {
        self.lock().queue.push_back(Scripted::Fail {
            message: message.into(),
            transient: true,
        });
        self
    }

    /// Queue a call that never completes.
    pub fn push_hang(&self) -> &Self {
        self.lock().queue.push_back(Scripted::Hang);
        self
    }

    /// Number of generate calls so far.
    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock().requests.clone()
    }

    /// Results still queued.
    pub fn remaining(&self) -> usize {
        self.lock().queue.len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let next = {
            let mut script = self.lock();
            script.requests.push(request.clone());
            script.queue.pop_front()
        };
        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail { message, transient }) => {
                Err(GenerationError::Service { message, transient })
            }
            Some(Scripted::Hang) => {
                std::future::pending::<()>().await;
                Err(GenerationError::Unavailable("hung call resumed".to_string()))
            }
            None => Ok(ReplyBuilder::new("Nothing more happens.")
                .choices(["Wait", "Rest", "Move on"])
                .build()),
        }
    }
}

/// Builds a reply in the section format the story template asks for.
#[derive(Debug, Clone, Default)]
pub struct ReplyBuilder {
    narrative: String,
    found: Vec<(String, String)>,
    used: Vec<String>,
    npcs: Vec<String>,
    choices: Vec<String>,
    the_end: bool,
}

impl ReplyBuilder {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            ..Self::default()
        }
    }

    pub fn found(mut self, name: &str, description: &str) -> Self {
        self.found.push((name.to_string(), description.to_string()));
        self
    }

    pub fn used(mut self, name: &str) -> Self {
        self.used.push(name.to_string());
        self
    }

    pub fn npc(mut self, name: &str, role: &str, delta: i64, note: &str) -> Self {
        self.npcs.push(format!("{name} | {role} | {delta:+} | {note}"));
        self
    }

    pub fn choices<I, T>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn the_end(mut self) -> Self {
        self.the_end = true;
        self
    }

    pub fn build(&self) -> String {
        let mut out = format!("NARRATIVE:\n{}\n\nITEMS FOUND:\n", self.narrative);
        if self.found.is_empty() {
            out.push_str("- none\n");
        }
        for (name, description) in &self.found {
            out.push_str(&format!("- {name}: {description}\n"));
        }
        out.push_str("\nITEMS USED:\n");
        if self.used.is_empty() {
            out.push_str("- none\n");
        }
        for name in &self.used {
            out.push_str(&format!("- {name}\n"));
        }
        out.push_str("\nNPCS:\n");
        if self.npcs.is_empty() {
            out.push_str("- none\n");
        }
        for line in &self.npcs {
            out.push_str(&format!("- {line}\n"));
        }
        if !self.choices.is_empty() {
            out.push_str("\nCHOICES:\n");
            for (n, choice) in self.choices.iter().enumerate() {
                out.push_str(&format!("{}. {choice}\n", n + 1));
            }
        }
        if self.the_end {
            out.push_str("\nTHE END\n");
        }
        out
    }
}

/// A character that passes validation.
pub fn sample_character(name: &str) -> CharacterConfig {
    CharacterConfig::new()
        .name(name)
        .background(Background::BeetFarmer)
        .with_trait(Trait::Resourceful)
        .with_trait(Trait::Suspicious)
        .with_trait(Trait::Anxious)
}

/// Test harness for running game scenarios.
pub struct TestHarness {
    /// Shared handle on the engine's generator.
    pub generator: ScriptedGenerator,
    pub engine: StoryEngine<ScriptedGenerator, MemoryStore>,
    pub session: Session,
}

impl TestHarness {
    /// Start a session of the given length with a sample character.
    pub async fn start(length: StoryLength) -> Self {
        Self::start_with(length, EngineConfig::default()).await
    }

    pub async fn start_with(length: StoryLength, config: EngineConfig) -> Self {
        let generator = ScriptedGenerator::new();
        let mut engine = StoryEngine::new(generator.clone(), MemoryStore::new(), config);
        let session = match engine
            .begin(SessionConfig::new(sample_character("Test Survivor")).with_story_length(length))
            .await
        {
            Ok(session) => session,
            Err(err) => panic!("sample session failed to start: {err}"),
        };
        Self {
            generator,
            engine,
            session,
        }
    }

    /// Queue a reply.
    pub fn expect_reply(&mut self, reply: impl Into<String>) -> &mut Self {
        self.generator.push_reply(reply);
        self
    }

    /// Queue a reply with only a narrative and three choices.
    pub fn expect_narrative(&mut self, text: &str) -> &mut Self {
        self.expect_reply(
            ReplyBuilder::new(text)
                .choices(["Go left", "Go right", "Stay"])
                .build(),
        )
    }

    /// Play one round.
    pub async fn play(&mut self, input: &str) -> Result<RoundReport, EngineError> {
        self.engine.play_round(&mut self.session, input).await
    }

    pub async fn quit(&mut self) -> Result<(), EngineError> {
        self.engine.quit(&mut self.session).await
    }

    pub fn store(&self) -> &MemoryStore {
        self.engine.repository().store()
    }

    pub fn store_mut(&mut self) -> &mut MemoryStore {
        self.engine.repository_mut().store_mut()
    }

    /// Rows currently persisted for the harness session.
    pub async fn stored_record(&self) -> Option<SessionRecord> {
        self.store().get(self.session.id).await.ok().flatten()
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.session
            .inventory
            .items()
            .iter()
            .any(|i| i.name.eq_ignore_ascii_case(name))
    }

    pub fn affinity(&self, npc: &str) -> Option<i32> {
        self.session
            .relationships
            .find_by_name(npc)
            .map(|n| n.affinity.value())
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the session has completed exactly `round` rounds.
#[track_caller]
pub fn assert_round(harness: &TestHarness, round: u32) {
    assert_eq!(
        harness.session.round, round,
        "Expected round {round}, got {}",
        harness.session.round
    );
}

/// Assert the player carries an item with this name.
#[track_caller]
pub fn assert_has_item(harness: &TestHarness, name: &str) {
    assert!(
        harness.has_item(name),
        "Expected '{name}' in inventory: {:?}",
        harness.session.inventory.items()
    );
}

/// Assert the player does NOT carry an item with this name.
#[track_caller]
pub fn assert_no_item(harness: &TestHarness, name: &str) {
    assert!(
        !harness.has_item(name),
        "Expected '{name}' NOT to be in inventory"
    );
}

/// Assert an NPC's affinity.
#[track_caller]
pub fn assert_affinity(harness: &TestHarness, npc: &str, expected: i32) {
    assert_eq!(
        harness.affinity(npc),
        Some(expected),
        "Expected {npc} at affinity {expected}"
    );
}

/// Assert two sessions serialize to the same bytes.
#[track_caller]
pub fn assert_byte_identical(before: &Session, after: &Session) {
    let before = serde_json::to_vec(before).unwrap_or_default();
    let after = serde_json::to_vec(after).unwrap_or_default();
    assert!(
        before == after,
        "Expected session state to be unchanged"
    );
}
