//! The round state machine.
//!
//! ```text
//!  Setup ──begin──▶ Active ──play_round──▶ Active ──┬──▶ Ended
//!                     ▲                              │  (round limit,
//!                     └──────────────────────────────┘   quit, THE END,
//!                                                        cancellation)
//! ```
//!
//! Every mutation follows the same commit sequence: clone the caller's
//! session, apply the round to the clone, validate it, persist it, and only
//! then swap it into the caller's value. Any failure before the swap leaves
//! the caller's session exactly as it was.

use crate::config::EngineConfig;
use crate::context::ContextSynthesizer;
use crate::generation::{
    parse_reply, GenerationError, GenerationRequest, Generator, ParseError, RoundOutcome,
};
use crate::memory::{Interaction, InventoryItem, JournalEntry, JournalError, NpcId};
use crate::persist::{MemoryBounds, PersistError, SessionRepository};
use crate::session::{
    EndReason, Session, SessionConfig, SessionId, SessionStatus, ValidationError,
};
use crate::store::{StateStore, StoreError};
use crate::template::Templates;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid session state: {0}")]
    Validation(#[from] ValidationError),

    #[error("generation failed after {attempts} attempt(s): {last}")]
    GenerationFailure { attempts: u32, last: GenerationError },

    #[error("could not save the session: {0}")]
    Persistence(#[source] StoreError),

    #[error("session is {status}; cannot {action}")]
    StateViolation {
        status: SessionStatus,
        action: &'static str,
    },

    #[error("session {0} not found")]
    NotFound(SessionId),
}

impl From<PersistError> for EngineError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::NotFound(id) => EngineError::NotFound(id),
            PersistError::Validation(e) => EngineError::Validation(e),
            PersistError::Store(e) => EngineError::Persistence(e),
        }
    }
}

impl EngineError {
    /// Whether the session is still playable after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::GenerationFailure { .. } | EngineError::Persistence(_)
        )
    }
}

/// What one round changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// The round just completed.
    pub round: u32,
    /// What the player did, with numbered choices resolved to their text.
    pub player_choice: String,
    pub narrative: String,
    /// Choices offered for the next round; empty once the story ends.
    pub choices: Vec<String>,
    pub items_gained: Vec<InventoryItem>,
    pub items_lost: Vec<InventoryItem>,
    pub npcs_touched: Vec<NpcId>,
    /// Set when this round ended the session.
    pub ended: Option<EndReason>,
}

/// Drives sessions through rounds.
pub struct StoryEngine<G, S> {
    generator: G,
    repository: SessionRepository<S>,
    config: EngineConfig,
    synthesizer: ContextSynthesizer,
    templates: Templates,
    /// A committed-in-memory session whose write has not landed yet.
    pending: Option<Session>,
}

impl<G: Generator, S: StateStore> StoryEngine<G, S> {
    pub fn new(generator: G, store: S, config: EngineConfig) -> Self {
        Self {
            generator,
            repository: SessionRepository::new(store),
            synthesizer: ContextSynthesizer::from_config(&config),
            templates: Templates::from_overrides(&config.templates),
            config,
            pending: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn repository(&self) -> &SessionRepository<S> {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut SessionRepository<S> {
        &mut self.repository
    }

    pub fn synthesizer(&self) -> &ContextSynthesizer {
        &self.synthesizer
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// The staged session waiting for [`StoryEngine::flush`], if any.
    pub fn pending(&self) -> Option<&Session> {
        self.pending.as_ref()
    }

    /// Create a session from character-creation choices, activate it and
    /// save it.
    pub async fn begin(&mut self, config: SessionConfig) -> Result<Session, EngineError> {
        let bounds = MemoryBounds {
            npc_summary_chars: self.config.npc_summary_chars,
            journal_summary_chars: self.config.journal_summary_chars,
        };
        let mut session = self.repository.create(config, bounds)?;
        session.activate();
        self.write(&session).await?;
        info!(
            session = %session.id,
            character = %session.character.name(),
            length = session.story_length.name(),
            "session started"
        );
        Ok(session)
    }

    /// Load a saved session.
    pub async fn resume(&self, id: SessionId) -> Result<Session, EngineError> {
        let session = self.repository.load(id).await?;
        debug!(session = %id, round = session.round, "session loaded");
        Ok(session)
    }

    /// Retry the write of a pending session and swap it in on success.
    ///
    /// Returns `false` when nothing was pending for this session.
    pub async fn flush(&mut self, session: &mut Session) -> Result<bool, EngineError> {
        if !self.pending.as_ref().is_some_and(|p| p.id == session.id) {
            return Ok(false);
        }
        let Some(staged) = self.pending.take() else {
            return Ok(false);
        };
        match self.write(&staged).await {
            Ok(()) => {
                info!(session = %staged.id, round = staged.round, "pending commit flushed");
                *session = staged;
                Ok(true)
            }
            Err(err) => {
                self.pending = Some(staged);
                Err(err)
            }
        }
    }

    /// Play one round with the player's input.
    pub async fn play_round(
        &mut self,
        session: &mut Session,
        input: &str,
    ) -> Result<RoundReport, EngineError> {
        self.play_round_cancellable(session, input, std::future::pending())
            .await
    }

    /// Play one round, abandoning the session if `cancel` completes first.
    ///
    /// Cancellation applies none of the round's effects; the session moves
    /// straight to `Ended`.
    pub async fn play_round_cancellable<C>(
        &mut self,
        session: &mut Session,
        input: &str,
        cancel: C,
    ) -> Result<RoundReport, EngineError>
    where
        C: Future<Output = ()>,
    {
        self.flush(session).await?;
        ensure_active(session, "play a round")?;

        let choice = resolve_choice(session, input);
        let payload = self.synthesizer.build(session, &choice);
        if payload.dropped_npcs + payload.dropped_events > 0 {
            debug!(
                session = %session.id,
                dropped_npcs = payload.dropped_npcs,
                dropped_events = payload.dropped_events,
                "context trimmed to budget"
            );
        }
        let request = GenerationRequest::new(
            self.templates.system.text(),
            payload.render(&self.templates.story),
        );
        info!(session = %session.id, round = payload.round, "round started");

        let outcome = tokio::select! {
            biased;
            _ = cancel => None,
            result = self.generate_outcome(&request) => Some(result),
        };

        let Some(outcome) = outcome else {
            warn!(session = %session.id, "round cancelled");
            let mut staged = session.clone();
            staged.end(EndReason::Cancelled);
            staged.choices.clear();
            self.commit(session, staged).await?;
            return Ok(RoundReport {
                round: session.round,
                player_choice: choice,
                narrative: String::new(),
                choices: Vec::new(),
                items_gained: Vec::new(),
                items_lost: Vec::new(),
                npcs_touched: Vec::new(),
                ended: Some(EndReason::Cancelled),
            });
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(session = %session.id, error = %err, "round aborted");
                return Err(err);
            }
        };

        let mut staged = session.clone();
        let report = self.apply(&mut staged, &choice, outcome)?;
        self.commit(session, staged).await?;
        info!(
            session = %session.id,
            round = report.round,
            ended = ?report.ended,
            "round committed"
        );
        Ok(report)
    }

    /// End the session at the player's request.
    pub async fn quit(&mut self, session: &mut Session) -> Result<(), EngineError> {
        self.flush(session).await?;
        ensure_active(session, "quit")?;
        let mut staged = session.clone();
        staged.end(EndReason::PlayerQuit);
        staged.choices.clear();
        self.commit(session, staged).await?;
        info!(session = %session.id, round = session.round, "player quit");
        Ok(())
    }

    /// Ask the narrator for a closing passage. Never mutates the session.
    pub async fn epilogue(&self, session: &Session) -> Result<String, EngineError> {
        if session.status == SessionStatus::Setup {
            return Err(EngineError::StateViolation {
                status: session.status,
                action: "write an epilogue",
            });
        }
        let payload = self.synthesizer.build(session, "");
        let mut values = payload.values();
        let reason = session
            .end_reason
            .map(|r| r.describe())
            .unwrap_or("the player set the story aside");
        values.insert("end_reason", reason.to_string());
        let request = GenerationRequest::new(
            self.templates.system.text(),
            self.templates.epilogue.render(&values),
        );

        self.with_retries(&request, |text| {
            let text = text.trim();
            if text.is_empty() {
                Err(ParseError::Empty)
            } else {
                Ok(text.to_string())
            }
        })
        .await
    }

    async fn generate_outcome(
        &self,
        request: &GenerationRequest,
    ) -> Result<RoundOutcome, EngineError> {
        self.with_retries(request, parse_reply).await
    }

    /// Run one request under the timeout, retrying retryable failures.
    async fn with_retries<T>(
        &self,
        request: &GenerationRequest,
        parse: impl Fn(&str) -> Result<T, ParseError>,
    ) -> Result<T, EngineError> {
        let max = self.config.attempts_per_round;
        let timeout = self.config.generation_timeout();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(timeout, self.generator.generate(request)).await
            {
                Err(_) => Err(GenerationError::Timeout(timeout)),
                Ok(Err(err)) => Err(err),
                Ok(Ok(text)) => parse(&text).map_err(GenerationError::from),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max => {
                    warn!(attempt, error = %err, "generation attempt failed; retrying");
                }
                Err(last) => {
                    return Err(EngineError::GenerationFailure {
                        attempts: attempt,
                        last,
                    })
                }
            }
        }
    }

    /// Apply a parsed reply to a staged copy of the session.
    fn apply(
        &self,
        staged: &mut Session,
        choice: &str,
        outcome: RoundOutcome,
    ) -> Result<RoundReport, EngineError> {
        let round = staged.round + 1;

        staged
            .journal
            .append(JournalEntry::new(round, outcome.narrative.clone(), choice))
            .map_err(|err| match err {
                JournalError::OutOfOrder { round, last_round } => ValidationError::JournalOrder {
                    round,
                    current: last_round,
                },
            })?;

        let mut items_lost = Vec::new();
        for name in &outcome.items_used {
            match staged.inventory.consume(name) {
                Some(item) => items_lost.push(item),
                None => debug!(item = %name, "used item was not carried"),
            }
        }

        let mut items_gained = Vec::new();
        for found in &outcome.items_found {
            let carried = staged
                .inventory
                .items()
                .iter()
                .any(|i| i.name.eq_ignore_ascii_case(found.name.trim()));
            if found.inferred && carried {
                continue;
            }
            if let Some(id) = staged.inventory.add(&found.name, &found.description, round) {
                if let Some(item) = staged.inventory.get(id) {
                    items_gained.push(item.clone());
                }
            }
        }

        let mut npcs_touched: Vec<NpcId> = Vec::new();
        for interaction in &outcome.npcs {
            if outcome.npcs_inferred && is_player_name(staged, &interaction.npc) {
                continue;
            }
            if let Some(id) = staged.relationships.apply_interaction(interaction, round) {
                if !npcs_touched.contains(&id) {
                    npcs_touched.push(id);
                }
            }
        }
        let mentioned: Vec<String> = staged
            .relationships
            .mentioned_in(&outcome.narrative)
            .into_iter()
            .filter(|npc| !npcs_touched.contains(&npc.id))
            .map(|npc| npc.name.clone())
            .collect();
        for name in mentioned {
            if let Some(id) = staged
                .relationships
                .apply_interaction(&Interaction::new(name), round)
            {
                npcs_touched.push(id);
            }
        }

        staged.round = round;
        staged.choices = outcome.choices;
        if round >= staged.round_limit() {
            staged.end(EndReason::RoundLimit);
        } else if outcome.terminal {
            staged.end(EndReason::Epilogue);
        }
        if staged.is_ended() {
            staged.choices.clear();
        }

        let window = u32::try_from(self.config.recent_window).unwrap_or(u32::MAX);
        let older_than = (round + 1).saturating_sub(window);
        if older_than > staged.journal.summary().through_round() + 1 {
            staged.journal.summarize(older_than);
            debug!(session = %staged.id, older_than, "journal summarized");
        }

        staged.validate()?;

        Ok(RoundReport {
            round,
            player_choice: choice.to_string(),
            narrative: outcome.narrative,
            choices: staged.choices.clone(),
            items_gained,
            items_lost,
            npcs_touched,
            ended: staged.end_reason.filter(|_| staged.is_ended()),
        })
    }

    /// Persist `staged` and swap it into `session`, or hold it as pending.
    async fn commit(&mut self, session: &mut Session, staged: Session) -> Result<(), EngineError> {
        match self.write(&staged).await {
            Ok(()) => {
                *session = staged;
                Ok(())
            }
            Err(EngineError::Persistence(err)) => {
                warn!(
                    session = %staged.id,
                    round = staged.round,
                    error = %err,
                    "commit held pending until the store recovers"
                );
                self.pending = Some(staged);
                Err(EngineError::Persistence(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Write with the configured number of attempts.
    async fn write(&mut self, session: &Session) -> Result<(), EngineError> {
        let max = self.config.persist_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.repository.persist(session).await {
                Ok(()) => {
                    debug!(
                        session = %session.id,
                        round = session.round,
                        attempt,
                        "session persisted"
                    );
                    return Ok(());
                }
                Err(PersistError::Store(err)) if attempt < max => {
                    warn!(session = %session.id, attempt, error = %err, "persist failed; retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn ensure_active(session: &Session, action: &'static str) -> Result<(), EngineError> {
    if session.is_active() {
        Ok(())
    } else {
        Err(EngineError::StateViolation {
            status: session.status,
            action,
        })
    }
}

/// The player's full name, or any single word of it.
fn is_player_name(session: &Session, speaker: &str) -> bool {
    let name = session.character.name();
    name.eq_ignore_ascii_case(speaker)
        || name
            .split_whitespace()
            .any(|word| word.eq_ignore_ascii_case(speaker))
}

/// Map `1`..`3` onto the offered choice of that number.
fn resolve_choice(session: &Session, input: &str) -> String {
    let input = input.trim();
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| session.choices.get(idx))
        .cloned()
        .unwrap_or_else(|| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Background, CharacterConfig, Trait};
    use crate::session::StoryLength;

    fn session_with_choices(choices: &[&str]) -> Session {
        let character = CharacterConfig::new()
            .name("Rosa")
            .background(Background::Cardiologist)
            .with_trait(Trait::Empathetic)
            .build()
            .unwrap();
        let mut session = Session::new(character, StoryLength::Short, "p");
        session.activate();
        session.choices = choices.iter().map(|c| c.to_string()).collect();
        session
    }

    #[test]
    fn test_numeric_choice_resolution() {
        let session = session_with_choices(&["Swim", "Climb", "Shout"]);
        assert_eq!(resolve_choice(&session, " 2 "), "Climb");
        assert_eq!(resolve_choice(&session, "4"), "4");
        assert_eq!(resolve_choice(&session, "0"), "0");
        assert_eq!(resolve_choice(&session, "run away"), "run away");

        let no_choices = session_with_choices(&[]);
        assert_eq!(resolve_choice(&no_choices, "1"), "1");
    }

    #[test]
    fn test_persist_error_mapping() {
        let id = SessionId::new();
        assert!(matches!(
            EngineError::from(PersistError::NotFound(id)),
            EngineError::NotFound(x) if x == id
        ));
        let err = EngineError::from(PersistError::Store(StoreError::Unavailable("down".into())));
        assert!(err.is_recoverable());
        assert!(!EngineError::from(PersistError::Validation(ValidationError::EmptyName))
            .is_recoverable());
    }
}
