//! Context synthesis: the bounded payload sent with every generation request.
//!
//! The payload is a pure function of the session and the player's input.
//! Two sections can grow without limit over a long game, the NPC list and
//! the recent events, so they share a character budget. When they overflow
//! it the least recently seen NPC and the oldest event are dropped in turn.
//! The premise, character and player response are never trimmed.

use crate::config::EngineConfig;
use crate::memory::JournalEntry;
use crate::session::Session;
use crate::template::PromptTemplate;
use serde::Serialize;
use std::collections::BTreeMap;

const NO_EVENTS: &str = "No previous events.";
const NO_NPCS: &str = "No established NPC relationships yet.";
const NO_SUMMARY: &str = "The story is just beginning.";
const NO_ITEMS: &str = "Empty-handed.";

/// One journal entry as it appears in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentEvent {
    pub round: u32,
    pub narrative: String,
    pub choice: String,
}

impl From<&JournalEntry> for RecentEvent {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            round: entry.round,
            narrative: entry.narrative.trim().to_string(),
            choice: entry.choice.trim().to_string(),
        }
    }
}

impl RecentEvent {
    pub fn render(&self) -> String {
        let mut out = format!("Round {}:\n{}", self.round, self.narrative);
        if !self.choice.is_empty() {
            out.push_str(&format!("\nPlayer choice: {}", self.choice));
        }
        out
    }
}

/// Everything the narrator is told for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextPayload {
    pub story_premise: String,
    pub character_info: String,
    pub summary: String,
    /// Relationship lines, most recently seen first.
    pub npc_relationships: Vec<String>,
    pub inventory: Vec<String>,
    /// Chronological.
    pub recent_events: Vec<RecentEvent>,
    pub player_response: String,
    /// The round being played.
    pub round: u32,
    /// Rounds left after this one.
    pub rounds_remaining: u32,
    pub dropped_npcs: usize,
    pub dropped_events: usize,
}

impl ContextPayload {
    pub fn npc_text(&self) -> String {
        if self.npc_relationships.is_empty() {
            return NO_NPCS.to_string();
        }
        self.npc_relationships
            .iter()
            .map(|line| format!("- {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn events_text(&self) -> String {
        if self.recent_events.is_empty() {
            return NO_EVENTS.to_string();
        }
        self.recent_events
            .iter()
            .map(RecentEvent::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn inventory_text(&self) -> String {
        if self.inventory.is_empty() {
            return NO_ITEMS.to_string();
        }
        self.inventory
            .iter()
            .map(|line| format!("- {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn summary_text(&self) -> &str {
        if self.summary.is_empty() {
            NO_SUMMARY
        } else {
            &self.summary
        }
    }

    /// Placeholder values for the prompt templates.
    pub fn values(&self) -> BTreeMap<&'static str, String> {
        let mut values = BTreeMap::new();
        values.insert("story_premise", self.story_premise.clone());
        values.insert("character_info", self.character_info.clone());
        values.insert("summary", self.summary_text().to_string());
        values.insert("npc_relationships", self.npc_text());
        values.insert("inventory", self.inventory_text());
        values.insert("recent_events", self.events_text());
        values.insert("player_response", self.player_response.clone());
        values.insert("round", self.round.to_string());
        values.insert("rounds_remaining", self.rounds_remaining.to_string());
        values
    }

    pub fn render(&self, template: &PromptTemplate) -> String {
        template.render(&self.values())
    }

    /// Characters the NPC list and recent events take up, the part held
    /// to the budget.
    pub fn bounded_len(&self) -> usize {
        let npcs: usize = self.npc_relationships.iter().map(|l| l.chars().count() + 3).sum();
        let events: usize = self
            .recent_events
            .iter()
            .map(|e| e.render().chars().count() + 2)
            .sum();
        npcs + events
    }
}

/// Builds [`ContextPayload`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSynthesizer {
    pub recent_window: usize,
    pub budget: usize,
}

impl Default for ContextSynthesizer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ContextSynthesizer {
    pub fn new(recent_window: usize, budget: usize) -> Self {
        Self {
            recent_window,
            budget,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.recent_window, config.context_budget)
    }

    /// Build the payload for the next round.
    pub fn build(&self, session: &Session, player_response: &str) -> ContextPayload {
        let round = (session.round + 1).min(session.round_limit());
        let mut payload = ContextPayload {
            story_premise: session.premise.trim().to_string(),
            character_info: session.character.describe(),
            summary: session.journal.summary().render(),
            npc_relationships: session
                .relationships
                .by_recency()
                .into_iter()
                .map(|npc| npc.line())
                .collect(),
            inventory: session
                .inventory
                .items()
                .iter()
                .map(|item| {
                    if item.description.is_empty() {
                        item.name.clone()
                    } else {
                        format!("{}: {}", item.name, item.description)
                    }
                })
                .collect(),
            recent_events: session
                .journal
                .recent_window(self.recent_window)
                .iter()
                .map(RecentEvent::from)
                .collect(),
            player_response: player_response.to_string(),
            round,
            rounds_remaining: session.round_limit().saturating_sub(round),
            dropped_npcs: 0,
            dropped_events: 0,
        };
        self.trim(&mut payload);
        payload
    }

    fn trim(&self, payload: &mut ContextPayload) {
        let mut drop_npc_next = true;
        while payload.bounded_len() > self.budget {
            let has_npcs = !payload.npc_relationships.is_empty();
            let has_events = !payload.recent_events.is_empty();
            if !has_npcs && !has_events {
                break;
            }
            if (drop_npc_next && has_npcs) || !has_events {
                payload.npc_relationships.pop();
                payload.dropped_npcs += 1;
            } else {
                payload.recent_events.remove(0);
                payload.dropped_events += 1;
            }
            drop_npc_next = !drop_npc_next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Background, CharacterConfig, Trait};
    use crate::memory::Interaction;
    use crate::session::StoryLength;

    fn session_with(rounds: u32, npcs: &[(&str, u32)]) -> Session {
        let character = CharacterConfig::new()
            .name("Rosa")
            .background(Background::MovieStar)
            .with_trait(Trait::Charismatic)
            .with_trait(Trait::Reckless)
            .build()
            .unwrap();
        let mut session = Session::new(character, StoryLength::Long, "The sea came inland.");
        session.activate();
        for r in 1..=rounds {
            session
                .journal
                .append(JournalEntry::new(r, format!("Event {r}."), format!("act {r}")))
                .unwrap();
        }
        session.round = rounds;
        for (name, round) in npcs {
            session
                .relationships
                .apply_interaction(&Interaction::new(*name).with_note("met"), *round);
        }
        session
    }

    #[test]
    fn test_fresh_session_uses_fallbacks() {
        let session = session_with(0, &[]);
        let payload = ContextSynthesizer::default().build(&session, "I wake up");

        assert_eq!(payload.round, 1);
        assert_eq!(payload.rounds_remaining, 19);
        let values = payload.values();
        assert_eq!(values["recent_events"], NO_EVENTS);
        assert_eq!(values["npc_relationships"], NO_NPCS);
        assert_eq!(values["summary"], NO_SUMMARY);
        assert_eq!(values["inventory"], NO_ITEMS);
        assert_eq!(values["player_response"], "I wake up");
        assert!(values["character_info"].contains("Movie Star"));
    }

    #[test]
    fn test_npcs_ordered_by_recency_then_name() {
        let session = session_with(4, &[("Zed", 2), ("Bram", 4), ("Ada", 2)]);
        let payload = ContextSynthesizer::default().build(&session, "go");
        let names: Vec<&str> = payload
            .npc_relationships
            .iter()
            .map(|l| l.split(' ').next().unwrap())
            .collect();
        assert_eq!(names, vec!["Bram", "Ada", "Zed"]);
    }

    #[test]
    fn test_window_is_chronological_suffix() {
        let session = session_with(8, &[]);
        let payload = ContextSynthesizer::new(3, 6000).build(&session, "go");
        let rounds: Vec<u32> = payload.recent_events.iter().map(|e| e.round).collect();
        assert_eq!(rounds, vec![6, 7, 8]);
    }

    #[test]
    fn test_identical_inputs_give_identical_payloads() {
        let session = session_with(6, &[("Mara", 3), ("Jonah", 5)]);
        let synth = ContextSynthesizer::default();
        let a = synth.build(&session, "climb the tower");
        let b = synth.build(&session.clone(), "climb the tower");
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_trimming_alternates_and_keeps_core_fields() {
        let session = session_with(
            5,
            &[("Ada", 1), ("Bram", 2), ("Cole", 3), ("Dara", 4), ("Eli", 5)],
        );
        let full = ContextSynthesizer::new(5, 100_000).build(&session, "hold");
        let budget = full.bounded_len() - 1;
        let payload = ContextSynthesizer::new(5, budget).build(&session, "hold");

        assert_eq!(payload.dropped_npcs, 1);
        assert_eq!(payload.dropped_events, 0);
        assert!(!payload.npc_relationships.iter().any(|l| l.starts_with("Ada")));

        let tight = ContextSynthesizer::new(5, 0).build(&session, "hold");
        assert!(tight.npc_relationships.is_empty());
        assert!(tight.recent_events.is_empty());
        assert_eq!(tight.dropped_npcs, 5);
        assert_eq!(tight.dropped_events, 5);
        assert_eq!(tight.player_response, "hold");
        assert!(tight.character_info.contains("Rosa"));
    }

    #[test]
    fn test_second_trim_drops_oldest_event() {
        let session = session_with(3, &[("Ada", 1), ("Bram", 2)]);
        let full = ContextSynthesizer::new(5, 100_000).build(&session, "x");
        let without_ada = full.bounded_len() - (full.npc_relationships[1].chars().count() + 3);
        let payload = ContextSynthesizer::new(5, without_ada - 1).build(&session, "x");

        assert_eq!(payload.dropped_npcs, 1);
        assert_eq!(payload.dropped_events, 1);
        assert_eq!(payload.recent_events.first().unwrap().round, 2);
    }

    #[test]
    fn test_render_fills_template() {
        let session = session_with(1, &[]);
        let payload = ContextSynthesizer::default().build(&session, "dig");
        let text = payload.render(&PromptTemplate::new(
            "R{round}/{rounds_remaining} {player_response}\n{recent_events}",
        ));
        assert_eq!(text, "R2/18 dig\nRound 1:\nEvent 1.\nPlayer choice: act 1");
    }
}
