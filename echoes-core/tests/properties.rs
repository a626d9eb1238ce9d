//! Property tests for the memory invariants.

use echoes_core::character::{Background, CharacterConfig, Trait};
use echoes_core::memory::{
    Affinity, Interaction, Journal, JournalEntry, Relationships, AFFINITY_MAX, AFFINITY_MIN,
};
use echoes_core::{ContextSynthesizer, Session, StoryLength};
use proptest::prelude::*;

fn session() -> Session {
    let character = CharacterConfig::new()
        .name("Rosa")
        .background(Background::HighSchoolLibrarian)
        .with_trait(Trait::Stubborn)
        .build()
        .unwrap();
    let mut session = Session::new(character, StoryLength::Long, "The lights went out.");
    session.activate();
    session
}

proptest! {
    #[test]
    fn affinity_stays_in_bounds(deltas in prop::collection::vec(any::<i64>(), 0..40)) {
        let mut relationships = Relationships::new();
        for (round, delta) in deltas.iter().enumerate() {
            relationships.apply_interaction(
                &Interaction::new("Mara").with_delta(*delta),
                round as u32 + 1,
            );
            let value = relationships.find_by_name("Mara").unwrap().affinity.value();
            prop_assert!((AFFINITY_MIN..=AFFINITY_MAX).contains(&value));
        }
    }

    #[test]
    fn adjust_matches_clamped_sum(start in -100i64..=100, delta in -500i64..=500) {
        let adjusted = Affinity::clamped(start).adjust(delta).value() as i64;
        prop_assert_eq!(adjusted, (start + delta).clamp(-100, 100));
    }

    #[test]
    fn npc_summaries_respect_their_bound(
        max_chars in 20usize..200,
        notes in prop::collection::vec("[a-z ]{1,50}", 1..20),
    ) {
        let mut relationships = Relationships::new().with_summary_chars(max_chars);
        for (round, note) in notes.iter().enumerate() {
            relationships.apply_interaction(
                &Interaction::new("Eli").with_note(note.clone()),
                round as u32 + 1,
            );
        }
        if let Some(npc) = relationships.find_by_name("Eli") {
            prop_assert!(npc.summary.chars().count() <= max_chars);
        }
    }

    #[test]
    fn journal_stays_ordered_through_summarization(
        rounds in 1u32..40,
        cut in 0u32..45,
        window in 1usize..8,
    ) {
        let mut journal = Journal::with_summary_chars(400);
        for round in 1..=rounds {
            journal
                .append(JournalEntry::new(round, format!("Event {round}."), "act"))
                .unwrap();
        }
        journal.summarize(cut);

        let kept: Vec<u32> = journal.entries().iter().map(|e| e.round).collect();
        prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(kept.iter().all(|&r| r >= cut));
        prop_assert_eq!(journal.last_round(), rounds);
        prop_assert!(journal.summary().through_round() < cut.max(1));
        prop_assert!(journal.summary().render().chars().count() <= 400);

        let window_rounds: Vec<u32> = journal
            .recent_window(window)
            .iter()
            .map(|e| e.round)
            .collect();
        prop_assert!(window_rounds.len() <= window);
        prop_assert!(window_rounds.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(window_rounds.last().copied(), kept.last().copied());
    }

    #[test]
    fn summary_bound_holds_for_long_input(
        max_chars in 1usize..1500,
        rounds in prop::collection::vec(("[a-z .]{0,400}", "[a-z ]{0,3000}"), 1..12),
    ) {
        let mut journal = Journal::with_summary_chars(max_chars);
        for (n, (narrative, choice)) in rounds.iter().enumerate() {
            journal
                .append(JournalEntry::new(n as u32 + 1, narrative.clone(), choice.clone()))
                .unwrap();
            journal.summarize(n as u32 + 1);
            prop_assert!(journal.summary().render().chars().count() <= max_chars);
        }
        journal.summarize(u32::MAX);
        prop_assert!(journal.summary().render().chars().count() <= max_chars);
        prop_assert!(journal.entries().is_empty());
    }

    #[test]
    fn context_is_deterministic_and_bounded(
        budget in 50usize..2000,
        npcs in prop::collection::vec(("[A-Z][a-z]{2,8}", -20i64..=20), 0..10),
        events in 0u32..12,
    ) {
        let mut session = session();
        for round in 1..=events {
            session
                .journal
                .append(JournalEntry::new(
                    round,
                    format!("Something happens in round {round}."),
                    "wait",
                ))
                .unwrap();
        }
        session.round = events;
        for (n, (name, delta)) in npcs.iter().enumerate() {
            session.relationships.apply_interaction(
                &Interaction::new(name.clone()).with_delta(*delta).with_note("met"),
                (n as u32 % events.max(1)) + 1,
            );
        }

        let synthesizer = ContextSynthesizer::new(5, budget);
        let first = synthesizer.build(&session, "look around");
        let second = synthesizer.build(&session, "look around");
        prop_assert_eq!(&first, &second);

        if first.dropped_npcs + first.dropped_events > 0 {
            prop_assert!(first.bounded_len() <= budget);
        }
        prop_assert!(first.recent_events.len() <= 5);
        prop_assert!(first.recent_events.windows(2).all(|w| w[0].round < w[1].round));
    }
}
