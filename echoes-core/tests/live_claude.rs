//! Integration tests that call the real Claude API.
//!
//! These tests require ANTHROPIC_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p echoes-core --test live_claude -- --ignored`
//!
//! Marked #[ignore] by default since they cost money and take seconds per call.

use echoes_core::testing::sample_character;
use echoes_core::{
    ClaudeGenerator, EngineConfig, MemoryStore, SessionConfig, StoryEngine, StoryLength,
};

fn setup() {
    let _ = dotenvy::dotenv();
}

fn has_api_key() -> bool {
    std::env::var("ANTHROPIC_API_KEY").is_ok()
}

fn live_config() -> EngineConfig {
    EngineConfig::default()
        .with_max_tokens(1024)
        .with_temperature(0.7)
}

#[tokio::test]
#[ignore] // Run with: cargo test -p echoes-core --test live_claude -- --ignored
async fn test_live_round_parses_and_commits() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let config = live_config();
    let generator = ClaudeGenerator::from_env(&config).expect("Failed to create generator");
    let mut engine = StoryEngine::new(generator, MemoryStore::new(), config);
    let mut session = engine
        .begin(SessionConfig::new(sample_character("Rosa")).with_story_length(StoryLength::Short))
        .await
        .expect("session should start");

    let report = engine
        .play_round(&mut session, "I search the abandoned gas station for water")
        .await
        .expect("round should commit");

    assert!(!report.narrative.is_empty(), "narrator should write something");
    assert!(report.choices.len() <= 3);
    assert_eq!(session.round, 1);
    println!("Narrative:\n{}\n\nChoices: {:?}", report.narrative, report.choices);
}

#[tokio::test]
#[ignore] // Run with: cargo test -p echoes-core --test live_claude -- --ignored
async fn test_live_epilogue_after_quit() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let config = live_config();
    let generator = ClaudeGenerator::from_env(&config).expect("Failed to create generator");
    let mut engine = StoryEngine::new(generator, MemoryStore::new(), config);
    let mut session = engine
        .begin(SessionConfig::new(sample_character("Rosa")))
        .await
        .expect("session should start");
    engine.quit(&mut session).await.expect("quit should commit");

    let epilogue = engine.epilogue(&session).await.expect("epilogue should generate");
    assert!(!epilogue.trim().is_empty());
    println!("Epilogue:\n{epilogue}");
}
