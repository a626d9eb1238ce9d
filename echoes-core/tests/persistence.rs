//! Sessions saved to disk and resumed by a fresh engine.

use echoes_core::testing::{sample_character, ReplyBuilder, ScriptedGenerator};
use echoes_core::{
    EngineConfig, EngineError, JsonFileStore, SessionConfig, SessionId, StateStore, StoryEngine,
    StoryLength,
};
use tempfile::TempDir;

type DiskEngine = StoryEngine<ScriptedGenerator, JsonFileStore>;

async fn open_engine(dir: &TempDir) -> (ScriptedGenerator, DiskEngine) {
    let generator = ScriptedGenerator::new();
    let store = JsonFileStore::open(dir.path()).await.unwrap();
    let engine = StoryEngine::new(generator.clone(), store, EngineConfig::default());
    (generator, engine)
}

#[tokio::test]
async fn test_resume_after_restart() {
    let dir = TempDir::new().unwrap();
    let (generator, mut engine) = open_engine(&dir).await;

    let mut session = engine
        .begin(
            SessionConfig::new(sample_character("Rosa Vance"))
                .with_story_length(StoryLength::Medium)
                .with_premise("The river dried up overnight."),
        )
        .await
        .unwrap();

    generator.push_reply(
        ReplyBuilder::new("Mud cracks under your boots. Eli waves from the bridge.")
            .found("Canteen", "half full")
            .npc("Eli", "Lost Soul", 12, "asked for water")
            .choices(["Share water", "Walk past", "Ask about the river"])
            .build(),
    );
    engine.play_round(&mut session, "head downstream").await.unwrap();
    generator.push_reply(
        ReplyBuilder::new("Eli drinks and thanks you.")
            .used("Canteen")
            .npc("Eli", "Lost Soul", 15, "grateful")
            .choices(["Travel together", "Part ways", "Rest"])
            .build(),
    );
    engine.play_round(&mut session, "1").await.unwrap();
    let id = session.id;
    drop(engine);

    let (generator, mut engine) = open_engine(&dir).await;
    let mut resumed = engine.resume(id).await.unwrap();
    assert_eq!(resumed, session);
    assert_eq!(resumed.premise, "The river dried up overnight.");
    assert_eq!(resumed.choices, vec!["Travel together", "Part ways", "Rest"]);
    assert!(resumed.inventory.is_empty());
    assert_eq!(
        resumed.relationships.find_by_name("Eli").unwrap().affinity.value(),
        27
    );

    generator.push_reply(
        ReplyBuilder::new("You and Eli set off together.")
            .found("Walking Stick", "oak")
            .choices(["North", "East", "Camp"])
            .build(),
    );
    let report = engine.play_round(&mut resumed, "1").await.unwrap();
    assert_eq!(report.round, 3);
    assert_eq!(report.player_choice, "Travel together");
    assert_eq!(
        resumed.inventory.items()[0].id.0,
        1,
        "item ids keep counting after a reload"
    );

    let store = engine.repository().store();
    assert_eq!(store.list().await.unwrap(), vec![id]);
    assert_eq!(store.journal(id).await.unwrap().len(), 3);
    assert_eq!(store.inventory(id).await.unwrap().len(), 1);
    assert_eq!(store.relationships(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_resume_unknown_session() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = open_engine(&dir).await;
    let id = SessionId::new();
    assert!(matches!(
        engine.resume(id).await,
        Err(EngineError::NotFound(missing)) if missing == id
    ));
}

#[tokio::test]
async fn test_corrupt_save_is_reported() {
    let dir = TempDir::new().unwrap();
    let (_, mut engine) = open_engine(&dir).await;
    let session = engine
        .begin(SessionConfig::new(sample_character("Rosa")))
        .await
        .unwrap();

    let path = engine.repository().store().path_for(session.id);
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let err = engine.resume(session.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));
}
