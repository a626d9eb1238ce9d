//! The game loop: read a line, run a command or a round, print the result.

use anyhow::{Context, Result};
use echoes_core::{
    Command, EngineError, Generator, JsonFileStore, RoundReport, Session, StateStore, StoryEngine,
    Transcript,
};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Completes on Ctrl-C; never completes if the signal cannot be watched.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn print_narrative(text: &str) {
    println!();
    for para in text.split("\n\n") {
        println!("{}", para.trim());
        println!();
    }
}

fn print_choices(choices: &[String]) {
    if choices.is_empty() {
        return;
    }
    println!("What do you do?");
    for (n, choice) in choices.iter().enumerate() {
        println!("  {}. {choice}", n + 1);
    }
}

fn print_report(report: &RoundReport) {
    print_narrative(&report.narrative);
    for item in &report.items_gained {
        println!("[+] {}", item.name);
    }
    for item in &report.items_lost {
        println!("[-] {}", item.name);
    }
    if !report.items_gained.is_empty() || !report.items_lost.is_empty() {
        println!();
    }
}

/// Play `session` until it ends or input runs out.
pub async fn run<G, S>(
    engine: &mut StoryEngine<G, S>,
    mut session: Session,
    save_dir: &Path,
) -> Result<()>
where
    G: Generator,
    S: StateStore,
{
    println!("\n{}\n", session.character.describe());
    println!("Session {} (type 'help' for commands)", session.id);
    let mut transcript = if session.round == 0 {
        print_narrative(&session.premise);
        Transcript::new()
    } else {
        println!(
            "Resuming at round {} of {}.",
            session.round,
            session.round_limit()
        );
        if let Some(last) = session.journal.entries().last() {
            print_narrative(&last.narrative);
        }
        Transcript::resumed(&session)
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while session.is_active() {
        print_choices(&session.choices);
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            if let Err(err) = engine.flush(&mut session).await {
                report_error(&err);
            }
            println!("\nYour progress is saved. Resume with --resume {}", session.id);
            return Ok(());
        };

        let command = Command::parse(&line);
        if let Some(text) = command.render(&session) {
            println!("\n{text}\n");
            continue;
        }
        match command {
            Command::Quit => {
                println!("\nAre you sure you want to end your adventure? (y/n)");
                print!("> ");
                std::io::stdout().flush().ok();
                let answer = lines.next_line().await?.unwrap_or_default();
                if !confirms(&answer) {
                    println!("\nAdventure continues...\n");
                    continue;
                }
                match engine.quit(&mut session).await {
                    Ok(()) => println!("\nYou set down your pack for the last time."),
                    Err(err) => report_error(&err),
                }
            }
            Command::Action(action) if action.is_empty() => {}
            Command::Action(action) => {
                println!("\n...");
                match engine
                    .play_round_cancellable(&mut session, &action, interrupted())
                    .await
                {
                    Ok(report) => {
                        print_report(&report);
                        transcript.record(&report);
                    }
                    Err(err) => {
                        report_error(&err);
                        if !err.is_recoverable() {
                            return Err(err.into());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    finish(engine, &session, transcript, save_dir).await
}

/// A yes to the quit prompt.
fn confirms(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with('y')
}

fn report_error(err: &EngineError) {
    match err {
        EngineError::GenerationFailure { .. } => {
            println!("[The narrator lost the thread: {err}. Nothing changed; try again.]");
        }
        EngineError::Persistence(_) => {
            println!("[Could not save: {err}. The round will be saved with your next action.]");
        }
        _ => println!("[ERROR] {err}"),
    }
}

/// Epilogue plus the adventure log.
async fn finish<G, S>(
    engine: &StoryEngine<G, S>,
    session: &Session,
    mut transcript: Transcript,
    save_dir: &Path,
) -> Result<()>
where
    G: Generator,
    S: StateStore,
{
    if let Some(reason) = session.end_reason {
        println!("\n=== THE END ({}) ===", reason.describe());
    }
    match engine.epilogue(session).await {
        Ok(epilogue) => {
            print_narrative(&epilogue);
            transcript.set_epilogue(epilogue);
        }
        Err(err) => {
            tracing::warn!(error = %err, "epilogue unavailable");
            println!("[The epilogue could not be written: {err}]");
        }
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let path = save_dir.join(Transcript::file_name(session, now));
    tokio::fs::write(&path, transcript.render(session))
        .await
        .with_context(|| format!("failed to write adventure log to {}", path.display()))?;
    println!("Your adventure log was saved to {}", path.display());
    Ok(())
}

/// Print one line per saved session.
pub async fn list_saves(store: &JsonFileStore) -> Result<()> {
    let ids = store.list().await?;
    if ids.is_empty() {
        println!("No saved sessions in {}.", store.dir().display());
        return Ok(());
    }
    for id in ids {
        match store.get(id).await {
            Ok(Some(record)) => println!(
                "{id}  {:<20} round {:>2}/{:<2} {}",
                record.character.name(),
                record.session.round,
                record.session.story_length.round_limit(),
                record.session.status
            ),
            Ok(None) => {}
            Err(err) => println!("{id}  (unreadable: {err})"),
        }
    }
    Ok(())
}
