//! Echoes of the Wasteland.
//!
//! A line-oriented text adventure narrated by Claude. Sessions are saved
//! after every round and can be resumed:
//!
//! ```bash
//! cargo run -p echoes
//! cargo run -p echoes -- --resume 6f1c...-...
//! ECHOES_LOG=echoes_core=debug cargo run -p echoes
//! ```

mod creation;
mod play;

use anyhow::{bail, Context, Result};
use echoes_core::{ClaudeGenerator, EngineConfig, JsonFileStore, SessionId, StoryEngine};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_SAVE_DIR: &str = "saves";

/// Command line options.
#[derive(Debug, Default)]
struct Args {
    help: bool,
    resume: Option<SessionId>,
    list: bool,
    saves: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => parsed.help = true,
            "--list" => parsed.list = true,
            "--resume" => {
                let id = args.get(i + 1).context("--resume needs a session id")?;
                parsed.resume = Some(id.parse().context("invalid session id")?);
                i += 1;
            }
            "--saves" => {
                let dir = args.get(i + 1).context("--saves needs a directory")?;
                parsed.saves = Some(PathBuf::from(dir));
                i += 1;
            }
            "--config" => {
                let path = args.get(i + 1).context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
                i += 1;
            }
            other => bail!("unknown argument: {other} (try --help)"),
        }
        i += 1;
    }
    Ok(parsed)
}

/// Log to stderr so the story on stdout stays readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ECHOES_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os("ECHOES_CONFIG").map(PathBuf::from));
    let config = match path {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default().with_env_overrides()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let argv: Vec<String> = std::env::args().collect();
    let args = parse_args(&argv)?;
    if args.help {
        print_help();
        return Ok(());
    }

    let save_dir = args
        .saves
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_DIR));
    let store = JsonFileStore::open(&save_dir)
        .await
        .with_context(|| format!("failed to open save directory {}", save_dir.display()))?;

    if args.list {
        return play::list_saves(&store).await;
    }

    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export ANTHROPIC_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let config = load_config(&args)?;
    let generator = ClaudeGenerator::from_env(&config)?;
    tracing::info!(model = generator.model(), saves = %save_dir.display(), "starting");
    let mut engine = StoryEngine::new(generator, store, config);

    let session = match args.resume {
        Some(id) => engine.resume(id).await?,
        None => {
            let Some(session_config) = creation::run()? else {
                println!("Maybe next time.");
                return Ok(());
            };
            engine.begin(session_config).await?
        }
    };

    play::run(&mut engine, session, &save_dir).await
}

fn print_help() {
    println!("Echoes of the Wasteland - a text adventure narrated by Claude");
    println!();
    println!("USAGE:");
    println!("  echoes [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --resume <ID>       Continue a saved session");
    println!("  --list              List saved sessions");
    println!("  --saves <DIR>       Save directory (default: {DEFAULT_SAVE_DIR})");
    println!("  --config <PATH>     TOML config file (or set ECHOES_CONFIG)");
    println!();
    println!("ENVIRONMENT:");
    println!("  ANTHROPIC_API_KEY      Required");
    println!("  ECHOES_MODEL           Claude model to use");
    println!("  ECHOES_RECENT_WINDOW   Rounds kept verbatim in the prompt");
    println!("  ECHOES_CONTEXT_BUDGET  Character budget for NPCs and recent events");
    println!("  ECHOES_TIMEOUT_SECS    Seconds before a narrator call is abandoned");
    println!("  ECHOES_LOG             Log filter, e.g. echoes_core=debug (default: warn)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("echoes")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args() {
        let id = SessionId::new();
        let id_text = id.to_string();
        let parsed = parse_args(&argv(&["--resume", &id_text, "--saves", "/tmp/x"])).unwrap();
        assert_eq!(parsed.resume, Some(id));
        assert_eq!(parsed.saves, Some(PathBuf::from("/tmp/x")));
        assert!(!parsed.help);

        assert!(parse_args(&argv(&["--help"])).unwrap().help);
        assert!(parse_args(&argv(&["--resume"])).is_err());
        assert!(parse_args(&argv(&["--resume", "nope"])).is_err());
        assert!(parse_args(&argv(&["--bogus"])).is_err());
    }
}
