//! Binary entrypoint for the ncterm CLI.
//!
//! Commands:
//! - `init` - write a starter `ncterm.toml`
//! - `play` - interactive prompt; state is saved after every command
//! - `exec <words...>` - run one command line and print the JSON result
//! - `status` - print the stored player summary
//!
//! See the library crate docs for module-level details: `ncterm::`.
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use ncterm::config::{AdapterMode, Config};
use ncterm::engine::{
    Content, GameSession, GameStore, GameStoreBuilder, InterpretOptions, SimulatedAdapter,
    TimeoutAdapter,
};

#[derive(Parser)]
#[command(name = "ncterm")]
#[command(about = "NetCorp terminal simulator: learn the shell, uncover the conspiracy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "ncterm.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Start an interactive session
    Play,
    /// Run a single command line and print the result as JSON
    Exec {
        /// The command line, e.g. `exec cat admin_note.txt`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Show the stored player summary
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            return Ok(());
        }
        _ => Config::load(&cli.config).await?,
    };
    init_logging(&Some(config.clone()), cli.verbose);

    match cli.command {
        Commands::Init => {}
        Commands::Play => {
            let store = GameStoreBuilder::new(config.game.data_path()).open()?;
            let mut session = open_session(&config, &store)?;
            run_prompt(&mut session, &store).await?;
        }
        Commands::Exec { words } => {
            let store = GameStoreBuilder::new(config.game.data_path()).open()?;
            let mut session = open_session(&config, &store)?;
            let (line, options) = InterpretOptions::from_cli_line(&words.join(" "));
            let result = session.interpret(&line, options).await;
            persist(&mut session, &store)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Status => {
            let store = GameStoreBuilder::new(config.game.data_path())
                .without_lock()
                .open()?;
            let state = store.load_player(
                &config.game.player_id,
                &config.game.display_name,
                chrono::Utc::now(),
            )?;
            let p = &state.player;
            println!("Player:       {} ({})", p.display_name, p.id);
            println!("Position:     {} (tier {})", p.title, p.tier);
            println!("Level / XP:   {} / {}", p.level, p.xp);
            println!("Quests done:  {}", p.completed_quests.len());
            println!("Discoveries:  {}", p.discoveries.len());
            println!("Achievements: {}", p.achievements.join(", "));
            println!("Danger log:   {} attempts", store.danger_log(&p.id)?.len());
        }
    }

    Ok(())
}

fn open_session(config: &Config, store: &GameStore) -> Result<GameSession> {
    let content = Content::load(config.game.content_dir.as_deref().map(std::path::Path::new))?;
    let state = store.load_player(
        &config.game.player_id,
        &config.game.display_name,
        chrono::Utc::now(),
    )?;
    let adapter = match config.adapter.mode {
        AdapterMode::Simulated => TimeoutAdapter::new(
            SimulatedAdapter::new(&config.adapter.hostname, &config.adapter.username),
            Duration::from_millis(config.adapter.timeout_ms),
        ),
    };
    info!(
        "session for '{}' (level {}, tier {})",
        state.player.id, state.player.level, state.player.tier
    );
    Ok(GameSession::new(state, content).with_adapter(Box::new(adapter)))
}

fn persist(session: &mut GameSession, store: &GameStore) -> Result<()> {
    let player_id = session.state().player.id.clone();
    for attempt in session.drain_danger_attempts() {
        store.append_danger(&player_id, &attempt)?;
    }
    store.save_player(session.state())?;
    Ok(())
}

async fn run_prompt(session: &mut GameSession, store: &GameStore) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(b"NetCorp Terminal - type 'help' to begin, 'exit' to leave.\n")
        .await?;
    loop {
        let prompt = format!(
            "{}@{}$ ",
            session.state().player.id,
            session.state().player.title.to_lowercase()
        );
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        let Some(input) = lines.next_line().await? else {
            break;
        };
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }
        let (line, options) = InterpretOptions::from_cli_line(trimmed);
        let result = session.interpret(&line, options).await;
        if !result.output.is_empty() {
            stdout.write_all(result.output.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        if let Err(e) = persist(session, store) {
            warn!("failed to save progress: {}", e);
        }
    }
    store.flush()?;
    info!("session closed for '{}'", session.state().player.id);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let configured = config
        .as_ref()
        .and_then(|c| log::LevelFilter::from_str(&c.logging.level).ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Interactive play writes to the console too; piped output stays clean.
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if record.target() == "security" {
                    if let Some(ref sec_path) = security_path {
                        if let Ok(mut sf) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(sec_path)
                        {
                            let _ = writeln!(sf, "{}", line);
                        }
                    }
                }

                if is_tty && record.level() <= log::Level::Warn {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
