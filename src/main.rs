use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use topic_warden::config::{self, Overrides};
use topic_warden::policy::{MessageLedger, WatchedTopic};
use topic_warden::store::JsonFileStore;
use topic_warden::{Config, Daemon, commands};

/// Warden - Telegram forum-topic message limiter
#[derive(Parser)]
#[command(name = "warden", version, about)]
struct Cli {
    /// Telegram bot token
    #[arg(long, env = "WARDEN_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to the config file (default: ~/.config/omni/warden/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State-file directory
    #[arg(long, env = "WARDEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Watched supergroup chat id (with --thread-id)
    #[arg(long, requires = "thread_id", allow_hyphen_values = true)]
    chat_id: Option<i64>,

    /// Watched forum-topic id (with --chat-id)
    #[arg(long, requires = "chat_id")]
    thread_id: Option<i64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the warden (default)
    Run,
    /// Print the local message ledger for a chat
    Status {
        /// Chat id to inspect
        #[arg(allow_hyphen_values = true)]
        chat_id: i64,
    },
    /// Print users seen within the current cooldown window for a chat
    Check {
        /// Chat id to inspect
        #[arg(allow_hyphen_values = true)]
        chat_id: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,topic_warden=info",
        1 => "info,topic_warden=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = config::load_config_file(cli.config.as_deref());

    match cli.command {
        Some(Command::Status { chat_id }) => {
            let store = open_store(cli.data_dir, &file)?;
            let ledger = MessageLedger::load(Arc::new(store));
            let now = chrono::Utc::now().timestamp();
            let snapshot = ledger.snapshot(chat_id);
            if snapshot.is_empty() {
                println!("no records for chat {chat_id}");
                return Ok(());
            }
            for (user, ts) in &snapshot {
                let ago = commands::format_hm(now.saturating_sub(*ts).unsigned_abs());
                println!("user {user}: {ago} ago");
            }
            println!("total: {} users", snapshot.len());
            Ok(())
        }
        Some(Command::Check { chat_id }) => {
            let window = file
                .limits
                .default_cooldown_secs
                .unwrap_or(config::DEFAULT_COOLDOWN_SECS);
            let store = open_store(cli.data_dir, &file)?;
            let ledger = MessageLedger::load(Arc::new(store));
            let now = chrono::Utc::now().timestamp();
            let recent = ledger.recent_activity(chat_id, window, now);
            if recent.is_empty() {
                println!("no users posted within the current window in chat {chat_id}");
                return Ok(());
            }
            for (user, ts) in recent {
                let ago = commands::format_hm(now.saturating_sub(ts).unsigned_abs());
                println!("user {user}: {ago} ago");
            }
            Ok(())
        }
        Some(Command::Run) | None => {
            let watch = match (cli.chat_id, cli.thread_id) {
                (Some(chat_id), Some(thread_id)) => Some(WatchedTopic { chat_id, thread_id }),
                _ => None,
            };
            let config = Config::resolve(
                file,
                Overrides {
                    bot_token: cli.token,
                    data_dir: cli.data_dir,
                    watch,
                },
            )?;
            Daemon::new(config).run().await?;
            Ok(())
        }
    }
}

/// Open the state store at the resolved data directory (read-only use)
fn open_store(
    cli_data_dir: Option<PathBuf>,
    file: &config::WardenConfigFile,
) -> anyhow::Result<JsonFileStore> {
    let dir = cli_data_dir
        .or_else(|| file.runtime.data_dir.clone())
        .or_else(config::default_data_dir)
        .ok_or_else(|| anyhow::anyhow!("cannot determine a data directory"))?;
    Ok(JsonFileStore::new(&dir)?)
}
