//! Patronage CLI - command-line interface for the membership synchronizer.

mod config;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use patronage::store::CacheKey;
use patronage::{ApiClient, CacheStore, LogReporter, NoSeed, Synchronizer};
use tracing_subscriber::EnvFilter;

use crate::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "patronage")]
#[command(version)]
#[command(about = "A crowdfunding membership cache synchronizer")]
#[command(
    long_about = "Patronage keeps a local cache of a creator's campaigns, reward tiers, and \
patron memberships in step with the remote crowdfunding platform. It can run \
scheduled full resyncs and apply individual pledge webhook events."
)]
#[command(after_long_help = r#"EXAMPLES
    Run a full catalog and membership resync:
        $ patronage sync

    Apply a pledge webhook payload:
        $ patronage event created --file payload.json

    Inspect the cached pledge map:
        $ patronage show pledges

CONFIGURATION
    Patronage reads configuration from:
      1. ~/.config/patronage/config.toml (or $XDG_CONFIG_HOME/patronage/config.toml)
      2. ./patronage.toml
      3. Environment variables (PATRONAGE_* prefix)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    PATRONAGE_ACCESS_TOKEN                Platform API creator access token
    PATRONAGE_CACHE_PATH                  Cache file path (default: ~/.local/state/patronage/cache.json)
    PATRONAGE_API__BASE_URL               API base URL (default: https://api.patreon.com)
    PATRONAGE_API__MAX_REQUESTS_PER_HOUR  Hourly request quota (default: 100)
    PATRONAGE_API__MAX_REQUESTS_PER_DAY   Daily request quota (default: 1000)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full catalog and membership resync
    Sync,
    /// Apply a single pledge webhook event to the cache
    Event {
        /// What happened to the pledge
        kind: EventKind,

        /// Path to the JSON event payload (reads stdin if not specified)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print cached state
    Show {
        /// Cache section to print (prints everything if not specified)
        key: Option<ShowKey>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EventKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShowKey {
    Rewards,
    Pledges,
    Declines,
    Users,
    RewardUsers,
}

impl ShowKey {
    fn cache_key(self) -> CacheKey {
        match self {
            ShowKey::Rewards => CacheKey::Rewards,
            ShowKey::Pledges => CacheKey::Pledges,
            ShowKey::Declines => CacheKey::PledgeDeclines,
            ShowKey::Users => CacheKey::Users,
            ShowKey::RewardUsers => CacheKey::RewardUsers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging for non-TTY mode only; interactive runs get
    // console output instead.
    if !Term::stdout().is_term() {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("patronage=info,patronage_cli=info"));

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    let cache_path = config
        .cache_path()
        .ok_or("Failed to determine a cache file path")?;
    let store: Arc<dyn CacheStore> = Arc::new(JsonFileStore::new(cache_path));

    match cli.command {
        Commands::Sync => {
            let problems: Arc<dyn patronage::ProblemReporter> = Arc::new(LogReporter);
            let errors: Arc<dyn patronage::ErrorReporter> = Arc::new(LogReporter);
            let client = ApiClient::new(config.api_config(), problems, errors)?;
            let sync = Synchronizer::new(client, Arc::clone(&store), Arc::new(NoSeed));

            if sync.sync_all().await? {
                println!("{} full resync complete", style("✓").green());
            } else {
                println!(
                    "{} the platform returned no campaigns; cache left untouched",
                    style("!").yellow()
                );
            }
        }
        Commands::Event { kind, file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => std::io::read_to_string(std::io::stdin())?,
            };
            let payload: serde_json::Value = serde_json::from_str(&raw)?;

            match kind {
                EventKind::Created => {
                    patronage::reconcile::pledge_created(store.as_ref(), &payload).await?;
                }
                EventKind::Updated => {
                    patronage::reconcile::pledge_updated(store.as_ref(), &payload).await?;
                }
                EventKind::Deleted => {
                    patronage::reconcile::pledge_deleted(store.as_ref(), &payload).await?;
                }
            }
            println!("{} event applied", style("✓").green());
        }
        Commands::Show { key } => {
            let keys: Vec<CacheKey> = match key {
                Some(key) => vec![key.cache_key()],
                None => vec![
                    CacheKey::Rewards,
                    CacheKey::Pledges,
                    CacheKey::PledgeDeclines,
                    CacheKey::Users,
                    CacheKey::RewardUsers,
                ],
            };
            for key in keys {
                let value = store
                    .get(key)
                    .await?
                    .unwrap_or(serde_json::Value::Object(Default::default()));
                println!("{}", style(key.as_str()).bold());
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        }
    }

    Ok(())
}
