//! Euterpe - Personalized Feed Synthesis Service
//!
//! This is the main entry point for the feed server and the one-shot
//! pipeline commands (seeding, liking, rebuilding, profile inspection).

use clap::{Parser, Subcommand};
use euterpe_core::{
    api::{ApiServer, ApiServerConfig},
    config::Settings,
    engage::EngagementRecorder,
    error::{EuterpeError, Result},
    ledger::{EngagementLedger, FileLedger},
    reconcile::FeedReconciler,
    scoring::{LlmOracle, PopularityOracle, RelevanceOracle, RelevanceScorer},
    seed,
    store::{ActivityStore, MemoryStore, RestStore},
    types::FeedKey,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{self, EnvFilter};

/// Assembled pipeline shared by the server and the one-shot commands
struct Pipeline {
    store: Arc<dyn ActivityStore>,
    ledger: Arc<FileLedger>,
    recorder: Arc<EngagementRecorder>,
    reconciler: Arc<FeedReconciler>,
    store_label: &'static str,
}

/// Select the activity store backend
///
/// A configured base URL selects the remote feed store; without one,
/// activities live in process memory and are lost on exit.
fn build_store(settings: &Settings) -> Result<(Arc<dyn ActivityStore>, &'static str)> {
    if settings.store.base_url.is_some() {
        Ok((Arc::new(RestStore::new(&settings.store)?), "rest"))
    } else {
        Ok((Arc::new(MemoryStore::new()), "memory"))
    }
}

/// Select the relevance oracle
///
/// Without an API key, scoring degrades to the popularity heuristic.
fn build_oracle(settings: &Settings) -> Result<Arc<dyn RelevanceOracle>> {
    if settings.oracle.api_key.is_empty() {
        warn!("ANTHROPIC_API_KEY not set, scoring with the popularity heuristic");
        Ok(Arc::new(PopularityOracle::new()))
    } else {
        Ok(Arc::new(LlmOracle::new(settings.oracle.clone())?))
    }
}

/// Wire up the full pipeline from settings
async fn build_pipeline(settings: &Settings) -> Result<Pipeline> {
    let (store, store_label) = build_store(settings)?;

    let ledger_path = settings.ledger_path()?;
    debug!("Using engagement ledger: {}", ledger_path.display());
    let ledger = Arc::new(FileLedger::open(ledger_path).await?);
    let ledger_dyn: Arc<dyn EngagementLedger> = ledger.clone();

    let oracle = build_oracle(settings)?;
    let scorer = RelevanceScorer::new(
        oracle,
        settings.rebuild.concurrency,
        Duration::from_secs(settings.oracle.timeout_secs),
    );

    let recorder = Arc::new(EngagementRecorder::new(
        store.clone(),
        ledger_dyn.clone(),
        settings.rebuild.candidate_page_size,
    ));
    let reconciler = Arc::new(FeedReconciler::new(
        store.clone(),
        ledger_dyn,
        scorer,
        &settings.rebuild,
    ));

    Ok(Pipeline {
        store,
        ledger,
        recorder,
        reconciler,
        store_label,
    })
}

/// One-shot commands mutate feeds that must outlive the process
fn require_remote_store(settings: &Settings) -> Result<()> {
    if settings.store.base_url.is_none() {
        return Err(EuterpeError::Config(config::ConfigError::Message(
            "this command needs a remote feed store; set store.base_url or EUTERPE_STORE_URL"
                .to_string(),
        )));
    }
    Ok(())
}

/// Start the HTTP server and run until interrupted
async fn serve(settings: Settings, addr_override: Option<SocketAddr>) -> Result<()> {
    let pipeline = build_pipeline(&settings).await?;

    if pipeline.store_label == "memory" {
        warn!("No store.base_url configured, feeds are held in process memory");
    }

    let config = ApiServerConfig {
        addr: addr_override.unwrap_or(settings.api.addr),
        view_page_size: settings.rebuild.view_page_size,
    };

    let ledger = pipeline.ledger.clone();
    let server = ApiServer::new(
        config,
        pipeline.store,
        pipeline.ledger as Arc<dyn EngagementLedger>,
        pipeline.recorder,
        pipeline.reconciler,
        pipeline.store_label,
    );

    tokio::select! {
        result = server.serve() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping feed server gracefully...");
        }
    }

    ledger.flush().await?;
    info!("Feed server shut down complete");
    Ok(())
}

#[derive(Parser)]
#[command(name = "euterpe")]
#[command(about = "Personalized feed synthesis from engagement history", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Settings file (TOML); defaults to ./euterpe.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the feed server
    Serve {
        /// Bind address (overrides the settings file)
        #[arg(long)]
        addr: Option<SocketAddr>,
    },

    /// Load the demo catalog into the global feed
    Seed,

    /// Record a like against a global activity
    Like {
        /// User recording the like
        #[arg(short, long)]
        user: String,

        /// Foreign ID of the liked activity (e.g. "post:Post:X")
        #[arg(short, long)]
        foreign_id: String,
    },

    /// Rebuild a user's personalized feed
    Rebuild {
        /// User whose feed to rebuild
        user: String,
    },

    /// Show a user's ranked genre preferences
    Profile {
        /// User to inspect
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // CLI level for euterpe, WARN for noisy external crates
    let filter = EnvFilter::new(format!(
        "euterpe={level},euterpe_core={level},tower_http=warn,hyper=warn",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Euterpe v{} starting...", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { addr } => serve(settings, addr).await,
        Commands::Seed => {
            require_remote_store(&settings)?;
            let pipeline = build_pipeline(&settings).await?;

            let added = seed::seed_global(pipeline.store.as_ref()).await?;
            println!("✓ Seeded {} activities into {}", added, FeedKey::global());
            Ok(())
        }
        Commands::Like { user, foreign_id } => {
            require_remote_store(&settings)?;
            let pipeline = build_pipeline(&settings).await?;

            let receipt = pipeline.recorder.record_like(&user, &foreign_id).await?;
            println!(
                "✓ {} liked {} ({} on {})",
                receipt.user,
                receipt.foreign_id,
                if receipt.likes == 1 {
                    "1 like".to_string()
                } else {
                    format!("{} likes", receipt.likes)
                },
                receipt.genre,
            );
            Ok(())
        }
        Commands::Rebuild { user } => {
            require_remote_store(&settings)?;
            let pipeline = build_pipeline(&settings).await?;

            let report = pipeline.reconciler.rebuild(&user).await?;
            if report.is_full() {
                println!(
                    "✓ Rebuilt feed for {}: {} of {} candidates selected, {} removed, {} added",
                    report.user, report.selected, report.candidates, report.removed, report.added,
                );
            } else {
                println!(
                    "⚠ Partial rebuild for {}: {} selected, {} remove failure(s)",
                    report.user,
                    report.selected,
                    report.remove_failures.len(),
                );
                for failure in &report.remove_failures {
                    println!("  ✗ remove {}: {}", failure.foreign_id, failure.error);
                }
                if let Some(err) = &report.append_error {
                    println!("  ✗ append: {}", err);
                }
            }
            Ok(())
        }
        Commands::Profile { user } => {
            let pipeline = build_pipeline(&settings).await?;

            let profile = pipeline.ledger.profile(&user).await?;
            let summary = euterpe_core::profile::PreferenceSummary::from_profile(&profile);

            if summary.is_empty() {
                println!("No engagement recorded for {}", user);
            } else {
                println!("Preferences for {}:", user);
                for entry in summary.entries() {
                    println!("  {} ({} likes)", entry.genre, entry.likes);
                }
            }
            Ok(())
        }
    }
}
