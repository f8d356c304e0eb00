//! CLI command definitions, routing, and tracing setup.

use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use transync_core::pipeline::{ProgressReporter, SyncOptions, run_sync, unprocessed_items};
use transync_core::{Classifier, RunLock};
use transync_memory::{HttpMemory, NullMemory, Publisher};
use transync_shared::{
    AppConfig, SyncRunSummary, init_config, load_config, validate_api_key,
};
use transync_source::FsSource;
use transync_summarize::{AnthropicClient, Transformer};
use transync_tracker::SqliteTracker;

/// How many pending transcripts a dry run prints before eliding the rest.
const DRY_RUN_PREVIEW: usize = 20;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Transync — sync meeting transcripts into your memory store.
#[derive(Parser)]
#[command(
    name = "transync",
    version,
    about = "Summarize new meeting transcripts and publish them to a memory store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Find unprocessed transcripts, summarize them, and publish the results.
    Run {
        /// Transcripts directory to scan (defaults to config).
        #[arg(short, long)]
        source: Option<String>,

        /// Tracker database path (defaults to config).
        #[arg(long)]
        db: Option<String>,

        /// Maximum transcripts to process this run.
        #[arg(short, long)]
        limit: Option<usize>,

        /// List what would be processed without summarizing or publishing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recent sync runs.
    History {
        /// Tracker database path (defaults to config).
        #[arg(long)]
        db: Option<String>,

        /// Maximum runs to show.
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = format!(
        "transync_cli={level},transync_core={level},transync_tracker={level},\
         transync_source={level},transync_summarize={level},transync_memory={level}"
    );

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            source,
            db,
            limit,
            dry_run,
        } => cmd_run(source.as_deref(), db.as_deref(), limit, dry_run).await,
        Command::History { db, limit } => cmd_history(db.as_deref(), limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    source_dir: Option<&str>,
    db_path: Option<&str>,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let config = load_config()?;

    let source_dir = source_dir
        .map(String::from)
        .unwrap_or_else(|| config.defaults.transcripts_dir.clone());
    let db_path = db_path
        .map(String::from)
        .unwrap_or_else(|| config.defaults.db_path.clone());
    let limit = limit.or(config.defaults.limit);

    let source = FsSource::new(&source_dir);
    let tracker = SqliteTracker::open(Path::new(&db_path)).await?;

    let options = SyncOptions {
        limit,
        retry_errors: config.defaults.retry_errors,
        stage_timeout: Duration::from_secs(config.defaults.stage_timeout_secs),
    };

    if dry_run {
        let pending = unprocessed_items(&source, &tracker, &options).await?;
        println!("Would process {} transcripts:", pending.len());
        for item in pending.iter().take(DRY_RUN_PREVIEW) {
            println!("  {}", item.path);
        }
        if pending.len() > DRY_RUN_PREVIEW {
            println!("  ... and {} more", pending.len() - DRY_RUN_PREVIEW);
        }
        return Ok(());
    }

    // Validate the API key before acquiring the lock or touching anything.
    validate_api_key(&config)?;

    let _lock = RunLock::acquire(Path::new(&db_path))?;

    info!(source = %source_dir, db = %db_path, ?limit, "starting sync run");

    let classifier = Classifier::new(&config.mapping);
    let client = AnthropicClient::from_config(&config.anthropic)?;
    let transformer = Transformer::new(client, config.anthropic.max_input_chars);

    let reporter = CliProgress::new();

    let summary = match HttpMemory::from_config(&config.memory)? {
        Some(store) => {
            run_sync(
                &options,
                &source,
                &classifier,
                &transformer,
                &Publisher::new(store, config.memory.entity_kind.clone()),
                &tracker,
                &reporter,
            )
            .await?
        }
        None => {
            info!("no memory endpoint configured, publishing to the logging placeholder");
            run_sync(
                &options,
                &source,
                &classifier,
                &transformer,
                &Publisher::new(NullMemory, config.memory.entity_kind.clone()),
                &tracker,
                &reporter,
            )
            .await?
        }
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SyncRunSummary) {
    println!();
    println!("  Sync complete!");
    println!("  Total:    {}", summary.total);
    println!("  Success:  {}", summary.success);
    println!("  Empty:    {}", summary.empty);
    println!("  Failed:   {}", summary.failed);
    println!("  Time:     {:.1}s", summary.duration_seconds());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_started(&self, name: &str, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Processing [{current}/{total}] {name}"
        ));
    }

    fn done(&self, _summary: &SyncRunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

async fn cmd_history(db_path: Option<&str>, limit: u32) -> Result<()> {
    let config = load_config()?;
    let db_path = db_path
        .map(String::from)
        .unwrap_or_else(|| config.defaults.db_path.clone());

    let tracker = SqliteTracker::open(Path::new(&db_path)).await?;
    let runs = tracker.recent_runs(limit).await?;

    if runs.is_empty() {
        println!("No sync runs recorded yet.");
        return Ok(());
    }

    println!("{:<20}  {:>5}  {:>7}  {:>5}  {:>6}  {}", "started", "total", "success", "empty", "failed", "status");
    for run in runs {
        println!(
            "{:<20}  {:>5}  {:>7}  {:>5}  {:>6}  {}",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.total,
            run.success,
            run.empty,
            run.failed,
            run.status,
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
