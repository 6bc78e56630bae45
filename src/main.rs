//! Docket Archiver main entry point
//!
//! This is the command-line interface for archiving a regulatory docket and
//! post-processing the resulting archive directory.

use anyhow::Context;
use clap::Parser;
use docket_archiver::config::{load_config, Config};
use docket_archiver::crawler::{ArchiveOptions, Coordinator};
use docket_archiver::output::{
    diff_archives, extract_comments, extract_new_comments, load_statistics, move_spreadsheets,
    print_diff, print_statistics,
};
use docket_archiver::state::ArchiveStage;
use docket_archiver::storage::{CheckpointStore, JsonManifestStore};
use docket_archiver::ConfigError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Docket Archiver: a resumable, quota-aware docket crawler
///
/// Archives a docket's details, documents, comments and comment attachments
/// into an output directory. Interrupted runs resume from the checkpoint
/// manifest kept alongside the artifacts.
#[derive(Parser, Debug)]
#[command(name = "docket-archiver")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, quota-aware docket archiver", long_about = None)]
struct Cli {
    /// Archive output directory
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "./archiver.toml")]
    config: PathBuf,

    /// Docket to archive
    #[arg(short = 'i', long, value_name = "ID")]
    docket_id: Option<String>,

    /// Ignore the resume manifest and fetch everything again
    #[arg(long)]
    no_resume: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what a run would do without fetching
    #[arg(long, conflicts_with_all = ["stats", "extract_comments", "move_attachments", "diff"])]
    dry_run: bool,

    /// Show progress statistics from the resume manifest and exit
    #[arg(long, conflicts_with_all = ["dry_run", "extract_comments", "move_attachments", "diff"])]
    stats: bool,

    /// Write every archived comment as text into DIR and exit
    ///
    /// With --diff, only the comments new to this archive are written.
    #[arg(short, long, value_name = "DIR", conflicts_with_all = ["dry_run", "stats", "move_attachments"])]
    extract_comments: Option<PathBuf>,

    /// Copy spreadsheet attachments into DIR and exit
    #[arg(short, long, value_name = "DIR", conflicts_with_all = ["dry_run", "stats", "extract_comments", "diff"])]
    move_attachments: Option<PathBuf>,

    /// Compare the archive with an older archive in ORIG_DIR and exit
    #[arg(short, long, value_name = "ORIG_DIR", conflicts_with_all = ["dry_run", "stats", "move_attachments"])]
    diff: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(original) = &cli.diff {
        handle_diff(&cli.output, original, cli.extract_comments.as_deref())
    } else if let Some(extract_dir) = &cli.extract_comments {
        let count = extract_comments(&cli.output, extract_dir)?;
        println!("✓ Extracted {} comments to: {}", count, extract_dir.display());
        Ok(())
    } else if let Some(target) = &cli.move_attachments {
        let count = move_spreadsheets(&cli.output, target)?;
        println!("✓ Copied {} spreadsheets to: {}", count, target.display());
        Ok(())
    } else if cli.stats {
        handle_stats(&cli.output)
    } else {
        let config = load_configuration(&cli.config)?;
        if cli.dry_run {
            handle_dry_run(&config, &cli)
        } else {
            handle_archive(&config, &cli).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docket_archiver=info,warn"),
            1 => EnvFilter::new("docket_archiver=debug,info"),
            2 => EnvFilter::new("docket_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_configuration(path: &Path) -> anyhow::Result<Config> {
    tracing::info!("Loading configuration from: {}", path.display());
    match load_config(path) {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e).with_context(|| format!("invalid configuration in {}", path.display()))
        }
    }
}

fn require_docket_id(cli: &Cli) -> Result<String, ConfigError> {
    match cli.docket_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ConfigError::Validation(
            "a docket id is required (--docket-id)".to_string(),
        )),
    }
}

/// Handles the --dry-run mode: validates inputs and shows what would be fetched
fn handle_dry_run(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let docket_id = require_docket_id(cli)?;
    println!("=== Docket Archiver Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Docket: {}", docket_id);

    println!("\nFetcher:");
    println!(
        "  Quota: {} requests per {}s",
        config.fetcher.requests_per_window,
        config.fetcher.quota_window().as_secs()
    );
    println!(
        "  Cool-down after 429: {}s",
        config.fetcher.rate_limit_cooldown().as_secs()
    );
    println!(
        "  Page size: {} ({} items per batch)",
        config.pagination.page_size,
        config.pagination.max_items_per_batch()
    );
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nOutput: {}", cli.output.display());
    let pending = if cli.no_resume {
        ArchiveStage::DocketDetails
    } else {
        JsonManifestStore::new(&cli.output).load()?.pending_stage()
    };

    println!("\nStages:");
    for stage in ArchiveStage::ALL {
        let marker = if stage < pending { "done" } else { "pending" };
        let network = if stage.uses_network() { "network" } else { "local" };
        println!("  - {} [{}, {}]", stage, marker, network);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would resume at: {}", pending);

    Ok(())
}

/// Handles the --stats mode: shows progress recorded in the resume manifest
fn handle_stats(output: &Path) -> anyhow::Result<()> {
    let store = JsonManifestStore::new(output);
    println!("Manifest: {}\n", store.path().display());

    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --diff mode, extracting new comments when a folder is given
fn handle_diff(output: &Path, original: &Path, extract_dir: Option<&Path>) -> anyhow::Result<()> {
    let diff = diff_archives(output, original)?;
    let Some(extract_dir) = extract_dir else {
        print_diff(&diff);
        return Ok(());
    };

    let missing = extract_new_comments(output, &diff, extract_dir)?;
    println!(
        "✓ Extracted {} new comments to: {}",
        diff.only_in_newer.len() - missing.len(),
        extract_dir.display()
    );
    for key in &missing {
        println!("!! Could not find file for comment: {}", key.artifact_name());
    }
    if !diff.only_in_original.is_empty() {
        println!(
            "{} comments exist only in {}",
            diff.only_in_original.len(),
            original.display()
        );
    }

    Ok(())
}

/// Handles the main archive operation
async fn handle_archive(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let docket_id = require_docket_id(cli)?;
    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("cannot create output directory {}", cli.output.display()))?;

    if cli.no_resume {
        tracing::info!("Starting fresh archive (ignoring resume manifest)");
    } else {
        tracing::info!("Starting archive (will resume if a manifest exists)");
    }

    let options = ArchiveOptions {
        docket_id,
        output_dir: cli.output.clone(),
        resume: !cli.no_resume,
    };
    let mut coordinator = Coordinator::new(config, options)?;

    let cancellation = coordinator.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, stopping after the current unit (Ctrl-C again to abort)");
        cancellation.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt received, aborting");
            std::process::exit(130);
        }
    });

    match coordinator.run().await {
        Ok(report) => {
            tracing::info!(
                "Archived {} documents, {} comments, {} attachment files with {} requests in {:.2?}",
                report.documents,
                report.comments,
                report.attachment_files,
                report.requests_sent,
                report.elapsed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Archive failed: {}", e);
            Err(e.into())
        }
    }
}
