//! Harvest-Ripple main entry point
//!
//! This is the command-line interface for the Harvest-Ripple content harvester.

use anyhow::Context;
use clap::Parser;
use harvest_ripple::config::{build_fleet, load_config_with_hash, Config};
use harvest_ripple::Fleet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Harvest-Ripple: a concurrent content harvester
///
/// Harvest-Ripple crawls websites with a pool of workers per site and
/// collects text matched by configured patterns into plain text files.
#[derive(Parser, Debug)]
#[command(name = "harvest-ripple")]
#[command(version)]
#[command(about = "A concurrent content harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the configured jobs without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let fleet = build_fleet(&config, Some(config_hash)).context("failed to build jobs")?;
    handle_harvest(&config, &fleet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("harvest_ripple=info,warn"),
            1 => EnvFilter::new("harvest_ripple=debug,info"),
            2 => EnvFilter::new("harvest_ripple=trace,debug"),
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

/// Handles the --dry-run mode: prints the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Harvest-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Connect timeout: {}ms", config.crawler.connect_timeout_ms);
    println!(
        "  Rate-limit cooldown: {}ms",
        config.crawler.rate_limit_cooldown_ms
    );
    println!("  Cache size: {}", config.crawler.cache_size);
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nOutput directory: {}", config.output.directory.display());

    println!("\nJobs ({}):", config.jobs.len());
    for job in &config.jobs {
        println!("  - {} ({} workers)", job.start_url, job.threads);
        if !job.options.is_empty() {
            let options: Vec<&str> = job.options.iter().map(|o| o.as_str()).collect();
            println!("    options: {}", options.join(", "));
        }
        if let Some(language) = &job.restrict_language {
            println!("    language: {}", language);
        }
        for pattern in &job.patterns {
            let source = pattern
                .standard
                .as_deref()
                .or(pattern.pattern.as_deref())
                .unwrap_or("-");
            let limit = pattern.limit.unwrap_or(job.limit);
            println!("    * {} = {} (limit {})", pattern.name, source, limit);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Runs every job until it finishes or Ctrl-C is pressed, then reports
async fn handle_harvest(config: &Config, fleet: &Fleet) -> anyhow::Result<()> {
    let started = fleet.start_all().await;
    if started == 0 {
        anyhow::bail!("none of the {} configured jobs could be started", fleet.len());
    }
    tracing::info!("Started {} of {} jobs", started, fleet.len());

    tokio::select! {
        _ = fleet.wait_all() => {
            tracing::info!("All jobs finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, stopping {} running jobs", fleet.running_count());
            fleet.stop_all().await;
        }
    }

    let report = fleet.report();
    println!("{}", report);

    if let Some(summary_file) = &config.output.summary_file {
        std::fs::create_dir_all(&config.output.directory)?;
        let path = config.output.directory.join(summary_file);
        report
            .write_markdown(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("✓ Summary written to: {}", path.display());
    }

    Ok(())
}
