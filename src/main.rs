//! artifact-migrate CLI
//!
//! Migrates artifacts from a local or remote repository into an artifact
//! registry, skipping what the destination already holds.

use artifact_migrate::config::{CliArgs, MigrateConfig};
use artifact_migrate::core::Migration;
use artifact_migrate::error::{MigrateError, Result};
use artifact_migrate::progress::ProgressReporter;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG wins over -v
    let default_level = if args.verbose > 0 { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    // Build configuration
    let config = MigrateConfig::from_cli(&args)?;

    // Print configuration if verbose
    if args.verbose > 1 {
        print_config(&config);
    }

    // Create progress reporter
    let progress = if args.progress && !args.quiet {
        ProgressReporter::new()
    } else {
        ProgressReporter::disabled()
    };

    if config.dry_run && !args.quiet {
        println!("=== Dry Run Mode ===");
        println!("Nothing will be transferred.");
        println!();
    }

    let migration = Migration::new(config).with_progress(progress);
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| MigrateError::config(format!("Failed to start async runtime: {}", e)))?;

    // Stop dispatching on Ctrl-C; units in flight finish and the report still prints
    let cancelled = migration.cancellation_flag();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, waiting for transfers in flight");
            cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let result = runtime.block_on(migration.execute())?;

    // Print results
    if !args.quiet {
        let mut out = std::io::stdout().lock();
        if args.verbose > 0 || result.dry_run {
            result.inventory.render(&mut out)?;
        }
        if !result.dry_run {
            result.report.render(&mut out, args.output_format)?;
        }
        drop(out);
        if !result.dry_run {
            result.print_summary();
        }
    }

    if let Some(e) = result.abort {
        return Err(e);
    }
    if !result.report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_config(config: &MigrateConfig) {
    println!("=== Configuration ===");
    println!("Type:          {}", config.kind.name());
    println!("Source:        {} ({:?})", config.source, config.source_type);
    println!("Destination:   {}", config.destination);
    println!("Concurrency:   {}", config.concurrency);
    println!("Force:         {}", config.force);
    println!("Fail fast:     {}", config.fail_fast);
    println!("Retries:       {} (delay {})", config.retries, humantime::format_duration(config.retry_delay));
    println!("Timeout:       {}", humantime::format_duration(config.timeout));
    if let Some(max) = config.max_files {
        println!("Max files:     {}", max);
    }
    if let Some(prefix) = &config.prefix {
        println!("Prefix:        {}", prefix);
    }
    println!();
}
