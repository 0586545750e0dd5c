//! Migration pipeline
//!
//! One run: check credentials, ask the destination what it already holds,
//! list the source, build the inventory, then push what is left through the
//! transfer scheduler.

use crate::config::MigrateConfig;
use crate::core::{HttpTransfer, RetryPolicy, SchedulerConfig, StatsSnapshot, TransferScheduler};
use crate::error::{MigrateError, Result};
use crate::http::build_client;
use crate::inventory::{Inventory, InventoryBuilder, InventoryCounts};
use crate::kind;
use crate::progress::ProgressReporter;
use crate::registry::{Destination, ExistenceOracle};
use crate::report::Report;
use crate::source::adapter_for;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Migration run result
#[derive(Debug)]
pub struct MigrationResult {
    /// Per-unit results (empty when nothing was transferred)
    pub report: Arc<Report>,
    /// Units that were scheduled (or would have been, on a dry run)
    pub inventory: Inventory,
    /// Shape of the inventory that was scheduled
    pub counts: InventoryCounts,
    /// Source entries that classified
    pub scanned: usize,
    /// Units the destination did not have yet
    pub needed: usize,
    pub stats: StatsSnapshot,
    pub duration: Duration,
    /// Inventory built but nothing transferred
    pub dry_run: bool,
    /// Why the transfer stage stopped early (fail-fast or cancellation)
    pub abort: Option<MigrateError>,
}

impl MigrationResult {
    /// True when every scheduled unit succeeded or was skipped
    pub fn is_success(&self) -> bool {
        self.abort.is_none() && self.report.is_success()
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        let summary = self.report.summary();
        println!("\n=== Migration Summary ===");
        println!("Scanned:         {}", self.scanned);
        println!("Needed:          {}", self.needed);
        println!("Succeeded:       {}", summary.succeeded);
        println!("Skipped:         {}", summary.skipped);
        println!("Failed:          {}", summary.failed);
        println!("Data:            {}", humansize::format_size(self.stats.bytes, humansize::BINARY));
        println!("Duration:        {:.2?}", self.duration);
        if let Some(e) = &self.abort {
            println!("\nStopped early: {}", e);
        }
    }
}

/// Runs one migration
pub struct Migration {
    config: MigrateConfig,
    progress: Option<Arc<ProgressReporter>>,
    cancelled: Arc<AtomicBool>,
}

impl Migration {
    pub fn new(config: MigrateConfig) -> Self {
        Self {
            config,
            progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set progress reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Get cancellation flag for external control
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Cancel the run; units in flight finish, nothing new starts
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_status(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress.set_status(message);
        }
    }

    /// Execute the migration
    ///
    /// Errors before the transfer stage (credentials, destination URL,
    /// existence queries, listing) are returned directly. Once transfers
    /// start, the result always carries the report; an early stop is in
    /// `MigrationResult::abort`.
    pub async fn execute(&self) -> Result<MigrationResult> {
        let start_time = Instant::now();
        let config = &self.config;
        let kind = kind::for_type(config.kind, config);

        let destination = Destination::parse(&config.destination, kind.artifact_type().name(), kind.path_layout())?;
        let credentials = config
            .destination_credentials
            .clone()
            .ok_or_else(|| MigrateError::Unauthorized(destination.registry_host().to_string()))?;
        let client = build_client(config)?;

        let existence = if config.force {
            tracing::info!("Force mode, not checking what the destination already holds");
            None
        } else {
            self.set_status("Fetching existing artifacts");
            let oracle = ExistenceOracle::new(client.clone(), destination.clone(), credentials.clone());
            Some(oracle.fetch(kind.as_ref()).await?)
        };
        if self.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        let adapter = adapter_for(config, client.clone())?;
        self.set_status(&format!("Listing {}", adapter.describe()));
        tracing::info!("Listing {}", adapter.describe());
        let entries = adapter.list().await?;
        if self.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        let outcome = InventoryBuilder::new(kind.as_ref())
            .with_existence(existence.as_ref())
            .force(config.force)
            .max_files(config.max_files)
            .build(entries);

        let units = outcome.inventory.units();
        let mut result = MigrationResult {
            report: Arc::new(Report::new()),
            counts: outcome.inventory.counts(),
            inventory: outcome.inventory,
            scanned: outcome.scanned,
            needed: outcome.needed,
            stats: StatsSnapshot::default(),
            duration: Duration::ZERO,
            dry_run: config.dry_run,
            abort: None,
        };

        if units.is_empty() {
            if outcome.scanned > 0 {
                tracing::info!("All artifacts have been migrated");
            } else {
                tracing::info!("No artifacts found in the source");
            }
            self.finish(&mut result, start_time);
            return Ok(result);
        }
        if config.dry_run {
            tracing::info!("Dry run, {} files would be migrated", outcome.needed);
            self.finish(&mut result, start_time);
            return Ok(result);
        }

        let transfer = HttpTransfer::new(client, destination)
            .with_source_credentials(config.source_credentials.clone())
            .with_destination_credentials(Some(credentials))
            .with_retry(RetryPolicy::from_config(config));
        let scheduler_config = SchedulerConfig {
            concurrency: config.concurrency.max(1),
            fail_fast: config.fail_fast,
            largest_first: config.largest_first.unwrap_or_else(|| kind.largest_first()),
            sleep: config.sleep,
        };
        let scheduler = TransferScheduler::new(scheduler_config, Arc::new(transfer), Arc::clone(&result.report))
            .with_progress(self.progress.clone())
            .with_cancellation(self.cancellation_flag());

        self.set_status(&format!("Pushing {} files", outcome.needed));
        tracing::info!(
            "Pushing {} files ({}) with concurrency {}",
            outcome.needed,
            humansize::format_size(result.counts.bytes, humansize::BINARY),
            config.concurrency.max(1)
        );
        result.abort = scheduler.run(units).await.err();
        result.stats = scheduler.stats().snapshot();

        self.finish(&mut result, start_time);
        Ok(result)
    }

    fn finish(&self, result: &mut MigrationResult, start_time: Instant) {
        result.duration = start_time.elapsed();
        if let Some(progress) = &self.progress {
            let summary = result.report.summary();
            let message = format!(
                "{} succeeded, {} skipped, {} failed",
                summary.succeeded, summary.skipped, summary.failed
            );
            if result.is_success() {
                progress.finish_success(&message);
            } else {
                progress.finish_error(&message);
            }
        }
    }
}
