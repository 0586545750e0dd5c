//! Transfer scheduling
//!
//! Runs transfer units with bounded concurrency:
//! - `concurrency <= 1` runs strictly sequentially in input order
//! - otherwise a pre-filled queue is drained by exactly `concurrency` workers,
//!   optionally largest units first
//! - every unit ends up in the report exactly once, including units never
//!   dispatched because the run was aborted or cancelled

use crate::core::{Transfer, TransferOutcome, SUCCESS_MESSAGE};
use crate::error::{MigrateError, Result};
use crate::inventory::TransferUnit;
use crate::progress::ProgressReporter;
use crate::report::{Report, ResultRecord};
use crossbeam::channel::{unbounded, Receiver, Sender};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Report message for units skipped because the run stopped early
pub const NOT_ATTEMPTED_MESSAGE: &str = "not attempted: run aborted";

const IN_FLIGHT_GAUGE: &str = "artifact_migrate_transfers_in_flight";
const TRANSFERS_COUNTER: &str = "artifact_migrate_transfers_total";

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of workers
    pub concurrency: usize,
    /// Stop dispatching after the first failure
    pub fail_fast: bool,
    /// Dispatch largest units first (concurrent mode only)
    pub largest_first: bool,
    /// Pause a worker takes after each unit
    pub sleep: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            fail_fast: false,
            largest_first: false,
            sleep: None,
        }
    }
}

/// Transfer statistics
#[derive(Debug, Default)]
pub struct TransferStats {
    /// Transfers currently running
    pub in_flight: AtomicUsize,
    /// Highest `in_flight` observed
    pub peak_in_flight: AtomicUsize,
    pub completed: AtomicU64,
    pub succeeded: AtomicU64,
    pub skipped: AtomicU64,
    pub failed: AtomicU64,
    /// Bytes of all attempted units
    pub bytes: AtomicU64,
}

impl TransferStats {
    fn start(&self, size: u64) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        self.bytes.fetch_add(size, Ordering::Relaxed);
        metrics::gauge!(IN_FLIGHT_GAUGE).increment(1.0);
    }

    fn finish(&self, outcome: &TransferOutcome) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        metrics::gauge!(IN_FLIGHT_GAUGE).decrement(1.0);

        let counter = match outcome {
            TransferOutcome::Succeeded => &self.succeeded,
            TransferOutcome::Skipped(_) => &self.skipped,
            TransferOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(TRANSFERS_COUNTER, "outcome" => outcome.label()).increment(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `TransferStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub peak_in_flight: usize,
    pub completed: u64,
    pub succeeded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes: u64,
}

/// State shared by every worker
struct WorkerContext {
    transfer: Arc<dyn Transfer>,
    report: Arc<Report>,
    stats: Arc<TransferStats>,
    shutdown: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    progress: Option<Arc<ProgressReporter>>,
    fail_fast: bool,
    sleep: Option<Duration>,
}

impl WorkerContext {
    fn should_stop(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst) || self.cancelled.load(Ordering::SeqCst)
    }

    /// Transfer one unit and record it. Returns the error that aborts the run
    /// under fail-fast.
    async fn process(&self, unit: &TransferUnit) -> Option<MigrateError> {
        self.stats.start(unit.size);
        let started = Instant::now();
        let outcome = match AssertUnwindSafe(self.transfer.transfer(unit)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => TransferOutcome::Failed(MigrateError::Panicked(panic_message(panic.as_ref()))),
        };
        let elapsed = started.elapsed();
        self.stats.finish(&outcome);
        if let Some(progress) = &self.progress {
            progress.complete_file(unit.size);
        }

        let abort = match outcome {
            TransferOutcome::Succeeded => {
                tracing::debug!("Pushed {} in {:?}", unit.destination_path, elapsed);
                self.report.add_succeeded(ResultRecord::for_unit(unit, elapsed, SUCCESS_MESSAGE));
                None
            }
            TransferOutcome::Skipped(message) => {
                self.report.add_skipped(ResultRecord::for_unit(unit, elapsed, message));
                None
            }
            TransferOutcome::Failed(e) => {
                tracing::warn!("Failed to migrate {} ({}): {}", unit.display_name(), unit.source, e);
                self.report.add_failed(ResultRecord::for_unit(unit, elapsed, e.to_string()));
                if self.fail_fast {
                    self.shutdown.store(true, Ordering::SeqCst);
                    Some(MigrateError::Aborted {
                        path: unit.source.to_string(),
                        source: Box::new(e),
                    })
                } else {
                    None
                }
            }
        };

        if let Some(pause) = self.sleep {
            tokio::time::sleep(pause).await;
        }
        abort
    }

    fn record_not_attempted(&self, units: impl Iterator<Item = TransferUnit>) {
        let mut count = 0usize;
        for unit in units {
            self.report
                .add_skipped(ResultRecord::for_unit(&unit, Duration::ZERO, NOT_ATTEMPTED_MESSAGE));
            if let Some(progress) = &self.progress {
                progress.complete_file(0);
            }
            count += 1;
        }
        if count > 0 {
            tracing::info!("{} units were not attempted", count);
        }
    }
}

/// Bounded-concurrency transfer scheduler
pub struct TransferScheduler {
    config: SchedulerConfig,
    transfer: Arc<dyn Transfer>,
    report: Arc<Report>,
    stats: Arc<TransferStats>,
    /// Set by the first failure under fail-fast
    shutdown: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    progress: Option<Arc<ProgressReporter>>,
}

impl TransferScheduler {
    pub fn new(config: SchedulerConfig, transfer: Arc<dyn Transfer>, report: Arc<Report>) -> Self {
        Self {
            config,
            transfer,
            report,
            stats: Arc::new(TransferStats::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Count completed units on a progress bar
    pub fn with_progress(mut self, progress: Option<Arc<ProgressReporter>>) -> Self {
        self.progress = progress;
        self
    }

    /// Observe an external cancellation flag
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn stats(&self) -> Arc<TransferStats> {
        Arc::clone(&self.stats)
    }

    pub fn report(&self) -> Arc<Report> {
        Arc::clone(&self.report)
    }

    fn context(&self) -> Arc<WorkerContext> {
        Arc::new(WorkerContext {
            transfer: Arc::clone(&self.transfer),
            report: Arc::clone(&self.report),
            stats: Arc::clone(&self.stats),
            shutdown: Arc::clone(&self.shutdown),
            cancelled: Arc::clone(&self.cancelled),
            progress: self.progress.clone(),
            fail_fast: self.config.fail_fast,
            sleep: self.config.sleep,
        })
    }

    /// Transfer every unit. Returns the first fail-fast error, or
    /// `Cancelled`, once all workers have drained.
    pub async fn run(&self, units: Vec<TransferUnit>) -> Result<()> {
        if let Some(progress) = &self.progress {
            progress.set_total_files(units.len() as u64);
        }

        let context = self.context();
        let first_error = if self.config.concurrency <= 1 {
            run_sequential(&context, units).await
        } else {
            self.run_concurrent(context, units).await
        };

        match first_error {
            Some(e) => Err(e),
            None if self.cancelled.load(Ordering::SeqCst) => Err(MigrateError::Cancelled),
            None => Ok(()),
        }
    }

    async fn run_concurrent(&self, context: Arc<WorkerContext>, mut units: Vec<TransferUnit>) -> Option<MigrateError> {
        if self.config.largest_first {
            units.sort_by(|a, b| b.size.cmp(&a.size));
        }

        let (task_tx, task_rx) = unbounded();
        for unit in units {
            // the receiver is alive, send cannot fail
            let _ = task_tx.send(unit);
        }
        drop(task_tx);

        let (error_tx, error_rx) = unbounded();
        let workers: Vec<_> = (0..self.config.concurrency)
            .map(|id| {
                let tasks = task_rx.clone();
                let errors = error_tx.clone();
                tokio::spawn(worker(id, tasks, errors, Arc::clone(&context)))
            })
            .collect();
        drop(error_tx);

        for joined in futures::future::join_all(workers).await {
            if let Err(e) = joined {
                tracing::error!("Transfer worker panicked: {}", e);
            }
        }

        context.record_not_attempted(task_rx.try_iter());
        error_rx.try_iter().next()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn run_sequential(context: &WorkerContext, units: Vec<TransferUnit>) -> Option<MigrateError> {
    let mut first_error = None;
    let mut pending = units.into_iter();

    while !context.should_stop() {
        let Some(unit) = pending.next() else {
            break;
        };
        if let Some(e) = context.process(&unit).await {
            first_error.get_or_insert(e);
        }
    }

    context.record_not_attempted(pending);
    first_error
}

async fn worker(
    id: usize,
    tasks: Receiver<TransferUnit>,
    errors: Sender<MigrateError>,
    context: Arc<WorkerContext>,
) {
    tracing::debug!("Worker {} started", id);
    while !context.should_stop() {
        let Ok(unit) = tasks.try_recv() else {
            break;
        };
        if let Some(e) = context.process(&unit).await {
            let _ = errors.send(e);
        }
    }
    tracing::debug!("Worker {} shutting down", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CONFLICT_MESSAGE;
    use crate::inventory::{Coordinate, Payload, SourceLocation};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Outcome decided by destination path
    #[derive(Default)]
    struct ScriptedTransfer {
        delay: Duration,
        conflicts: HashSet<String>,
        failures: HashSet<String>,
        panics: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransfer {
        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn conflict(mut self, path: &str) -> Self {
            self.conflicts.insert(path.to_string());
            self
        }

        fn fail(mut self, path: &str) -> Self {
            self.failures.insert(path.to_string());
            self
        }

        fn panic(mut self, path: &str) -> Self {
            self.panics.insert(path.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transfer for ScriptedTransfer {
        async fn transfer(&self, unit: &TransferUnit) -> TransferOutcome {
            self.calls.lock().unwrap().push(unit.destination_path.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panics.contains(&unit.destination_path) {
                panic!("transfer of {} blew up", unit.destination_path);
            }
            if self.failures.contains(&unit.destination_path) {
                TransferOutcome::Failed(MigrateError::UnexpectedStatus {
                    url: unit.destination_path.clone(),
                    status: 500,
                    body: String::new(),
                })
            } else if self.conflicts.contains(&unit.destination_path) {
                TransferOutcome::Skipped(CONFLICT_MESSAGE.to_string())
            } else {
                TransferOutcome::Succeeded
            }
        }
    }

    fn unit(path: &str, size: u64) -> TransferUnit {
        TransferUnit {
            coordinate: Coordinate::Path { path: path.to_string() },
            source: SourceLocation::Remote(format!("http://src/{}", path)),
            destination_path: path.to_string(),
            size,
            payload: Payload::Raw,
        }
    }

    fn units(n: usize) -> Vec<TransferUnit> {
        (0..n).map(|i| unit(&format!("f{:03}", i), i as u64)).collect()
    }

    fn scheduler(config: SchedulerConfig, transfer: Arc<ScriptedTransfer>) -> TransferScheduler {
        TransferScheduler::new(config, transfer, Arc::new(Report::new()))
    }

    #[tokio::test]
    async fn test_sample_scenario() {
        let transfer = Arc::new(ScriptedTransfer::default().conflict("g1/a1/v1/f1.jar"));
        let sched = scheduler(SchedulerConfig::default(), transfer);
        sched
            .run(vec![unit("g1/a1/v1/f1.jar", 10), unit("g1/a1/v1/f1.jar.md5", 1)])
            .await
            .unwrap();

        let summary = sched.report().summary();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(sched.report().skipped()[0].message, CONFLICT_MESSAGE);
    }

    #[tokio::test]
    async fn test_sequential_keeps_input_order() {
        let transfer = Arc::new(ScriptedTransfer::default());
        let config = SchedulerConfig {
            largest_first: true,
            ..Default::default()
        };
        scheduler(config, Arc::clone(&transfer)).run(units(5)).await.unwrap();
        assert_eq!(transfer.calls(), vec!["f000", "f001", "f002", "f003", "f004"]);
    }

    #[tokio::test]
    async fn test_largest_first_dispatch() {
        let transfer = Arc::new(ScriptedTransfer::default());
        let config = SchedulerConfig {
            concurrency: 2,
            largest_first: true,
            ..Default::default()
        };
        scheduler(config, Arc::clone(&transfer)).run(units(5)).await.unwrap();
        assert_eq!(transfer.calls(), vec!["f004", "f003", "f002", "f001", "f000"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_ceiling() {
        let transfer = Arc::new(ScriptedTransfer::default().with_delay(Duration::from_millis(10)));
        let config = SchedulerConfig {
            concurrency: 3,
            ..Default::default()
        };
        let sched = scheduler(config, transfer);
        sched.run(units(30)).await.unwrap();

        let stats = sched.stats().snapshot();
        assert!(stats.peak_in_flight <= 3);
        assert!(stats.peak_in_flight >= 2);
        assert_eq!(stats.completed, 30);
        assert_eq!(sched.report().total_count(), 30);
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent() {
        let script = || {
            ScriptedTransfer::default()
                .conflict("f002")
                .fail("f005")
                .with_delay(Duration::from_millis(1))
        };
        let rows = |report: Arc<Report>| -> Vec<(String, String, u64, String)> {
            report
                .merged()
                .into_iter()
                .map(|r| (r.name, r.path, r.size, r.message))
                .collect()
        };

        let sequential = scheduler(SchedulerConfig::default(), Arc::new(script()));
        sequential.run(units(12)).await.unwrap();

        let concurrent = scheduler(
            SchedulerConfig {
                concurrency: 4,
                largest_first: true,
                ..Default::default()
            },
            Arc::new(script()),
        );
        concurrent.run(units(12)).await.unwrap();

        assert_eq!(rows(sequential.report()), rows(concurrent.report()));
    }

    #[tokio::test]
    async fn test_conflict_and_failure_do_not_stop_run() {
        let transfer = Arc::new(ScriptedTransfer::default().conflict("f001").fail("f002"));
        let sched = scheduler(SchedulerConfig::default(), transfer);
        sched.run(units(5)).await.unwrap();

        let summary = sched.report().summary();
        assert_eq!((summary.succeeded, summary.skipped, summary.failed), (3, 1, 1));
    }

    #[tokio::test]
    async fn test_fail_fast_sequential() {
        let transfer = Arc::new(ScriptedTransfer::default().fail("f001"));
        let config = SchedulerConfig {
            fail_fast: true,
            ..Default::default()
        };
        let sched = scheduler(config, Arc::clone(&transfer));
        let err = sched.run(units(4)).await.unwrap_err();

        assert!(matches!(err, MigrateError::Aborted { .. }));
        assert_eq!(err.status(), Some(500));
        assert_eq!(transfer.calls().len(), 2);

        let report = sched.report();
        assert_eq!(report.summary().failed, 1);
        assert_eq!(report.summary().succeeded, 1);
        let skipped = report.skipped();
        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().all(|r| r.message == NOT_ATTEMPTED_MESSAGE));
    }

    #[tokio::test]
    async fn test_fail_fast_concurrent_drains() {
        let transfer = Arc::new(
            ScriptedTransfer::default()
                .fail("f000")
                .with_delay(Duration::from_millis(5)),
        );
        let config = SchedulerConfig {
            concurrency: 2,
            fail_fast: true,
            ..Default::default()
        };
        let sched = scheduler(config, Arc::clone(&transfer));
        let err = sched.run(units(20)).await.unwrap_err();

        assert!(matches!(err, MigrateError::Aborted { .. }));
        assert!(transfer.calls().len() < 20);
        assert_eq!(sched.report().total_count(), 20);
        assert_eq!(sched.report().summary().failed, 1);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let cancelled = Arc::new(AtomicBool::new(true));
        let transfer = Arc::new(ScriptedTransfer::default());
        let sched = scheduler(SchedulerConfig::default(), Arc::clone(&transfer)).with_cancellation(cancelled);

        let err = sched.run(units(3)).await.unwrap_err();
        assert!(matches!(err, MigrateError::Cancelled));
        assert!(transfer.calls().is_empty());
        assert_eq!(sched.report().summary().skipped, 3);
    }

    #[tokio::test]
    async fn test_panicking_transfer_is_reported_failed() {
        let transfer = Arc::new(ScriptedTransfer::default().panic("f001"));
        let sequential = scheduler(SchedulerConfig::default(), Arc::clone(&transfer));
        sequential.run(units(3)).await.unwrap();
        let failed = sequential.report().failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, "http://src/f001");
        assert!(failed[0].message.contains("blew up"));
        assert_eq!(sequential.report().summary().succeeded, 2);

        let concurrent = scheduler(
            SchedulerConfig {
                concurrency: 2,
                ..Default::default()
            },
            Arc::new(ScriptedTransfer::default().panic("f001")),
        );
        concurrent.run(units(6)).await.unwrap();
        assert_eq!(concurrent.report().total_count(), 6);
        assert_eq!(concurrent.report().summary().failed, 1);
        assert_eq!(concurrent.stats().in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_counts_every_unit() {
        let progress = Arc::new(ProgressReporter::disabled());
        let transfer = Arc::new(ScriptedTransfer::default().conflict("f000").fail("f001"));
        let sched = scheduler(SchedulerConfig::default(), transfer).with_progress(Some(Arc::clone(&progress)));
        sched.run(units(4)).await.unwrap();
        assert_eq!(progress.files_done(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_every_unit_is_reported(
            n in 0usize..40,
            concurrency in 1usize..6,
            fail_fast in any::<bool>(),
            failing in proptest::collection::hash_set(0usize..40, 0..5),
            conflicting in proptest::collection::hash_set(0usize..40, 0..5),
        ) {
            let mut transfer = ScriptedTransfer::default();
            for i in &failing {
                transfer = transfer.fail(&format!("f{:03}", i));
            }
            for i in &conflicting {
                transfer = transfer.conflict(&format!("f{:03}", i));
            }
            let config = SchedulerConfig { concurrency, fail_fast, largest_first: true, sleep: None };
            let sched = scheduler(config, Arc::new(transfer));

            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let result = runtime.block_on(sched.run(units(n)));

            let summary = sched.report().summary();
            prop_assert_eq!(summary.succeeded + summary.skipped + summary.failed, n);
            let any_failed = failing.iter().any(|i| *i < n);
            prop_assert_eq!(result.is_err(), fail_fast && any_failed);
        }
    }
}
