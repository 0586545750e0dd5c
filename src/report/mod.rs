//! Migration report
//!
//! Workers append results concurrently; rendering happens once at the end
//! and sorts by artifact name so output does not depend on completion order.

use crate::config::OutputFormat;
use crate::inventory::TransferUnit;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const MB: f64 = 1024.0 * 1024.0;

/// One row of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    /// Artifact display name (`g:a:v`, `name=version`, file name)
    pub name: String,
    /// Source path or download URL
    pub path: String,
    pub size: u64,
    pub elapsed_ms: u64,
    pub message: String,
}

impl ResultRecord {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        elapsed: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            elapsed_ms: elapsed.as_millis() as u64,
            message: message.into(),
        }
    }

    /// Record for a transfer unit
    pub fn for_unit(unit: &TransferUnit, elapsed: Duration, message: impl Into<String>) -> Self {
        Self::new(unit.display_name(), unit.source.to_string(), unit.size, elapsed, message)
    }

    fn size_mb(&self) -> f64 {
        self.size as f64 / MB
    }

    fn seconds(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}

/// Counts per outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: ReportSummary,
    succeeded: &'a [ResultRecord],
    skipped: &'a [ResultRecord],
    failed: &'a [ResultRecord],
}

/// Append-only, thread-safe result accumulator
#[derive(Debug, Default)]
pub struct Report {
    succeeded: Mutex<Vec<ResultRecord>>,
    skipped: Mutex<Vec<ResultRecord>>,
    failed: Mutex<Vec<ResultRecord>>,
}

fn lock(list: &Mutex<Vec<ResultRecord>>) -> MutexGuard<'_, Vec<ResultRecord>> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_succeeded(&self, record: ResultRecord) {
        lock(&self.succeeded).push(record);
    }

    pub fn add_skipped(&self, record: ResultRecord) {
        lock(&self.skipped).push(record);
    }

    pub fn add_failed(&self, record: ResultRecord) {
        lock(&self.failed).push(record);
    }

    pub fn total_count(&self) -> usize {
        self.summary().total
    }

    pub fn summary(&self) -> ReportSummary {
        let succeeded = lock(&self.succeeded).len();
        let skipped = lock(&self.skipped).len();
        let failed = lock(&self.failed).len();
        ReportSummary {
            succeeded,
            skipped,
            failed,
            total: succeeded + skipped + failed,
        }
    }

    /// True when no unit failed
    pub fn is_success(&self) -> bool {
        lock(&self.failed).is_empty()
    }

    pub fn succeeded(&self) -> Vec<ResultRecord> {
        lock(&self.succeeded).clone()
    }

    pub fn skipped(&self) -> Vec<ResultRecord> {
        lock(&self.skipped).clone()
    }

    pub fn failed(&self) -> Vec<ResultRecord> {
        lock(&self.failed).clone()
    }

    /// All records sorted by name, then path
    pub fn merged(&self) -> Vec<ResultRecord> {
        let mut all = self.succeeded();
        all.extend(self.skipped());
        all.extend(self.failed());
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        all
    }

    pub fn render(&self, w: &mut dyn Write, format: OutputFormat) -> io::Result<()> {
        match format {
            OutputFormat::Text => self.render_text(w),
            OutputFormat::Json => self.render_json(w),
        }
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        let by_name = |mut v: Vec<ResultRecord>| {
            v.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
            v
        };
        let (succeeded, skipped, failed) = (by_name(self.succeeded()), by_name(self.skipped()), by_name(self.failed()));
        let document = ReportDocument {
            summary: self.summary(),
            succeeded: &succeeded,
            skipped: &skipped,
            failed: &failed,
        };
        serde_json::to_writer_pretty(&mut *w, &document)?;
        writeln!(w)
    }

    fn render_text(&self, w: &mut dyn Write) -> io::Result<()> {
        let records = self.merged();
        let headers = ["Artifact", "Src Path", "Size(MB)", "Time(s)", "Result"];

        let rows: Vec<[String; 5]> = records
            .iter()
            .map(|r| {
                [
                    r.name.clone(),
                    r.path.clone(),
                    format!("{:.3}", r.size_mb()),
                    format!("{:.3}", r.seconds()),
                    r.message.clone(),
                ]
            })
            .collect();

        let total_mb: f64 = records.iter().map(ResultRecord::size_mb).sum();
        let total_s: f64 = records.iter().map(ResultRecord::seconds).sum();
        let footer = [
            "Total".to_string(),
            records.len().to_string(),
            format!("{:.3}", total_mb),
            format!("{:.3}", total_s),
            String::new(),
        ];

        let mut widths = headers.map(str::len);
        for row in rows.iter().chain(std::iter::once(&footer)) {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |w: &mut dyn Write, cells: [&str; 5]| -> io::Result<()> {
            writeln!(
                w,
                "{:<a$}  {:<b$}  {:>c$}  {:>d$}  {}",
                cells[0],
                cells[1],
                cells[2],
                cells[3],
                cells[4],
                a = widths[0],
                b = widths[1],
                c = widths[2],
                d = widths[3]
            )
        };
        let rule = "-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1));

        line(&mut *w, headers)?;
        writeln!(w, "{}", rule)?;
        for row in &rows {
            line(&mut *w, row.each_ref().map(String::as_str))?;
        }
        writeln!(w, "{}", rule)?;
        line(&mut *w, footer.each_ref().map(String::as_str))?;

        let summary = self.summary();
        writeln!(
            w,
            "\nSucceeded: {}, Skipped: {}, Failed: {}",
            summary.succeeded, summary.skipped, summary.failed
        )
    }
}
