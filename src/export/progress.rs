//! Progress tracking for export runs
//!
//! Every segment reports each completed page here. The tracker keeps the
//! run-wide row count, logs one structured event per page and optionally
//! drives a spinner on the terminal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Progress observation for one completed page of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub segment: u32,
    /// Rows returned by the page
    pub page_rows: u64,
    /// Rows examined by the page
    pub scanned: u64,
    /// Rows exported by this segment so far
    pub segment_total: u64,
}

/// Progress tracker shared by all segments of a run
pub struct ProgressTracker {
    /// Rows exported so far across all segments
    processed: AtomicU64,
    /// Start time of the run
    start_time: Instant,
    /// Progress spinner (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a spinner
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {pos} records {msg}")
            {
                bar.set_style(style);
            }
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Record a completed page
    ///
    /// # Returns
    /// * `u64` - Run-wide total after this page
    pub fn record_page(&self, page: &PageProgress) -> u64 {
        let total = self.processed.fetch_add(page.page_rows, Ordering::Relaxed) + page.page_rows;

        info!(
            segment = page.segment,
            page_rows = page.page_rows,
            scanned = page.scanned,
            segment_total = page.segment_total,
            total,
            "Retrieved {} records; total at {} records. Scanned count: {}",
            page.page_rows,
            total,
            page.scanned
        );

        if let Some(ref bar) = self.bar {
            bar.set_position(total);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = total as f64 / elapsed;
                bar.set_message(format!("({:.0} records/sec)", speed));
            }
        }

        total
    }

    /// Rows exported so far
    pub fn total(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
