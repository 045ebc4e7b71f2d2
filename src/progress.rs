//! Aggregation of per-worker progress messages into one overall figure.

use std::time::Instant;

use serde::Serialize;

/// How many leaves a worker processed since its last report.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent {
    pub worker: usize,
    pub increment: usize,
}

/// A snapshot handed to the caller's progress callback.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressUpdate {
    /// Overall completion, 0..=100, never decreasing.
    pub percent: u8,
    /// Leaves per second, sampled from one designated worker's stream so
    /// cross-worker timing skew cannot distort the estimate. `None` until
    /// that worker has reported.
    pub throughput: Option<f64>,
}

/// Folds a stream of [`ProgressEvent`]s into a monotonic percentage and a
/// throughput estimate.
pub struct ProgressAggregator {
    total: usize,
    processed: usize,
    last_percent: u8,
    sample_worker: usize,
    sample_processed: usize,
    started: Instant,
}

impl ProgressAggregator {
    /// `total` is the full address count; `sample_worker` designates the
    /// worker whose stream feeds the throughput estimate.
    pub fn new(total: usize, sample_worker: usize) -> Self {
        Self {
            total,
            processed: 0,
            last_percent: 0,
            sample_worker,
            sample_processed: 0,
            started: Instant::now(),
        }
    }

    /// Fold one event in and return the current snapshot.
    pub fn record(&mut self, event: ProgressEvent) -> ProgressUpdate {
        self.processed += event.increment;
        if event.worker == self.sample_worker {
            self.sample_processed += event.increment;
        }

        let percent = if self.total == 0 {
            100
        } else {
            let raw = (self.processed as f64 / self.total as f64) * 100.0;
            raw.round().min(100.0) as u8
        };
        // Non-decreasing even if a straggler event lands after a larger
        // one already pushed the figure up.
        self.last_percent = self.last_percent.max(percent);

        ProgressUpdate {
            percent: self.last_percent,
            throughput: self.throughput(),
        }
    }

    fn throughput(&self) -> Option<f64> {
        if self.sample_processed == 0 {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        Some(self.sample_processed as f64 / elapsed)
    }
}
