// src/stats.rs
// =============================================================================
// Run-level counters, shared by every worker, reported at the end.
// Plain atomics: increments happen on hot paths and nothing ever reads
// them until the snapshot.
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct CrawlStats {
    pub pages_fetched: AtomicUsize,
    pub pages_from_cache: AtomicUsize,
    pub fetch_failures: AtomicUsize,
    pub skipped_robots: AtomicUsize,
    pub skipped_duplicate: AtomicUsize,
    pub extraction_failures: AtomicUsize,
    pub records_dropped: AtomicUsize,
    pub pipeline_failures: AtomicUsize,
    pub records_exported: AtomicUsize,
}

/// Point-in-time copy of the counters, for printing and serializing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub pages_fetched: usize,
    pub pages_from_cache: usize,
    pub fetch_failures: usize,
    pub skipped_robots: usize,
    pub skipped_duplicate: usize,
    pub extraction_failures: usize,
    pub records_dropped: usize,
    pub pipeline_failures: usize,
    pub records_exported: usize,
}

impl CrawlStats {
    pub fn incr(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_from_cache: self.pages_from_cache.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            skipped_robots: self.skipped_robots.load(Ordering::Relaxed),
            skipped_duplicate: self.skipped_duplicate.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            pipeline_failures: self.pipeline_failures.load(Ordering::Relaxed),
            records_exported: self.records_exported.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Per-item failures that should flip the process exit code, as
    /// opposed to ordinary skips and duplicate drops.
    pub fn failure_count(&self) -> usize {
        self.fetch_failures + self.extraction_failures + self.pipeline_failures
    }
}
