// src/pipeline/mod.rs
// =============================================================================
// The item pipeline: an ordered sequence of independent stages every
// record passes through after extraction.
//
// Each stage takes the record and either hands it on (possibly
// modified) or drops it with a typed reason. A drop ends that record's
// journey and touches nothing else in flight. The runner holds the
// fixed stage order; stages share state only through their own sync
// primitives, so records can flow through concurrently.
//
// Standard order: validation -> deduplication -> download -> export
// (-> optional csv). close() runs every stage's teardown even when an
// earlier one fails, because the export writer must always finalize.
// =============================================================================

mod csv_sink;
mod dedup;
mod download;
mod export;
mod validation;

pub use csv_sink::CsvExportStage;
pub use dedup::DedupStage;
pub use download::DownloadStage;
pub use export::JsonExportStage;
pub use validation::ValidationStage;

use crate::error::{DropReason, PipelineError};
use crate::records::ProductRecord;
use async_trait::async_trait;
use tracing::warn;

/// What one stage decided about one record.
pub enum StageOutcome {
    Continue(ProductRecord),
    Drop(DropReason),
}

/// One pipeline stage. `process` may mutate the record (stages add
/// fields, e.g. downloaded manuals gain a local path); `close` runs at
/// run teardown.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, record: ProductRecord) -> Result<StageOutcome, PipelineError>;

    async fn close(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Owns the ordered stage list for a run.
pub struct ItemPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl ItemPipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        ItemPipeline { stages }
    }

    /// Runs one record through every stage in order. Returns the record
    /// when it survived the whole pipeline, None when a stage dropped it.
    pub async fn process(
        &self,
        mut record: ProductRecord,
    ) -> Result<Option<ProductRecord>, PipelineError> {
        for stage in &self.stages {
            match stage.process(record).await? {
                StageOutcome::Continue(next) => record = next,
                StageOutcome::Drop(reason) => {
                    warn!(stage = stage.name(), reason = %reason, "record dropped");
                    return Ok(None);
                }
            }
        }
        Ok(Some(record))
    }

    /// Tears down every stage. Later stages still close when an earlier
    /// close fails; the first error is reported.
    pub async fn close(&self) -> Result<(), PipelineError> {
        let mut first_error = None;
        for stage in &self.stages {
            if let Err(e) = stage.close().await {
                warn!(stage = stage.name(), error = %e, "stage close failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is #[async_trait]?
//    - Traits can't have async methods in stable Rust without boxing
//    - The async_trait macro rewrites each async fn into one returning
//      a boxed future, so Stage implementations can await (downloads,
//      file writes) behind a plain trait object
//
// 2. Why Box<dyn Stage> instead of generics?
//    - The stage list is heterogeneous and its order is data, not types
//    - Dynamic dispatch keeps the runner a simple Vec walk
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(url: &str) -> ProductRecord {
        ProductRecord::new(url.to_string(), "rona".to_string(), "Drill".to_string())
    }

    /// Counts how many records reach it; optionally drops everything.
    struct CountingStage {
        seen: Arc<AtomicUsize>,
        drop_all: bool,
    }

    impl CountingStage {
        fn new(drop_all: bool) -> (Self, Arc<AtomicUsize>) {
            let seen = Arc::new(AtomicUsize::new(0));
            (
                CountingStage {
                    seen: seen.clone(),
                    drop_all,
                },
                seen,
            )
        }
    }

    #[async_trait]
    impl Stage for CountingStage {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn process(&self, record: ProductRecord) -> Result<StageOutcome, PipelineError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.drop_all {
                Ok(StageOutcome::Drop(DropReason::MissingName))
            } else {
                Ok(StageOutcome::Continue(record))
            }
        }
    }

    #[tokio::test]
    async fn test_record_flows_through_all_stages_in_order() {
        let (first, first_seen) = CountingStage::new(false);
        let (second, second_seen) = CountingStage::new(false);
        let pipeline = ItemPipeline::new(vec![Box::new(first), Box::new(second)]);

        let out = pipeline.process(record("https://x.com/p/1")).await.unwrap();
        assert!(out.is_some());
        assert_eq!(first_seen.load(Ordering::SeqCst), 1);
        assert_eq!(second_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_halts_later_stages_for_that_record_only() {
        let (dropper, _) = CountingStage::new(true);
        let (after, after_seen) = CountingStage::new(false);
        let pipeline = ItemPipeline::new(vec![Box::new(dropper), Box::new(after)]);

        let out = pipeline.process(record("https://x.com/p/1")).await.unwrap();
        assert!(out.is_none());
        // The stage after the drop never saw the record
        assert_eq!(after_seen.load(Ordering::SeqCst), 0);

        // A second, independent record still flows in
        let out = pipeline.process(record("https://x.com/p/2")).await.unwrap();
        assert!(out.is_none());
        assert_eq!(after_seen.load(Ordering::SeqCst), 0);
    }
}
