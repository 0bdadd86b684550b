// src/pipeline/dedup.rs
// =============================================================================
// Second pipeline stage: one exported record per source URL per run.
// Membership is the normalized URL, and DashSet::insert is the single
// atomic check-and-mark, so two workers racing on the same URL can
// never both get through. First seen wins.
// =============================================================================

use crate::error::{DropReason, PipelineError};
use crate::pipeline::{Stage, StageOutcome};
use crate::records::ProductRecord;
use crate::urls::normalize;
use async_trait::async_trait;
use dashmap::DashSet;
use url::Url;

#[derive(Default)]
pub struct DedupStage {
    seen: DashSet<String>,
}

impl DedupStage {
    pub fn new() -> Self {
        Self::default()
    }

    fn fingerprint(record: &ProductRecord) -> String {
        match Url::parse(&record.url) {
            Ok(url) => normalize(&url),
            // An unparsable URL still dedups, just on its raw form
            Err(_) => record.url.clone(),
        }
    }
}

#[async_trait]
impl Stage for DedupStage {
    fn name(&self) -> &'static str {
        "deduplication"
    }

    async fn process(&self, record: ProductRecord) -> Result<StageOutcome, PipelineError> {
        if self.seen.insert(Self::fingerprint(&record)) {
            Ok(StageOutcome::Continue(record))
        } else {
            Ok(StageOutcome::Drop(DropReason::DuplicateUrl))
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why DashSet instead of HashSet?
//    - Records from many workers hit this stage concurrently
//    - DashSet shards its locks internally, and insert() atomically
//      answers "was this already present?" in one call
//    - With a plain HashSet we'd need a Mutex and a separate
//      contains-then-insert, which is exactly the race we're avoiding
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(url: &str) -> ProductRecord {
        ProductRecord::new(url.to_string(), "rona".to_string(), "Drill".to_string())
    }

    #[tokio::test]
    async fn test_second_occurrence_drops_as_duplicate() {
        let stage = DedupStage::new();

        let first = stage.process(record("https://x.com/p/1")).await.unwrap();
        assert!(matches!(first, StageOutcome::Continue(_)));

        let second = stage.process(record("https://x.com/p/1")).await.unwrap();
        assert!(matches!(
            second,
            StageOutcome::Drop(DropReason::DuplicateUrl)
        ));
    }

    #[tokio::test]
    async fn test_normalized_variants_collide() {
        let stage = DedupStage::new();
        stage.process(record("https://x.com/p/1/")).await.unwrap();

        let dup = stage
            .process(record("https://x.com/p/1?"))
            .await
            .unwrap();
        assert!(matches!(dup, StageOutcome::Drop(DropReason::DuplicateUrl)));
    }

    #[tokio::test]
    async fn test_distinct_urls_never_collide_under_concurrency() {
        let stage = Arc::new(DedupStage::new());

        let mut handles = Vec::new();
        for i in 0..64 {
            let stage = stage.clone();
            handles.push(tokio::spawn(async move {
                let out = stage
                    .process(record(&format!("https://x.com/p/{}", i)))
                    .await
                    .unwrap();
                matches!(out, StageOutcome::Continue(_))
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_same_url_under_concurrency_passes_exactly_once() {
        let stage = Arc::new(DedupStage::new());

        let mut handles = Vec::new();
        for _ in 0..32 {
            let stage = stage.clone();
            handles.push(tokio::spawn(async move {
                let out = stage.process(record("https://x.com/p/races")).await.unwrap();
                matches!(out, StageOutcome::Continue(_))
            }));
        }

        let mut passed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                passed += 1;
            }
        }
        assert_eq!(passed, 1);
    }
}
