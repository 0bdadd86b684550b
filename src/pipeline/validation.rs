// src/pipeline/validation.rs
// =============================================================================
// First pipeline stage: re-checks the required-field invariants the
// extraction engine already enforced. Defense in depth - a record that
// somehow arrives without a name or source URL never reaches the
// writers.
// =============================================================================

use crate::error::{DropReason, PipelineError};
use crate::pipeline::{Stage, StageOutcome};
use crate::records::ProductRecord;
use async_trait::async_trait;

pub struct ValidationStage;

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn process(&self, record: ProductRecord) -> Result<StageOutcome, PipelineError> {
        if record.name.trim().is_empty() {
            return Ok(StageOutcome::Drop(DropReason::MissingName));
        }
        if record.url.trim().is_empty() {
            return Ok(StageOutcome::Drop(DropReason::MissingUrl));
        }
        Ok(StageOutcome::Continue(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, name: &str) -> ProductRecord {
        ProductRecord::new(url.to_string(), "rona".to_string(), name.to_string())
    }

    #[tokio::test]
    async fn test_valid_record_passes() {
        let out = ValidationStage
            .process(record("https://x.com/p/1", "Drill"))
            .await
            .unwrap();
        assert!(matches!(out, StageOutcome::Continue(_)));
    }

    #[tokio::test]
    async fn test_blank_name_drops() {
        let out = ValidationStage
            .process(record("https://x.com/p/1", "   "))
            .await
            .unwrap();
        assert!(matches!(
            out,
            StageOutcome::Drop(DropReason::MissingName)
        ));
    }

    #[tokio::test]
    async fn test_blank_url_drops() {
        let out = ValidationStage.process(record("", "Drill")).await.unwrap();
        assert!(matches!(out, StageOutcome::Drop(DropReason::MissingUrl)));
    }
}
