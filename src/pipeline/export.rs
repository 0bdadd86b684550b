// src/pipeline/export.rs
// =============================================================================
// Terminal pipeline stage: streams records into a JSON array on disk.
//
// The writer is an explicit resource: opened (and `[` written) when the
// stage is built at run start, appended to and flushed once per record,
// and closed deterministically at teardown (`]` plus the metadata
// sidecar), however many records made it and whether or not the run was
// cancelled. Because every record is flushed as it lands, an
// interrupted run leaves a file that accounts for exactly the records
// that were exported - it just lacks the closing bracket.
//
// The sidecar carries the run's aggregate counters so downstream
// tooling can tell "zero results" apart from "crashed".
// =============================================================================

use crate::error::PipelineError;
use crate::pipeline::{Stage, StageOutcome};
use crate::records::ProductRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::info;

/// Sidecar written next to the export at run end.
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    pub site: String,
    pub spider_run_start: DateTime<Utc>,
    pub spider_run_end: DateTime<Utc>,
    pub total_items: usize,
    pub items_with_manuals: usize,
    pub items_with_documents: usize,
}

struct ExportWriter {
    file: BufWriter<File>,
    first: bool,
    closed: bool,
}

pub struct JsonExportStage {
    writer: Mutex<ExportWriter>,
    site: String,
    started_at: DateTime<Utc>,
    export_path: PathBuf,
    metadata_path: PathBuf,
    total_items: AtomicUsize,
    items_with_manuals: AtomicUsize,
    items_with_documents: AtomicUsize,
}

impl JsonExportStage {
    /// Opens the export file and writes the array opener. The filename
    /// carries the site and a run timestamp, like
    /// `products_rona_20260806_142501.json`.
    pub fn new(data_dir: &Path, site: &str) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(data_dir)?;

        let started_at = Utc::now();
        let stamp = started_at.format("%Y%m%d_%H%M%S");
        let export_path = data_dir.join(format!("products_{}_{}.json", site, stamp));
        let metadata_path = data_dir.join(format!("products_{}_{}_metadata.json", site, stamp));

        let mut file = BufWriter::new(File::create(&export_path)?);
        file.write_all(b"[\n")?;
        file.flush()?;

        Ok(JsonExportStage {
            writer: Mutex::new(ExportWriter {
                file,
                first: true,
                closed: false,
            }),
            site: site.to_string(),
            started_at,
            export_path,
            metadata_path,
            total_items: AtomicUsize::new(0),
            items_with_manuals: AtomicUsize::new(0),
            items_with_documents: AtomicUsize::new(0),
        })
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn exported_count(&self) -> usize {
        self.total_items.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Stage for JsonExportStage {
    fn name(&self) -> &'static str {
        "export"
    }

    async fn process(&self, record: ProductRecord) -> Result<StageOutcome, PipelineError> {
        // Serialize outside the lock; only the write itself is exclusive
        let json = serde_json::to_string_pretty(&record)?;

        {
            let mut writer = self.writer.lock().unwrap();
            if writer.first {
                writer.first = false;
            } else {
                writer.file.write_all(b",\n")?;
            }
            writer.file.write_all(json.as_bytes())?;
            // Flushed per record so an interrupted run keeps everything
            // written so far
            writer.file.flush()?;
        }

        self.total_items.fetch_add(1, Ordering::Relaxed);
        if !record.manuals.is_empty() {
            self.items_with_manuals.fetch_add(1, Ordering::Relaxed);
        }
        if !record.documents.is_empty() {
            self.items_with_documents.fetch_add(1, Ordering::Relaxed);
        }

        Ok(StageOutcome::Continue(record))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        {
            let mut writer = self.writer.lock().unwrap();
            if !writer.closed {
                writer.file.write_all(b"\n]\n")?;
                writer.file.flush()?;
                writer.closed = true;
            }
        }

        let metadata = RunMetadata {
            site: self.site.clone(),
            spider_run_start: self.started_at,
            spider_run_end: Utc::now(),
            total_items: self.total_items.load(Ordering::Relaxed),
            items_with_manuals: self.items_with_manuals.load(Ordering::Relaxed),
            items_with_documents: self.items_with_documents.load(Ordering::Relaxed),
        };
        std::fs::write(&self.metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        info!(
            path = %self.export_path.display(),
            items = metadata.total_items,
            "export closed"
        );
        Ok(())
    }
}
