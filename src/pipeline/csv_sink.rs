// src/pipeline/csv_sink.rs
// =============================================================================
// Optional parallel sink: one flat CSV row per exported record, for
// spreadsheet-style analysis. List- and map-valued fields are
// represented by their counts; it never drops a record.
// =============================================================================

use crate::error::PipelineError;
use crate::pipeline::{Stage, StageOutcome};
use crate::records::ProductRecord;
use async_trait::async_trait;
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const COLUMNS: &[&str] = &[
    "url",
    "name",
    "brand",
    "model",
    "sku",
    "price",
    "category",
    "subcategory",
    "description",
    "availability",
    "rating",
    "warranty",
    "dimensions",
    "weight",
    "manual_count",
    "document_count",
    "scraped_at",
    "site",
];

pub struct CsvExportStage {
    writer: Mutex<csv::Writer<File>>,
    path: PathBuf,
}

impl CsvExportStage {
    pub fn new(data_dir: &Path, site: &str) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(data_dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = data_dir.join(format!("products_{}_{}.csv", site, stamp));

        let mut writer = csv::Writer::from_writer(File::create(&path)?);
        writer.write_record(COLUMNS)?;
        writer.flush()?;

        Ok(CsvExportStage {
            writer: Mutex::new(writer),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn row(record: &ProductRecord) -> Vec<String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            record.url.clone(),
            record.name.clone(),
            opt(&record.brand),
            opt(&record.model),
            opt(&record.sku),
            record.price.map(|p| p.to_string()).unwrap_or_default(),
            opt(&record.category),
            opt(&record.subcategory),
            opt(&record.description),
            opt(&record.availability),
            record.rating.map(|r| r.to_string()).unwrap_or_default(),
            opt(&record.warranty),
            opt(&record.dimensions),
            opt(&record.weight),
            record.manuals.len().to_string(),
            record.documents.len().to_string(),
            record.scraped_at.to_rfc3339(),
            record.site.clone(),
        ]
    }
}

#[async_trait]
impl Stage for CsvExportStage {
    fn name(&self) -> &'static str {
        "csv-export"
    }

    async fn process(&self, record: ProductRecord) -> Result<StageOutcome, PipelineError> {
        {
            let mut writer = self.writer.lock().unwrap();
            writer.write_record(Self::row(&record))?;
            writer.flush()?;
        }
        Ok(StageOutcome::Continue(record))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        self.writer.lock().unwrap().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_header_and_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let stage = CsvExportStage::new(dir.path(), "rona").unwrap();

        let mut record = ProductRecord::new(
            "https://x.com/p/1".to_string(),
            "rona".to_string(),
            "Drill, cordless".to_string(),
        );
        record.price = Some(99.5);
        stage.process(record).await.unwrap();
        stage.close().await.unwrap();

        let content = std::fs::read_to_string(stage.path()).unwrap();
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            COLUMNS.to_vec()
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        // The comma in the name survives quoting
        assert_eq!(&rows[0][1], "Drill, cordless");
        assert_eq!(&rows[0][5], "99.5");
        assert_eq!(&rows[0][14], "0");
    }
}
