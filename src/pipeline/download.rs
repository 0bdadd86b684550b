// src/pipeline/download.rs
// =============================================================================
// Third pipeline stage: materializes manuals and documents.
//
// Every manual/document entry on the record gets one download attempt.
// On success the entry gains its local path; on failure the entry keeps
// the remote URL so a downstream consumer can re-attempt it. Either way
// one DownloadRecord lands in the run's append-only log, which close()
// writes out as download_log.json. This stage never drops a record -
// file fetches are best-effort per entry.
//
// Files land under <manuals_dir>/<site>/ named
// {sku-or-url-hash}_{sanitized-title}.{ext}, so re-running a crawl
// overwrites rather than duplicates.
// =============================================================================

use crate::crawl::fetcher::categorize_error;
use crate::error::{DownloadError, FetchError, PipelineError};
use crate::pipeline::{Stage, StageOutcome};
use crate::records::{DownloadRecord, ProductRecord};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use url::Url;

pub struct DownloadStage {
    client: reqwest::Client,
    site_dir: PathBuf,
    log: Mutex<Vec<DownloadRecord>>,
}

impl DownloadStage {
    pub fn new(
        client: reqwest::Client,
        manuals_dir: &Path,
        site: &str,
    ) -> Result<Self, PipelineError> {
        let site_dir = manuals_dir.join(site);
        std::fs::create_dir_all(&site_dir)?;
        Ok(DownloadStage {
            client,
            site_dir,
            log: Mutex::new(Vec::new()),
        })
    }

    /// Deterministic target filename: the SKU (or, without one, the
    /// first 8 hex chars of the URL's sha256), the sanitized title
    /// capped at 50 chars, and the extension from the URL path
    /// (defaulting to pdf).
    fn build_filename(url: &str, title: &str, sku: &str) -> String {
        let stem = if sku.is_empty() {
            let mut hasher = Sha256::new();
            hasher.update(url.as_bytes());
            format!("{:x}", hasher.finalize())[..8].to_string()
        } else {
            sanitize(sku, 50)
        };

        let ext = Url::parse(url)
            .ok()
            .and_then(|u| {
                Path::new(u.path())
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
            })
            .unwrap_or_else(|| "pdf".to_string());

        format!("{}_{}.{}", stem, sanitize(title, 50), ext)
    }

    async fn download_file(&self, url: &str, title: &str, sku: &str) -> Result<String, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Fetch(categorize_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Fetch(FetchError::HttpStatus(status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadError::Fetch(FetchError::Malformed(e.to_string())))?;

        let path = self.site_dir.join(Self::build_filename(url, title, sku));
        tokio::fs::write(&path, &bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// One attempt per entry; the outcome goes into both the entry and
    /// the log.
    async fn fetch_entry(
        &self,
        url: &str,
        title: &str,
        sku: &str,
    ) -> Option<String> {
        let local_path = match self.download_file(url, title, sku).await {
            Ok(path) => {
                info!(url = %url, path = %path, "downloaded");
                Some(path)
            }
            Err(e) => {
                // The record keeps the remote URL; only the log shows the miss
                warn!(url = %url, error = %e, "download failed, keeping remote URL");
                None
            }
        };

        self.log.lock().unwrap().push(DownloadRecord {
            url: url.to_string(),
            local_path: local_path.clone(),
            title: title.to_string(),
            sku: sku.to_string(),
            downloaded_at: Utc::now(),
        });

        local_path
    }

    /// Copy of the log so far, for tests and accounting.
    pub fn log_snapshot(&self) -> Vec<DownloadRecord> {
        self.log.lock().unwrap().clone()
    }
}

/// Keeps alphanumerics, spaces, dashes, and underscores; trims and caps
/// the length so titles can't produce hostile filenames.
fn sanitize(text: &str, max_len: usize) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .chars()
        .take(max_len)
        .collect()
}

#[async_trait]
impl Stage for DownloadStage {
    fn name(&self) -> &'static str {
        "download"
    }

    async fn process(&self, mut record: ProductRecord) -> Result<StageOutcome, PipelineError> {
        let sku = record.sku.clone().unwrap_or_default();

        for i in 0..record.manuals.len() {
            let (url, title) = (record.manuals[i].url.clone(), record.manuals[i].title.clone());
            record.manuals[i].local_path = self.fetch_entry(&url, &title, &sku).await;
        }
        for i in 0..record.documents.len() {
            let (url, title) = (
                record.documents[i].url.clone(),
                record.documents[i].title.clone(),
            );
            record.documents[i].local_path = self.fetch_entry(&url, &title, &sku).await;
        }

        Ok(StageOutcome::Continue(record))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        let log = self.log.lock().unwrap().clone();
        let path = self.site_dir.join("download_log.json");
        std::fs::write(&path, serde_json::to_string_pretty(&log)?)?;
        info!(path = %path.display(), attempts = log.len(), "download log written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DocKind, DocumentLink};
    use std::time::Duration;

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    #[test]
    fn test_filename_uses_sku_and_sanitized_title() {
        let name = DownloadStage::build_filename(
            "https://x.com/files/dcd771.pdf",
            "Owner's Manual: Setup!",
            "330-1234",
        );
        assert_eq!(name, "330-1234_Owners Manual Setup.pdf");
    }

    #[test]
    fn test_filename_falls_back_to_url_hash_without_sku() {
        let a = DownloadStage::build_filename("https://x.com/files/a.pdf", "Manual", "");
        let b = DownloadStage::build_filename("https://x.com/files/a.pdf", "Manual", "");
        let c = DownloadStage::build_filename("https://x.com/files/b.pdf", "Manual", "");
        // Deterministic per URL, different across URLs
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with("_Manual.pdf"));
    }

    #[test]
    fn test_filename_extension_defaults_to_pdf() {
        let name = DownloadStage::build_filename("https://x.com/support/guide", "Guide", "S1");
        assert!(name.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_failed_download_keeps_remote_url_and_logs_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let stage = DownloadStage::new(client(), dir.path(), "rona").unwrap();

        let mut record = ProductRecord::new(
            "https://x.com/p/1".to_string(),
            "rona".to_string(),
            "Drill".to_string(),
        );
        // Nothing listens on port 1: the fetch fails fast
        record.manuals.push(DocumentLink {
            url: "http://127.0.0.1:1/manual.pdf".to_string(),
            title: "Manual".to_string(),
            kind: DocKind::Pdf,
            local_path: None,
        });

        let out = stage.process(record).await.unwrap();
        let StageOutcome::Continue(record) = out else {
            panic!("download stage must never drop a record");
        };

        assert_eq!(record.manuals[0].url, "http://127.0.0.1:1/manual.pdf");
        assert_eq!(record.manuals[0].local_path, None);

        let log = stage.log_snapshot();
        assert_eq!(log.len(), 1);
        assert!(log[0].local_path.is_none());
    }

    #[tokio::test]
    async fn test_close_writes_download_log() {
        let dir = tempfile::tempdir().unwrap();
        let stage = DownloadStage::new(client(), dir.path(), "rona").unwrap();
        stage.close().await.unwrap();

        let log_path = dir.path().join("rona").join("download_log.json");
        let content = std::fs::read_to_string(log_path).unwrap();
        let parsed: Vec<DownloadRecord> = serde_json::from_str(&content).unwrap();
        assert!(parsed.is_empty());
    }
}
