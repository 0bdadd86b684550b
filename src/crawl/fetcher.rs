// src/crawl/fetcher.rs
// =============================================================================
// The HTTP fetch capability the crawl consumes.
//
// Key functionality:
// - One reqwest client per run, identified by the site's user agent
// - Every failure mapped to a typed FetchError (timeout, http-status,
//   connection, malformed)
// - Transient failures retried with exponential backoff, a bounded
//   number of times, after which the URL is abandoned
// - A disk-backed response cache with an expiration window, so nearby
//   runs can reuse recent responses; keyed by the sha256 of the URL
// =============================================================================

use crate::error::FetchError;
use crate::sitemap::{SitemapFetch, SitemapPayload};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One fetched response, whether it came off the wire or out of the cache.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Wire time; zero for cache hits
    pub latency: Duration,
    pub from_cache: bool,
}

impl FetchedPage {
    /// The body as text, with invalid UTF-8 replaced rather than refused.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Serialize, Deserialize)]
struct CacheMeta {
    url: String,
    status: u16,
    content_type: Option<String>,
    stored_at: DateTime<Utc>,
}

/// Disk-backed response cache. Each entry is a metadata JSON plus a raw
/// body file; entries older than the expiration window are ignored on
/// read. Lives independently of the in-run dedup set: dedup means
/// "never refetch in this run", the cache means "a recent response may
/// be reused even by a new run".
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(ResponseCache { dir, ttl })
    }

    fn key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, url: &str) -> Option<FetchedPage> {
        let key = Self::key(url);
        let meta_bytes = std::fs::read(self.dir.join(format!("{}.json", key))).ok()?;
        let meta: CacheMeta = serde_json::from_slice(&meta_bytes).ok()?;

        let age = Utc::now().signed_duration_since(meta.stored_at);
        if age.num_seconds() < 0 || age.num_seconds() as u64 > self.ttl.as_secs() {
            return None;
        }

        let body = std::fs::read(self.dir.join(format!("{}.body", key))).ok()?;
        Some(FetchedPage {
            url: meta.url,
            status: meta.status,
            content_type: meta.content_type,
            body,
            latency: Duration::ZERO,
            from_cache: true,
        })
    }

    /// Best-effort: a cache write failure is logged and forgotten.
    pub fn put(&self, page: &FetchedPage) {
        let key = Self::key(&page.url);
        let meta = CacheMeta {
            url: page.url.clone(),
            status: page.status,
            content_type: page.content_type.clone(),
            stored_at: Utc::now(),
        };

        let result = serde_json::to_vec(&meta)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .and_then(|bytes| std::fs::write(self.dir.join(format!("{}.json", key)), bytes))
            .and_then(|_| std::fs::write(self.dir.join(format!("{}.body", key)), &page.body));

        if let Err(e) = result {
            warn!(url = %page.url, error = %e, "response cache write failed");
        }
    }
}

/// Fetches pages with typed errors, bounded retries, and the cache in
/// front of the wire.
pub struct PageFetcher {
    client: reqwest::Client,
    retry_limit: u32,
    cache: Option<ResponseCache>,
}

impl PageFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        retry_limit: u32,
        cache: Option<ResponseCache>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(PageFetcher {
            client,
            retry_limit,
            cache,
        })
    }

    /// A bare client with the same identity, for collaborators that
    /// manage their own requests (robots.txt, file downloads).
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetches a URL, retrying transient failures with exponential
    /// backoff until the retry limit, then giving up with the last error.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(page) = cache.get(url) {
                debug!(url = %url, "cache hit");
                return Ok(page);
            }
        }

        let mut attempt: u32 = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(page) => {
                    if let Some(cache) = &self.cache {
                        cache.put(&page);
                    }
                    return Ok(page);
                }
                Err(e) if e.is_retryable() && attempt < self.retry_limit => {
                    let backoff = backoff_delay(attempt);
                    warn!(url = %url, error = %e, attempt, "fetch failed, retrying in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Malformed(e.to_string())
            }
        })?;

        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
            latency: started.elapsed(),
            from_cache: false,
        })
    }
}

#[async_trait]
impl SitemapFetch for PageFetcher {
    async fn fetch_sitemap(&self, url: &str) -> Result<SitemapPayload, FetchError> {
        let page = self.fetch(url).await?;
        Ok(SitemapPayload {
            content_type: page.content_type,
            body: page.body,
        })
    }
}

/// Maps a reqwest error to the typed taxonomy the scheduler understands.
pub(crate) fn categorize_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_decode() {
        FetchError::Malformed(error.to_string())
    } else {
        // Connect failures, DNS errors, TLS problems, and anything else
        // that never produced a usable response
        FetchError::Connection(error.to_string())
    }
}

/// 500ms, 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500) * 2u32.saturating_pow(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache =
            ResponseCache::new(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap();

        let page = FetchedPage {
            url: "https://example.com/tools/drill".to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            body: b"<html>drill</html>".to_vec(),
            latency: Duration::from_millis(120),
            from_cache: false,
        };
        cache.put(&page);

        let hit = cache.get("https://example.com/tools/drill").unwrap();
        assert!(hit.from_cache);
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, page.body);

        assert!(cache.get("https://example.com/other").is_none());
    }

    #[test]
    fn test_cache_entries_expire() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().to_path_buf(), Duration::from_secs(60)).unwrap();

        let url = "https://example.com/tools/saw";
        let page = FetchedPage {
            url: url.to_string(),
            status: 200,
            content_type: None,
            body: b"x".to_vec(),
            latency: Duration::ZERO,
            from_cache: false,
        };
        cache.put(&page);

        // Age the entry past the window by rewriting its metadata
        let key = ResponseCache::key(url);
        let meta = CacheMeta {
            url: url.to_string(),
            status: 200,
            content_type: None,
            stored_at: Utc::now() - chrono::Duration::seconds(120),
        };
        std::fs::write(
            dir.path().join(format!("{}.json", key)),
            serde_json::to_vec(&meta).unwrap(),
        )
        .unwrap();

        assert!(cache.get(url).is_none());
    }
}
