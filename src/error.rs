// src/error.rs
// =============================================================================
// Typed error taxonomy for the crawl pipeline.
//
// Every error here is attributable to exactly one URL, record, or file:
// - SitemapError: one sitemap document failed; the crawl skips it
// - FetchError: one page fetch failed; retried a bounded number of times
// - ExtractionError: one page could not produce a record; never retried
// - DropReason: one record was rejected by a pipeline stage
// - DownloadError: one auxiliary file failed; the record keeps the remote URL
// - PipelineError: a stage hit an I/O or serialization problem
//
// None of these abort sibling work. Only startup validation (unknown site,
// bad configuration) is allowed to be fatal, and that happens in main before
// any crawling starts.
// =============================================================================

use thiserror::Error;

/// Failure to fetch one page, categorized so the scheduler can decide
/// whether a retry makes sense.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request exceeded its per-fetch timeout
    #[error("request timed out")]
    Timeout,

    /// Server answered with a non-2xx status
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// Could not connect (DNS, refused, TLS, unreachable)
    #[error("connection failed: {0}")]
    Connection(String),

    /// Connected but the response could not be read or decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Transient failures are worth retrying; 4xx and undecodable
    /// responses are not going to improve on a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Connection(_) => true,
            FetchError::HttpStatus(code) => (500..=599).contains(code),
            FetchError::Malformed(_) => false,
        }
    }
}

/// Failure to resolve one sitemap document. Recoverable: the resolver
/// reports it, yields nothing for that document, and the crawl goes on.
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to fetch sitemap {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("invalid sitemap XML at {url}: {message}")]
    Parse { url: String, message: String },
}

/// Failure to turn a fetched page into a ProductRecord.
/// Terminal for that URL; there is no retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("missing required field '{0}'")]
    MissingRequiredField(&'static str),

    #[error("no extraction strategy named '{0}'")]
    UnsupportedSite(String),
}

/// Why a pipeline stage rejected a record. Terminal for that record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingName,
    MissingUrl,
    DuplicateUrl,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DropReason::MissingName => "missing-name",
            DropReason::MissingUrl => "missing-url",
            DropReason::DuplicateUrl => "duplicate-url",
        };
        f.write_str(s)
    }
}

/// Failure to materialize one auxiliary file. Never escalates past the
/// file entry it belongs to.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not write file: {0}")]
    Io(#[from] std::io::Error),
}

/// Infrastructure failure inside a pipeline stage (as opposed to a
/// record being dropped, which is a normal outcome).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
