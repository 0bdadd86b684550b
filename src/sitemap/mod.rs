// src/sitemap/mod.rs
// =============================================================================
// Sitemap resolution: turns a sitemap URL into page URLs.
//
// How it works:
// 1. Fetch the document (through the SitemapFetch seam, so tests can
//    supply canned XML)
// 2. Decompress it when it arrives gzipped (.gz suffix or gzip content
//    type)
// 3. Pull every <loc> out with a streaming XML reader and classify the
//    document: a <sitemapindex> lists more sitemaps, a <urlset> lists
//    actual pages
// 4. discover() walks nested indexes breadth-first, bounded by a depth
//    limit so a misbehaving index-of-index chain cannot expand forever
//
// A failed or malformed sitemap yields an empty result plus a logged
// SitemapError; it never aborts the crawl.
// =============================================================================

use crate::error::{FetchError, SitemapError};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{HashSet, VecDeque};
use std::io::Read;
use tracing::{debug, warn};

/// What one sitemap document turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDoc {
    /// A sitemap index: URLs of further sitemap documents
    Index(Vec<String>),
    /// A leaf sitemap: URLs of actual pages
    Pages(Vec<String>),
}

/// Raw bytes of one fetched sitemap plus the content type it came with.
pub struct SitemapPayload {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// The fetch capability the resolver consumes. The production
/// implementation lives on PageFetcher; tests hand back canned payloads.
#[async_trait]
pub trait SitemapFetch: Send + Sync {
    async fn fetch_sitemap(&self, url: &str) -> Result<SitemapPayload, FetchError>;
}

/// Fetches and parses a single sitemap document.
pub async fn resolve(fetch: &dyn SitemapFetch, url: &str) -> Result<SitemapDoc, SitemapError> {
    let payload = fetch
        .fetch_sitemap(url)
        .await
        .map_err(|source| SitemapError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let bytes = decode_payload(url, payload.content_type.as_deref(), payload.body).map_err(
        |message| SitemapError::Parse {
            url: url.to_string(),
            message,
        },
    )?;

    parse_sitemap_xml(&bytes).map_err(|message| SitemapError::Parse {
        url: url.to_string(),
        message,
    })
}

/// Walks the sitemap tree starting at `entry_url` and returns every page
/// URL found together with the depth of the sitemap that yielded it,
/// breadth-first. Each sitemap document is resolved at most once;
/// indexes deeper than `depth_limit` are not followed. Nested sitemaps
/// are only recursed into when their URL mentions products or
/// categories, since large sites also index news, store, and image
/// sitemaps we have no use for.
pub async fn discover(
    fetch: &dyn SitemapFetch,
    entry_url: &str,
    depth_limit: usize,
) -> Vec<(String, usize)> {
    let mut pages = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((entry_url.to_string(), 0));

    while let Some((url, depth)) = queue.pop_front() {
        if !visited.insert(url.clone()) {
            continue;
        }

        match resolve(fetch, &url).await {
            Ok(SitemapDoc::Index(children)) => {
                if depth + 1 > depth_limit {
                    warn!(url = %url, depth, "sitemap index exceeds depth limit, not following");
                    continue;
                }
                debug!(url = %url, children = children.len(), "sitemap index");
                for child in children {
                    if is_product_sitemap(&child) {
                        queue.push_back((child, depth + 1));
                    }
                }
            }
            Ok(SitemapDoc::Pages(urls)) => {
                debug!(url = %url, pages = urls.len(), "leaf sitemap");
                pages.extend(urls.into_iter().map(|u| (u, depth)));
            }
            Err(e) => {
                // One bad sitemap is an empty result, not a dead crawl
                warn!(error = %e, "skipping sitemap");
            }
        }
    }

    pages
}

/// Nested sitemaps worth recursing into mention products or categories
/// in their URL.
fn is_product_sitemap(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("product") || lower.contains("category")
}

/// Un-gzips the payload when the URL or content type says it is gzipped.
fn decode_payload(
    url: &str,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> Result<Vec<u8>, String> {
    let path_gzipped = url.split('?').next().unwrap_or(url).ends_with(".gz");
    let type_gzipped = content_type
        .map(|ct| ct.contains("gzip"))
        .unwrap_or(false);

    if !path_gzipped && !type_gzipped {
        return Ok(body);
    }

    let mut decoder = GzDecoder::new(body.as_slice());
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| format!("gzip decode failed: {}", e))?;
    Ok(out)
}

/// Streams through the XML once, collecting every <loc> and noting
/// whether the root element was <sitemapindex> or <urlset>.
fn parse_sitemap_xml(xml: &[u8]) -> Result<SitemapDoc, String> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_loc = false;
    let mut locs: Vec<String> = Vec::new();
    let mut saw_index = false;
    let mut saw_urlset = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                // Match by local name so namespace prefixes don't matter
                if e.name().as_ref().ends_with(b"sitemapindex") {
                    saw_index = true;
                } else if e.name().as_ref().ends_with(b"urlset") {
                    saw_urlset = true;
                } else if e.name().as_ref().ends_with(b"loc") {
                    in_loc = true;
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref().ends_with(b"loc") {
                    in_loc = false;
                }
            }
            Ok(Event::Text(t)) => {
                if in_loc {
                    let text = t
                        .unescape()
                        .map_err(|e| format!("bad text in <loc>: {}", e))?
                        .trim()
                        .to_string();
                    if !text.is_empty() {
                        locs.push(text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    if saw_index {
        Ok(SitemapDoc::Index(locs))
    } else if saw_urlset {
        Ok(SitemapDoc::Pages(locs))
    } else {
        Err("document is neither a sitemap index nor a urlset".to_string())
    }
}
