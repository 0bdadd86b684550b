// src/urls.rs
// =============================================================================
// URL identity and resolution.
//
// Two different sitemap entries can point at the same page ("/p/1" vs
// "/p/1/" vs "/p/1?b=2&a=1" vs "/p/1?a=1&b=2"), so every dedup decision
// in the crawl goes through normalize(): scheme + host + path with the
// trailing slash stripped + query pairs sorted. The normalized form is a
// fingerprint for set membership, not a URL to fetch.
// =============================================================================

use url::Url;

/// One URL the scheduler may fetch: where it came from and how deep in
/// the sitemap tree it was discovered.
#[derive(Debug, Clone)]
pub struct CrawlUrl {
    pub url: Url,
    pub depth: usize,
    pub site: String,
}

impl CrawlUrl {
    pub fn new(url: Url, depth: usize, site: impl Into<String>) -> Self {
        CrawlUrl {
            url,
            depth,
            site: site.into(),
        }
    }

    /// The identity used for "never fetch twice" checks.
    pub fn fingerprint(&self) -> String {
        normalize(&self.url)
    }
}

/// Canonical fingerprint of a URL: scheme + host (+ non-default port) +
/// path without its trailing slash + query pairs sorted by key then value.
/// Fragments are dropped. The root path normalizes to no path at all, so
/// `https://x.com/` and `https://x.com` agree.
pub fn normalize(url: &Url) -> String {
    let mut out = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }

    out.push_str(url.path().trim_end_matches('/'));

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query: Vec<String> = pairs
            .into_iter()
            .map(|(k, v)| if v.is_empty() { k } else { format!("{}={}", k, v) })
            .collect();
        out.push('?');
        out.push_str(&query.join("&"));
    }

    out
}

/// Resolves a possibly-relative href against the page it appeared on.
/// Anchors and non-web schemes (mailto, tel, javascript, data) resolve
/// to nothing; so does anything that is not http(s) after joining.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    if href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does resolve_href return Option<Url>?
//    - Some hrefs aren't fetchable links at all (anchors, mailto:, tel:)
//    - Option lets callers skip those with filter_map instead of
//      special-casing error values
//
// 2. What does query_pairs() yield?
//    - Cow<str> pairs: borrowed when no percent-decoding was needed,
//      owned when it was
//    - into_owned() turns either form into a String we can sort
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_strips_trailing_slash() {
        assert_eq!(
            normalize(&url("https://example.com/p/1/")),
            normalize(&url("https://example.com/p/1"))
        );
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize(&url("https://example.com/")), "https://example.com");
    }

    #[test]
    fn test_normalize_sorts_query_pairs() {
        assert_eq!(
            normalize(&url("https://example.com/p?b=2&a=1")),
            normalize(&url("https://example.com/p?a=1&b=2"))
        );
    }

    #[test]
    fn test_normalize_drops_fragment() {
        assert_eq!(
            normalize(&url("https://example.com/p#reviews")),
            "https://example.com/p"
        );
    }

    #[test]
    fn test_normalize_keeps_distinct_urls_distinct() {
        assert_ne!(
            normalize(&url("https://example.com/p/1")),
            normalize(&url("https://example.com/p/2"))
        );
    }

    #[test]
    fn test_resolve_relative_href() {
        let base = url("https://example.com/products/drill");
        let resolved = resolve_href(&base, "/support/manual.pdf").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/support/manual.pdf");
    }

    #[test]
    fn test_resolve_skips_anchors_and_special_schemes() {
        let base = url("https://example.com/page");
        assert!(resolve_href(&base, "#specs").is_none());
        assert!(resolve_href(&base, "mailto:help@example.com").is_none());
        assert!(resolve_href(&base, "javascript:void(0)").is_none());
        assert!(resolve_href(&base, "tel:+15551234").is_none());
    }

    #[test]
    fn test_fingerprint_uses_normalized_form() {
        let a = CrawlUrl::new(url("https://example.com/p/1/"), 2, "rona");
        let b = CrawlUrl::new(url("https://example.com/p/1"), 3, "rona");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
