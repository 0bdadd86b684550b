// src/config.rs
// =============================================================================
// Site profiles and run settings.
//
// A SiteProfile describes one target site: where its sitemap lives, which
// domains belong to it, how it wants to be crawled (per-site concurrency,
// base delay, identification string), and which extraction strategy reads
// its pages. Profiles are loaded once at startup and never mutated.
//
// RunSettings carries the knobs that apply to a whole run rather than to
// one site: global concurrency, jitter band, retry limit, output
// directories, cache window, item ceiling.
// =============================================================================

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Category tokens a URL must mention to count as a product page.
pub const TARGET_CATEGORIES: &[&str] = &[
    "tools",
    "appliances",
    "hardware",
    "power-tools",
    "hand-tools",
    "outdoor",
    "automotive",
    "lawn-garden",
    "home-improvement",
];

/// Immutable description of one target site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteProfile {
    /// Short key used on the command line and in output paths
    pub key: String,
    /// Human-readable site name
    pub name: String,
    pub base_url: String,
    pub sitemap_url: String,
    /// Hosts that belong to this site; URLs outside are never fetched
    pub allowed_domains: Vec<String>,
    /// Identification string sent as the User-Agent header
    pub user_agent: String,
    /// Base politeness delay between requests, in seconds
    pub download_delay: f64,
    /// Per-site in-flight request ceiling
    pub concurrent_requests: usize,
    /// Which extraction strategy reads this site's pages
    pub strategy: String,
}

impl SiteProfile {
    /// True when `host` is one of the allowed domains or a subdomain of one.
    pub fn is_allowed_domain(&self, host: &str) -> bool {
        self.allowed_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)))
    }
}

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The sites this binary knows how to crawl.
pub fn builtin_profiles() -> Vec<SiteProfile> {
    vec![
        SiteProfile {
            key: "rona".to_string(),
            name: "Rona".to_string(),
            base_url: "https://www.rona.ca".to_string(),
            sitemap_url: "https://www.rona.ca/sitemap.xml".to_string(),
            allowed_domains: vec!["rona.ca".to_string()],
            user_agent: BROWSER_UA.to_string(),
            download_delay: 2.0,
            concurrent_requests: 8,
            strategy: "rona".to_string(),
        },
        SiteProfile {
            key: "canadiantire".to_string(),
            name: "Canadian Tire".to_string(),
            base_url: "https://www.canadiantire.ca".to_string(),
            sitemap_url: "https://www.canadiantire.ca/sitemap.xml".to_string(),
            allowed_domains: vec!["canadiantire.ca".to_string()],
            user_agent: BROWSER_UA.to_string(),
            download_delay: 2.0,
            concurrent_requests: 8,
            strategy: "canadiantire".to_string(),
        },
    ]
}

/// Looks up a built-in profile by its key.
pub fn profile_for(key: &str) -> Option<SiteProfile> {
    builtin_profiles().into_iter().find(|p| p.key == key)
}

/// Run-wide settings with the crawl's default politeness numbers.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Stop after this many exported records (None = no ceiling)
    pub max_items: Option<usize>,
    /// Total in-flight request ceiling across the run
    pub max_concurrency: usize,
    /// Politeness delay is multiplied by a uniform draw from [1-j, 1+j]
    pub jitter: f64,
    /// Adaptive throttle never pushes the delay beyond this, in seconds
    pub max_delay: f64,
    /// Adaptive throttle steers toward this average concurrency per site
    pub target_concurrency: f64,
    /// Extra attempts after the first failed fetch
    pub retry_limit: u32,
    pub fetch_timeout: Duration,
    pub download_timeout: Duration,
    /// How deep nested sitemap indexes are followed
    pub sitemap_depth_limit: usize,
    pub obey_robots: bool,
    /// Response cache directory (None disables the cache)
    pub cache_dir: Option<PathBuf>,
    /// Cached responses older than this are ignored
    pub cache_ttl: Duration,
    /// Where product JSON/CSV exports land
    pub data_dir: PathBuf,
    /// Where downloaded manuals land (one subdirectory per site)
    pub manuals_dir: PathBuf,
    /// Also write the flat CSV sink
    pub csv_export: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            max_items: None,
            max_concurrency: 8,
            jitter: 0.5,
            max_delay: 60.0,
            target_concurrency: 2.0,
            retry_limit: 3,
            fetch_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(30),
            sitemap_depth_limit: 3,
            obey_robots: true,
            cache_dir: Some(PathBuf::from(".httpcache")),
            cache_ttl: Duration::from_secs(3600),
            data_dir: PathBuf::from("data"),
            manuals_dir: PathBuf::from("manuals"),
            csv_export: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_resolve_by_key() {
        let profile = profile_for("rona").unwrap();
        assert_eq!(profile.name, "Rona");
        assert_eq!(profile.strategy, "rona");
        assert!(profile_for("unknown-site").is_none());
    }

    #[test]
    fn test_allowed_domain_matches_subdomains() {
        let profile = profile_for("rona").unwrap();
        assert!(profile.is_allowed_domain("rona.ca"));
        assert!(profile.is_allowed_domain("www.rona.ca"));
        assert!(!profile.is_allowed_domain("rona.ca.evil.com"));
        assert!(!profile.is_allowed_domain("notrona.ca"));
    }
}
