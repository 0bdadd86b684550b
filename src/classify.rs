// src/classify.rs
// =============================================================================
// Separates product detail pages from the listing and navigation noise
// that site sitemaps mix in freely.
//
// A URL is kept only if its path-or-query mentions at least one target
// category token AND none of the exclusion tokens (search, filter,
// listing, storefront, and account pages). Matching is case-insensitive
// substring containment; there is no tokenization or stemming. This is
// the single policy point for "is this a product page candidate", kept
// pure so it stays independently testable.
// =============================================================================

use url::Url;

/// Paths that are navigation, search, or account noise, never product
/// detail pages.
pub const EXCLUDED_TOKENS: &[&str] = &[
    "/search",
    "/filter",
    "/category",
    "/brand",
    "/store",
    "/about",
    "/contact",
    "/help",
    "/login",
    "/account",
];

/// Filters `urls` down to product-page candidates for the given target
/// category tokens. Unparsable URLs are dropped. Idempotent: filtering
/// an already-filtered list returns it unchanged.
pub fn filter_product_urls<S: AsRef<str>>(urls: &[S], target_categories: &[&str]) -> Vec<String> {
    urls.iter()
        .filter_map(|u| {
            let raw = u.as_ref();
            let parsed = Url::parse(raw).ok()?;

            let mut haystack = parsed.path().to_lowercase();
            if let Some(query) = parsed.query() {
                haystack.push('?');
                haystack.push_str(&query.to_lowercase());
            }

            let in_category = target_categories
                .iter()
                .any(|cat| haystack.contains(&cat.to_lowercase()));
            let excluded = EXCLUDED_TOKENS.iter().any(|tok| haystack.contains(tok));

            if in_category && !excluded {
                Some(raw.to_string())
            } else {
                None
            }
        })
        .collect()
}
