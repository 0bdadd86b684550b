// src/extract/mod.rs
// =============================================================================
// The extraction engine: fetched page in, ProductRecord (or a typed
// extraction failure) out.
//
// Extraction is polymorphic over site through the SiteStrategy trait.
// The set of strategies is closed: adding a site means adding an
// implementation and a match arm in strategy_for(), never touching the
// engine's control flow. All of this is synchronous - parsing and field
// lookup never hold a DOM across an await point.
//
// Submodules:
// - helpers: locator lookup, price/rating parsing, spec cleanup,
//   manual/document discovery (shared by every strategy)
// - rona, canadiantire: the per-site locator tables
// =============================================================================

mod canadiantire;
pub mod helpers;
mod rona;

use crate::config::SiteProfile;
use crate::error::ExtractionError;
use crate::records::ProductRecord;
use scraper::Html;
use url::Url;

pub use helpers::{clean_specifications, parse_price, parse_rating};

/// One site's way of reading its product pages.
pub trait SiteStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(
        &self,
        doc: &Html,
        page_url: &Url,
        profile: &SiteProfile,
    ) -> Result<ProductRecord, ExtractionError>;
}

/// The closed set of strategies, looked up by the profile's selector.
pub fn strategy_for(name: &str) -> Option<&'static dyn SiteStrategy> {
    match name {
        "rona" => Some(&rona::Rona),
        "canadiantire" => Some(&canadiantire::CanadianTire),
        _ => None,
    }
}

/// Parses the page and runs the profile's strategy over it.
pub fn extract_product(
    html: &str,
    page_url: &Url,
    profile: &SiteProfile,
) -> Result<ProductRecord, ExtractionError> {
    let strategy = strategy_for(&profile.strategy)
        .ok_or_else(|| ExtractionError::UnsupportedSite(profile.strategy.clone()))?;
    let doc = Html::parse_document(html);
    strategy.extract(&doc, page_url, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profile_for;

    #[test]
    fn test_every_builtin_profile_has_a_strategy() {
        for profile in crate::config::builtin_profiles() {
            assert!(
                strategy_for(&profile.strategy).is_some(),
                "profile '{}' names unknown strategy '{}'",
                profile.key,
                profile.strategy
            );
        }
    }

    #[test]
    fn test_unknown_strategy_is_unsupported_site() {
        let mut profile = profile_for("rona").unwrap();
        profile.strategy = "acme-hardware".to_string();
        let page_url = Url::parse("https://www.rona.ca/tools/x").unwrap();

        let err = extract_product("<html></html>", &page_url, &profile).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::UnsupportedSite("acme-hardware".to_string())
        );
    }

    #[test]
    fn test_engine_dispatches_by_profile() {
        let profile = profile_for("rona").unwrap();
        let page_url = Url::parse("https://www.rona.ca/tools/hammer-12").unwrap();
        let html = r#"<h1 class="pdp-product-name">Claw Hammer</h1>"#;

        let record = extract_product(html, &page_url, &profile).unwrap();
        assert_eq!(record.name, "Claw Hammer");
        assert_eq!(record.url, "https://www.rona.ca/tools/hammer-12");
    }
}
