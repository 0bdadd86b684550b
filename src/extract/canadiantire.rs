// src/extract/canadiantire.rs
// =============================================================================
// Extraction strategy for Canadian Tire product pages. Same field set as
// the Rona strategy, different structural locators; the model number
// doubles as the SKU when no dedicated SKU element exists.
// =============================================================================

use crate::config::SiteProfile;
use crate::error::ExtractionError;
use crate::extract::helpers::{
    breadcrumb_categories, clean_specifications, discover_documents, first_match, parse_price,
    parse_rating, select_attrs, select_texts, spec_rows, Locator,
};
use crate::extract::SiteStrategy;
use crate::records::ProductRecord;
use crate::urls::resolve_href;
use scraper::Html;
use url::Url;

const NAME: &[Locator] = &[
    Locator::css("h1.pdp-product-name"),
    Locator::css(".product-name h1"),
];
const BRAND: &[Locator] = &[Locator::css(".brand"), Locator::css(".manufacturer")];
const MODEL: &[Locator] = &[Locator::css(".model"), Locator::css(".item-number")];
const SKU: &[Locator] = &[
    Locator::css(".sku"),
    Locator::attr("[data-sku]", "data-sku"),
];
const PRICE: &[Locator] = &[Locator::css(".price-current"), Locator::css(".price")];
const DESCRIPTION: &[Locator] = &[
    Locator::css(".product-description"),
    Locator::css(".description p"),
];
const AVAILABILITY: &[Locator] = &[
    Locator::css(".availability-message"),
    Locator::css(".stock-status"),
];
const RATING: &[Locator] = &[
    Locator::attr(".star-rating", "data-rating"),
    Locator::css(".rating-value"),
];
const DIMENSIONS: &[Locator] = &[Locator::css(".dimensions")];
const WEIGHT: &[Locator] = &[Locator::css(".weight")];
const WARRANTY: &[Locator] = &[Locator::css(".warranty-info"), Locator::css(".warranty")];

pub struct CanadianTire;

impl SiteStrategy for CanadianTire {
    fn name(&self) -> &'static str {
        "canadiantire"
    }

    fn extract(
        &self,
        doc: &Html,
        page_url: &Url,
        profile: &SiteProfile,
    ) -> Result<ProductRecord, ExtractionError> {
        let name =
            first_match(doc, NAME).ok_or(ExtractionError::MissingRequiredField("name"))?;
        let mut record = ProductRecord::new(page_url.to_string(), profile.key.clone(), name);

        record.brand = first_match(doc, BRAND);
        record.model = first_match(doc, MODEL);
        record.sku = first_match(doc, SKU).or_else(|| record.model.clone());
        record.price = first_match(doc, PRICE).as_deref().and_then(parse_price);
        record.description = first_match(doc, DESCRIPTION);

        let (category, subcategory) =
            breadcrumb_categories(doc, ".breadcrumb a, .breadcrumbs a");
        record.category = category;
        record.subcategory = subcategory;

        record.images = select_attrs(doc, ".product-images img, .media-gallery img", "src")
            .iter()
            .filter_map(|src| resolve_href(page_url, src))
            .map(|u| u.to_string())
            .collect();

        record.specifications =
            clean_specifications(spec_rows(doc, ".spec-table tr, .specifications tr"));
        record.features = select_texts(doc, ".features li, .key-features li");

        record.availability = first_match(doc, AVAILABILITY);
        record.rating = first_match(doc, RATING).as_deref().and_then(parse_rating);
        record.dimensions = first_match(doc, DIMENSIONS);
        record.weight = first_match(doc, WEIGHT);
        record.warranty = first_match(doc, WARRANTY);

        let (manuals, documents) = discover_documents(doc, page_url);
        record.manuals = manuals;
        record.documents = documents;

        Ok(record)
    }
}
