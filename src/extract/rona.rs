// src/extract/rona.rs
// =============================================================================
// Extraction strategy for Rona product pages.
//
// Each field has a short ordered locator list; the first hit wins and a
// total miss leaves the field absent. Only `name` is required - a page
// without one never becomes a record.
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
    Locator::css(".product-title h1"),
];
const BRAND: &[Locator] = &[Locator::css(".brand-name"), Locator::css(".product-brand")];
const MODEL: &[Locator] = &[Locator::css(".model-number"), Locator::css(".sku")];
const SKU: &[Locator] = &[
    Locator::css(".sku-number"),
    Locator::attr("[data-sku]", "data-sku"),
];
const PRICE: &[Locator] = &[
    Locator::css(".price"),
    Locator::css(".current-price"),
    Locator::css(".product-price"),
];
const DESCRIPTION: &[Locator] = &[
    Locator::css(".product-description p"),
    Locator::css(".description"),
];
const AVAILABILITY: &[Locator] = &[Locator::css(".availability"), Locator::css(".stock-status")];
const RATING: &[Locator] = &[
    Locator::css(".rating"),
    Locator::attr(".star-rating", "data-rating"),
];
const DIMENSIONS: &[Locator] = &[
    Locator::css(".dimensions"),
    Locator::css("[data-dimension]"),
];
const WEIGHT: &[Locator] = &[Locator::css(".weight"), Locator::css("[data-weight]")];
const WARRANTY: &[Locator] = &[Locator::css(".warranty"), Locator::css(".warranty-info")];

pub struct Rona;

impl SiteStrategy for Rona {
    fn name(&self) -> &'static str {
        "rona"
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
        record.sku = first_match(doc, SKU);
        record.price = first_match(doc, PRICE).as_deref().and_then(parse_price);
        record.description = first_match(doc, DESCRIPTION);

        let (category, subcategory) = breadcrumb_categories(doc, ".breadcrumb a");
        record.category = category;
        record.subcategory = subcategory;

        record.images = select_attrs(doc, ".product-image img, .gallery img", "src")
            .iter()
            .filter_map(|src| resolve_href(page_url, src))
            .map(|u| u.to_string())
            .collect();

        record.specifications =
            clean_specifications(spec_rows(doc, ".specifications tr, .product-specs tr"));
        record.features = select_texts(doc, ".features li, .product-features li");

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profile_for;

    const PAGE: &str = r#"<html><body>
        <nav class="breadcrumb"><a>Home</a><a>Tools</a><a>Drills</a></nav>
        <h1 class="pdp-product-name">DeWalt 20V Cordless Drill</h1>
        <div class="brand-name">DeWalt</div>
        <span class="model-number">DCD771C2</span>
        <span data-sku="330-1234"></span>
        <div class="price">$1,234.56</div>
        <div class="product-description"><p>Compact drill driver kit.</p></div>
        <div class="gallery"><img src="/img/drill-1.jpg"><img src="/img/drill-2.jpg"></div>
        <table class="specifications">
            <tr><th>Voltage</th><td>20 V</td></tr>
            <tr><th>Chuck</th><td>N/A</td></tr>
        </table>
        <ul class="features"><li>Two-speed transmission</li><li>LED work light</li></ul>
        <div class="availability">In stock</div>
        <span class="star-rating" data-rating="4.5"></span>
        <div class="warranty">3-year limited warranty</div>
        <a href="/support/dcd771-owner.pdf">Owner's Manual</a>
    </body></html>"#;

    #[test]
    fn test_extracts_full_record() {
        let profile = profile_for("rona").unwrap();
        let doc = Html::parse_document(PAGE);
        let page_url = Url::parse("https://www.rona.ca/tools/drill-dcd771").unwrap();

        let record = Rona.extract(&doc, &page_url, &profile).unwrap();

        assert_eq!(record.name, "DeWalt 20V Cordless Drill");
        assert_eq!(record.site, "rona");
        assert_eq!(record.brand.as_deref(), Some("DeWalt"));
        assert_eq!(record.model.as_deref(), Some("DCD771C2"));
        assert_eq!(record.sku.as_deref(), Some("330-1234"));
        assert_eq!(record.price, Some(1234.56));
        assert_eq!(record.category.as_deref(), Some("Tools"));
        assert_eq!(record.subcategory.as_deref(), Some("Drills"));
        assert_eq!(
            record.images,
            vec![
                "https://www.rona.ca/img/drill-1.jpg",
                "https://www.rona.ca/img/drill-2.jpg"
            ]
        );
        // The N/A spec row is cleaned away
        assert_eq!(record.specifications.len(), 1);
        assert_eq!(
            record.specifications.get("Voltage").map(String::as_str),
            Some("20 V")
        );
        assert_eq!(record.features.len(), 2);
        assert_eq!(record.availability.as_deref(), Some("In stock"));
        assert_eq!(record.rating, Some(4.5));
        assert_eq!(record.warranty.as_deref(), Some("3-year limited warranty"));
        assert_eq!(record.manuals.len(), 1);
        assert_eq!(
            record.manuals[0].url,
            "https://www.rona.ca/support/dcd771-owner.pdf"
        );
    }

    #[test]
    fn test_missing_name_is_an_extraction_error() {
        let profile = profile_for("rona").unwrap();
        let doc = Html::parse_document("<html><body><div class='price'>$5</div></body></html>");
        let page_url = Url::parse("https://www.rona.ca/tools/mystery").unwrap();

        let err = Rona.extract(&doc, &page_url, &profile).unwrap_err();
        assert_eq!(err, ExtractionError::MissingRequiredField("name"));
    }

    #[test]
    fn test_unparsable_price_is_absent_not_error() {
        let profile = profile_for("rona").unwrap();
        let doc = Html::parse_document(
            r#"<h1 class="pdp-product-name">Mystery Saw</h1>
               <div class="price">Call for price</div>"#,
        );
        let page_url = Url::parse("https://www.rona.ca/tools/mystery-saw").unwrap();

        let record = Rona.extract(&doc, &page_url, &profile).unwrap();
        assert_eq!(record.price, None);
    }
}
