// src/records.rs
// =============================================================================
// The data shapes that flow through the crawl.
//
// - ProductRecord: one product page's structured data. Created by the
//   extraction engine, mutated in place as pipeline stages add to it
//   (e.g. downloaded manuals gain a local path), frozen once exported.
// - DocumentLink: one manual or document linked from a product page.
// - DownloadRecord: one attempted auxiliary file download, success or not.
//   Append-only; the whole log is written at the end of the run.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of auxiliary document linked from a product page.
/// A `.pdf` link is a manual; anything else in the lexicon is a
/// generic document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    Pdf,
    Document,
}

/// A manual or document discovered on a product page.
///
/// `local_path` stays `None` until the download stage materializes the
/// file. If the download fails the entry keeps its remote URL so a
/// downstream consumer can re-attempt it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: DocKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

/// One product page's structured data.
///
/// `url` and `name` are the required fields; everything else is
/// best-effort. A field the extractor found no locator for is `None`,
/// never an empty string, so "absent on page" stays distinguishable
/// from "extractor returned nothing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub site: String,
    pub scraped_at: DateTime<Utc>,

    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub description: Option<String>,

    /// Label -> value. Labels trimmed, placeholder values removed.
    pub specifications: BTreeMap<String, String>,
    /// Bullet-list features, page order preserved.
    pub features: Vec<String>,
    /// Absolute image URLs, page order preserved.
    pub images: Vec<String>,

    pub availability: Option<String>,
    /// Star rating; present only when parsable and within 0.0..=5.0.
    pub rating: Option<f32>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub warranty: Option<String>,

    pub manuals: Vec<DocumentLink>,
    pub documents: Vec<DocumentLink>,
}

impl ProductRecord {
    /// Starts a record with the required fields; extraction strategies
    /// fill in the rest.
    pub fn new(url: String, site: String, name: String) -> Self {
        ProductRecord {
            url,
            site,
            scraped_at: Utc::now(),
            name,
            brand: None,
            model: None,
            sku: None,
            price: None,
            category: None,
            subcategory: None,
            description: None,
            specifications: BTreeMap::new(),
            features: Vec::new(),
            images: Vec::new(),
            availability: None,
            rating: None,
            dimensions: None,
            weight: None,
            warranty: None,
            manuals: Vec::new(),
            documents: Vec::new(),
        }
    }
}

/// One attempted auxiliary file download. `local_path` is `None` when
/// the attempt failed. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub url: String,
    pub local_path: Option<String>,
    pub title: String,
    pub sku: String,
    pub downloaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_link_serializes_kind_as_type() {
        let link = DocumentLink {
            url: "https://x.com/m.pdf".to_string(),
            title: "Manual".to_string(),
            kind: DocKind::Pdf,
            local_path: None,
        };
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "pdf");
        // local_path is omitted until the file is materialized
        assert!(json.get("local_path").is_none());
    }

    #[test]
    fn test_new_record_has_empty_collections() {
        let record = ProductRecord::new(
            "https://x.com/p/1".to_string(),
            "rona".to_string(),
            "Cordless Drill".to_string(),
        );
        assert!(record.specifications.is_empty());
        assert!(record.manuals.is_empty());
        assert!(record.price.is_none());
    }
}
