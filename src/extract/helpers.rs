// src/extract/helpers.rs
// =============================================================================
// Field-extraction building blocks shared by every site strategy.
//
// Key functionality:
// - first_match: ordered locator list, first non-empty hit wins; a total
//   miss is an observable None, never an empty string
// - select_texts / select_attrs: all matches for list-valued fields
//   (features, images), whitespace-collapsed, page order preserved
// - parse_price / parse_rating: lenient numeric parsing where junk text
//   means "absent", not "error"
// - clean_specifications: trims labels/values and drops placeholders
// - discover_documents: scans every hyperlink for manual/document
//   candidates and resolves them against the page URL
// =============================================================================

use crate::records::{DocKind, DocumentLink};
use crate::urls::resolve_href;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// One structural locator: a CSS selector, optionally pointing at an
/// attribute instead of the element's text.
#[derive(Debug, Clone, Copy)]
pub struct Locator {
    pub selector: &'static str,
    pub attr: Option<&'static str>,
}

impl Locator {
    pub const fn css(selector: &'static str) -> Self {
        Locator {
            selector,
            attr: None,
        }
    }

    pub const fn attr(selector: &'static str, attr: &'static str) -> Self {
        Locator {
            selector,
            attr: Some(attr),
        }
    }
}

/// Words and suffixes that mark a link as a manual or document candidate,
/// matched against both the href and the anchor text.
pub const DOCUMENT_LEXICON: &[&str] = &[
    "manual",
    "instruction",
    "guide",
    "installation",
    "assembly",
    "user guide",
    "owner",
    "setup",
    "quick start",
    "operation",
    ".pdf",
    "download",
    "document",
];

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: &ElementRef) -> String {
    collapse_ws(&element.text().collect::<Vec<_>>().join(" "))
}

/// Tries each locator in order and returns the first non-empty value.
/// Locators that match nothing (or match only whitespace) fall through
/// to the next; if none hit, the field is absent.
pub fn first_match(doc: &Html, locators: &[Locator]) -> Option<String> {
    for locator in locators {
        let Ok(selector) = Selector::parse(locator.selector) else {
            continue;
        };
        for element in doc.select(&selector) {
            let raw = match locator.attr {
                Some(attr) => element.value().attr(attr).map(collapse_ws),
                None => Some(element_text(&element)),
            };
            if let Some(value) = raw {
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Every match's text for a (possibly comma-joined) selector, cleaned,
/// empties dropped, page order preserved.
pub fn select_texts(doc: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&selector)
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Every match's attribute value for a selector, page order preserved.
pub fn select_attrs(doc: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Parses the first numeric run out of a price string: commas dropped,
/// currency symbols and surrounding text ignored. Text with no number
/// at all ("Call for price") is None, not an error.
pub fn parse_price(text: &str) -> Option<f64> {
    let no_commas = text.replace(',', "");
    let mut run = String::new();
    for c in no_commas.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else if c == '.' && !run.is_empty() && !run.contains('.') {
            run.push(c);
        } else if !run.is_empty() {
            break;
        }
    }
    if run.is_empty() {
        return None;
    }
    run.trim_end_matches('.').parse().ok()
}

/// A star rating is kept only when it parses and lands in 0..=5;
/// anything else counts as absent.
pub fn parse_rating(text: &str) -> Option<f32> {
    let value: f32 = text.trim().parse().ok()?;
    (0.0..=5.0).contains(&value).then_some(value)
}

/// Trims labels and values, drops entries whose value is empty or a
/// placeholder (n/a, not applicable, -), keeps the rest verbatim.
pub fn clean_specifications(
    specs: impl IntoIterator<Item = (String, String)>,
) -> BTreeMap<String, String> {
    specs
        .into_iter()
        .filter_map(|(key, value)| {
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            let lower = value.to_lowercase();
            if lower == "n/a" || lower == "not applicable" || lower == "-" {
                return None;
            }
            Some((key, value))
        })
        .collect()
}

/// Reads label/value pairs out of table rows: first cell is the label,
/// last cell the value; rows without two cells are skipped.
pub fn spec_rows(doc: &Html, rows_selector: &str) -> Vec<(String, String)> {
    let Ok(row_selector) = Selector::parse(rows_selector) else {
        return Vec::new();
    };
    let Ok(cell_selector) = Selector::parse("th, td") else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for row in doc.select(&row_selector) {
        let cells: Vec<String> = row.select(&cell_selector).map(|c| element_text(&c)).collect();
        if cells.len() >= 2 {
            rows.push((cells[0].clone(), cells[cells.len() - 1].clone()));
        }
    }
    rows
}

/// Derives category and subcategory from breadcrumbs: with two or more
/// crumbs the last is the subcategory and the one before it the
/// category; a lone crumb is just the category.
pub fn breadcrumb_categories(doc: &Html, selector: &str) -> (Option<String>, Option<String>) {
    let crumbs = select_texts(doc, selector);
    match crumbs.len() {
        0 => (None, None),
        1 => (Some(crumbs[0].clone()), None),
        n => (Some(crumbs[n - 2].clone()), Some(crumbs[n - 1].clone())),
    }
}

/// True when the href or anchor text mentions anything in the lexicon.
pub fn is_document_link(href: &str, text: &str) -> bool {
    let href_lower = href.to_lowercase();
    let text_lower = text.to_lowercase();
    DOCUMENT_LEXICON
        .iter()
        .any(|word| href_lower.contains(word) || text_lower.contains(word))
}

/// Scans every hyperlink on the page for manual/document candidates.
/// A `.pdf` href is a manual; any other lexicon hit is a generic
/// document. Relative hrefs are resolved against the page URL; ones
/// that don't resolve to http(s) are skipped.
pub fn discover_documents(doc: &Html, page_url: &Url) -> (Vec<DocumentLink>, Vec<DocumentLink>) {
    let mut manuals = Vec::new();
    let mut documents = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return (manuals, documents);
    };

    for element in doc.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let text = element_text(&element);
        if !is_document_link(href, &text) {
            continue;
        }
        let Some(resolved) = resolve_href(page_url, href) else {
            continue;
        };

        if href.to_lowercase().ends_with(".pdf") {
            manuals.push(DocumentLink {
                url: resolved.to_string(),
                title: if text.is_empty() { "Manual".to_string() } else { text },
                kind: DocKind::Pdf,
                local_path: None,
            });
        } else {
            documents.push(DocumentLink {
                url: resolved.to_string(),
                title: if text.is_empty() { "Document".to_string() } else { text },
                kind: DocKind::Document,
                local_path: None,
            });
        }
    }

    (manuals, documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_takes_the_first_locator_that_hits() {
        let doc = Html::parse_document(
            r#"<div class="b">second</div><h1 class="a">  first   value </h1>"#,
        );
        let locators = [Locator::css("h1.a"), Locator::css(".b")];
        assert_eq!(first_match(&doc, &locators), Some("first value".to_string()));
    }

    #[test]
    fn test_first_match_total_miss_is_none() {
        let doc = Html::parse_document("<p>nothing relevant</p>");
        let locators = [Locator::css(".name"), Locator::css("h1.title")];
        assert_eq!(first_match(&doc, &locators), None);
    }

    #[test]
    fn test_first_match_reads_attributes() {
        let doc = Html::parse_document(r#"<span data-sku="AB-123"></span>"#);
        let locators = [Locator::attr("[data-sku]", "data-sku")];
        assert_eq!(first_match(&doc, &locators), Some("AB-123".to_string()));
    }

    #[test]
    fn test_first_match_skips_empty_hits() {
        let doc = Html::parse_document(r#"<h1 class="a">   </h1><div class="b">real</div>"#);
        let locators = [Locator::css("h1.a"), Locator::css(".b")];
        assert_eq!(first_match(&doc, &locators), Some("real".to_string()));
    }

    #[test]
    fn test_parse_price_strips_currency_and_commas() {
        assert_eq!(parse_price("$1,234.56"), Some(1234.56));
        assert_eq!(parse_price("CAD 89.99 "), Some(89.99));
        assert_eq!(parse_price("1299"), Some(1299.0));
    }

    #[test]
    fn test_parse_price_junk_is_none_not_error() {
        assert_eq!(parse_price("Call for price"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_parse_rating_enforces_range() {
        assert_eq!(parse_rating("4.5"), Some(4.5));
        assert_eq!(parse_rating(" 0 "), Some(0.0));
        assert_eq!(parse_rating("7.2"), None);
        assert_eq!(parse_rating("four stars"), None);
    }

    #[test]
    fn test_clean_specifications_drops_placeholders() {
        let raw = vec![
            ("Color".to_string(), "  Red ".to_string()),
            ("Weight".to_string(), "N/A".to_string()),
            ("Size".to_string(), "".to_string()),
            (" Finish ".to_string(), "-".to_string()),
        ];
        let cleaned = clean_specifications(raw);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.get("Color").map(String::as_str), Some("Red"));
    }

    #[test]
    fn test_spec_rows_reads_first_and_last_cells() {
        let doc = Html::parse_document(
            r#"<table class="specifications">
                <tr><th>Voltage</th><td>20 V</td></tr>
                <tr><td>Chuck</td><td>1/2 in</td></tr>
                <tr><td>lonely cell</td></tr>
            </table>"#,
        );
        let rows = spec_rows(&doc, ".specifications tr");
        assert_eq!(
            rows,
            vec![
                ("Voltage".to_string(), "20 V".to_string()),
                ("Chuck".to_string(), "1/2 in".to_string()),
            ]
        );
    }

    #[test]
    fn test_breadcrumbs_two_or_more_crumbs() {
        let doc = Html::parse_document(
            r#"<nav class="breadcrumb">
                <a>Home</a><a>Tools</a><a>Drills</a>
            </nav>"#,
        );
        let (category, subcategory) = breadcrumb_categories(&doc, ".breadcrumb a");
        assert_eq!(category.as_deref(), Some("Tools"));
        assert_eq!(subcategory.as_deref(), Some("Drills"));
    }

    #[test]
    fn test_breadcrumbs_single_crumb() {
        let doc = Html::parse_document(r#"<nav class="breadcrumb"><a>Tools</a></nav>"#);
        let (category, subcategory) = breadcrumb_categories(&doc, ".breadcrumb a");
        assert_eq!(category.as_deref(), Some("Tools"));
        assert_eq!(subcategory, None);
    }

    #[test]
    fn test_manual_link_classification_and_resolution() {
        let doc = Html::parse_document(
            r#"<a href="/support/manual.pdf">Install Guide</a>
               <a href="/support/spec-sheet">Download spec document</a>
               <a href="/tools/other-drill">Similar products</a>"#,
        );
        let page_url = Url::parse("https://x.com/p/1").unwrap();
        let (manuals, documents) = discover_documents(&doc, &page_url);

        assert_eq!(manuals.len(), 1);
        assert_eq!(manuals[0].url, "https://x.com/support/manual.pdf");
        assert_eq!(manuals[0].title, "Install Guide");
        assert_eq!(manuals[0].kind, DocKind::Pdf);
        assert_eq!(manuals[0].local_path, None);

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].kind, DocKind::Document);
        assert_eq!(documents[0].url, "https://x.com/support/spec-sheet");
    }

    #[test]
    fn test_untitled_manual_gets_a_default_title() {
        let doc = Html::parse_document(r#"<a href="/files/dw123.pdf"><img src="x.png"></a>"#);
        let page_url = Url::parse("https://x.com/p/1").unwrap();
        let (manuals, _) = discover_documents(&doc, &page_url);
        assert_eq!(manuals[0].title, "Manual");
    }
}
