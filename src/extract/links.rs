//! Listing page extraction

use crate::extract::document::{elements, find_caption, has_exact_class, next_named, text_of};
use scraper::{Html, Selector};
use url::Url;

/// Extracts entry links from a catalog listing page
///
/// Entry links are the `<a>` tags whose class is exactly `photo`. Links are
/// resolved against `base_url` and returned in page order without duplicates.
///
/// # Example
///
/// ```
/// use kym_harvester::extract::extract_links;
/// use url::Url;
///
/// let html = r#"<a class="photo" href="/memes/doge">Doge</a><a href="/about">About</a>"#;
/// let base = Url::parse("https://knowyourmeme.com").unwrap();
/// assert_eq!(extract_links(html, &base), vec!["https://knowyourmeme.com/memes/doge"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if !has_exact_class(element, "photo") {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                if !links.contains(&absolute_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty and fragment-only hrefs, non-HTTP schemes and
/// unparsable URLs.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Derives the exclusive end page from the catalog index
///
/// The index states the total number of entries in the paragraph after the
/// "All Entries" heading. With `items_per_page` entries per listing page the
/// crawl covers `1..ceil(total / items_per_page) + 1`.
pub fn extract_last_page(html: &str, items_per_page: u32) -> Option<u32> {
    if items_per_page == 0 {
        return None;
    }

    let document = Html::parse_document(html);
    let order = elements(&document);
    let heading = find_caption(document.root_element(), "All Entries")?;
    let paragraph = next_named(&order, heading, "p")?;

    let digits: String = text_of(paragraph)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let total: u32 = digits.parse().ok()?;

    Some(total.div_ceil(items_per_page) + 1)
}
