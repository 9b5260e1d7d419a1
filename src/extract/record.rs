//! Entry page extraction

use crate::extract::document::{
    elements, find_caption, following, has_exact_class, next_named, next_outside, select_first,
    text_of,
};
use crate::extract::text::extract_body_text;
use crate::state::{Record, Year};
use scraper::{ElementRef, Html, Selector};

const COUNTERS: [&str; 4] = ["views", "videos", "photos", "comments"];

/// Extracts the record of one catalog entry
///
/// `url` is the entry link the page was fetched from. `catalog_prefix` is the
/// path prefix of internal catalog links (`/memes`), used to keep those out
/// of the picture fallback. Missing markup never fails the extraction: the
/// affected field keeps its default.
pub fn extract_record(html: &str, url: &str, catalog_prefix: &str) -> Record {
    let document = Html::parse_document(html);
    let order = elements(&document);
    let root = document.root_element();

    let mut record = Record::new(url);

    for counter in COUNTERS {
        let value = select_first(root, &format!("dd.{}", counter))
            .map(|dd| counter_value(&order, dd))
            .unwrap_or(0);
        match counter {
            "views" => record.views = value,
            "videos" => record.videos = value,
            "photos" => record.photos = value,
            _ => record.comments = value,
        }
    }

    record.name = select_first(root, "h1").map(text_of).unwrap_or_default();

    if let Some(properties) = select_first(root, "aside.left") {
        fill_properties(&mut record, &order, properties);
    }

    fill_dates(&mut record, &document);

    let body = extract_body_text(&document, &order);
    record.about = body.about;
    record.history = body.history;
    record.other = body.other;

    record.picture = picture_link(&document, catalog_prefix);

    record
}

/// Value of the first link following a counter label, "1,234" reads as 1234
fn counter_value(order: &[ElementRef<'_>], label: ElementRef<'_>) -> u64 {
    next_named(order, label, "a")
        .map(|a| text_of(a).replace(',', ""))
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Lowercased trimmed text, empty when the element is missing
fn lowered(element: Option<ElementRef<'_>>) -> String {
    element.map(|e| text_of(e).to_lowercase()).unwrap_or_default()
}

/// Reads the categorical metadata from the left-hand details panel
fn fill_properties<'a>(record: &mut Record, order: &[ElementRef<'a>], properties: ElementRef<'a>) {
    record.category = lowered(
        select_first(properties, "dl").and_then(|dl| following(order, dl).first().copied()),
    );
    record.status = lowered(next_named(order, properties, "dd"));
    record.kind = lowered(select_first(properties, "a.entry-type-link"));
    record.origin = lowered(select_first(properties, "dd.entry_origin_link"));

    record.year = find_caption(properties, "Year")
        .and_then(|caption| next_outside(order, caption))
        .map(|value| Year::parse(&text_of(value)))
        .unwrap_or_default();

    record.tags = lowered(
        find_caption(properties, "Tags").and_then(|caption| next_outside(order, caption)),
    );
}

/// Reads the "Added" and "Updated" timestamps from their `abbr.timeago` tags
fn fill_dates(record: &mut Record, document: &Html) {
    let selector = match Selector::parse("abbr.timeago") {
        Ok(selector) => selector,
        Err(_) => return,
    };

    for abbr in document.select(&selector) {
        let title = abbr.value().attr("title").unwrap_or_default().to_string();
        let caption_text = abbr
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| parent.text().collect::<String>())
            .unwrap_or_default();
        let mut lines = caption_text.split('\n').map(str::trim);

        if lines.clone().any(|line| line == "Added") {
            record.added = title;
        } else if lines.any(|line| line == "Updated") {
            record.updated = title;
        }
    }
}

/// Representative picture of the entry
///
/// Prefers the wide header photo, else the first photo link that does not
/// point back into the catalog.
fn picture_link(document: &Html, catalog_prefix: &str) -> String {
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };
    let anchors: Vec<ElementRef<'_>> = document.select(&selector).collect();
    let href = |a: &ElementRef<'_>| a.value().attr("href").unwrap_or_default().to_string();

    if let Some(wide) = anchors.iter().find(|a| has_exact_class(**a, "photo left wide")) {
        return href(wide);
    }

    anchors
        .iter()
        .filter(|a| has_exact_class(**a, "photo left"))
        .map(href)
        .find(|target| !target.starts_with(catalog_prefix))
        .unwrap_or_default()
}
