//! Document-order traversal over a parsed page
//!
//! Field lookups on entry pages are positional ("the first link after this
//! counter", "paragraphs until the next heading"), so they work over a flat
//! list of elements in document order.

use scraper::{ElementRef, Html, Selector};

/// All elements of the document in document order
pub(crate) fn elements(html: &Html) -> Vec<ElementRef<'_>> {
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

/// Index of `element` in `order`
pub(crate) fn position(order: &[ElementRef<'_>], element: ElementRef<'_>) -> Option<usize> {
    order.iter().position(|candidate| *candidate == element)
}

/// Elements after `anchor`, starting with its own descendants
pub(crate) fn following<'a, 'b>(
    order: &'b [ElementRef<'a>],
    anchor: ElementRef<'a>,
) -> &'b [ElementRef<'a>] {
    match position(order, anchor) {
        Some(index) => &order[index + 1..],
        None => &[],
    }
}

/// First element after `anchor` that is not inside it
pub(crate) fn next_outside<'a>(
    order: &[ElementRef<'a>],
    anchor: ElementRef<'a>,
) -> Option<ElementRef<'a>> {
    following(order, anchor)
        .iter()
        .copied()
        .find(|element| !element.ancestors().any(|ancestor| ancestor == *anchor))
}

/// First element after `anchor` with tag `name`
pub(crate) fn next_named<'a>(
    order: &[ElementRef<'a>],
    anchor: ElementRef<'a>,
    name: &str,
) -> Option<ElementRef<'a>> {
    following(order, anchor)
        .iter()
        .copied()
        .find(|element| element.value().name() == name)
}

/// First element in or below `scope` carrying a direct text child equal to `caption`
pub(crate) fn find_caption<'a>(scope: ElementRef<'a>, caption: &str) -> Option<ElementRef<'a>> {
    scope.descendants().filter_map(ElementRef::wrap).find(|element| {
        element.children().any(|child| {
            child
                .value()
                .as_text()
                .map_or(false, |text| text.trim() == caption)
        })
    })
}

/// First match of `selector` below `scope`
pub(crate) fn select_first<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    let found = scope.select(&selector).next();
    found
}

/// Trimmed text content of an element
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Returns true if the element's `class` attribute is exactly `class`
pub(crate) fn has_exact_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().attr("class").map(str::trim) == Some(class)
}
