//! Free-text sections of an entry page

use crate::extract::document::{find_caption, following, next_named, position, select_first, text_of};
use scraper::{ElementRef, Html};

/// Removes "(shown below)" asides that point at embedded media
pub fn strip_asides(text: &str) -> String {
    text.replace("(shown below)", "")
}

/// About, origin/history and remaining body text of an entry
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct BodyText {
    pub about: String,
    pub history: String,
    pub other: String,
}

/// Concatenated paragraph text starting at `order[start]` up to the first element matching `stop`
///
/// Returns the text and the index of the stopping element, if any.
fn paragraphs_until(
    order: &[ElementRef<'_>],
    start: usize,
    stop: impl Fn(ElementRef<'_>) -> bool,
) -> (String, Option<usize>) {
    let mut text = String::new();
    for (offset, element) in order[start..].iter().copied().enumerate() {
        if stop(element) {
            return (text, Some(start + offset));
        }
        if element.value().name() == "p" {
            text.push_str(&text_of(element));
        }
    }
    (text, None)
}

fn is_heading(element: ElementRef<'_>) -> bool {
    element.value().name() == "h2"
}

/// Extracts the body text sections from `section.bodycopy`
pub(crate) fn extract_body_text<'a>(html: &'a Html, order: &[ElementRef<'a>]) -> BodyText {
    let bodycopy = match select_first(html.root_element(), "section.bodycopy") {
        Some(section) => section,
        None => return BodyText::default(),
    };

    let about = select_first(bodycopy, "p")
        .map(|p| strip_asides(&text_of(p)))
        .unwrap_or_default();

    let heading = find_caption(bodycopy, "Origin").or_else(|| find_caption(bodycopy, "History"));
    let first_paragraph = heading.and_then(|heading| next_named(order, heading, "p"));
    let start = match first_paragraph.and_then(|p| position(order, p)) {
        Some(start) => start,
        None => {
            return BodyText {
                about,
                ..BodyText::default()
            }
        }
    };

    let (history, next_heading) = paragraphs_until(order, start, is_heading);

    let other = next_heading
        .and_then(|index| {
            following(order, order[index])
                .iter()
                .position(|element| element.value().name() == "p")
                .map(|offset| index + 1 + offset)
        })
        .map(|start| {
            paragraphs_until(order, start, |element| {
                is_heading(element) || text_of(element) == "Search Interest"
            })
            .0
        })
        .unwrap_or_default();

    BodyText {
        about,
        history: strip_asides(&history),
        other: strip_asides(&other),
    }
}
