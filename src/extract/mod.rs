//! HTML extraction for catalog listing and entry pages
//!
//! These functions are pure: they take an already fetched body and never fail.
//! Anything the markup does not provide falls back to the field default.
//!
//! - `extract_links`: entry links of one listing page
//! - `extract_record`: the [`Record`](crate::state::Record) of one entry page
//! - `extract_last_page`: exclusive end page derived from the catalog index

mod document;
mod links;
mod record;
mod text;

pub use links::{extract_last_page, extract_links};
pub use record::extract_record;
pub use text::strip_asides;
