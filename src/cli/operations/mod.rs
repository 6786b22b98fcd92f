//! Diagnostic operations
//!
//! One-off scrapes against a single profile and offline text normalization.

pub mod normalize;
pub mod scrape;
