//! External sources and the resolution cascade
//!
//! - `search`: web search provider used to find the primary source page
//! - `scraper`: headless-browser scraping with per-source profiles
//! - `resolver`: cache, store, primary and backup tiers in order

pub mod resolver;
pub mod scraper;
pub mod search;
