//! Infrastructure and cross-cutting concerns
//!
//! - Caching layer in front of the durable store and the scrapers

pub mod cache;

pub use cache::{HybridCache, LyricsCache, MemoryCache};
