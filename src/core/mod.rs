//! Core functionality modules
//!
//! - `data`: song catalog and lyrics persistence
//! - `services`: search, scraping and the resolution cascade
//! - `infrastructure`: lyrics cache backends
//! - `lyrics`: text normalization

pub mod data;
pub mod infrastructure;
pub mod lyrics;
pub mod services;
