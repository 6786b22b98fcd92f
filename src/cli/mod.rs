//! Command Line Interface module
//!
//! Commands are grouped into:
//! - `core`: resolving lyrics and managing the song catalog
//! - `operations`: single scrapes and offline normalization
//! - `management`: cache and configuration

pub mod core;
pub mod management;
pub mod operations;

pub use self::core::{resolve, songs};
pub use management::{cache, config};
pub use operations::{normalize, scrape};
