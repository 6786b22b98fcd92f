//! Service wiring
//!
//! `SimpleServices` turns a loaded `Config` into the concrete store, cache,
//! search client, scraper and resolver used by the CLI commands.

pub mod simple_container;

pub use simple_container::SimpleServices;
