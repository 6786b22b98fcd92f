//! Management commands
//!
//! Cache inspection and configuration display.

pub mod cache;
pub mod config;
