//! Core CLI commands
//!
//! Resolving lyrics for a song and managing the song catalog.

pub mod resolve;
pub mod songs;
