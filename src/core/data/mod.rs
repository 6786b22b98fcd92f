//! Data layer modules
//!
//! - `models`: song identity, lyrics records and the staleness rule
//! - `database`: the `LyricsStore` contract and its SQLite implementation

pub mod database;
pub mod models;

pub use database::{LyricsStore, SqliteLyricsStore};
pub use models::SongKey;
