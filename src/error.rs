//! Error handling for the lyrics resolver
//!
//! Each pipeline stage has its own error type. Search, scrape and cache
//! failures are recoverable inside the resolution cascade; persistence
//! failures are surfaced to the caller.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Search API returned status {0}")]
    Status(u16),

    #[error("Search API quota exceeded")]
    QuotaExceeded,

    #[error("Search request timed out")]
    Timeout,

    #[error("Search API response invalid: {reason}")]
    InvalidResponse { reason: String },

    #[error("Search API key or engine id not configured")]
    NotConfigured,
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out waiting for '{selector}' on {url}")]
    SelectorTimeout {
        selector: String,
        url: String,
        snapshot: Option<PathBuf>,
    },

    #[error("Failed to extract lyrics: {reason}")]
    Extraction { reason: String },

    #[error("Browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Connection failed: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Song not found in catalog: {song}")]
    SongNotFound { song: String },

    #[error("Invalid timestamp stored for song {song_id}: {value}")]
    InvalidTimestamp { song_id: i64, value: String },

    #[error("Database corruption detected")]
    Corruption,

    #[error("Database lock poisoned")]
    Poisoned,

    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, LyricsError>;

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ffi::Error { code: ffi::ErrorCode::DatabaseCorrupt, .. }, _) => {
                PersistenceError::Corruption
            }
            _ => PersistenceError::Query(err),
        }
    }
}

use rusqlite::ffi;

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout
        } else {
            SearchError::Http(err)
        }
    }
}

impl From<std::io::Error> for LyricsError {
    fn from(err: std::io::Error) -> Self {
        LyricsError::Internal(err.into())
    }
}

impl From<toml::de::Error> for LyricsError {
    fn from(err: toml::de::Error) -> Self {
        LyricsError::Config(ConfigError::InvalidFormat(err))
    }
}

impl From<serde_json::Error> for LyricsError {
    fn from(err: serde_json::Error) -> Self {
        LyricsError::Internal(err.into())
    }
}
