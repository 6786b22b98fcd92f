use std::env;
use std::path::PathBuf;
use crate::error::{Result, LyricsError};

/// Environment variable configuration constants
pub struct EnvVars;

impl EnvVars {
    pub const DATABASE_PATH: &'static str = "LYRICSR_DATABASE_PATH";
    pub const REDIS_URL: &'static str = "LYRICSR_REDIS_URL";
    pub const CACHE_TTL_SECONDS: &'static str = "LYRICSR_CACHE_TTL_SECONDS";
    pub const CACHE_MAX_ENTRIES: &'static str = "LYRICSR_CACHE_MAX_ENTRIES";
    pub const STALENESS_MONTHS: &'static str = "LYRICSR_STALENESS_MONTHS";

    pub const SEARCH_API_KEY: &'static str = "LYRICSR_SEARCH_API_KEY";
    pub const SEARCH_ENGINE_ID: &'static str = "LYRICSR_SEARCH_ENGINE_ID";
    pub const SEARCH_ENDPOINT: &'static str = "LYRICSR_SEARCH_ENDPOINT";
    pub const SEARCH_QUALIFIER: &'static str = "LYRICSR_SEARCH_QUALIFIER";
    pub const SEARCH_RESULT_COUNT: &'static str = "LYRICSR_SEARCH_RESULT_COUNT";
    pub const SEARCH_TIMEOUT_SECONDS: &'static str = "LYRICSR_SEARCH_TIMEOUT_SECONDS";

    pub const USER_AGENT: &'static str = "LYRICSR_USER_AGENT";
    pub const NAVIGATION_TIMEOUT_SECONDS: &'static str = "LYRICSR_NAVIGATION_TIMEOUT_SECONDS";
    pub const PRIMARY_SELECTOR_TIMEOUT_SECONDS: &'static str = "LYRICSR_PRIMARY_SELECTOR_TIMEOUT_SECONDS";
    pub const BACKUP_SELECTOR_TIMEOUT_SECONDS: &'static str = "LYRICSR_BACKUP_SELECTOR_TIMEOUT_SECONDS";
    pub const PRIMARY_DOMAIN: &'static str = "LYRICSR_PRIMARY_DOMAIN";
    pub const PRIMARY_PATH_MARKER: &'static str = "LYRICSR_PRIMARY_PATH_MARKER";
    pub const BACKUP_URL_TEMPLATE: &'static str = "LYRICSR_BACKUP_URL_TEMPLATE";
    pub const SNAPSHOT_DIR: &'static str = "LYRICSR_SNAPSHOT_DIR";
    pub const SAVE_SNAPSHOTS: &'static str = "LYRICSR_SAVE_SNAPSHOTS";
    pub const CHROME_EXECUTABLE: &'static str = "LYRICSR_CHROME_EXECUTABLE";

    // Special environment variables
    pub const DOCKER: &'static str = "DOCKER";
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Parse environment variable as string with validation
    pub fn parse_string(var_name: &str, validator: Option<fn(&str) -> Result<()>>) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(None);
                }

                if let Some(validate_fn) = validator {
                    validate_fn(&trimmed)?;
                }

                Ok(Some(trimmed))
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => {
                Err(LyricsError::Validation(format!(
                    "Environment variable {} contains invalid UTF-8",
                    var_name
                )))
            }
        }
    }

    /// Parse environment variable as PathBuf with validation
    pub fn parse_path(var_name: &str, should_exist: bool) -> Result<Option<PathBuf>> {
        if let Some(path_str) = Self::parse_string(var_name, None)? {
            let path = PathBuf::from(path_str);

            if should_exist && !path.exists() {
                return Err(LyricsError::Validation(format!(
                    "Path specified in {} does not exist: {}",
                    var_name,
                    path.display()
                )));
            }

            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as boolean
    pub fn parse_bool(var_name: &str) -> Result<Option<bool>> {
        if let Some(value_str) = Self::parse_string(var_name, None)? {
            match value_str.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(LyricsError::Validation(format!(
                    "Invalid boolean value in {}: '{}'. Use: true/false, 1/0, yes/no, on/off",
                    var_name, value_str
                )))
            }
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as an unsigned integer within `min..=max`
    pub fn parse_number<T>(var_name: &str, min: T, max: T) -> Result<Option<T>>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    {
        if let Some(value_str) = Self::parse_string(var_name, None)? {
            let value = value_str.parse::<T>().map_err(|_| {
                LyricsError::Validation(format!(
                    "Invalid number in {}: '{}'. Must be a positive integer",
                    var_name, value_str
                ))
            })?;

            if value < min || value > max {
                return Err(LyricsError::Validation(format!(
                    "Value in {} must be between {} and {}, got {}",
                    var_name, min, max, value
                )));
            }

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Check if environment variable is present (for boolean flags)
    pub fn is_present(var_name: &str) -> bool {
        env::var(var_name).is_ok()
    }
}
