use std::path::Path;
use url::Url;
use crate::error::{Result, LyricsError};

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a URL string
    pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
        Url::parse(url).map_err(|e| {
            LyricsError::Validation(format!("Invalid {} URL '{}': {}", field_name, url, e))
        })?;
        Ok(())
    }

    /// Validate numeric range
    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(LyricsError::Validation(format!(
                "{} must be between {} and {}, got {}",
                field_name, min, max, value
            )));
        }
        Ok(())
    }

    /// Validate Redis URL format
    pub fn validate_redis_url(url: &str) -> Result<()> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(LyricsError::Validation(format!(
                "Redis URL must start with 'redis://' or 'rediss://', got: {}",
                url
            )));
        }

        Self::validate_url(url, "Redis")?;
        Ok(())
    }

    /// Validate database file extension
    pub fn validate_db_path(path: &Path) -> Result<()> {
        if let Some(ext) = path.extension() {
            if ext != "db" && ext != "sqlite" && ext != "sqlite3" {
                return Err(LyricsError::Validation(format!(
                    "Database file should have .db, .sqlite, or .sqlite3 extension, got: {}",
                    path.display()
                )));
            }
        } else {
            return Err(LyricsError::Validation(format!(
                "Database file should have an extension (.db, .sqlite, .sqlite3), got: {}",
                path.display()
            )));
        }
        Ok(())
    }

    /// Backup URL template must carry `{song_id}` and be a URL once filled in
    pub fn validate_url_template(template: &str) -> Result<()> {
        if !template.contains("{song_id}") {
            return Err(LyricsError::Validation(format!(
                "Backup URL template must contain '{{song_id}}', got: {}",
                template
            )));
        }

        Self::validate_url(&template.replace("{song_id}", "0"), "backup template")
    }

    /// Bare host name such as `genius.com`
    pub fn validate_domain(domain: &str) -> Result<()> {
        let valid = !domain.is_empty()
            && !domain.contains("://")
            && !domain.contains('/')
            && !domain.contains(char::is_whitespace);

        if !valid {
            return Err(LyricsError::Validation(format!(
                "Primary domain must be a bare host name, got: '{}'",
                domain
            )));
        }
        Ok(())
    }

    pub fn validate_not_blank(value: &str, field_name: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(LyricsError::Validation(format!("{} must not be empty", field_name)));
        }
        Ok(())
    }
}
