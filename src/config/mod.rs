use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use directories::ProjectDirs;
use tracing::debug;

use crate::core::services::resolver::ResolverPolicy;
use crate::core::services::scraper::{ScrapeProfile, ScrapeSettings, DEFAULT_USER_AGENT};
use crate::core::services::search::SearchSettings;
use crate::error::{ConfigError, LyricsError, Result};

pub mod builder;
pub mod env;
pub mod validation;

pub use builder::ConfigBuilder;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_BACKUP_URL_TEMPLATE: &str = "https://www.melon.com/song/detail.htm?songId={song_id}";

fn default_cache_ttl_seconds() -> u64 {
    3600
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_staleness_months() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file path
    pub database_path: PathBuf,

    /// Redis URL for the shared cache (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    /// Lifetime of a cached lyrics entry
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    /// Upper bound on in-memory cache entries
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Age after which unconfirmed stored lyrics are refreshed
    #[serde(default = "default_staleness_months")]
    pub staleness_months: u32,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,
}

/// Web search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,
    pub endpoint: String,
    /// Appended to "title artist" to steer results toward translations
    pub qualifier: String,
    pub result_count: u8,
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            qualifier: "Genius English Translation".to_string(),
            result_count: 2,
            timeout_seconds: 10,
        }
    }
}

/// Browser scraping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub user_agent: String,
    pub navigation_timeout_seconds: u64,
    pub primary_selector_timeout_seconds: u64,
    pub backup_selector_timeout_seconds: u64,
    pub primary_domain: String,
    pub primary_path_marker: String,
    /// Backup page URL; `{song_id}` is replaced with the external song id
    pub backup_url_template: String,
    /// Where selector-timeout screenshots are written
    pub snapshot_dir: PathBuf,
    pub save_snapshots: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout_seconds: 60,
            primary_selector_timeout_seconds: 60,
            backup_selector_timeout_seconds: 20,
            primary_domain: "genius.com".to_string(),
            primary_path_marker: "english-translation".to_string(),
            backup_url_template: DEFAULT_BACKUP_URL_TEMPLATE.to_string(),
            snapshot_dir: ConfigBuilder::default_snapshot_dir(),
            save_snapshots: true,
            chrome_executable: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: ConfigBuilder::default_data_path().join("lyrics.db"),
            redis_url: None,
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_max_entries: default_cache_max_entries(),
            staleness_months: default_staleness_months(),
            search: SearchConfig::default(),
            scrape: ScrapeConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then the config file, then `.env`, then `LYRICSR_*` variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(ConfigError::FileNotFound { path }.into());
                }
                path
            }
            None => Self::default_config_path()?,
        };

        let base = if config_file.exists() {
            debug!("Loading config from {}", config_file.display());
            Self::from_file(&config_file)?
        } else {
            // First run: write out defaults, never secrets picked up from the environment
            let defaults = Self::default();
            if let Some(parent) = config_file.parent() {
                fs::create_dir_all(parent)?;
            }
            defaults.save(&config_file)?;
            defaults
        };

        dotenvy::dotenv().ok();

        let config = ConfigBuilder::from_config(base).load_from_env()?.build()?;

        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn default_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "lyricsr", "lyricsr").ok_or_else(|| {
            LyricsError::Internal(anyhow::anyhow!("Failed to determine project directories"))
        })?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Self::default_config_path()
    }

    /// Copy safe for display: the search API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.search.api_key = copy.search.api_key.as_deref().map(mask_secret);
        copy
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            endpoint: self.search.endpoint.clone(),
            api_key: self.search.api_key.clone(),
            engine_id: self.search.engine_id.clone(),
            result_count: self.search.result_count,
            timeout: Duration::from_secs(self.search.timeout_seconds),
        }
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            user_agent: self.scrape.user_agent.clone(),
            navigation_timeout: Duration::from_secs(self.scrape.navigation_timeout_seconds),
            snapshot_dir: self.scrape.save_snapshots.then(|| self.scrape.snapshot_dir.clone()),
            chrome_executable: self.scrape.chrome_executable.clone(),
        }
    }

    pub fn primary_profile(&self) -> ScrapeProfile {
        ScrapeProfile::primary(Duration::from_secs(self.scrape.primary_selector_timeout_seconds))
    }

    pub fn backup_profile(&self) -> ScrapeProfile {
        ScrapeProfile::backup(
            self.scrape.backup_url_template.clone(),
            Duration::from_secs(self.scrape.backup_selector_timeout_seconds),
        )
    }

    pub fn resolver_policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            query_qualifier: self.search.qualifier.clone(),
            primary_domain: self.scrape.primary_domain.clone(),
            primary_path_marker: self.scrape.primary_path_marker.clone(),
            staleness_months: self.staleness_months,
        }
    }
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "********".to_string()
    } else {
        format!("{}********", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
database_path = "/tmp/lyrics-test.db"

[search]
engine_id = "abc123"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/lyrics-test.db"));
        assert_eq!(config.search.engine_id.as_deref(), Some("abc123"));
        assert_eq!(config.search.result_count, 2);
        assert_eq!(config.search.endpoint, DEFAULT_SEARCH_ENDPOINT);
        assert_eq!(config.scrape.backup_selector_timeout_seconds, 20);
        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.staleness_months, 1);
    }

    #[test]
    fn test_selector_timeout_snapshots_are_on_by_default() {
        let config = Config::default();
        let settings = config.scrape_settings();

        let dir = settings.snapshot_dir.unwrap();
        assert!(dir.ends_with("snapshots"));
        assert_eq!(dir, config.scrape.snapshot_dir);
    }

    #[test]
    fn test_snapshots_can_be_switched_off() {
        let mut config = Config::default();
        config.scrape.save_snapshots = false;
        assert!(config.scrape_settings().snapshot_dir.is_none());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.redis_url = Some("redis://localhost:6379".to_string());
        config.scrape.snapshot_dir = dir.path().join("snapshots");

        config.save(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.redis_url, config.redis_url);
        assert_eq!(loaded.scrape.snapshot_dir, config.scrape.snapshot_dir);
        assert_eq!(loaded.scrape.backup_url_template, DEFAULT_BACKUP_URL_TEMPLATE);
    }

    #[test]
    fn test_invalid_file_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "database_path = [").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, LyricsError::Config(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_explicit_missing_config_file_is_reported() {
        let err = Config::load(Some("/nonexistent/lyricsr/config.toml")).unwrap_err();
        assert!(matches!(err, LyricsError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let mut config = Config::default();
        config.search.api_key = Some("AIzaSyExampleKey123".to_string());

        let shown = config.redacted();
        assert_eq!(shown.search.api_key.as_deref(), Some("AIza********"));
        assert_eq!(mask_secret("short"), "********");
    }

    #[test]
    fn test_derived_settings_follow_config() {
        let mut config = Config::default();
        config.search.qualifier = "English Lyrics".to_string();
        config.scrape.backup_selector_timeout_seconds = 5;

        let policy = config.resolver_policy();
        assert_eq!(policy.query_qualifier, "English Lyrics");
        assert_eq!(policy.primary_domain, "genius.com");

        let backup = config.backup_profile();
        assert_eq!(backup.selector_timeout, Duration::from_secs(5));
        assert_eq!(
            backup.target_url("30244931"),
            "https://www.melon.com/song/detail.htm?songId=30244931"
        );
        assert!(config.primary_profile().confirms_english);
        assert_eq!(config.search_settings().timeout, Duration::from_secs(10));
    }
}
