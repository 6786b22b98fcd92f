use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use tracing::warn;
use crate::error::Result;
use crate::config::validation::ConfigValidator;
use crate::config::env::{EnvVars, EnvParser};
use crate::config::Config;

/// Configuration builder with validation and type safety
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Start from built-in defaults
    pub fn new() -> Self {
        Self { config: Config::default() }
    }

    /// Start from an already loaded configuration (e.g. the config file)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set database path with validation
    pub fn database_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ConfigValidator::validate_db_path(&path)?;
        self.config.database_path = path;
        Ok(self)
    }

    /// Set Redis URL with validation
    pub fn redis_url<S: Into<String>>(mut self, url: Option<S>) -> Result<Self> {
        if let Some(url) = url {
            let url = url.into();
            ConfigValidator::validate_redis_url(&url)?;
            self.config.redis_url = Some(url);
        } else {
            self.config.redis_url = None;
        }
        Ok(self)
    }

    pub fn cache_ttl_seconds(mut self, seconds: u64) -> Result<Self> {
        ConfigValidator::validate_range(seconds, 1, 30 * 24 * 3600, "cache TTL seconds")?;
        self.config.cache_ttl_seconds = seconds;
        Ok(self)
    }

    pub fn cache_max_entries(mut self, entries: usize) -> Result<Self> {
        ConfigValidator::validate_range(entries, 1, 1_000_000, "cache max entries")?;
        self.config.cache_max_entries = entries;
        Ok(self)
    }

    pub fn staleness_months(mut self, months: u32) -> Result<Self> {
        ConfigValidator::validate_range(months, 1, 120, "staleness months")?;
        self.config.staleness_months = months;
        Ok(self)
    }

    pub fn search_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.search.api_key = Some(key.into());
        self
    }

    pub fn search_engine_id<S: Into<String>>(mut self, id: S) -> Self {
        self.config.search.engine_id = Some(id.into());
        self
    }

    /// Set search endpoint with validation
    pub fn search_endpoint<S: Into<String>>(mut self, url: S) -> Result<Self> {
        let url = url.into();
        ConfigValidator::validate_url(&url, "search endpoint")?;
        self.config.search.endpoint = url;
        Ok(self)
    }

    pub fn search_qualifier<S: Into<String>>(mut self, qualifier: S) -> Self {
        self.config.search.qualifier = qualifier.into();
        self
    }

    /// The search API accepts at most 10 results per request
    pub fn search_result_count(mut self, count: u8) -> Result<Self> {
        ConfigValidator::validate_range(count, 1, 10, "search result count")?;
        self.config.search.result_count = count;
        Ok(self)
    }

    pub fn search_timeout_seconds(mut self, seconds: u64) -> Result<Self> {
        ConfigValidator::validate_range(seconds, 1, 300, "search timeout seconds")?;
        self.config.search.timeout_seconds = seconds;
        Ok(self)
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Result<Self> {
        let user_agent = user_agent.into();
        ConfigValidator::validate_not_blank(&user_agent, "user agent")?;
        self.config.scrape.user_agent = user_agent;
        Ok(self)
    }

    pub fn navigation_timeout_seconds(mut self, seconds: u64) -> Result<Self> {
        ConfigValidator::validate_range(seconds, 1, 600, "navigation timeout seconds")?;
        self.config.scrape.navigation_timeout_seconds = seconds;
        Ok(self)
    }

    pub fn primary_selector_timeout_seconds(mut self, seconds: u64) -> Result<Self> {
        ConfigValidator::validate_range(seconds, 1, 600, "primary selector timeout seconds")?;
        self.config.scrape.primary_selector_timeout_seconds = seconds;
        Ok(self)
    }

    pub fn backup_selector_timeout_seconds(mut self, seconds: u64) -> Result<Self> {
        ConfigValidator::validate_range(seconds, 1, 600, "backup selector timeout seconds")?;
        self.config.scrape.backup_selector_timeout_seconds = seconds;
        Ok(self)
    }

    pub fn primary_domain<S: Into<String>>(mut self, domain: S) -> Result<Self> {
        let domain = domain.into();
        ConfigValidator::validate_domain(&domain)?;
        self.config.scrape.primary_domain = domain;
        Ok(self)
    }

    pub fn primary_path_marker<S: Into<String>>(mut self, marker: S) -> Result<Self> {
        let marker = marker.into();
        ConfigValidator::validate_not_blank(&marker, "primary path marker")?;
        self.config.scrape.primary_path_marker = marker;
        Ok(self)
    }

    pub fn backup_url_template<S: Into<String>>(mut self, template: S) -> Result<Self> {
        let template = template.into();
        ConfigValidator::validate_url_template(&template)?;
        self.config.scrape.backup_url_template = template;
        Ok(self)
    }

    pub fn snapshot_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.scrape.snapshot_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn save_snapshots(mut self, enabled: bool) -> Self {
        self.config.scrape.save_snapshots = enabled;
        self
    }

    pub fn chrome_executable<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        self.config.scrape.chrome_executable = path.map(|p| p.as_ref().to_path_buf());
        self
    }

    /// Load values from environment variables with validation
    pub fn load_from_env(mut self) -> Result<Self> {
        if let Some(path) = EnvParser::parse_path(EnvVars::DATABASE_PATH, false)? {
            self = self.database_path(path)?;
        }

        if let Some(redis) = EnvParser::parse_string(EnvVars::REDIS_URL, Some(|url| {
            ConfigValidator::validate_redis_url(url)
        }))? {
            self = self.redis_url(Some(redis))?;
        }

        if let Some(ttl) = EnvParser::parse_number(EnvVars::CACHE_TTL_SECONDS, 1u64, 30 * 24 * 3600)? {
            self = self.cache_ttl_seconds(ttl)?;
        }

        if let Some(entries) = EnvParser::parse_number(EnvVars::CACHE_MAX_ENTRIES, 1usize, 1_000_000)? {
            self = self.cache_max_entries(entries)?;
        }

        if let Some(months) = EnvParser::parse_number(EnvVars::STALENESS_MONTHS, 1u32, 120)? {
            self = self.staleness_months(months)?;
        }

        // Search provider
        if let Some(key) = EnvParser::parse_string(EnvVars::SEARCH_API_KEY, None)? {
            self = self.search_api_key(key);
        }

        if let Some(id) = EnvParser::parse_string(EnvVars::SEARCH_ENGINE_ID, None)? {
            self = self.search_engine_id(id);
        }

        if let Some(endpoint) = EnvParser::parse_string(EnvVars::SEARCH_ENDPOINT, None)? {
            self = self.search_endpoint(endpoint)?;
        }

        if let Some(qualifier) = EnvParser::parse_string(EnvVars::SEARCH_QUALIFIER, None)? {
            self = self.search_qualifier(qualifier);
        }

        if let Some(count) = EnvParser::parse_number(EnvVars::SEARCH_RESULT_COUNT, 1u8, 10)? {
            self = self.search_result_count(count)?;
        }

        if let Some(seconds) = EnvParser::parse_number(EnvVars::SEARCH_TIMEOUT_SECONDS, 1u64, 300)? {
            self = self.search_timeout_seconds(seconds)?;
        }

        // Scraping
        if let Some(user_agent) = EnvParser::parse_string(EnvVars::USER_AGENT, None)? {
            self = self.user_agent(user_agent)?;
        }

        if let Some(seconds) = EnvParser::parse_number(EnvVars::NAVIGATION_TIMEOUT_SECONDS, 1u64, 600)? {
            self = self.navigation_timeout_seconds(seconds)?;
        }

        if let Some(seconds) = EnvParser::parse_number(EnvVars::PRIMARY_SELECTOR_TIMEOUT_SECONDS, 1u64, 600)? {
            self = self.primary_selector_timeout_seconds(seconds)?;
        }

        if let Some(seconds) = EnvParser::parse_number(EnvVars::BACKUP_SELECTOR_TIMEOUT_SECONDS, 1u64, 600)? {
            self = self.backup_selector_timeout_seconds(seconds)?;
        }

        if let Some(domain) = EnvParser::parse_string(EnvVars::PRIMARY_DOMAIN, None)? {
            self = self.primary_domain(domain)?;
        }

        if let Some(marker) = EnvParser::parse_string(EnvVars::PRIMARY_PATH_MARKER, None)? {
            self = self.primary_path_marker(marker)?;
        }

        if let Some(template) = EnvParser::parse_string(EnvVars::BACKUP_URL_TEMPLATE, None)? {
            self = self.backup_url_template(template)?;
        }

        if let Some(dir) = EnvParser::parse_path(EnvVars::SNAPSHOT_DIR, false)? {
            self = self.snapshot_dir(dir);
        }

        if let Some(enabled) = EnvParser::parse_bool(EnvVars::SAVE_SNAPSHOTS)? {
            self = self.save_snapshots(enabled);
        }

        if let Some(chrome) = EnvParser::parse_path(EnvVars::CHROME_EXECUTABLE, true)? {
            self = self.chrome_executable(Some(chrome));
        }

        Ok(self)
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Get default data path based on environment
    pub fn default_data_path() -> PathBuf {
        // Use /data only when explicitly running under Docker
        if EnvParser::is_present(EnvVars::DOCKER) {
            PathBuf::from("/data")
        } else {
            match ProjectDirs::from("dev", "lyricsr", "lyricsr") {
                Some(project_dirs) => project_dirs.data_dir().to_path_buf(),
                None => {
                    warn!("ProjectDirs unavailable; falling back to current directory for data path");
                    PathBuf::from(".")
                }
            }
        }
    }

    /// Screenshots are cache material, so they live beside other caches
    pub fn default_snapshot_dir() -> PathBuf {
        if EnvParser::is_present(EnvVars::DOCKER) {
            PathBuf::from("/data/snapshots")
        } else {
            match ProjectDirs::from("dev", "lyricsr", "lyricsr") {
                Some(project_dirs) => project_dirs.cache_dir().join("snapshots"),
                None => PathBuf::from("snapshots"),
            }
        }
    }
}

impl Config {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_db_path(&self.database_path)?;

        if let Some(ref url) = self.redis_url {
            ConfigValidator::validate_redis_url(url)?;
        }

        ConfigValidator::validate_range(self.cache_ttl_seconds, 1, 30 * 24 * 3600, "cache TTL seconds")?;
        ConfigValidator::validate_range(self.cache_max_entries, 1, 1_000_000, "cache max entries")?;
        ConfigValidator::validate_range(self.staleness_months, 1, 120, "staleness months")?;

        ConfigValidator::validate_url(&self.search.endpoint, "search endpoint")?;
        ConfigValidator::validate_range(self.search.result_count, 1, 10, "search result count")?;
        ConfigValidator::validate_range(self.search.timeout_seconds, 1, 300, "search timeout seconds")?;

        ConfigValidator::validate_not_blank(&self.scrape.user_agent, "user agent")?;
        ConfigValidator::validate_range(self.scrape.navigation_timeout_seconds, 1, 600, "navigation timeout seconds")?;
        ConfigValidator::validate_range(
            self.scrape.primary_selector_timeout_seconds,
            1,
            600,
            "primary selector timeout seconds"
        )?;
        ConfigValidator::validate_range(
            self.scrape.backup_selector_timeout_seconds,
            1,
            600,
            "backup selector timeout seconds"
        )?;
        ConfigValidator::validate_domain(&self.scrape.primary_domain)?;
        ConfigValidator::validate_not_blank(&self.scrape.primary_path_marker, "primary path marker")?;
        ConfigValidator::validate_url_template(&self.scrape.backup_url_template)?;

        Ok(())
    }
}
