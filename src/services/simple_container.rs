use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::core::data::SqliteLyricsStore;
use crate::core::infrastructure::{HybridCache, MemoryCache};
use crate::core::services::resolver::LyricsResolver;
use crate::core::services::scraper::BrowserScraper;
use crate::core::services::search::GoogleSearchClient;
use crate::error::Result;

pub struct SimpleServices {
    config: Arc<Config>,
}

impl SimpleServices {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub async fn create_store(&self) -> Result<SqliteLyricsStore> {
        let store = SqliteLyricsStore::open(&self.config.database_path).await?;
        Ok(store)
    }

    /// Memory cache, layered over Redis when `redis_url` is set
    pub fn create_cache(&self) -> HybridCache {
        let ttl = self.config.cache_ttl();
        let memory = MemoryCache::new(ttl, self.config.cache_max_entries);
        HybridCache::new(memory, self.config.redis_url.as_deref(), ttl)
    }

    pub fn create_search_client(&self) -> Result<GoogleSearchClient> {
        let client = GoogleSearchClient::new(self.config.search_settings())?;
        Ok(client)
    }

    pub fn create_scraper(&self) -> BrowserScraper {
        BrowserScraper::new(self.config.scrape_settings())
    }

    /// The resolver shares `store` so callers can seed the catalog first
    pub fn create_resolver(&self, store: Arc<SqliteLyricsStore>) -> Result<LyricsResolver> {
        debug!("Wiring resolver with database {}", self.config.database_path.display());

        Ok(LyricsResolver::new(
            Arc::new(self.create_cache()),
            store,
            Arc::new(self.create_search_client()?),
            Arc::new(self.create_scraper()),
            self.config.primary_profile(),
            self.config.backup_profile(),
            self.config.resolver_policy(),
        ))
    }
}
