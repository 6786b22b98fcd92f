use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::error::CacheError;

/// Key/value lyrics cache with expiry.
///
/// The cache only accelerates lookups; losing an entry never affects
/// correctness, so `get` swallows backend failures and reports a miss.
#[async_trait]
pub trait LyricsCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
    fn stats(&self) -> CacheStats;
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: Option<usize>,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub hit_rate_percent: f64,
    pub last_cleanup: u64,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    hits: AtomicU64,
    last_cleanup: AtomicU64,
}

impl Counters {
    fn record(&self, hit: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.last_cleanup.store(current_timestamp(), Ordering::Relaxed);
    }

    fn snapshot(&self, total_entries: Option<usize>) -> CacheStats {
        let total_requests = self.requests.load(Ordering::Relaxed);
        let cache_hits = self.hits.load(Ordering::Relaxed);
        CacheStats {
            total_entries,
            total_requests,
            cache_hits,
            hit_rate_percent: hit_rate(cache_hits, total_requests),
            last_cleanup: self.last_cleanup.load(Ordering::Relaxed),
        }
    }
}

struct CacheEntry {
    value: String,
    cached_at: Instant,
    last_accessed: Instant,
}

/// Process-local cache with a TTL and a least-recently-used size bound.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    counters: Counters,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let counters = Counters::default();
        counters.last_cleanup.store(current_timestamp(), Ordering::Relaxed);
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            counters,
        }
    }

    fn evict(&self, entries: &mut HashMap<String, CacheEntry>) {
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.cached_at.elapsed() <= ttl);

        // Trim to a low-water mark so the next inserts do not evict again
        if entries.len() > self.max_entries {
            let low_water = (self.max_entries - self.max_entries / 10).max(1);
            let to_remove = entries.len() - low_water;
            let mut by_access: Vec<(String, Instant)> = entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.last_accessed))
                .collect();
            by_access.select_nth_unstable_by_key(to_remove - 1, |(_, accessed)| *accessed);

            for (key, _) in by_access.into_iter().take(to_remove) {
                entries.remove(&key);
            }
        }

        self.counters.last_cleanup.store(current_timestamp(), Ordering::Relaxed);
        debug!("Memory cache cleanup: {} -> {} entries", before, entries.len());
    }
}

#[async_trait]
impl LyricsCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let Ok(mut entries) = self.entries.lock() else {
            warn!("Memory cache lock poisoned, treating {} as a miss", key);
            return None;
        };

        let expired = match entries.get_mut(key) {
            Some(entry) if entry.cached_at.elapsed() <= self.ttl => {
                entry.last_accessed = Instant::now();
                let value = entry.value.clone();
                self.counters.record(true);
                debug!("Cache hit for {}", key);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Cache entry expired for {}", key);
            entries.remove(key);
        }

        self.counters.record(false);
        None
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        let now = Instant::now();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                cached_at: now,
                last_accessed: now,
            },
        );

        if entries.len() > self.max_entries {
            self.evict(&mut entries);
        }

        debug!("Cached {}", key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.clear();
        self.counters.reset();
        info!("Memory cache cleared");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        let total_entries = self.entries.lock().ok().map(|entries| entries.len());
        self.counters.snapshot(total_entries)
    }
}

/// Redis-backed cache; expiry is delegated to Redis TTLs.
pub struct RedisCache {
    client: RedisClient,
    key_prefix: String,
    ttl_seconds: u64,
    counters: Counters,
}

impl RedisCache {
    pub fn new(redis_url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = RedisClient::open(redis_url)?;
        let counters = Counters::default();
        counters.last_cleanup.store(current_timestamp(), Ordering::Relaxed);

        Ok(Self {
            client,
            key_prefix: "lyricsr:".to_string(),
            ttl_seconds: ttl.as_secs().max(1),
            counters,
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl LyricsCache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let redis_key = self.prefixed(key);

        let mut con = match self.client.get_multiplexed_async_connection().await {
            Ok(con) => con,
            Err(e) => {
                warn!("Failed to connect to Redis: {}", e);
                self.counters.record(false);
                return None;
            }
        };

        match con.get::<_, Option<String>>(&redis_key).await {
            Ok(Some(value)) => {
                self.counters.record(true);
                debug!("Redis cache hit for {}", key);
                Some(value)
            }
            Ok(None) => {
                self.counters.record(false);
                debug!("Redis cache miss for {}", key);
                None
            }
            Err(e) => {
                self.counters.record(false);
                warn!("Redis get error for {}: {}", redis_key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let _: () = con.set_ex(self.prefixed(key), value, self.ttl_seconds).await?;
        debug!("Cached {} in Redis", key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let pattern = format!("{}*", self.key_prefix);
        let keys: Vec<String> = con.keys(&pattern).await?;

        if !keys.is_empty() {
            let _: () = con.del(&keys).await?;
        }

        self.counters.reset();
        info!("Redis cache cleared, removed {} keys", keys.len());
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot(None)
    }
}

/// Memory in front of Redis. Redis hits are copied into memory.
pub struct HybridCache {
    memory: MemoryCache,
    redis: Option<RedisCache>,
}

impl HybridCache {
    pub fn new(memory: MemoryCache, redis_url: Option<&str>, ttl: Duration) -> Self {
        let redis = match redis_url {
            Some(url) => match RedisCache::new(url, ttl) {
                Ok(cache) => {
                    info!("Redis cache initialized successfully");
                    Some(cache)
                }
                Err(e) => {
                    warn!("Failed to initialize Redis cache, falling back to memory only: {}", e);
                    None
                }
            },
            None => None,
        };

        Self { memory, redis }
    }
}

#[async_trait]
impl LyricsCache for HybridCache {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.memory.get(key).await {
            return Some(value);
        }

        let redis = self.redis.as_ref()?;
        let value = redis.get(key).await?;
        if let Err(e) = self.memory.set(key, &value).await {
            debug!("Failed to backfill memory cache for {}: {}", key, e);
        }
        Some(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let memory_result = self.memory.set(key, value).await;

        if let Some(redis) = &self.redis {
            match (redis.set(key, value).await, memory_result) {
                (Err(redis_err), Err(_)) => return Err(redis_err),
                (Err(redis_err), Ok(())) => {
                    debug!("Redis cache set failed, memory cache succeeded: {}", redis_err);
                }
                _ => {}
            }
            return Ok(());
        }

        memory_result
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.memory.clear().await?;
        if let Some(redis) = &self.redis {
            redis.clear().await?;
        }
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        let memory = self.memory.stats();
        let Some(redis) = &self.redis else {
            return memory;
        };
        let redis = redis.stats();

        let total_requests = memory.total_requests;
        let cache_hits = memory.cache_hits + redis.cache_hits;
        CacheStats {
            total_entries: memory.total_entries,
            total_requests,
            cache_hits,
            hit_rate_percent: hit_rate(cache_hits, total_requests),
            last_cleanup: memory.last_cleanup.max(redis.last_cleanup),
        }
    }
}

fn hit_rate(hits: u64, requests: u64) -> f64 {
    if requests > 0 {
        (hits as f64 / requests as f64) * 100.0
    } else {
        0.0
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}
