//! Lyrics resolution cascade
//!
//! Tiers run in order and the first one that yields text wins:
//!
//! 1. cache
//! 2. stored record (refreshed through the primary path when stale)
//! 3. web search + primary scrape
//! 4. backup scrape by external song id
//!
//! Any tier that produces new text writes it to the store and then the
//! cache before returning.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::data::{LyricsStore, SongKey};
use crate::core::infrastructure::LyricsCache;
use crate::core::lyrics::normalize;
use crate::core::services::scraper::{ScrapeProfile, Scraper};
use crate::core::services::search::{SearchProvider, SearchResult};
use crate::error::{PersistenceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Cache,
    Stored,
    Refreshed,
    Primary,
    Backup,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Cache => "CACHE",
            ResolutionSource::Stored => "DB",
            ResolutionSource::Refreshed => "REFRESHED",
            ResolutionSource::Primary => "PRIMARY",
            ResolutionSource::Backup => "BACKUP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub text: String,
    pub source: ResolutionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Cache,
    Stored,
    SearchAndPrimary,
    Backup,
}

const CASCADE: [Tier; 4] = [Tier::Cache, Tier::Stored, Tier::SearchAndPrimary, Tier::Backup];

enum TierOutcome {
    Resolved(Resolution),
    Continue,
}

/// Knobs for choosing and refreshing sources.
#[derive(Debug, Clone)]
pub struct ResolverPolicy {
    pub query_qualifier: String,
    pub primary_domain: String,
    pub primary_path_marker: String,
    pub staleness_months: u32,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            query_qualifier: "Genius English Translation".to_string(),
            primary_domain: "genius.com".to_string(),
            primary_path_marker: "english-translation".to_string(),
            staleness_months: 1,
        }
    }
}

impl ResolverPolicy {
    pub fn compose_query(&self, song: &SongKey) -> String {
        format!("{} {} {}", song.title, song.artist, self.query_qualifier)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First result hosted on the primary domain whose path carries the
    /// translation marker.
    pub fn select_primary_link<'a>(&self, results: &'a [SearchResult]) -> Option<&'a SearchResult> {
        let domain = self.primary_domain.to_lowercase();
        let marker = self.primary_path_marker.to_lowercase();

        results.iter().find(|result| {
            let Ok(url) = Url::parse(&result.link) else {
                return false;
            };
            let host_matches = url
                .host_str()
                .map(|host| {
                    let host = host.to_lowercase();
                    host == domain || host.ends_with(&format!(".{}", domain))
                })
                .unwrap_or(false);
            host_matches && url.path().to_lowercase().contains(&marker)
        })
    }
}

pub struct LyricsResolver {
    cache: Arc<dyn LyricsCache>,
    store: Arc<dyn LyricsStore>,
    search: Arc<dyn SearchProvider>,
    scraper: Arc<dyn Scraper>,
    primary: ScrapeProfile,
    backup: ScrapeProfile,
    policy: ResolverPolicy,
    in_flight: InFlightMap,
}

impl LyricsResolver {
    pub fn new(
        cache: Arc<dyn LyricsCache>,
        store: Arc<dyn LyricsStore>,
        search: Arc<dyn SearchProvider>,
        scraper: Arc<dyn Scraper>,
        primary: ScrapeProfile,
        backup: ScrapeProfile,
        policy: ResolverPolicy,
    ) -> Self {
        Self {
            cache,
            store,
            search,
            scraper,
            primary,
            backup,
            policy,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Best available lyrics, or `None` when no tier found any.
    pub async fn resolve(&self, title: &str, artist: &str, song_id: &str) -> Result<Option<String>> {
        let song = SongKey::new(title, artist, song_id);
        Ok(self.resolve_detailed(&song).await?.map(|resolution| resolution.text))
    }

    pub async fn resolve_detailed(&self, song: &SongKey) -> Result<Option<Resolution>> {
        let flight = InFlight::enter(&self.in_flight, song.cache_key());
        let _turn = flight.gate.lock().await;
        self.run_cascade(song).await
    }

    async fn run_cascade(&self, song: &SongKey) -> Result<Option<Resolution>> {
        for tier in CASCADE {
            debug!("Trying {:?} tier for {}", tier, song);
            let outcome = match tier {
                Tier::Cache => self.from_cache(song).await,
                Tier::Stored => self.from_store(song).await?,
                Tier::SearchAndPrimary => self.from_primary(song).await?,
                Tier::Backup => self.from_backup(song).await?,
            };

            if let TierOutcome::Resolved(resolution) = outcome {
                info!("Resolved lyrics for {} from {}", song, resolution.source.as_str());
                return Ok(Some(resolution));
            }
        }

        info!("No lyrics found for {}", song);
        Ok(None)
    }

    async fn from_cache(&self, song: &SongKey) -> TierOutcome {
        match self.cache.get(&song.cache_key()).await {
            Some(text) => TierOutcome::Resolved(Resolution { text, source: ResolutionSource::Cache }),
            None => TierOutcome::Continue,
        }
    }

    async fn from_store(&self, song: &SongKey) -> Result<TierOutcome> {
        let Some(record) = self.store.find(song).await.map_err(log_persistence)? else {
            debug!("No stored lyrics for {}", song);
            return Ok(TierOutcome::Continue);
        };
        let Some(stored) = record.text().map(str::to_string) else {
            debug!("Stored record for {} has no text", song);
            return Ok(TierOutcome::Continue);
        };

        self.warm_cache(song, &stored).await;

        if !record.is_stale(Utc::now(), self.policy.staleness_months) {
            return Ok(TierOutcome::Resolved(Resolution { text: stored, source: ResolutionSource::Stored }));
        }

        info!("Stored lyrics for {} are stale and unconfirmed, trying primary source", song);
        match self.primary_attempt(song).await {
            Some(fresh) => {
                self.write_through(song, &fresh, self.primary.confirms_english).await?;
                Ok(TierOutcome::Resolved(Resolution { text: fresh, source: ResolutionSource::Refreshed }))
            }
            None => {
                debug!("Refresh failed for {}, keeping stored lyrics", song);
                Ok(TierOutcome::Resolved(Resolution { text: stored, source: ResolutionSource::Stored }))
            }
        }
    }

    async fn from_primary(&self, song: &SongKey) -> Result<TierOutcome> {
        let Some(text) = self.primary_attempt(song).await else {
            return Ok(TierOutcome::Continue);
        };
        self.write_through(song, &text, self.primary.confirms_english).await?;
        Ok(TierOutcome::Resolved(Resolution { text, source: ResolutionSource::Primary }))
    }

    async fn from_backup(&self, song: &SongKey) -> Result<TierOutcome> {
        let Some(text) = self.scrape_normalized(&self.backup, &song.song_id).await else {
            return Ok(TierOutcome::Continue);
        };
        self.write_through(song, &text, self.backup.confirms_english).await?;
        Ok(TierOutcome::Resolved(Resolution { text, source: ResolutionSource::Backup }))
    }

    /// Search, pick a qualifying link and scrape it with the primary profile.
    async fn primary_attempt(&self, song: &SongKey) -> Option<String> {
        let query = self.policy.compose_query(song);
        let results = match self.search.search(&query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed for {}: {}", song, e);
                return None;
            }
        };

        let Some(hit) = self.policy.select_primary_link(&results) else {
            debug!("No qualifying primary link among {} results for {}", results.len(), song);
            return None;
        };

        self.scrape_normalized(&self.primary, &hit.link).await
    }

    async fn scrape_normalized(&self, profile: &ScrapeProfile, target: &str) -> Option<String> {
        match self.scraper.scrape(profile, target).await {
            Ok(raw) => {
                let text = normalize(&raw);
                if text.is_empty() {
                    warn!("{} scrape of {} produced no text", profile.kind.as_str(), target);
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                warn!("{} scrape of {} failed: {}", profile.kind.as_str(), target, e);
                None
            }
        }
    }

    async fn write_through(&self, song: &SongKey, text: &str, english_confirmed: bool) -> Result<()> {
        self.store
            .upsert(song, text, english_confirmed)
            .await
            .map_err(log_persistence)?;
        self.warm_cache(song, text).await;
        Ok(())
    }

    async fn warm_cache(&self, song: &SongKey, text: &str) {
        if let Err(e) = self.cache.set(&song.cache_key(), text).await {
            warn!("Failed to cache lyrics for {}: {}", song, e);
        }
    }
}

type InFlightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Membership in the per-song gate map. Leaving, including by the
/// resolution future being dropped, removes the entry once no one else
/// holds it.
struct InFlight<'a> {
    map: &'a InFlightMap,
    key: String,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn enter(map: &'a InFlightMap, key: String) -> Self {
        let gate = {
            let mut in_flight = map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            in_flight.entry(key.clone()).or_default().clone()
        };
        Self { map, key, gate }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // The map and this handle account for two references
        if in_flight.get(&self.key).is_some_and(|gate| Arc::strong_count(gate) <= 2) {
            in_flight.remove(&self.key);
        }
    }
}

fn log_persistence(err: PersistenceError) -> PersistenceError {
    error!("Lyrics store failure: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::models::LyricsRecord;
    use crate::core::infrastructure::cache::CacheStats;
    use crate::core::services::scraper::ProfileKind;
    use crate::error::{CacheError, LyricsError, ScrapeError, SearchError};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    const GENIUS_LINK: &str = "https://genius.com/Genius-english-translations-bts-spring-day-english-translation-lyrics";

    #[derive(Default)]
    struct MockCache {
        entries: Mutex<HashMap<String, String>>,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl LyricsCache for MockCache {
        async fn get(&self, key: &str) -> Option<String> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().get(key).cloned()
        }

        async fn set(&self, key: &str, value: &str) -> std::result::Result<(), CacheError> {
            self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn clear(&self) -> std::result::Result<(), CacheError> {
            self.entries.lock().unwrap().clear();
            Ok(())
        }

        fn stats(&self) -> CacheStats {
            CacheStats::default()
        }
    }

    #[derive(Default)]
    struct MockStore {
        records: Mutex<HashMap<String, LyricsRecord>>,
        upserts: Mutex<Vec<(String, String, bool)>>,
        finds: AtomicUsize,
        fail_writes: bool,
    }

    impl MockStore {
        fn with_record(song_id: &str, text: &str, english_confirmed: bool, updated_at: DateTime<Utc>) -> Self {
            let store = Self::default();
            store.records.lock().unwrap().insert(
                song_id.to_string(),
                LyricsRecord {
                    song: 1,
                    lyrics: Some(text.to_string()),
                    english_confirmed,
                    updated_at,
                },
            );
            store
        }

        fn upserts(&self) -> Vec<(String, String, bool)> {
            self.upserts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LyricsStore for MockStore {
        async fn find(&self, song: &SongKey) -> std::result::Result<Option<LyricsRecord>, PersistenceError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.lock().unwrap().get(&song.song_id).cloned())
        }

        async fn upsert(&self, song: &SongKey, lyrics: &str, english_confirmed: bool) -> std::result::Result<(), PersistenceError> {
            if self.fail_writes {
                return Err(PersistenceError::SongNotFound { song: song.to_string() });
            }
            self.upserts.lock().unwrap().push((song.song_id.clone(), lyrics.to_string(), english_confirmed));
            self.records.lock().unwrap().insert(
                song.song_id.clone(),
                LyricsRecord {
                    song: 1,
                    lyrics: Some(lyrics.to_string()),
                    english_confirmed,
                    updated_at: Utc::now(),
                },
            );
            Ok(())
        }
    }

    struct MockSearch {
        response: std::result::Result<Vec<String>, ()>,
        queries: Mutex<Vec<String>>,
    }

    impl MockSearch {
        fn returning(links: &[&str]) -> Self {
            Self {
                response: Ok(links.iter().map(|l| l.to_string()).collect()),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self { response: Err(()), queries: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SearchProvider for MockSearch {
        async fn search(&self, query: &str) -> std::result::Result<Vec<SearchResult>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            match &self.response {
                Ok(links) => Ok(links.iter().map(SearchResult::from_link).collect()),
                Err(()) => Err(SearchError::QuotaExceeded),
            }
        }
    }

    struct MockScraper {
        primary: std::result::Result<String, ()>,
        backup: std::result::Result<String, ()>,
        delay: StdDuration,
        calls: Mutex<Vec<(ProfileKind, String)>>,
    }

    impl MockScraper {
        fn new(primary: std::result::Result<&str, ()>, backup: std::result::Result<&str, ()>) -> Self {
            Self {
                primary: primary.map(str::to_string),
                backup: backup.map(str::to_string),
                delay: StdDuration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(ProfileKind, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_for(&self, kind: ProfileKind) -> usize {
            self.calls().iter().filter(|(k, _)| *k == kind).count()
        }
    }

    #[async_trait]
    impl Scraper for MockScraper {
        async fn scrape(&self, profile: &ScrapeProfile, target: &str) -> std::result::Result<String, ScrapeError> {
            self.calls.lock().unwrap().push((profile.kind, profile.target_url(target)));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let outcome = match profile.kind {
                ProfileKind::Primary => &self.primary,
                ProfileKind::Backup => &self.backup,
            };
            outcome.clone().map_err(|()| ScrapeError::SelectorTimeout {
                selector: profile.selector.clone(),
                url: target.to_string(),
                snapshot: None,
            })
        }
    }

    struct Harness {
        cache: Arc<MockCache>,
        store: Arc<MockStore>,
        search: Arc<MockSearch>,
        scraper: Arc<MockScraper>,
        resolver: LyricsResolver,
    }

    fn harness(store: MockStore, search: MockSearch, scraper: MockScraper) -> Harness {
        let cache = Arc::new(MockCache::default());
        let store = Arc::new(store);
        let search = Arc::new(search);
        let scraper = Arc::new(scraper);
        let resolver = LyricsResolver::new(
            cache.clone(),
            store.clone(),
            search.clone(),
            scraper.clone(),
            ScrapeProfile::primary(StdDuration::from_secs(60)),
            ScrapeProfile::backup("https://www.melon.com/song/detail.htm?songId={song_id}", StdDuration::from_secs(20)),
            ResolverPolicy::default(),
        );
        Harness { cache, store, search, scraper, resolver }
    }

    fn song() -> SongKey {
        SongKey::new("Spring Day", "BTS", "30244931")
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits_everything() {
        let h = harness(MockStore::default(), MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Ok("x"), Ok("y")));
        h.cache.set("lyrics_30244931", "cached text").await.unwrap();

        let result = h.resolver.resolve_detailed(&song()).await.unwrap().unwrap();

        assert_eq!(result, Resolution { text: "cached text".to_string(), source: ResolutionSource::Cache });
        assert_eq!(h.store.finds.load(Ordering::SeqCst), 0);
        assert_eq!(h.search.calls(), 0);
        assert!(h.scraper.calls().is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_record_is_returned_regardless_of_age() {
        let store = MockStore::with_record("30244931", "confirmed text", true, Utc::now() - Duration::days(730));
        let h = harness(store, MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Ok("new"), Ok("backup")));

        let result = h.resolver.resolve("Spring Day", "BTS", "30244931").await.unwrap();

        assert_eq!(result.as_deref(), Some("confirmed text"));
        assert_eq!(h.search.calls(), 0);
        assert!(h.scraper.calls().is_empty());
        assert!(h.store.upserts().is_empty());
        assert_eq!(h.cache.entries.lock().unwrap().get("lyrics_30244931").map(String::as_str), Some("confirmed text"));
    }

    #[tokio::test]
    async fn test_recent_unconfirmed_record_is_not_refreshed() {
        let store = MockStore::with_record("30244931", "original", false, Utc::now() - Duration::days(10));
        let h = harness(store, MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Ok("new"), Ok("backup")));

        let result = h.resolver.resolve_detailed(&song()).await.unwrap().unwrap();

        assert_eq!(result.source, ResolutionSource::Stored);
        assert_eq!(result.text, "original");
        assert!(h.scraper.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stale_record_falls_back_after_one_failed_primary_attempt() {
        let store = MockStore::with_record("30244931", "stale original", false, Utc::now() - Duration::days(40));
        let h = harness(store, MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Err(()), Ok("backup")));

        let result = h.resolver.resolve_detailed(&song()).await.unwrap().unwrap();

        assert_eq!(result.text, "stale original");
        assert_eq!(result.source, ResolutionSource::Stored);
        assert_eq!(h.scraper.calls_for(ProfileKind::Primary), 1);
        assert_eq!(h.scraper.calls_for(ProfileKind::Backup), 0);
        assert!(h.store.upserts().is_empty());
    }

    #[tokio::test]
    async fn test_stale_record_is_replaced_by_fresh_primary_lyrics() {
        let store = MockStore::with_record("30244931", "stale original", false, Utc::now() - Duration::days(40));
        let h = harness(store, MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Ok("[Verse 1]\nfresh"), Ok("backup")));

        let result = h.resolver.resolve_detailed(&song()).await.unwrap().unwrap();

        assert_eq!(result.source, ResolutionSource::Refreshed);
        assert_eq!(result.text, "[Verse 1]\nfresh");
        assert_eq!(h.store.upserts(), vec![("30244931".to_string(), "[Verse 1]\nfresh".to_string(), true)]);
        assert_eq!(h.cache.entries.lock().unwrap().get("lyrics_30244931").map(String::as_str), Some("[Verse 1]\nfresh"));
    }

    #[tokio::test]
    async fn test_stale_refresh_without_qualifying_link_skips_backup() {
        let store = MockStore::with_record("30244931", "stale original", false, Utc::now() - Duration::days(40));
        let h = harness(store, MockSearch::returning(&["https://example.com/lyrics"]), MockScraper::new(Ok("new"), Ok("backup")));

        let result = h.resolver.resolve("Spring Day", "BTS", "30244931").await.unwrap();

        assert_eq!(result.as_deref(), Some("stale original"));
        assert!(h.scraper.calls().is_empty());
    }

    #[tokio::test]
    async fn test_primary_resolution_persists_confirmed_and_warms_cache() {
        let h = harness(
            MockStore::default(),
            MockSearch::returning(&["https://example.com/spring-day", GENIUS_LINK]),
            MockScraper::new(Ok("  I miss you\n, I miss you more \n[Chorus]\nSpring day  "), Err(())),
        );

        let first = h.resolver.resolve("Spring Day", "BTS", "30244931").await.unwrap();
        let expected = "I miss you, I miss you more\n\n[Chorus]\nSpring day";
        assert_eq!(first.as_deref(), Some(expected));
        assert_eq!(h.store.upserts(), vec![("30244931".to_string(), expected.to_string(), true)]);
        assert_eq!(h.scraper.calls(), vec![(ProfileKind::Primary, GENIUS_LINK.to_string())]);
        assert_eq!(
            h.search.queries.lock().unwrap().as_slice(),
            ["Spring Day BTS Genius English Translation".to_string()]
        );

        let finds_before = h.store.finds.load(Ordering::SeqCst);
        let second = h.resolver.resolve_detailed(&song()).await.unwrap().unwrap();
        assert_eq!(second.text, expected);
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(h.search.calls(), 1);
        assert_eq!(h.scraper.calls().len(), 1);
        assert_eq!(h.store.finds.load(Ordering::SeqCst), finds_before);
    }

    #[tokio::test]
    async fn test_no_qualifying_link_uses_backup_by_song_id() {
        let h = harness(
            MockStore::default(),
            MockSearch::returning(&["https://genius.com/Bts-spring-day-lyrics", "https://example.com/english-translation"]),
            MockScraper::new(Ok("unused"), Ok("봄날\n보고 싶다")),
        );

        let result = h.resolver.resolve_detailed(&song()).await.unwrap().unwrap();

        assert_eq!(result.source, ResolutionSource::Backup);
        assert_eq!(result.text, "봄날\n보고 싶다");
        assert_eq!(
            h.scraper.calls(),
            vec![(ProfileKind::Backup, "https://www.melon.com/song/detail.htm?songId=30244931".to_string())]
        );
        assert_eq!(h.store.upserts(), vec![("30244931".to_string(), "봄날\n보고 싶다".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_search_failure_is_not_fatal() {
        let h = harness(MockStore::default(), MockSearch::failing(), MockScraper::new(Ok("unused"), Ok("backup text")));

        let result = h.resolver.resolve("Spring Day", "BTS", "30244931").await.unwrap();

        assert_eq!(result.as_deref(), Some("backup text"));
        assert_eq!(h.scraper.calls_for(ProfileKind::Primary), 0);
        assert_eq!(h.scraper.calls_for(ProfileKind::Backup), 1);
    }

    #[tokio::test]
    async fn test_empty_primary_text_falls_through_to_backup() {
        let h = harness(MockStore::default(), MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Ok(" \n\n "), Ok("backup text")));

        let result = h.resolver.resolve_detailed(&song()).await.unwrap().unwrap();

        assert_eq!(result.source, ResolutionSource::Backup);
        assert_eq!(h.store.upserts(), vec![("30244931".to_string(), "backup text".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_all_sources_failing_returns_none_without_writes() {
        let h = harness(MockStore::default(), MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Err(()), Err(())));

        let result = h.resolver.resolve("Spring Day", "BTS", "30244931").await.unwrap();

        assert_eq!(result, None);
        assert_eq!(h.scraper.calls_for(ProfileKind::Primary), 1);
        assert_eq!(h.scraper.calls_for(ProfileKind::Backup), 1);
        assert!(h.store.upserts().is_empty());
        assert!(h.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_the_request() {
        let store = MockStore { fail_writes: true, ..MockStore::default() };
        let h = harness(store, MockSearch::returning(&[GENIUS_LINK]), MockScraper::new(Ok("text"), Ok("backup")));

        let err = h.resolver.resolve("Spring Day", "BTS", "30244931").await.unwrap_err();

        assert!(matches!(err, LyricsError::Persistence(_)));
        assert!(h.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_song_scrape_once() {
        let mut scraper = MockScraper::new(Ok("shared text"), Err(()));
        scraper.delay = StdDuration::from_millis(50);
        let h = harness(MockStore::default(), MockSearch::returning(&[GENIUS_LINK]), scraper);

        let (first, second) = (song(), song());
        let (a, b) = tokio::join!(
            h.resolver.resolve_detailed(&first),
            h.resolver.resolve_detailed(&second)
        );
        let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());

        assert_eq!(a.text, "shared text");
        assert_eq!(b.text, "shared text");
        assert_eq!(h.scraper.calls().len(), 1);
        assert_eq!(h.store.upserts().len(), 1);
        assert!(h.resolver.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_resolution_releases_its_gate() {
        let mut scraper = MockScraper::new(Ok("slow text"), Err(()));
        scraper.delay = StdDuration::from_millis(500);
        let h = harness(MockStore::default(), MockSearch::returning(&[GENIUS_LINK]), scraper);
        let song = song();

        let abandoned = tokio::time::timeout(StdDuration::from_millis(20), h.resolver.resolve_detailed(&song)).await;

        assert!(abandoned.is_err());
        assert_eq!(h.scraper.calls().len(), 1);
        assert!(h.resolver.in_flight.lock().unwrap().is_empty());

        let retried = h.resolver.resolve_detailed(&song).await.unwrap().unwrap();
        assert_eq!(retried.source, ResolutionSource::Primary);
    }

    #[test]
    fn test_select_primary_link_requires_domain_and_marker() {
        let policy = ResolverPolicy::default();
        let results: Vec<SearchResult> = [
            "https://notgenius.com/x-english-translation-lyrics",
            "https://genius.com/Bts-spring-day-lyrics",
            "not a url",
            "https://GENIUS.com/Genius-English-Translation-x",
            GENIUS_LINK,
        ]
        .iter()
        .map(|link| SearchResult::from_link(*link))
        .collect();

        let hit = policy.select_primary_link(&results).unwrap();
        assert_eq!(hit.link, "https://GENIUS.com/Genius-English-Translation-x");
        assert!(policy.select_primary_link(&results[..3]).is_none());
    }

    #[test]
    fn test_compose_query() {
        let policy = ResolverPolicy::default();
        assert_eq!(policy.compose_query(&song()), "Spring Day BTS Genius English Translation");
    }
}
