use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use std::fmt;

/// The identity a caller resolves lyrics for.
///
/// `song_id` is the external catalog id; it keys the cache and the backup
/// scrape URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SongKey {
    pub title: String,
    pub artist: String,
    pub song_id: String,
}

impl SongKey {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, song_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            song_id: song_id.into(),
        }
    }

    pub fn cache_key(&self) -> String {
        lyrics_cache_key(&self.song_id)
    }
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.artist, self.title, self.song_id)
    }
}

pub fn lyrics_cache_key(song_id: &str) -> String {
    format!("lyrics_{}", song_id)
}

/// A catalog row.
#[derive(Debug, Clone, Serialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub song_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LyricsRecord {
    pub song: i64,
    pub lyrics: Option<String>,
    pub english_confirmed: bool,
    pub updated_at: DateTime<Utc>,
}

impl LyricsRecord {
    /// Unconfirmed records older than `months` calendar months are eligible
    /// for a refresh. Confirmed records never are.
    pub fn is_stale(&self, now: DateTime<Utc>, months: u32) -> bool {
        if self.english_confirmed {
            return false;
        }
        match now.checked_sub_months(Months::new(months)) {
            Some(cutoff) => self.updated_at < cutoff,
            None => false,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.lyrics.as_deref().filter(|text| !text.trim().is_empty())
    }
}

/// Catalog listing with lyrics status, used by `songs list`.
#[derive(Debug, Clone, Serialize)]
pub struct SongListing {
    pub song: Song,
    pub has_lyrics: bool,
    pub english_confirmed: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(english_confirmed: bool, updated_at: DateTime<Utc>) -> LyricsRecord {
        LyricsRecord {
            song: 1,
            lyrics: Some("text".to_string()),
            english_confirmed,
            updated_at,
        }
    }

    #[test]
    fn test_cache_key_scheme() {
        let key = SongKey::new("Title", "Artist", "3801234");
        assert_eq!(key.cache_key(), "lyrics_3801234");
    }

    #[test]
    fn test_unconfirmed_record_older_than_a_month_is_stale() {
        let now = Utc::now();
        assert!(record(false, now - Duration::days(40)).is_stale(now, 1));
        assert!(!record(false, now - Duration::days(10)).is_stale(now, 1));
    }

    #[test]
    fn test_confirmed_record_is_never_stale() {
        let now = Utc::now();
        assert!(!record(true, now - Duration::days(730)).is_stale(now, 1));
    }

    #[test]
    fn test_staleness_uses_calendar_months() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        // One calendar month before March 31st clamps to February 29th.
        let just_inside = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let just_outside = Utc.with_ymd_and_hms(2024, 2, 29, 11, 59, 59).unwrap();
        assert!(!record(false, just_inside).is_stale(now, 1));
        assert!(record(false, just_outside).is_stale(now, 1));
    }

    #[test]
    fn test_blank_lyrics_are_not_usable_text() {
        let mut rec = record(false, Utc::now());
        rec.lyrics = Some("   ".to_string());
        assert_eq!(rec.text(), None);
        rec.lyrics = None;
        assert_eq!(rec.text(), None);
    }
}
