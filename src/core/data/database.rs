//! SQLite persistence for the song catalog and its lyrics records
//!
//! One lyrics record per song, enforced by the primary key of
//! `song_lyrics`. Writes are full replaces of the text and the English flag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::core::data::models::{LyricsRecord, Song, SongKey, SongListing};
use crate::error::PersistenceError;

const CURRENT_DB_VERSION: u32 = 1;

/// Durable lyrics storage consumed by the resolver.
#[async_trait]
pub trait LyricsStore: Send + Sync {
    async fn find(&self, song: &SongKey) -> Result<Option<LyricsRecord>, PersistenceError>;
    async fn upsert(&self, song: &SongKey, lyrics: &str, english_confirmed: bool) -> Result<(), PersistenceError>;
}

pub struct SqliteLyricsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLyricsStore {
    pub async fn open(db_path: &Path) -> Result<Self, PersistenceError> {
        info!("Opening database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::Migration(format!("cannot create {}: {}", parent.display(), e)))?;
        }

        let conn = Connection::open(db_path).map_err(PersistenceError::Connection)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::prepare(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(PersistenceError::Connection)?;
        Self::prepare(conn)
    }

    fn prepare(mut conn: Connection) -> Result<Self, PersistenceError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let existing_user_version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if existing_user_version < CURRENT_DB_VERSION {
            Self::upgrade_database(&mut conn, existing_user_version)?;
        }

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn upgrade_database(conn: &mut Connection, existing_version: u32) -> Result<(), PersistenceError> {
        debug!("Upgrading database from version {} to {}", existing_version, CURRENT_DB_VERSION);

        if existing_version == 0 {
            let tx = conn.transaction()?;

            tx.pragma_update(None, "user_version", CURRENT_DB_VERSION)?;

            tx.execute_batch(r#"
                CREATE TABLE artists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );

                CREATE TABLE songs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    artist_id INTEGER NOT NULL REFERENCES artists(id),
                    external_song_id TEXT NOT NULL UNIQUE
                );

                CREATE TABLE song_lyrics (
                    song_id INTEGER PRIMARY KEY REFERENCES songs(id),
                    lyrics TEXT,
                    eng_saved BOOLEAN NOT NULL DEFAULT FALSE,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX idx_songs_title ON songs(title);
            "#).map_err(|e| PersistenceError::Migration(e.to_string()))?;

            tx.commit()?;
        }

        info!("Database upgraded successfully");
        Ok(())
    }

    /// Runs `op` on the blocking pool so SQLite I/O never stalls the runtime.
    async fn with_connection<T, F>(&self, op: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&Connection) -> Result<T, PersistenceError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| PersistenceError::Poisoned)?;
            op(&conn)
        })
        .await?
    }

    /// Add a song to the catalog, or update its title and artist when the
    /// external id is already known.
    pub async fn register_song(&self, song: &SongKey) -> Result<Song, PersistenceError> {
        let song = song.clone();
        self.with_connection(move |conn| Self::insert_song(conn, &song)).await
    }

    fn insert_song(conn: &Connection, song: &SongKey) -> Result<Song, PersistenceError> {
        conn.execute(
            "INSERT OR IGNORE INTO artists (name) VALUES (?1)",
            params![song.artist],
        )?;
        let artist_id: i64 = conn.query_row(
            "SELECT id FROM artists WHERE name = ?1",
            params![song.artist],
            |row| row.get(0),
        )?;

        let id: i64 = conn.query_row(
            r#"
            INSERT INTO songs (title, artist_id, external_song_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (external_song_id) DO UPDATE SET
                title = excluded.title,
                artist_id = excluded.artist_id
            RETURNING id
            "#,
            params![song.title, artist_id, song.song_id],
            |row| row.get(0),
        )?;

        debug!("Registered song {} as #{}", song, id);
        Ok(Song {
            id,
            title: song.title.clone(),
            artist: song.artist.clone(),
            song_id: song.song_id.clone(),
        })
    }

    pub async fn list_songs(&self) -> Result<Vec<SongListing>, PersistenceError> {
        self.with_connection(Self::select_listings).await
    }

    fn select_listings(conn: &Connection) -> Result<Vec<SongListing>, PersistenceError> {
        let mut stmt = conn.prepare(r#"
            SELECT s.id, s.title, a.name, s.external_song_id,
                   sl.lyrics IS NOT NULL, COALESCE(sl.eng_saved, FALSE), sl.updated_at
            FROM songs s
            JOIN artists a ON s.artist_id = a.id
            LEFT JOIN song_lyrics sl ON sl.song_id = s.id
            ORDER BY a.name, s.title
        "#)?;

        let rows = stmt.query_map([], |row| {
            Ok((
                Song {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    song_id: row.get(3)?,
                },
                row.get::<_, bool>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(song, has_lyrics, english_confirmed, updated_at)| {
                let updated_at = updated_at
                    .map(|value| parse_timestamp(song.id, value))
                    .transpose()?;
                Ok(SongListing { song, has_lyrics, english_confirmed, updated_at })
            })
            .collect()
    }

    /// Catalog id for a song: by external id first, then by title and artist.
    fn song_row_id(conn: &Connection, song: &SongKey) -> Result<Option<i64>, PersistenceError> {
        let by_external: Option<i64> = conn
            .query_row(
                "SELECT id FROM songs WHERE external_song_id = ?1 LIMIT 1",
                params![song.song_id],
                |row| row.get(0),
            )
            .optional()?;

        if by_external.is_some() {
            return Ok(by_external);
        }

        let by_name = conn
            .query_row(
                r#"
                SELECT s.id FROM songs s
                JOIN artists a ON s.artist_id = a.id
                WHERE s.title = ?1 AND a.name = ?2
                LIMIT 1
                "#,
                params![song.title, song.artist],
                |row| row.get(0),
            )
            .optional()?;

        Ok(by_name)
    }

    async fn save(
        &self,
        song: &SongKey,
        lyrics: &str,
        english_confirmed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let (song, lyrics) = (song.clone(), lyrics.to_string());
        self.with_connection(move |conn| Self::write_record(conn, &song, &lyrics, english_confirmed, updated_at))
            .await
    }

    fn write_record(
        conn: &Connection,
        song: &SongKey,
        lyrics: &str,
        english_confirmed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let song_row = Self::song_row_id(conn, song)?
            .ok_or_else(|| PersistenceError::SongNotFound { song: song.to_string() })?;

        conn.execute(
            r#"
            INSERT INTO song_lyrics (song_id, lyrics, eng_saved, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (song_id) DO UPDATE SET
                lyrics = excluded.lyrics,
                eng_saved = excluded.eng_saved,
                updated_at = excluded.updated_at
            "#,
            params![song_row, lyrics, english_confirmed, updated_at.to_rfc3339()],
        )?;

        Ok(())
    }
}

#[async_trait]
impl LyricsStore for SqliteLyricsStore {
    async fn find(&self, song: &SongKey) -> Result<Option<LyricsRecord>, PersistenceError> {
        let song = song.clone();
        self.with_connection(move |conn| Self::select_record(conn, &song)).await
    }

    async fn upsert(&self, song: &SongKey, lyrics: &str, english_confirmed: bool) -> Result<(), PersistenceError> {
        self.save(song, lyrics, english_confirmed, Utc::now()).await?;
        debug!("Saved lyrics for {} (english confirmed: {})", song, english_confirmed);
        Ok(())
    }
}

impl SqliteLyricsStore {
    fn select_record(conn: &Connection, song: &SongKey) -> Result<Option<LyricsRecord>, PersistenceError> {
        let Some(song_row) = Self::song_row_id(conn, song)? else {
            debug!("Song not in catalog: {}", song);
            return Ok(None);
        };

        let row: Option<(Option<String>, bool, String)> = conn
            .query_row(
                "SELECT lyrics, eng_saved, updated_at FROM song_lyrics WHERE song_id = ?1",
                params![song_row],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(lyrics, english_confirmed, updated_at)| {
            Ok(LyricsRecord {
                song: song_row,
                lyrics,
                english_confirmed,
                updated_at: parse_timestamp(song_row, updated_at)?,
            })
        })
        .transpose()
    }
}

fn parse_timestamp(song_id: i64, value: String) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| PersistenceError::InvalidTimestamp { song_id, value })
}
