use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::core::data::SongKey;
use crate::core::services::resolver::ResolutionSource;
use crate::error::{LyricsError, Result};
use crate::services::SimpleServices;

#[derive(Args)]
pub struct ResolveArgs {
    /// Song title
    #[arg(short, long)]
    title: String,

    /// Artist name
    #[arg(short, long)]
    artist: String,

    /// Song id on the backup catalog site
    #[arg(short = 'i', long)]
    song_id: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    title: &'a str,
    artist: &'a str,
    song_id: &'a str,
    source: Option<ResolutionSource>,
    lyrics: Option<&'a str>,
}

impl ResolveArgs {
    fn song_key(&self) -> Result<SongKey> {
        for (name, value) in [("title", &self.title), ("artist", &self.artist), ("song id", &self.song_id)] {
            if value.trim().is_empty() {
                return Err(LyricsError::Validation(format!("{} must not be empty", name)));
            }
        }
        Ok(SongKey::new(self.title.trim(), self.artist.trim(), self.song_id.trim()))
    }
}

pub async fn execute(args: ResolveArgs, services: &SimpleServices) -> Result<()> {
    let song = args.song_key()?;

    let store = Arc::new(services.create_store().await?);
    store.register_song(&song).await?;
    let resolver = services.create_resolver(store)?;

    info!("Resolving lyrics for {}", song);
    let resolution = resolver.resolve_detailed(&song).await?;

    if args.json {
        let output = ResolveOutput {
            title: &song.title,
            artist: &song.artist,
            song_id: &song.song_id,
            source: resolution.as_ref().map(|r| r.source),
            lyrics: resolution.as_ref().map(|r| r.text.as_str()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match resolution {
        Some(resolution) => {
            eprintln!("🎵 {} (source: {})", song, resolution.source.as_str());
            println!("{}", resolution.text);
        }
        None => eprintln!("❌ No lyrics found for {}", song),
    }

    Ok(())
}
