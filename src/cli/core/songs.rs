use clap::{Args, Subcommand};

use crate::core::data::SongKey;
use crate::error::{LyricsError, Result};
use crate::services::SimpleServices;

#[derive(Args)]
pub struct SongsArgs {
    #[command(subcommand)]
    command: SongsCommands,
}

#[derive(Subcommand)]
enum SongsCommands {
    /// Add a song to the catalog (or rename an existing song id)
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        artist: String,

        #[arg(short = 'i', long)]
        song_id: String,
    },

    /// List catalog songs with their lyrics status
    List {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

pub async fn execute(args: SongsArgs, services: &SimpleServices) -> Result<()> {
    let store = services.create_store().await?;

    match args.command {
        SongsCommands::Add { title, artist, song_id } => {
            if title.trim().is_empty() || artist.trim().is_empty() || song_id.trim().is_empty() {
                return Err(LyricsError::Validation("title, artist and song id are required".to_string()));
            }
            let song = store
                .register_song(&SongKey::new(title.trim(), artist.trim(), song_id.trim()))
                .await?;
            println!("✅ Registered #{}: {} - {} ({})", song.id, song.artist, song.title, song.song_id);
        }

        SongsCommands::List { format } => {
            let songs = store.list_songs().await?;

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&songs)?),
                "table" => {
                    if songs.is_empty() {
                        println!("No songs in catalog");
                        return Ok(());
                    }
                    println!("{:<6} {:<12} {:<24} {:<32} {:<8} {}", "ID", "SONG ID", "ARTIST", "TITLE", "ENGLISH", "UPDATED");
                    for listing in &songs {
                        let status = match (listing.has_lyrics, listing.english_confirmed) {
                            (false, _) => "-",
                            (true, true) => "yes",
                            (true, false) => "no",
                        };
                        let updated = listing
                            .updated_at
                            .map(|at| at.format("%Y-%m-%d").to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<6} {:<12} {:<24} {:<32} {:<8} {}",
                            listing.song.id,
                            listing.song.song_id,
                            truncate(&listing.song.artist, 24),
                            truncate(&listing.song.title, 32),
                            status,
                            updated
                        );
                    }
                    println!("\n{} songs", songs.len());
                }
                other => {
                    return Err(LyricsError::Validation(format!("Unknown format '{}', use table or json", other)));
                }
            }
        }
    }

    Ok(())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
