use clap::{Args, Subcommand};
use tracing::info;

use crate::core::infrastructure::LyricsCache;
use crate::error::Result;
use crate::services::SimpleServices;

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommands,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache statistics
    Stats,

    /// Clear all cached lyrics
    Clear,
}

pub async fn execute(args: CacheArgs, services: &SimpleServices) -> Result<()> {
    let config = services.config();
    let cache = services.create_cache();

    match args.command {
        CacheCommands::Stats => {
            let stats = cache.stats();

            println!("📊 Cache Statistics");
            println!("══════════════════");
            println!("🔌 Backend: {}", if config.redis_url.is_some() { "memory + redis" } else { "memory" });
            println!("⏱️  TTL: {}s", config.cache_ttl_seconds);
            match stats.total_entries {
                Some(entries) => println!("🗂️  Total Entries: {}", entries),
                None => println!("🗂️  Total Entries: unknown"),
            }
            println!("📈 Total Requests: {}", stats.total_requests);
            println!("✅ Cache Hits: {}", stats.cache_hits);
            println!("📊 Hit Rate: {:.1}%", stats.hit_rate_percent);

            if stats.last_cleanup > 0 {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_else(|_| std::time::Duration::from_secs(0))
                    .as_secs();
                let seconds_ago = now.saturating_sub(stats.last_cleanup);
                println!("🧹 Last Cleanup: {} seconds ago", seconds_ago);
            }
        }

        CacheCommands::Clear => {
            info!("🗑️ Clearing cache...");
            cache.clear().await?;
            println!("✅ Cache cleared successfully!");
            println!("💡 Stored lyrics are kept; the next lookups will warm the cache again");
        }
    }

    Ok(())
}
