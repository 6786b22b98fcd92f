use clap::{Parser, Subcommand};

mod cli;
mod config;
mod core;
mod error;
mod services;
mod utils;

use cli::*;
use config::Config;
use error::Result;
use services::SimpleServices;

#[derive(Parser)]
#[command(name = "lyricsr")]
#[command(about = "Resolves English-readable song lyrics from cache, local store, web search and scraping")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve lyrics for a song
    Resolve(resolve::ResolveArgs),

    /// Normalize raw lyrics text from a file or stdin
    Normalize(normalize::NormalizeArgs),

    /// Manage the song catalog
    Songs(songs::SongsArgs),

    /// Run a single scrape with one source profile
    Scrape(scrape::ScrapeArgs),

    /// Manage cache operations
    Cache(cache::CacheArgs),

    /// Show configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::init_logging(cli.verbose)
        .map_err(error::LyricsError::Internal)?;

    // Normalization is offline and needs no configuration
    if let Commands::Normalize(args) = cli.command {
        return normalize::execute(args).await;
    }

    let config = Config::load(cli.config.as_deref())?;
    let services = SimpleServices::new(config);

    match cli.command {
        Commands::Resolve(args) => resolve::execute(args, &services).await,
        Commands::Songs(args) => songs::execute(args, &services).await,
        Commands::Scrape(args) => scrape::execute(args, &services).await,
        Commands::Cache(args) => cache::execute(args, &services).await,
        Commands::Config(args) => cli::config::execute(args, &services.config()).await,
        Commands::Normalize(_) => Ok(()),
    }
}
