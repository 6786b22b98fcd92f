use clap::{Args, ValueEnum};
use tracing::info;

use crate::core::lyrics::normalize;
use crate::core::services::scraper::{ScrapeProfile, Scraper};
use crate::error::Result;
use crate::services::SimpleServices;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ProfileChoice {
    Primary,
    Backup,
}

#[derive(Args)]
pub struct ScrapeArgs {
    /// Source profile to scrape with
    #[arg(short, long, value_enum)]
    profile: ProfileChoice,

    /// Page URL for primary, song id for backup
    #[arg(short, long)]
    target: String,

    /// Print the text exactly as extracted
    #[arg(long)]
    raw: bool,
}

pub async fn execute(args: ScrapeArgs, services: &SimpleServices) -> Result<()> {
    let config = services.config();
    let profile: ScrapeProfile = match args.profile {
        ProfileChoice::Primary => config.primary_profile(),
        ProfileChoice::Backup => config.backup_profile(),
    };

    info!("Scraping {} with the {} profile", profile.target_url(&args.target), profile.kind.as_str());
    let scraper = services.create_scraper();
    let text = scraper.scrape(&profile, &args.target).await?;

    if args.raw {
        println!("{}", text);
    } else {
        println!("{}", normalize(&text));
    }
    Ok(())
}
