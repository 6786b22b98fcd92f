use clap::{Args, Subcommand};

use crate::config::Config as AppConfig;
use crate::error::Result;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (secrets masked)
    Show {
        /// Print as TOML instead of a summary
        #[arg(long)]
        toml: bool,
    },

    /// Show configuration file path
    Path,
}

pub async fn execute(args: ConfigArgs, config: &AppConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Show { toml } => {
            let shown = config.redacted();
            if toml {
                let content = toml::to_string_pretty(&shown).map_err(crate::error::ConfigError::Serialize)?;
                println!("{}", content);
                return Ok(());
            }

            println!("Current configuration:");
            println!("  database_path: {}", shown.database_path.display());
            println!("  redis_url: {}", shown.redis_url.as_deref().unwrap_or("(none)"));
            println!("  cache_ttl_seconds: {}", shown.cache_ttl_seconds);
            println!("  cache_max_entries: {}", shown.cache_max_entries);
            println!("  staleness_months: {}", shown.staleness_months);
            println!("  search.api_key: {}", shown.search.api_key.as_deref().unwrap_or("(not set)"));
            println!("  search.engine_id: {}", shown.search.engine_id.as_deref().unwrap_or("(not set)"));
            println!("  search.endpoint: {}", shown.search.endpoint);
            println!("  search.qualifier: {}", shown.search.qualifier);
            println!("  search.result_count: {}", shown.search.result_count);
            println!("  search.timeout_seconds: {}", shown.search.timeout_seconds);
            println!("  scrape.user_agent: {}", shown.scrape.user_agent);
            println!("  scrape.navigation_timeout_seconds: {}", shown.scrape.navigation_timeout_seconds);
            println!("  scrape.primary_selector_timeout_seconds: {}", shown.scrape.primary_selector_timeout_seconds);
            println!("  scrape.backup_selector_timeout_seconds: {}", shown.scrape.backup_selector_timeout_seconds);
            println!("  scrape.primary_domain: {}", shown.scrape.primary_domain);
            println!("  scrape.primary_path_marker: {}", shown.scrape.primary_path_marker);
            println!("  scrape.backup_url_template: {}", shown.scrape.backup_url_template);
            println!("  scrape.snapshot_dir: {}", shown.scrape.snapshot_dir.display());
            println!("  scrape.save_snapshots: {}", shown.scrape.save_snapshots);
            println!("  scrape.chrome_executable: {:?}", shown.scrape.chrome_executable);
        }

        ConfigCommands::Path => {
            let config_path = AppConfig::config_path()?;
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
