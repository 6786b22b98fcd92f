use anyhow::Result;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Library crates that are chatty at INFO and below
const NOISY_TARGETS: [&str; 4] = ["reqwest", "rusqlite", "chromiumoxide", "tungstenite"];

pub fn build_filter(verbose: bool) -> Result<EnvFilter> {
    let level = if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    for target in NOISY_TARGETS {
        filter = filter.add_directive(format!("{}=warn", target).parse()?);
    }

    Ok(filter)
}

/// Logs go to stderr so command output on stdout stays pipeable.
pub fn init_logging(verbose: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(())
}
