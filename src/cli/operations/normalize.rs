use clap::Args;
use std::io::Read;
use std::path::PathBuf;

use crate::core::lyrics::normalize;
use crate::error::Result;

#[derive(Args)]
pub struct NormalizeArgs {
    /// Lyrics file to normalize (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

pub async fn execute(args: NormalizeArgs) -> Result<()> {
    let raw = match args.file {
        Some(path) => tokio::fs::read_to_string(&path).await?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    println!("{}", normalize(&raw));
    Ok(())
}
