use clap::Args;
use anyhow::Result;
use crate::Exporter;
use std::path::PathBuf;

#[derive(Args)]
pub struct DumpArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Collect a single tracker URL without a config file
    #[arg(short, long, conflicts_with = "config")]
    pub url: Option<String>,
}

pub async fn run(args: DumpArgs) -> Result<()> {
    // stdout is the payload, logs go to stderr
    crate::logging::init_stderr_logging("warn")?;

    let config = super::collection_config(args.config.as_ref(), args.url.as_deref())?;
    let exporter = Exporter::new(config)?;

    let text = exporter.collect_to_string().await?;
    print!("{}", text);

    Ok(())
}
