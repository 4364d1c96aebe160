use clap::Args;
use anyhow::{Context, Result};
use crate::Exporter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args)]
pub struct WriteArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Collect a single tracker URL without a config file
    #[arg(short, long, conflicts_with = "config")]
    pub url: Option<String>,

    /// .prom file to write
    #[arg(
        short,
        long,
        default_value = "/var/lib/prometheus/node-exporter/bttrack.prom"
    )]
    pub output: PathBuf,
}

pub async fn run(args: WriteArgs) -> Result<()> {
    crate::logging::init_stderr_logging("warn")?;

    let config = super::collection_config(args.config.as_ref(), args.url.as_deref())?;
    let exporter = Exporter::new(config)?;

    let text = exporter.collect_to_string().await?;
    write_atomic(&args.output, &text)?;

    info!("Wrote {}", args.output.display());
    Ok(())
}

/// Write-then-rename so the node-exporter textfile collector never reads a
/// half-written file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .with_context(|| format!("Output path has no file name: {}", path.display()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp_path = dir.join(format!(".{}.tmp", file_name));

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;

    Ok(())
}
