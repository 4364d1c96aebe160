use clap::Args;
use anyhow::{Context, Result};
use crate::{Config, Exporter};
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bttrack.toml")]
    pub config: PathBuf,

    /// Override the configured listen address (host:port)
    #[arg(short, long)]
    pub listen: Option<String>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    // Load configuration
    let mut config = Config::from_file(&args.config)?;

    if let Some(listen) = &args.listen {
        let (host, port) = listen
            .rsplit_once(':')
            .with_context(|| format!("Invalid listen address: {}", listen))?;
        config.server.host = host.to_string();
        config.server.port = port
            .parse()
            .with_context(|| format!("Invalid listen port: {}", port))?;
    }

    // Initialize logging
    crate::logging::init_logging(&config.logging.level, &config.logging.format)?;

    info!("Starting bttrack-exporter v{}", crate::VERSION);
    info!("Loading configuration from: {}", args.config.display());

    // Validate configuration
    let warnings = config.validate()?;
    for warning in warnings {
        println!("{}", warning);
    }

    let exporter = Exporter::new(config)?;
    exporter.serve().await?;

    Ok(())
}
