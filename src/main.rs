use clap::{Parser, Subcommand};
use bttrack_exporter::cli;
use anyhow::Result;

#[derive(Parser)]
#[command(name = "bttrack-exporter")]
#[command(version = bttrack_exporter::VERSION)]
#[command(about = "Prometheus exporter for BitTorrent tracker statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP exposition daemon
    Serve(cli::serve::ServeArgs),

    /// Collect once and print exposition text to stdout
    Dump(cli::dump::DumpArgs),

    /// Collect once and write a node-exporter textfile
    Write(cli::write::WriteArgs),

    /// Configuration management
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => cli::serve::run(args).await,
        Commands::Dump(args) => cli::dump::run(args).await,
        Commands::Write(args) => cli::write::run(args).await,
        Commands::Config(args) => cli::config::run(args).await,
    }
}
