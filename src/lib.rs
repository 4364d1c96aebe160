pub mod cli;
pub mod config;
pub mod exporter;
pub mod exposition;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod schema;
pub mod snapshot;
pub mod source;

pub use config::Config;
pub use exporter::Exporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
