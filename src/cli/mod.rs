pub mod config;
pub mod dump;
pub mod serve;
pub mod write;

pub use config::ConfigArgs;
pub use dump::DumpArgs;
pub use serve::ServeArgs;
pub use write::WriteArgs;

use crate::Config;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Config for the one-shot modes: a config file, or an ad-hoc `--url` site.
pub(crate) fn collection_config(config: Option<&PathBuf>, url: Option<&str>) -> Result<Config> {
    match (config, url) {
        (Some(path), _) => Config::from_file(path),
        (None, Some(url)) => Ok(Config::for_single_site(url)),
        (None, None) => bail!("Either --config or --url is required"),
    }
}
