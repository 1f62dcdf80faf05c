//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Example configuration written by `warpdrive init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../warpdrive.example.yaml");

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<WarpConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    let config = parse_config(&contents)?;
    log::debug!("loaded config from {:?} ({} voices)", path, config.voices.len());
    Ok(config)
}

/// Parse and validate configuration from YAML text
pub fn parse_config(contents: &str) -> Result<WarpConfig> {
    let config: WarpConfig = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}
