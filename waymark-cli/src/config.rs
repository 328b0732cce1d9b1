//! TOML router settings

use std::{fs, path::Path};

use tracing::info;
use waymark::RouterConfig;

use crate::error::CliError;

/// Reads router settings; missing keys keep their defaults
pub fn load_config(path: Option<&Path>) -> Result<RouterConfig, CliError> {
    let Some(path) = path else {
        return Ok(RouterConfig::default());
    };
    let config = parse_config(&fs::read_to_string(path)?)?;
    info!(path = %path.display(), vehicle = ?config.vehicle, "Loaded router configuration");
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<RouterConfig, CliError> {
    let config: RouterConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}
