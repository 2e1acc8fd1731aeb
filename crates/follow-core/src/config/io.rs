use super::models::FollowConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the engine configuration, falling back to defaults on any failure.
pub fn load_config(path: &Path) -> FollowConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return FollowConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            FollowConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<FollowConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("parsing config tables")?;
    Ok(FollowConfig::from(tables).sanitized())
}

pub fn serialize_config(config: &FollowConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("serializing config tables")
}
