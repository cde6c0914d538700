use crate::connection::{RowShape, DEFAULT_BUSY_TIMEOUT};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub busy_timeout_secs: u64,
    /// Enforce foreign keys. Off by default; version tracking requires it off.
    pub foreign_keys: bool,
    pub default_shape: RowShape,
    pub default_version: String,
    pub default_increment: String,
    /// Create the graph tables on open when they are missing.
    pub graph: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database: None,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT.as_secs(),
            foreign_keys: false,
            default_shape: RowShape::Tuple,
            default_version: "1.0".to_string(),
            default_increment: "1.0".to_string(),
            graph: false,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("rowgraph.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<DatabaseConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: DatabaseConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &DatabaseConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}
