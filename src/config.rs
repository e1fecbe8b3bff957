use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoreConfig {
    #[serde(default)]
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    /// Base directory holding collections and relation stores
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    /// Pretty-print documents
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            pretty: default_pretty(),
        }
    }
}

fn default_pretty() -> bool {
    true
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("docgraph.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("db")
}

/// Base directory to use: explicit override, then config, then the default
pub fn database_path(override_path: Option<&Path>, config: Option<&StoreConfig>) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.map(|c| c.database.path.clone()))
        .unwrap_or_else(default_database_path)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<StoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: StoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &StoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
