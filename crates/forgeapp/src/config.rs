//! # Configuration
//!
//! Forge configuration is a [`confique`] layered config, resolved in
//! priority order:
//! 1. **Environment variables**: `FORGE_DATA_DIR`, `FORGE_SCHEMA_FILE`,
//!    `FORGE_LOG`, `FORGE_USER`.
//! 2. **Config file**: `forge.toml` inside the data directory.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `data_dir` | OS data dir, else `.forge` | Directory holding `forge.json` |
//! | `schema_file` | none | Entry type schema (TOML) |
//! | `log_filter` | `warn` | `tracing` filter used when `RUST_LOG` is unset |
//! | `user` | `system` | Identity the CLI acts as |

use crate::error::Result;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "forge.toml";

/// Configuration for forge, stored in `forge.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ForgeConfig {
    /// Directory of the JSON store. Defaults to the OS data directory.
    #[config(env = "FORGE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Entry type schema. Without one, only the root type exists.
    #[config(env = "FORGE_SCHEMA_FILE")]
    pub schema_file: Option<PathBuf>,

    #[config(env = "FORGE_LOG", default = "warn")]
    pub log_filter: String,

    #[config(env = "FORGE_USER", default = "system")]
    pub user: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            schema_file: None,
            log_filter: "warn".to_string(),
            user: "system".to_string(),
        }
    }
}

/// The OS data directory for forge, or `.forge` when there is none.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "forge", "forge")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".forge"))
}

impl ForgeConfig {
    /// Loads env, then `dir/forge.toml`, then defaults. A missing file is
    /// not an error.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let config = ForgeConfig::builder()
            .env()
            .file(dir.join(CONFIG_FILE))
            .load()?;
        Ok(config)
    }

    /// Where the store lives: `data_dir` if set, else [`default_data_dir`].
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ForgeConfig::default();
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.user, "system");
        assert!(config.schema_file.is_none());
    }

    #[test]
    fn test_data_dir_override() {
        let config = ForgeConfig {
            data_dir: Some(PathBuf::from("/tmp/forge-data")),
            ..Default::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/forge-data"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "schema_file = \"types.toml\"\nuser = \"kim\"\n",
        )
        .unwrap();
        let config = ForgeConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.schema_file, Some(PathBuf::from("types.toml")));
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ForgeConfig::load_from(dir.path()).unwrap();
        assert!(config.schema_file.is_none());
    }
}
