//! # Startup
//!
//! [`initialize`] turns command line overrides into a ready [`ForgeContext`]:
//!
//! 1. **Data directory**: the `--data-dir` override, else `FORGE_DATA_DIR`,
//!    else the OS data directory (via the `directories` crate).
//! 2. **Config**: `forge.toml` in that directory, layered under environment
//!    variables (see [`crate::config`]).
//! 3. **Schema**: `schema_file` from the config, relative paths resolved
//!    against the data directory. Without one the store only knows the root
//!    type.
//! 4. **Caller**: the `--user` override, else the configured `user`.

use crate::api::ForgeApi;
use crate::caller::Caller;
use crate::config::{default_data_dir, ForgeConfig};
use crate::error::Result;
use crate::schema::{SchemaProvider, TypeSchema};
use crate::store::FileStore;
use std::path::PathBuf;
use std::sync::Arc;

pub struct ForgeContext {
    pub api: ForgeApi<FileStore>,
    pub config: ForgeConfig,
    pub caller: Caller,
}

pub fn initialize(data_override: Option<PathBuf>, user_override: Option<String>) -> Result<ForgeContext> {
    let data_dir = data_override
        .or_else(|| std::env::var_os("FORGE_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir);

    let mut config = ForgeConfig::load_from(&data_dir)?;
    config.data_dir = Some(data_dir.clone());

    let schema: Arc<dyn SchemaProvider> = match &config.schema_file {
        Some(file) => {
            let file = if file.is_absolute() {
                file.clone()
            } else {
                data_dir.join(file)
            };
            tracing::debug!(schema = %file.display(), "loading entry type schema");
            Arc::new(TypeSchema::load(&file)?)
        }
        None => Arc::new(TypeSchema::new()),
    };

    let user = user_override.unwrap_or_else(|| config.user.clone());
    tracing::debug!(data_dir = %data_dir.display(), user = %user, "forge initialized");

    Ok(ForgeContext {
        api: ForgeApi::new(FileStore::open(data_dir, schema)),
        config,
        caller: Caller::new(user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;
    use std::fs;
    use tempfile::TempDir;

    const TYPES: &str = r#"
[types.root]
sub_entry_types = ["show"]

[types.show]
properties = [{ name = "status", type = "text", value = "wait" }]
"#;

    #[test]
    fn schema_path_is_relative_to_data_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("types.toml"), TYPES).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "schema_file = \"types.toml\"\n").unwrap();

        let ctx = initialize(Some(dir.path().to_path_buf()), Some("system".into())).unwrap();
        let show = ctx.api.add_entry(&ctx.caller, "/", "show", "").unwrap();
        assert_eq!(show.type_name, "show");
        assert_eq!(show.properties["status"].value, "wait");
        assert_eq!(ctx.config.data_dir(), dir.path());
    }

    #[test]
    fn missing_schema_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "schema_file = \"nope.toml\"\n").unwrap();
        assert!(initialize(Some(dir.path().to_path_buf()), None).is_err());
    }
}
