use super::backend::{Snapshot, StorageBackend};
use super::tables::Tables;
use crate::error::{ForgeError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const DATA_FILE: &str = "forge.json";

#[derive(Serialize)]
struct StoredRef<'a> {
    version: u64,
    tables: &'a Tables,
}

#[derive(Deserialize)]
struct Stored {
    version: u64,
    tables: Tables,
}

/// Filesystem backend: the whole store is one JSON document in `root`.
///
/// Writes go to a temp file that is renamed over the data file, so readers
/// never observe a half-written store. The version check and the rename run
/// under a process-wide lock.
pub struct FsBackend {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_file(&self) -> PathBuf {
        self.root.join(DATA_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(ForgeError::Io)?;
        }
        Ok(())
    }

    fn read(&self) -> Result<Snapshot> {
        let data_file = self.data_file();
        if !data_file.exists() {
            return Ok(Snapshot {
                version: 0,
                tables: Arc::new(Tables::bootstrap(Utc::now())),
            });
        }
        let content = fs::read_to_string(&data_file).map_err(ForgeError::Io)?;
        let stored: Stored = serde_json::from_str(&content).map_err(ForgeError::Serialization)?;
        let mut tables = stored.tables;
        tables.reindex();
        Ok(Snapshot {
            version: stored.version,
            tables: Arc::new(tables),
        })
    }
}

impl StorageBackend for FsBackend {
    fn load(&self) -> Result<Snapshot> {
        self.read()
    }

    fn store(&self, expected: u64, tables: Arc<Tables>) -> Result<u64> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ForgeError::Store("file store lock poisoned".to_string()))?;
        let current = self.read()?;
        if current.version != expected {
            return Err(ForgeError::TxConflict(expected));
        }
        self.ensure_dir()?;

        let version = expected + 1;
        let content = serde_json::to_string_pretty(&StoredRef {
            version,
            tables: tables.as_ref(),
        })
        .map_err(ForgeError::Serialization)?;

        // Atomic write
        let tmp_file = self.root.join(format!(".forge-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(ForgeError::Io)?;
        fs::rename(&tmp_file, self.data_file()).map_err(ForgeError::Io)?;

        tracing::debug!(version, path = %self.data_file().display(), "store written");
        Ok(version)
    }
}
