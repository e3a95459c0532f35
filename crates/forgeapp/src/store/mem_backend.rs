use super::backend::{Snapshot, StorageBackend};
use super::tables::Tables;
use crate::error::{ForgeError, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory storage backend.
///
/// Requests run on their own threads, so the committed snapshot sits behind a
/// `Mutex`. Loading only clones the `Arc`; transactions copy the tables on
/// their first write.
pub struct MemBackend {
    current: Mutex<Snapshot>,
    simulate_write_error: AtomicBool,
}

impl Default for MemBackend {
    fn default() -> Self {
        Self {
            current: Mutex::new(Snapshot {
                version: 0,
                tables: Arc::new(Tables::bootstrap(Utc::now())),
            }),
            simulate_write_error: AtomicBool::new(false),
        }
    }
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Snapshot>> {
        self.current
            .lock()
            .map_err(|_| ForgeError::Store("memory store lock poisoned".to_string()))
    }
}

impl StorageBackend for MemBackend {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.lock()?.clone())
    }

    fn store(&self, expected: u64, tables: Arc<Tables>) -> Result<u64> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(ForgeError::Store("Simulated write error".to_string()));
        }
        let mut current = self.lock()?;
        if current.version != expected {
            return Err(ForgeError::TxConflict(expected));
        }
        current.version += 1;
        current.tables = tables;
        Ok(current.version)
    }
}
