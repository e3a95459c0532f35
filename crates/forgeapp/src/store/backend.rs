use super::tables::Tables;
use crate::error::Result;
use std::sync::Arc;

/// A versioned, immutable view of the stored tables.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub tables: Arc<Tables>,
}

/// Abstract interface for raw storage I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while EntryStore handles transactions, audit hand-off and schema access.
pub trait StorageBackend: Send + Sync {
    /// Load the latest committed snapshot. A store that was never written
    /// yields a bootstrapped one at version 0.
    fn load(&self) -> Result<Snapshot>;

    /// Replace the stored tables, but only if the stored version still equals
    /// `expected`. Returns the new version, or `ForgeError::TxConflict`.
    /// MUST be atomic: readers see either the old or the new tables.
    fn store(&self, expected: u64, tables: Arc<Tables>) -> Result<u64>;
}
