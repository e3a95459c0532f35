//! # Storage Layer
//!
//! The store is the transactional backing for the entry tree. It is split in
//! two levels, like any storage stack:
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ DataStore (EntryStore<B>)                  │  begin / commit, audit hand-off,
//! │                                            │  schema access
//! ├────────────────────────────────────────────┤
//! │ StorageBackend (MemBackend | FsBackend)    │  versioned load / store
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## Transactions
//!
//! [`DataStore::begin`] takes the latest committed [`Snapshot`] and wraps it in
//! a [`Transaction`]. Every read inside the transaction, including whole
//! ancestor walks, sees that one snapshot, so a walk can never mix pre- and
//! post-commit ancestor state.
//!
//! [`DataStore::commit`] publishes the transaction's tables only if nobody
//! else committed since the snapshot was taken (first committer wins). A lost
//! race surfaces as [`ForgeError::TxConflict`](crate::error::ForgeError::TxConflict).
//! There is no retry here; the caller decides.
//!
//! Rollback is simply dropping the transaction.
//!
//! ## Commit Order
//!
//! 1. Check the caller's cancellation token.
//! 2. Hand each pending audit record to the [`AuditSink`]. Any failure aborts.
//! 3. Version-checked write through the backend.
//!
//! Read-only transactions skip steps 2 and 3.

use crate::audit::{AuditSink, TracingSink};
use crate::caller::Caller;
use crate::error::Result;
use crate::schema::SchemaProvider;
use std::path::PathBuf;
use std::sync::Arc;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod tables;
pub mod tx;

pub use backend::{Snapshot, StorageBackend};
pub use fs_backend::FsBackend;
pub use mem_backend::MemBackend;
pub use tables::Tables;
pub use tx::Transaction;

pub trait DataStore {
    fn begin(&self, caller: &Caller) -> Result<Transaction>;

    fn commit(&self, tx: Transaction) -> Result<()>;

    /// Runs `f` on a fresh snapshot. Nothing is written.
    fn read<T, F>(&self, caller: &Caller, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&Transaction) -> Result<T>,
    {
        let tx = self.begin(caller)?;
        let out = f(&tx)?;
        tx.check_cancelled()?;
        Ok(out)
    }

    /// Runs `f` and commits. If `f` fails, the transaction is dropped and
    /// nothing is written.
    fn write<T, F>(&self, caller: &Caller, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Transaction) -> Result<T>,
    {
        let mut tx = self.begin(caller)?;
        let out = f(&mut tx)?;
        self.commit(tx)?;
        Ok(out)
    }
}

pub struct EntryStore<B: StorageBackend> {
    backend: B,
    schema: Arc<dyn SchemaProvider>,
    sink: Arc<dyn AuditSink>,
}

pub type InMemoryStore = EntryStore<MemBackend>;
pub type FileStore = EntryStore<FsBackend>;

impl<B: StorageBackend> EntryStore<B> {
    pub fn new(backend: B, schema: Arc<dyn SchemaProvider>) -> Self {
        Self {
            backend,
            schema,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl InMemoryStore {
    pub fn in_memory(schema: Arc<dyn SchemaProvider>) -> Self {
        Self::new(MemBackend::new(), schema)
    }
}

impl FileStore {
    pub fn open(root: PathBuf, schema: Arc<dyn SchemaProvider>) -> Self {
        Self::new(FsBackend::new(root), schema)
    }
}

impl<B: StorageBackend> DataStore for EntryStore<B> {
    fn begin(&self, caller: &Caller) -> Result<Transaction> {
        caller.check_cancelled()?;
        let snap = self.backend.load()?;
        Ok(Transaction::new(
            caller.clone(),
            snap.version,
            snap.tables,
            self.schema.clone(),
        ))
    }

    fn commit(&self, tx: Transaction) -> Result<()> {
        let (caller, base_version, tables, pending, dirty) = tx.into_parts();
        caller.check_cancelled()?;
        if !dirty {
            return Ok(());
        }
        for record in &pending {
            self.sink.append(record)?;
        }
        let version = self.backend.store(base_version, tables)?;
        tracing::debug!(
            user = %caller.user(),
            version,
            records = pending.len(),
            "transaction committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::CancelToken;
    use crate::error::ForgeError;
    use crate::model::{AuditAction, Category, LogRecord};
    use crate::schema::TypeSchema;
    use std::sync::Mutex;

    fn make_store() -> InMemoryStore {
        InMemoryStore::in_memory(Arc::new(TypeSchema::new()))
    }

    fn add_show(tx: &mut Transaction) -> Result<()> {
        let root = tx.tables().root_id()?;
        let now = tx.now();
        let id = tx.tables_mut().insert_entry(root, "show", "show", now)?;
        tx.log(id, AuditAction::Create, Category::Entry, "", "show", "")
    }

    // --- Transaction Tests ---

    #[test]
    fn dropped_transaction_writes_nothing() {
        let store = make_store();
        let caller = Caller::system();
        let mut tx = store.begin(&caller).unwrap();
        add_show(&mut tx).unwrap();
        drop(tx);

        let found = store
            .read(&caller, |tx| Ok(tx.tables().entry_id("/show")))
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn committed_transaction_is_visible() {
        let store = make_store();
        let caller = Caller::system();
        store.write(&caller, add_show).unwrap();
        let found = store
            .read(&caller, |tx| Ok(tx.tables().entry_id("/show")))
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn snapshot_is_isolated_from_later_commits() {
        let store = make_store();
        let caller = Caller::system();
        let reader = store.begin(&caller).unwrap();
        store.write(&caller, add_show).unwrap();
        assert_eq!(reader.tables().entry_id("/show"), None);
    }

    #[test]
    fn first_committer_wins() {
        let store = make_store();
        let caller = Caller::system();
        let mut a = store.begin(&caller).unwrap();
        let mut b = store.begin(&caller).unwrap();
        add_show(&mut a).unwrap();
        add_show(&mut b).unwrap();
        store.commit(a).unwrap();
        assert!(matches!(store.commit(b), Err(ForgeError::TxConflict(_))));
    }

    #[test]
    fn cancelled_commit_rolls_back() {
        let store = make_store();
        let token = CancelToken::new();
        let caller = Caller::system().with_cancel(token.clone());
        let result = store.write(&caller, |tx| {
            add_show(tx)?;
            token.cancel();
            Ok(())
        });
        assert!(matches!(result, Err(ForgeError::Cancelled)));
        let found = store
            .read(&Caller::system(), |tx| Ok(tx.tables().entry_id("/show")))
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn backend_write_error_surfaces() {
        let store = make_store();
        store.backend().set_simulate_write_error(true);
        let result = store.write(&Caller::system(), add_show);
        assert!(matches!(result, Err(ForgeError::Store(_))));
    }

    // --- Audit Tests ---

    #[derive(Default)]
    struct Collect(Mutex<Vec<LogRecord>>);

    impl AuditSink for Collect {
        fn append(&self, record: &LogRecord) -> Result<()> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct Refuse;

    impl AuditSink for Refuse {
        fn append(&self, _record: &LogRecord) -> Result<()> {
            Err(ForgeError::Audit("sink offline".into()))
        }
    }

    #[test]
    fn commit_hands_records_to_sink() {
        let sink = Arc::new(Collect::default());
        let store = make_store().with_sink(sink.clone());
        store.write(&Caller::new("kim"), add_show).unwrap();
        let got = sink.0.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].user, "kim");
        assert_eq!(got[0].entry_path, "/show");
    }

    #[test]
    fn refused_audit_aborts_commit() {
        let store = make_store().with_sink(Arc::new(Refuse));
        let result = store.write(&Caller::system(), add_show);
        assert!(matches!(result, Err(ForgeError::Audit(_))));
        let found = store
            .read(&Caller::system(), |tx| Ok(tx.tables().entry_id("/show")))
            .unwrap();
        assert_eq!(found, None);
    }
}
