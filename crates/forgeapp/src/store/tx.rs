use super::tables::{EntryRow, Tables};
use crate::caller::Caller;
use crate::error::{ForgeError, Result};
use crate::model::{AuditAction, Category, EntryId, LogRecord};
use crate::schema::SchemaProvider;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One unit of atomicity.
///
/// A transaction reads from the snapshot it was started on and buffers its
/// writes in a private copy of the tables (copied on first write). Nothing is
/// visible to anyone else until [`DataStore::commit`](super::DataStore::commit)
/// succeeds; dropping the transaction discards everything.
pub struct Transaction {
    caller: Caller,
    base_version: u64,
    tables: Arc<Tables>,
    schema: Arc<dyn SchemaProvider>,
    pending: Vec<LogRecord>,
    dirty: bool,
    now: DateTime<Utc>,
}

impl Transaction {
    pub(super) fn new(
        caller: Caller,
        base_version: u64,
        tables: Arc<Tables>,
        schema: Arc<dyn SchemaProvider>,
    ) -> Self {
        Self {
            caller,
            base_version,
            tables,
            schema,
            pending: Vec::new(),
            dirty: false,
            now: Utc::now(),
        }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn schema(&self) -> &dyn SchemaProvider {
        self.schema.as_ref()
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut Tables {
        self.dirty = true;
        Arc::make_mut(&mut self.tables)
    }

    /// Timestamp shared by every write in this transaction.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn check_cancelled(&self) -> Result<()> {
        self.caller.check_cancelled()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Looks up an entry by path without any permission check.
    pub fn entry_row(&self, path: &str) -> Result<&EntryRow> {
        self.tables
            .entry_by_path(path)
            .ok_or_else(|| ForgeError::not_found(format!("entry {}", path)))
    }

    pub fn entry_row_by_id(&self, id: EntryId) -> Result<&EntryRow> {
        self.tables
            .entry(id)
            .ok_or_else(|| ForgeError::not_found(format!("entry {}", id)))
    }

    /// Records an audit entry for this transaction's caller.
    pub fn log(
        &mut self,
        entry_id: EntryId,
        action: AuditAction,
        category: Category,
        name: &str,
        type_name: &str,
        value: &str,
    ) -> Result<()> {
        let entry_path = self.entry_row_by_id(entry_id)?.path.clone();
        let record = LogRecord {
            id: 0,
            entry_id,
            entry_path,
            user: self.caller.user().to_string(),
            action,
            category,
            name: name.to_string(),
            type_name: type_name.to_string(),
            value: value.to_string(),
            when: self.now,
        };
        let stored = self.tables_mut().push_log(record);
        self.pending.push(stored);
        Ok(())
    }

    pub(super) fn into_parts(self) -> (Caller, u64, Arc<Tables>, Vec<LogRecord>, bool) {
        (self.caller, self.base_version, self.tables, self.pending, self.dirty)
    }
}
