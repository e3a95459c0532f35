//! # Audit Sink
//!
//! Every mutation produces a [`LogRecord`]. Records are kept with the tables
//! (so they can be queried later) and are also handed to an [`AuditSink`]
//! when the transaction commits. A sink that refuses a record aborts the
//! commit: no mutation is persisted without its audit trail.

use crate::error::Result;
use crate::model::LogRecord;

pub trait AuditSink: Send + Sync {
    fn append(&self, record: &LogRecord) -> Result<()>;
}

/// Emits each record as a `tracing` event on the `forge::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn append(&self, record: &LogRecord) -> Result<()> {
        tracing::info!(
            target: "forge::audit",
            entry = %record.entry_path,
            user = %record.user,
            action = %record.action,
            category = %record.category,
            name = %record.name,
            value = %record.value,
            "audit"
        );
        Ok(())
    }
}
