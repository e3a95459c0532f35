//! Shared fixtures for command and API tests.
//!
//! [`sample_schema`] describes a small production: shows hold shots, shots
//! hold tasks. [`sample_store`] builds this tree on an in-memory store:
//!
//! ```text
//! /show        (show)  kim: r
//!   s01        (shot)  comp, lighting (task)
//!   s02        (shot)  comp, lighting (task)
//! /secret      (show)
//! ```
//!
//! Users `ada` (first, so admin), `kim` and `lee`; group `coord` = {lee}.

use crate::audit::AuditSink;
use crate::caller::Caller;
use crate::commands::{access, accessor, entry};
use crate::error::{ForgeError, Result};
use crate::model::{LogRecord, Permission};
use crate::schema::{TypeDef, TypeSchema};
use crate::store::{DataStore, InMemoryStore};
use crate::types::AttrType;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub type SampleStore = InMemoryStore;

pub fn sample_schema() -> TypeSchema {
    TypeSchema::new()
        .with_type("root", TypeDef::new().sub_entry_type("show"))
        .with_type(
            "show",
            TypeDef::new()
                .sub_entry_type("shot")
                .property("sup", AttrType::User, "", true)
                .property("fps", AttrType::Int, "24", true)
                .property("status", AttrType::Text, "", false)
                .property("note", AttrType::Text, "", false)
                .property("shots", AttrType::Search, "", false)
                .environ("SHOW", AttrType::EntryName, "."),
        )
        .with_type(
            "shot",
            TypeDef::new()
                .sub_entry_type("task")
                .sub_entry("comp", "task")
                .sub_entry("lighting", "task")
                .property("status", AttrType::Text, "wait", false)
                .property("due", AttrType::Date, "", false)
                .property("tags", AttrType::Tag, "", false)
                .property("assignee", AttrType::User, "", false)
                .property("cut_in", AttrType::Timecode, "", false)
                .property("note", AttrType::Text, "", false)
                .environ("SHOT", AttrType::EntryPath, ".")
                .access("coord", Permission::ReadWrite),
        )
        .with_type(
            "task",
            TypeDef::new()
                .property("status", AttrType::Text, "", false)
                .property("assignee", AttrType::User, "", false)
                .property("due", AttrType::Date, "", false),
        )
        .with_type(
            "trio",
            TypeDef::new()
                .property("a", AttrType::Text, "1", false)
                .property("b", AttrType::Text, "2", false)
                .property("c", AttrType::Text, "3", false),
        )
        .with_type(
            "broken",
            TypeDef::new()
                .property("a", AttrType::Text, "1", false)
                .property("b", AttrType::Text, "2", false)
                .property("frames", AttrType::Int, "not-a-number", false),
        )
}

pub fn sample_store() -> SampleStore {
    let store = InMemoryStore::in_memory(Arc::new(sample_schema()));
    let built = store.write(&Caller::system(), |tx| {
        accessor::add_user(tx, "ada", "Ada")?;
        accessor::add_user(tx, "kim", "Kim")?;
        accessor::add_user(tx, "lee", "Lee")?;
        accessor::add_group(tx, "coord", "Coordinators")?;
        accessor::add_group_member(tx, "coord", "lee")?;
        entry::create(tx, "/", "show", "show")?;
        access::add(tx, "/show", "kim", Permission::Read)?;
        entry::create(tx, "/show", "s01", "shot")?;
        entry::create(tx, "/show", "s02", "shot")?;
        entry::create(tx, "/", "secret", "show")?;
        Ok(())
    });
    if let Err(e) = built {
        panic!("sample store setup failed: {}", e);
    }
    store
}

/// An audit sink that accepts `limit` records, then refuses.
pub struct FailingSink {
    limit: usize,
    seen: AtomicUsize,
}

impl AuditSink for FailingSink {
    fn append(&self, _record: &LogRecord) -> Result<()> {
        let n = self.seen.fetch_add(1, Ordering::SeqCst);
        if n >= self.limit {
            return Err(ForgeError::Audit(format!("sink refused record {}", n + 1)));
        }
        Ok(())
    }
}

pub fn failing_after(limit: usize) -> Arc<dyn AuditSink> {
    Arc::new(FailingSink {
        limit,
        seen: AtomicUsize::new(0),
    })
}
