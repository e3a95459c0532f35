//! # Entry Type Schema
//!
//! The schema says, per entry type, which attributes an entry of that type
//! starts with and which names and types are legal on it. The core only
//! reads it, through [`SchemaProvider`]:
//!
//! - [`SchemaProvider::defaults_for`]: the [`Declaration`]s of a type. Property
//!   declarations double as the list of legal property names.
//! - [`SchemaProvider::sub_entry_types_for`]: which types may sit below it.
//!   A create with no type picks the only one, if there is exactly one.
//! - [`SchemaProvider::global_setting`]: free-form per-type settings (status
//!   vocabularies, property filters) that the core passes through.
//!
//! [`TypeSchema`] is the stock provider, loaded from TOML:
//!
//! ```toml
//! [types.shot]
//! sub_entry_types = ["task"]
//! sub_entries = [{ name = "comp", type = "task" }]
//! properties = [{ name = "status", type = "text", value = "wait" }]
//! environs = [{ name = "SHOT", type = "entry_name", value = "." }]
//! access = [{ name = "coord", value = "rw" }]
//!
//! [types.shot.globals]
//! status = "wait,wip,done"
//! ```

use crate::error::Result;
use crate::model::Permission;
use crate::types::AttrType;

mod toml_schema;

pub use toml_schema::{TypeDef, TypeSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclCategory {
    SubEntry,
    Property,
    Environ,
    Access,
}

/// One default declared for an entry type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    SubEntry {
        name: String,
        entry_type: String,
    },
    Property {
        name: String,
        type_name: AttrType,
        value: String,
        inherit: bool,
    },
    Environ {
        name: String,
        type_name: AttrType,
        value: String,
    },
    Access {
        name: String,
        permission: Permission,
    },
}

impl Declaration {
    pub fn category(&self) -> DeclCategory {
        match self {
            Declaration::SubEntry { .. } => DeclCategory::SubEntry,
            Declaration::Property { .. } => DeclCategory::Property,
            Declaration::Environ { .. } => DeclCategory::Environ,
            Declaration::Access { .. } => DeclCategory::Access,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Declaration::SubEntry { name, .. }
            | Declaration::Property { name, .. }
            | Declaration::Environ { name, .. }
            | Declaration::Access { name, .. } => name,
        }
    }
}

/// Read-only source of entry type definitions.
pub trait SchemaProvider: Send + Sync {
    fn has_type(&self, entry_type: &str) -> Result<bool>;
    fn defaults_for(&self, entry_type: &str) -> Result<Vec<Declaration>>;
    fn sub_entry_types_for(&self, entry_type: &str) -> Result<Vec<String>>;
    fn global_setting(&self, entry_type: &str, name: &str) -> Result<Option<String>>;
}

/// The property declaration of `name` on `entry_type`, if any.
pub fn property_decl(
    schema: &dyn SchemaProvider,
    entry_type: &str,
    name: &str,
) -> Result<Option<(AttrType, bool)>> {
    let found = schema
        .defaults_for(entry_type)?
        .into_iter()
        .find_map(|d| match d {
            Declaration::Property {
                name: n,
                type_name,
                inherit,
                ..
            } if n == name => Some((type_name, inherit)),
            _ => None,
        });
    Ok(found)
}

/// Whether `entry_type` declares a default access rule for `accessor`.
pub fn has_default_access(schema: &dyn SchemaProvider, entry_type: &str, accessor: &str) -> Result<bool> {
    Ok(schema
        .defaults_for(entry_type)?
        .iter()
        .any(|d| d.category() == DeclCategory::Access && d.name() == accessor))
}
