//! # Domain Model
//!
//! The caller-facing shapes of the entry tree: [`Entry`], [`Property`],
//! [`Environ`], [`AccessRule`], [`Accessor`] and audit [`LogRecord`]s, plus
//! the partial-patch updaters used by the update operations.
//!
//! ## Entries
//!
//! ```text
//! /                      root, type "root", no parent
//! └── show               path == parent.path + "/" + name
//!     └── s01
//!         └── a001       created after its parent, never before
//! ```
//!
//! An entry's identity is its integer id. Its path is unique and is rewritten
//! (for the entry and every descendant) only by rename.
//!
//! ## Attributes and Provenance
//!
//! [`Property`] and [`Environ`] values returned by the resolvers carry the
//! `entry_path` of the entry that *declared* them, which may be an ancestor of
//! the entry that was asked about. `value` is the evaluated display form,
//! `raw_value` the stored (validated) form.

use crate::error::{ForgeError, Result};
use crate::paths;
use crate::types::AttrType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type EntryId = u64;
pub type AccessorId = u64;

pub const ROOT_TYPE: &str = "root";
pub const ADMIN_GROUP: &str = "admin";
pub const EVERYONE_GROUP: &str = "everyone";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub parent: Option<EntryId>,
    pub path: String,
    pub type_name: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Effective properties, attached by lookups, listings and search.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Property>,
}

impl Entry {
    pub fn name(&self) -> &str {
        paths::base_name(&self.path)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub entry_path: String,
    pub name: String,
    pub type_name: AttrType,
    pub value: String,
    pub raw_value: String,
    pub inherit: bool,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Hidden properties (leading `.`) are skipped by generic search terms.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environ {
    pub entry_path: String,
    pub name: String,
    pub type_name: AttrType,
    pub value: String,
    pub raw_value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Explicit deny. Stops an ancestor grant from reaching this subtree.
    #[serde(rename = "none")]
    Deny,
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Deny => "none",
            Permission::Read => "r",
            Permission::ReadWrite => "rw",
        }
    }

    pub fn can_read(&self) -> bool {
        *self >= Permission::Read
    }

    pub fn can_write(&self) -> bool {
        *self == Permission::ReadWrite
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "none" | "-" => Ok(Permission::Deny),
            "r" => Ok(Permission::Read),
            "rw" => Ok(Permission::ReadWrite),
            other => Err(ForgeError::invalid(format!(
                "access mode should be none, r or rw: got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessorKind {
    User,
    Group,
}

impl fmt::Display for AccessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorKind::User => f.write_str("user"),
            AccessorKind::Group => f.write_str("group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessor {
    pub id: AccessorId,
    pub name: String,
    pub called: String,
    pub kind: AccessorKind,
}

impl Accessor {
    pub fn is_group(&self) -> bool {
        self.kind == AccessorKind::Group
    }

    /// `called` when set, else the login name.
    pub fn display_name(&self) -> &str {
        if self.called.is_empty() {
            &self.name
        } else {
            &self.called
        }
    }
}

/// An access rule as seen from an entry: which accessor, what level, and
/// which entry declared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub entry_path: String,
    pub accessor: String,
    pub accessor_kind: AccessorKind,
    pub permission: Permission,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub group: String,
    pub member: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Rename,
    Archive,
    Unarchive,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Rename => "rename",
            AuditAction::Archive => "archive",
            AuditAction::Unarchive => "unarchive",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Entry,
    Property,
    Environ,
    Access,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Entry => "entry",
            Category::Property => "property",
            Category::Environ => "environ",
            Category::Access => "access",
        };
        f.write_str(s)
    }
}

impl FromStr for Category {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "entry" => Ok(Category::Entry),
            "property" => Ok(Category::Property),
            "environ" => Ok(Category::Environ),
            "access" => Ok(Category::Access),
            other => Err(ForgeError::invalid(format!("unknown log category: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: u64,
    pub entry_id: EntryId,
    pub entry_path: String,
    pub user: String,
    pub action: AuditAction,
    pub category: Category,
    pub name: String,
    pub type_name: String,
    pub value: String,
    pub when: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSetting {
    #[serde(default)]
    pub show_archived: bool,
}

/// Partial update of one property. `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct PropertyUpdater {
    pub entry_path: String,
    pub name: String,
    pub value: Option<String>,
    pub inherit: Option<bool>,
}

impl PropertyUpdater {
    pub fn new(entry_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entry_path: entry_path.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_inherit(mut self, inherit: bool) -> Self {
        self.inherit = Some(inherit);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvironUpdater {
    pub entry_path: String,
    pub name: String,
    pub value: Option<String>,
}

impl EnvironUpdater {
    pub fn new(entry_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entry_path: entry_path.into(),
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessUpdater {
    pub entry_path: String,
    pub name: String,
    pub permission: Option<Permission>,
}

impl AccessUpdater {
    pub fn new(entry_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entry_path: entry_path.into(),
            name: name.into(),
            permission: None,
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_ordering() {
        assert!(!Permission::Deny.can_read());
        assert!(Permission::Read.can_read());
        assert!(!Permission::Read.can_write());
        assert!(Permission::ReadWrite.can_write());
    }

    #[test]
    fn permission_parse() {
        assert_eq!("rw".parse::<Permission>().unwrap(), Permission::ReadWrite);
        assert_eq!(" r ".parse::<Permission>().unwrap(), Permission::Read);
        assert_eq!("none".parse::<Permission>().unwrap(), Permission::Deny);
        assert!("w".parse::<Permission>().is_err());
    }

    #[test]
    fn permission_serializes_as_mode() {
        let json = serde_json::to_string(&Permission::ReadWrite).unwrap();
        assert_eq!(json, "\"rw\"");
    }

    #[test]
    fn accessor_display_name_falls_back_to_login() {
        let mut a = Accessor {
            id: 1,
            name: "kim@imagvfx.com".into(),
            called: String::new(),
            kind: AccessorKind::User,
        };
        assert_eq!(a.display_name(), "kim@imagvfx.com");
        a.called = "Kim".into();
        assert_eq!(a.display_name(), "Kim");
    }

    #[test]
    fn updater_builders() {
        let upd = PropertyUpdater::new("/show", "status")
            .with_value("wip")
            .with_inherit(true);
        assert_eq!(upd.value.as_deref(), Some("wip"));
        assert_eq!(upd.inherit, Some(true));
    }
}
