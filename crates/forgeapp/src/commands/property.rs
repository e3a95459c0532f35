//! Property CRUD.
//!
//! A property name is legal on an entry only if the entry's type declares it.
//! The declaration fixes the attribute type and the default `inherit` flag.
//! Values are validated against the currently stored value, so relative input
//! (`+3` on a date, `+tag` on a tag set) works on update.

use crate::error::{ForgeError, Result};
use crate::model::{AuditAction, Category, EntryId, Permission, Property, PropertyUpdater};
use crate::paths;
use crate::resolve::{access, inherit};
use crate::schema::property_decl;
use crate::store::tables::{AccessRow, PropertyRow};
use crate::store::Transaction;
use crate::types::{AccessorLookup, AttrType, ValueContext};

/// Setting this user-typed property also grants the named user `rw`.
pub const ASSIGNEE: &str = "assignee";

/// Effective properties of the entry at `path`, sorted by name.
pub fn entry_properties(tx: &Transaction, path: &str) -> Result<Vec<Property>> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    inherit::entry_properties(tx, row.id)
}

/// The property stored on the entry itself, ignoring inheritance.
pub fn get(tx: &Transaction, path: &str, name: &str) -> Result<Property> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    let stored = tx
        .tables()
        .property(row.id, name)
        .ok_or_else(|| ForgeError::not_found(format!("property {} of {}", name, row.path)))?;
    let cx = ValueContext::new(&row.path, tx.tables());
    Ok(Property {
        entry_path: row.path.clone(),
        name: name.to_string(),
        type_name: stored.type_name,
        value: stored.type_name.evaluate(&cx, &stored.value)?,
        raw_value: stored.value.clone(),
        inherit: stored.inherit,
        updated_at: stored.updated_at,
    })
}

/// Adds a declared property. `type_name` may be left out; when given it
/// must match the declaration. `inherit` defaults to the declaration's flag.
pub fn add(
    tx: &mut Transaction,
    path: &str,
    name: &str,
    type_name: Option<AttrType>,
    value: &str,
    inherit: Option<bool>,
) -> Result<Property> {
    let path = paths::clean(path);
    let id = access::writable_entry(tx, &path)?;
    let entry_type = tx.entry_row_by_id(id)?.type_name.clone();
    let (declared, declared_inherit) = property_decl(tx.schema(), &entry_type, name)?
        .ok_or_else(|| {
            ForgeError::invalid(format!(
                "property {} is not declared for entry type {}",
                name, entry_type
            ))
        })?;
    if let Some(given) = type_name {
        if given != declared {
            return Err(ForgeError::invalid(format!(
                "property {} should be of type {}, got {}",
                name, declared, given
            )));
        }
    }
    let value = {
        let cx = ValueContext::new(&path, tx.tables());
        declared.validate(&cx, value, None)?
    };
    let now = tx.now();
    let row = PropertyRow {
        type_name: declared,
        value: value.clone(),
        inherit: inherit.unwrap_or(declared_inherit),
        updated_at: now,
    };
    let t = tx.tables_mut();
    t.insert_property(id, name, row)?;
    t.touch(id, now);
    tx.log(id, AuditAction::Create, Category::Property, name, declared.as_str(), &value)?;
    if name == ASSIGNEE && declared == AttrType::User {
        grant_assignee(tx, id, &value)?;
    }
    get(tx, &path, name)
}

pub fn update(tx: &mut Transaction, upd: &PropertyUpdater) -> Result<()> {
    let path = paths::clean(&upd.entry_path);
    let id = access::writable_entry(tx, &path)?;
    apply(tx, id, &path, upd)
}

/// Applies several updates to one entry in a single transaction.
pub fn update_many(tx: &mut Transaction, updaters: &[PropertyUpdater]) -> Result<()> {
    let Some(first) = updaters.first() else {
        return Ok(());
    };
    let path = paths::clean(&first.entry_path);
    if let Some(other) = updaters.iter().find(|u| paths::clean(&u.entry_path) != path) {
        return Err(ForgeError::invalid(format!(
            "all updaters should target {}, got {}",
            path, other.entry_path
        )));
    }
    let id = access::writable_entry(tx, &path)?;
    for upd in updaters {
        tx.check_cancelled()?;
        apply(tx, id, &path, upd)?;
    }
    Ok(())
}

fn apply(tx: &mut Transaction, id: EntryId, path: &str, upd: &PropertyUpdater) -> Result<()> {
    let old = tx
        .tables()
        .property(id, &upd.name)
        .cloned()
        .ok_or_else(|| ForgeError::not_found(format!("property {} of {}", upd.name, path)))?;
    let value = match &upd.value {
        Some(input) => {
            let cx = ValueContext::new(path, tx.tables());
            old.type_name.validate(&cx, input, Some(&old.value))?
        }
        None => old.value.clone(),
    };
    let inherit = upd.inherit.unwrap_or(old.inherit);
    if value == old.value && inherit == old.inherit {
        return Ok(());
    }
    let now = tx.now();
    let t = tx.tables_mut();
    if let Some(row) = t.property_mut(id, &upd.name) {
        row.value = value.clone();
        row.inherit = inherit;
        row.updated_at = now;
    }
    t.touch(id, now);
    tx.log(id, AuditAction::Update, Category::Property, &upd.name, old.type_name.as_str(), &value)?;
    if upd.name == ASSIGNEE && old.type_name == AttrType::User && value != old.value {
        grant_assignee(tx, id, &value)?;
    }
    Ok(())
}

fn grant_assignee(tx: &mut Transaction, id: EntryId, stored: &str) -> Result<()> {
    if stored.is_empty() {
        return Ok(());
    }
    let accessor = stored
        .parse::<u64>()
        .ok()
        .and_then(|aid| tx.tables().accessor_by_id(aid))
        .map(|a| (a.id, a.name.clone()))
        .ok_or_else(|| ForgeError::Store(format!("dangling user id: {}", stored)))?;
    let (aid, name) = accessor;
    let now = tx.now();
    let action = match tx.tables().access_rule(id, aid).map(|r| r.permission) {
        Some(Permission::ReadWrite) => return Ok(()),
        Some(_) => {
            if let Some(rule) = tx.tables_mut().access_rule_mut(id, aid) {
                rule.permission = Permission::ReadWrite;
                rule.updated_at = now;
            }
            AuditAction::Update
        }
        None => {
            let row = AccessRow {
                permission: Permission::ReadWrite,
                updated_at: now,
            };
            tx.tables_mut().insert_access(id, aid, row)?;
            AuditAction::Create
        }
    };
    tx.log(id, action, Category::Access, &name, "user", Permission::ReadWrite.as_str())?;
    tracing::debug!(entry = id, user = %name, "assignee granted rw");
    Ok(())
}

pub fn delete(tx: &mut Transaction, path: &str, name: &str) -> Result<()> {
    let path = paths::clean(path);
    let id = access::writable_entry(tx, &path)?;
    let type_name = tx
        .tables()
        .property(id, name)
        .map(|p| p.type_name)
        .ok_or_else(|| ForgeError::not_found(format!("property {} of {}", name, path)))?;
    tx.log(id, AuditAction::Delete, Category::Property, name, type_name.as_str(), "")?;
    let now = tx.now();
    let t = tx.tables_mut();
    t.remove_property(id, name);
    t.touch(id, now);
    Ok(())
}
