//! Access rule CRUD.
//!
//! Rules are written on one entry and reach its whole subtree; the nearest
//! rule wins (see [`crate::resolve::access`]). Rules declared as defaults of
//! the entry's type may be changed but not removed.

use crate::error::{ForgeError, Result};
use crate::model::{AccessRule, AccessUpdater, AccessorId, AuditAction, Category, EntryId, Permission};
use crate::paths;
use crate::resolve::access;
use crate::schema::has_default_access;
use crate::store::tables::AccessRow;
use crate::store::Transaction;
use crate::types::AccessorLookup;

fn accessor_id(tx: &Transaction, name: &str) -> Result<AccessorId> {
    tx.tables()
        .accessor_by_name(name)
        .map(|a| a.id)
        .ok_or_else(|| ForgeError::not_found(format!("accessor {}", name)))
}

fn rule_of(tx: &Transaction, id: EntryId, accessor: AccessorId) -> Result<AccessRule> {
    let tables = tx.tables();
    let entry = tx.entry_row_by_id(id)?;
    let a = tables
        .accessor_by_id(accessor)
        .ok_or_else(|| ForgeError::not_found(format!("accessor {}", accessor)))?;
    let row = tables
        .access_rule(id, accessor)
        .ok_or_else(|| ForgeError::not_found(format!("access control for {} on {}", a.name, entry.path)))?;
    Ok(AccessRule {
        entry_path: entry.path.clone(),
        accessor: a.name.clone(),
        accessor_kind: a.kind,
        permission: row.permission,
        updated_at: row.updated_at,
    })
}

/// Effective rules of the entry at `path`, one per accessor.
pub fn entry_access_list(tx: &Transaction, path: &str) -> Result<Vec<AccessRule>> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    access::effective_access_list(tx, row.id)
}

/// The rule stored on the entry itself for `name`.
pub fn get(tx: &Transaction, path: &str, name: &str) -> Result<AccessRule> {
    let id = access::readable_entry(tx, &paths::clean(path))?.id;
    let accessor = accessor_id(tx, name)?;
    rule_of(tx, id, accessor)
}

pub fn add(tx: &mut Transaction, path: &str, name: &str, permission: Permission) -> Result<AccessRule> {
    let path = paths::clean(path);
    let id = access::writable_entry(tx, &path)?;
    let accessor = accessor_id(tx, name)?;
    let kind = tx
        .tables()
        .accessor_by_id(accessor)
        .map(|a| a.kind.to_string())
        .unwrap_or_default();
    let now = tx.now();
    let t = tx.tables_mut();
    t.insert_access(
        id,
        accessor,
        AccessRow {
            permission,
            updated_at: now,
        },
    )?;
    t.touch(id, now);
    tx.log(id, AuditAction::Create, Category::Access, name, &kind, permission.as_str())?;
    tracing::info!(path = %path, accessor = %name, permission = %permission, "access granted");
    rule_of(tx, id, accessor)
}

pub fn update(tx: &mut Transaction, upd: &AccessUpdater) -> Result<()> {
    let path = paths::clean(&upd.entry_path);
    let id = access::writable_entry(tx, &path)?;
    let accessor = accessor_id(tx, &upd.name)?;
    let old = rule_of(tx, id, accessor)?;
    let Some(permission) = upd.permission else {
        return Ok(());
    };
    if permission == old.permission {
        return Ok(());
    }
    let now = tx.now();
    let t = tx.tables_mut();
    if let Some(row) = t.access_rule_mut(id, accessor) {
        row.permission = permission;
        row.updated_at = now;
    }
    t.touch(id, now);
    tx.log(
        id,
        AuditAction::Update,
        Category::Access,
        &upd.name,
        &old.accessor_kind.to_string(),
        permission.as_str(),
    )
}

pub fn delete(tx: &mut Transaction, path: &str, name: &str) -> Result<()> {
    let path = paths::clean(path);
    let id = access::writable_entry(tx, &path)?;
    let accessor = accessor_id(tx, name)?;
    let old = rule_of(tx, id, accessor)?;
    let entry_type = tx.entry_row_by_id(id)?.type_name.clone();
    if has_default_access(tx.schema(), &entry_type, name)? {
        return Err(ForgeError::conflict(format!(
            "cannot delete default access control of {}: {}",
            entry_type, name
        )));
    }
    tx.log(id, AuditAction::Delete, Category::Access, name, &old.accessor_kind.to_string(), "")?;
    let now = tx.now();
    let t = tx.tables_mut();
    t.remove_access(id, accessor);
    t.touch(id, now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Caller;
    use crate::commands::entry;
    use crate::store::DataStore;
    use crate::test_utils::sample_store;

    #[test]
    fn deny_blocks_inherited_grant() {
        let store = sample_store();
        let sys = Caller::system();
        store
            .write(&sys, |tx| add(tx, "/show/s02", "kim", Permission::Deny).map(|_| ()))
            .unwrap();
        let kim = Caller::new("kim");
        assert!(store.read(&kim, |tx| entry::get(tx, "/show/s01/comp")).is_ok());
        assert!(store
            .read(&kim, |tx| entry::get(tx, "/show/s02/comp"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn default_rule_cannot_be_deleted() {
        let store = sample_store();
        let sys = Caller::system();
        assert!(matches!(
            store.write(&sys, |tx| delete(tx, "/show/s01", "coord")),
            Err(ForgeError::Conflict(_))
        ));
        store
            .write(&sys, |tx| {
                update(tx, &AccessUpdater::new("/show/s01", "coord").with_permission(Permission::Read))
            })
            .unwrap();
        let rule = store.read(&sys, |tx| get(tx, "/show/s01", "coord")).unwrap();
        assert_eq!(rule.permission, Permission::Read);
        store.write(&sys, |tx| delete(tx, "/show", "kim")).unwrap();
        assert!(store.read(&sys, |tx| get(tx, "/show", "kim")).unwrap_err().is_not_found());
    }

    #[test]
    fn access_list_shows_provenance() {
        let store = sample_store();
        let rules = store
            .read(&Caller::system(), |tx| entry_access_list(tx, "/show/s01/comp"))
            .unwrap();
        let got: Vec<(&str, &str, Permission)> = rules
            .iter()
            .map(|r| (r.accessor.as_str(), r.entry_path.as_str(), r.permission))
            .collect();
        assert_eq!(
            got,
            vec![
                ("coord", "/show/s01", Permission::ReadWrite),
                ("kim", "/show", Permission::Read),
            ]
        );
    }

    #[test]
    fn unknown_accessor_is_not_found() {
        let store = sample_store();
        assert!(store
            .write(&Caller::system(), |tx| add(tx, "/show", "ghost", Permission::Read).map(|_| ()))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn duplicate_rule_conflicts() {
        let store = sample_store();
        assert!(matches!(
            store.write(&Caller::system(), |tx| add(tx, "/show", "kim", Permission::ReadWrite).map(|_| ())),
            Err(ForgeError::Conflict(_))
        ));
    }
}
