//! Access control: who may read or write an entry.
//!
//! Rules are looked up walking from the entry towards the root. The first
//! entry holding a rule that applies to the caller decides; within one entry a
//! rule naming the user beats rules naming one of the user's groups, and among
//! several matching groups the most permissive rule applies. No applicable
//! rule anywhere means no access.
//!
//! Admins (members of `admin`, and the built-in `system` caller) always pass.
//! The root entry is readable by everyone.

use crate::error::{ForgeError, Result};
use crate::model::{AccessRule, AccessorId, EntryId, Permission, ADMIN_GROUP, EVERYONE_GROUP};
use crate::store::tables::{EntryRow, Tables};
use crate::store::Transaction;
use crate::types::AccessorLookup;
use std::collections::BTreeMap;

/// Who the caller is, in accessor terms.
struct Identity {
    user: Option<AccessorId>,
    groups: Vec<AccessorId>,
    admin: bool,
}

fn identity(tx: &Transaction) -> Identity {
    let tables = tx.tables();
    let caller = tx.caller();
    let user = tables
        .accessor_by_name(caller.user())
        .filter(|a| !a.is_group())
        .map(|a| a.id);
    let mut groups = Vec::new();
    if let Some(uid) = user {
        groups.extend(tables.groups_of(uid));
        if let Some(everyone) = tables.accessor_by_name(EVERYONE_GROUP) {
            groups.push(everyone.id);
        }
    }
    let admin = caller.is_system()
        || match (user, tables.accessor_by_name(ADMIN_GROUP)) {
            (Some(uid), Some(admin)) => tables.is_member(admin.id, uid),
            _ => false,
        };
    Identity { user, groups, admin }
}

pub fn is_admin(tx: &Transaction) -> bool {
    identity(tx).admin
}

/// Whether listings and search include archived branches for this caller:
/// only admins that turned `show_archived` on.
pub fn archived_visible(tx: &Transaction) -> bool {
    let who = identity(tx);
    who.admin
        && who
            .user
            .is_some_and(|uid| tx.tables().setting(uid).show_archived)
}

/// Permission of the caller on `entry`, or `None` when no rule applies.
pub fn access_mode(tx: &Transaction, entry: EntryId) -> Result<Option<Permission>> {
    let who = identity(tx);
    if who.admin {
        return Ok(Some(Permission::ReadWrite));
    }
    let user = match who.user {
        Some(u) => u,
        None => return Ok(None),
    };
    let tables = tx.tables();
    for row in tables.lineage(entry) {
        tx.check_cancelled()?;
        if let Some(rule) = tables.access_rule(row.id, user) {
            return Ok(Some(rule.permission));
        }
        let best = tables
            .access_of(row.id)
            .filter(|(accessor, _)| who.groups.contains(accessor))
            .map(|(_, rule)| rule.permission)
            .max();
        if best.is_some() {
            return Ok(best);
        }
    }
    Ok(None)
}

pub fn can_read(tx: &Transaction, entry: EntryId) -> Result<bool> {
    if tx.tables().entry(entry).map(|e| e.parent.is_none()) == Some(true) {
        return Ok(true);
    }
    Ok(access_mode(tx, entry)?.is_some_and(|p| p.can_read()))
}

pub fn can_write(tx: &Transaction, entry: EntryId) -> Result<bool> {
    Ok(access_mode(tx, entry)?.is_some_and(|p| p.can_write()))
}

/// Resolves `path` for reading. Missing and unreadable entries give the same
/// `NotFound`.
pub fn readable_entry<'t>(tx: &'t Transaction, path: &str) -> Result<&'t EntryRow> {
    let row = tx.entry_row(path)?;
    if !can_read(tx, row.id)? {
        return Err(ForgeError::not_found(format!("entry {}", path)));
    }
    Ok(row)
}

/// Resolves `path` for writing. A missing entry is `NotFound`, an existing
/// one without write access is `PermissionDenied`.
pub fn writable_entry(tx: &Transaction, path: &str) -> Result<EntryId> {
    let id = tx.entry_row(path)?.id;
    ensure_write(tx, id)?;
    Ok(id)
}

pub fn ensure_write(tx: &Transaction, entry: EntryId) -> Result<()> {
    if !can_write(tx, entry)? {
        let path = tx.entry_row_by_id(entry)?.path.clone();
        return Err(ForgeError::denied(format!(
            "{} cannot modify {}",
            tx.caller().user(),
            path
        )));
    }
    Ok(())
}

pub fn ensure_admin(tx: &Transaction) -> Result<()> {
    if !is_admin(tx) {
        return Err(ForgeError::denied(format!(
            "{} is not an admin",
            tx.caller().user()
        )));
    }
    Ok(())
}

/// One rule per accessor, the nearest entry winning, sorted by accessor name.
pub fn effective_access_list(tx: &Transaction, entry: EntryId) -> Result<Vec<AccessRule>> {
    let tables: &Tables = tx.tables();
    let mut seen: BTreeMap<String, AccessRule> = BTreeMap::new();
    for row in tables.lineage(entry) {
        tx.check_cancelled()?;
        for (accessor_id, rule) in tables.access_of(row.id) {
            let accessor = match tables.accessor_by_id(*accessor_id) {
                Some(a) => a,
                None => continue,
            };
            seen.entry(accessor.name.clone()).or_insert_with(|| AccessRule {
                entry_path: row.path.clone(),
                accessor: accessor.name.clone(),
                accessor_kind: accessor.kind,
                permission: rule.permission,
                updated_at: rule.updated_at,
            });
        }
    }
    Ok(seen.into_values().collect())
}
