//! Entry lookup, listing and structural changes.
//!
//! Create applies the entry type's declared defaults (properties, environs,
//! access rules, then default sub-entries, recursively) inside the same
//! transaction as the entry itself, so a failure anywhere leaves nothing.

use crate::error::{ForgeError, Result};
use crate::model::{AuditAction, Category, Entry, EntryId, ADMIN_GROUP};
use crate::paths;
use crate::resolve::{access, inherit};
use crate::schema::Declaration;
use crate::store::tables::{AccessRow, EnvironRow, PropertyRow};
use crate::store::Transaction;
use crate::types::{AccessorLookup, ValueContext};

/// A readable entry by path, with its effective properties.
pub fn get(tx: &Transaction, path: &str) -> Result<Entry> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    inherit::entry_with_properties(tx, row)
}

/// Readable direct children of `parent_path`, in creation order. Archived
/// branches are left out unless the caller may see them.
pub fn find(tx: &Transaction, parent_path: &str) -> Result<Vec<Entry>> {
    let parent = access::readable_entry(tx, &paths::clean(parent_path))?;
    let show_archived = access::archived_visible(tx);
    let tables = tx.tables();
    let mut out = Vec::new();
    for id in tables.children(parent.id) {
        tx.check_cancelled()?;
        let Some(row) = tables.entry(*id) else {
            continue;
        };
        if !show_archived && tables.is_archived(row.id) {
            continue;
        }
        if !access::can_read(tx, row.id)? {
            continue;
        }
        out.push(inherit::entry_with_properties(tx, row)?);
    }
    Ok(out)
}

/// Number of entries below `path`, at any depth.
pub fn count_all_sub_entries(tx: &Transaction, path: &str) -> Result<usize> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    Ok(tx.tables().descendants(row.id).len())
}

/// Creates `parent_path/name`. An empty `entry_type` is taken from the
/// parent type's sub-entry types when it declares exactly one.
pub fn create(tx: &mut Transaction, parent_path: &str, name: &str, entry_type: &str) -> Result<Entry> {
    let parent_path = paths::clean(parent_path);
    let parent = tx.entry_row(&parent_path)?.id;
    let id = create_under(tx, parent, name, entry_type, &mut Vec::new())?;
    let row = tx.entry_row_by_id(id)?;
    tracing::info!(path = %row.path, entry_type = %row.type_name, user = %tx.caller().user(), "entry created");
    inherit::entry_with_properties(tx, row)
}

/// `expanding` holds the types whose default sub-entries are being created
/// above this call.
fn create_under(
    tx: &mut Transaction,
    parent: EntryId,
    name: &str,
    entry_type: &str,
    expanding: &mut Vec<String>,
) -> Result<EntryId> {
    tx.check_cancelled()?;
    if !paths::is_valid_name(name) {
        return Err(ForgeError::invalid(format!(
            "entry name should only have [A-Za-z0-9_-]: {:?}",
            name
        )));
    }
    access::ensure_write(tx, parent)?;
    let entry_type = resolve_type(tx, parent, entry_type)?;
    let now = tx.now();
    let id = tx.tables_mut().insert_entry(parent, name, &entry_type, now)?;
    let path = tx.entry_row_by_id(id)?.path.clone();
    tx.log(id, AuditAction::Create, Category::Entry, &path, &entry_type, "")?;
    apply_defaults(tx, id, &entry_type, expanding)?;
    Ok(id)
}

fn resolve_type(tx: &Transaction, parent: EntryId, entry_type: &str) -> Result<String> {
    let schema = tx.schema();
    let entry_type = entry_type.trim();
    if !entry_type.is_empty() {
        if !schema.has_type(entry_type)? {
            return Err(ForgeError::UnknownType(format!("entry type {:?}", entry_type)));
        }
        return Ok(entry_type.to_string());
    }
    let parent_type = &tx.entry_row_by_id(parent)?.type_name;
    let mut subs = schema.sub_entry_types_for(parent_type)?;
    match subs.len() {
        1 => Ok(subs.remove(0)),
        0 => Err(ForgeError::invalid(format!(
            "cannot guess entry type: no sub entry type defined for {}",
            parent_type
        ))),
        _ => Err(ForgeError::invalid(format!(
            "cannot guess entry type: multiple sub entry types defined for {}",
            parent_type
        ))),
    }
}

fn apply_defaults(tx: &mut Transaction, id: EntryId, entry_type: &str, expanding: &mut Vec<String>) -> Result<()> {
    if expanding.iter().any(|t| t == entry_type) {
        return Err(ForgeError::invalid(format!(
            "sub entries of type {:?} lead back to itself",
            entry_type
        )));
    }
    expanding.push(entry_type.to_string());
    let decls = tx.schema().defaults_for(entry_type)?;
    let path = tx.entry_row_by_id(id)?.path.clone();
    let now = tx.now();
    for decl in decls {
        match decl {
            Declaration::Property {
                name,
                type_name,
                value,
                inherit,
            } => {
                let value = {
                    let cx = ValueContext::new(&path, tx.tables());
                    type_name.validate(&cx, &value, None)?
                };
                let row = PropertyRow {
                    type_name,
                    value: value.clone(),
                    inherit,
                    updated_at: now,
                };
                tx.tables_mut().insert_property(id, &name, row)?;
                tx.log(id, AuditAction::Create, Category::Property, &name, type_name.as_str(), &value)?;
            }
            Declaration::Environ {
                name,
                type_name,
                value,
            } => {
                let value = {
                    let cx = ValueContext::new(&path, tx.tables());
                    type_name.validate(&cx, &value, None)?
                };
                let row = EnvironRow {
                    type_name,
                    value: value.clone(),
                    updated_at: now,
                };
                tx.tables_mut().insert_environ(id, &name, row)?;
                tx.log(id, AuditAction::Create, Category::Environ, &name, type_name.as_str(), &value)?;
            }
            Declaration::Access { name, permission } => {
                let accessor = tx
                    .tables()
                    .accessor_by_name(&name)
                    .ok_or_else(|| ForgeError::invalid(format!("default access names unknown accessor: {}", name)))?;
                let (accessor_id, kind) = (accessor.id, accessor.kind);
                let row = AccessRow {
                    permission,
                    updated_at: now,
                };
                tx.tables_mut().insert_access(id, accessor_id, row)?;
                tx.log(
                    id,
                    AuditAction::Create,
                    Category::Access,
                    &name,
                    &kind.to_string(),
                    permission.as_str(),
                )?;
            }
            Declaration::SubEntry { name, entry_type } => {
                create_under(tx, id, &name, &entry_type, expanding)?;
            }
        }
    }
    expanding.pop();
    Ok(())
}

/// Renames the entry at `path` to `new_name`, rewriting every descendant's
/// path. Needs write access on the parent.
pub fn rename(tx: &mut Transaction, path: &str, new_name: &str) -> Result<Entry> {
    let path = paths::clean(path);
    if !paths::is_valid_name(new_name) {
        return Err(ForgeError::invalid(format!(
            "entry name should only have [A-Za-z0-9_-]: {:?}",
            new_name
        )));
    }
    let row = tx.entry_row(&path)?;
    let (id, parent) = (row.id, row.parent);
    let parent = parent.ok_or_else(|| ForgeError::invalid("cannot rename root entry"))?;
    access::ensure_write(tx, parent)?;
    let now = tx.now();
    let new_path = tx.tables_mut().rename_entry(id, new_name, now)?;
    if new_path != path {
        tx.log(id, AuditAction::Rename, Category::Entry, new_name, "", &path)?;
        tracing::info!(from = %path, to = %new_path, "entry renamed");
    }
    inherit::entry_with_properties(tx, tx.entry_row_by_id(id)?)
}

/// Deletes a childless entry. Needs write access on the parent.
pub fn delete(tx: &mut Transaction, path: &str) -> Result<()> {
    let path = paths::clean(path);
    let id = tx.entry_row(&path)?.id;
    delete_one(tx, id)
}

/// Deletes the entry and its whole subtree, deepest entries first.
pub fn delete_recursive(tx: &mut Transaction, path: &str) -> Result<()> {
    let path = paths::clean(path);
    let id = tx.entry_row(&path)?.id;
    let mut doomed = tx.tables().descendants(id);
    doomed.reverse();
    doomed.push(id);
    for eid in doomed {
        tx.check_cancelled()?;
        delete_one(tx, eid)?;
    }
    tracing::info!(path = %path, "entry tree deleted");
    Ok(())
}

fn delete_one(tx: &mut Transaction, id: EntryId) -> Result<()> {
    let row = tx.entry_row_by_id(id)?;
    let (path, type_name) = (row.path.clone(), row.type_name.clone());
    let parent = row
        .parent
        .ok_or_else(|| ForgeError::invalid("cannot delete root entry"))?;
    access::ensure_write(tx, parent)?;
    if !tx.tables().children(id).is_empty() {
        return Err(ForgeError::conflict(format!(
            "entry shouldn't have sub entries: {}",
            path
        )));
    }
    tx.log(id, AuditAction::Delete, Category::Entry, &path, &type_name, "")?;
    tx.tables_mut().remove_entry(id)?;
    Ok(())
}

pub fn archive(tx: &mut Transaction, path: &str) -> Result<()> {
    set_archived(tx, path, true)
}

pub fn unarchive(tx: &mut Transaction, path: &str) -> Result<()> {
    set_archived(tx, path, false)
}

/// Archiving is an admin operation on root branches (`/show`) only.
fn set_archived(tx: &mut Transaction, path: &str, archived: bool) -> Result<()> {
    if !access::is_admin(tx) {
        return Err(ForgeError::denied(format!(
            "{} is not a member of {}",
            tx.caller().user(),
            ADMIN_GROUP
        )));
    }
    let path = paths::clean(path);
    if paths::depth(&path) != 1 {
        return Err(ForgeError::invalid(format!(
            "archive applies only to root branches: {}",
            path
        )));
    }
    let id = tx.entry_row(&path)?.id;
    let now = tx.now();
    tx.tables_mut().set_archived(id, archived, now)?;
    let action = if archived {
        AuditAction::Archive
    } else {
        AuditAction::Unarchive
    };
    tx.log(id, action, Category::Entry, &path, "", "")
}
