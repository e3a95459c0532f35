//! Attribute inheritance: the effective properties and environs of an entry.
//!
//! The walk goes from the entry up to the root. Each level contributes its
//! own declared rows; a name already settled by a closer level is skipped.
//!
//! - Environs always inherit.
//! - Properties: every row counts at the entry itself. At ancestor levels only
//!   `inherit = true` rows are handed down, and a non-inheritable row still
//!   settles its name, so nothing further up leaks past it.
//!
//! Results carry raw stored values plus provenance. Display values are
//! produced on demand by [`to_property`] / [`to_environ`].

use crate::error::Result;
use crate::model::{Entry, EntryId, Environ, Property};
use crate::store::tables::{EntryRow, EnvironRow, PropertyRow};
use crate::store::Transaction;
use crate::types::ValueContext;
use std::collections::{BTreeMap, HashSet};

/// A stored row together with the entry that declared it.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'t, R> {
    pub entry_id: EntryId,
    pub entry_path: &'t str,
    pub name: &'t str,
    pub row: &'t R,
}

pub fn resolve_properties<'t>(
    tx: &'t Transaction,
    entry: EntryId,
    name: Option<&str>,
) -> Result<Vec<Resolved<'t, PropertyRow>>> {
    let tables = tx.tables();
    let mut found: BTreeMap<&'t str, Resolved<'t, PropertyRow>> = BTreeMap::new();
    let mut settled: HashSet<&'t str> = HashSet::new();
    let mut first_level = true;
    for level in tables.lineage(entry) {
        tx.check_cancelled()?;
        for (n, row) in tables.properties_of(level.id) {
            if name.is_some_and(|want| want != n) {
                continue;
            }
            if !settled.insert(n.as_str()) {
                continue;
            }
            if !first_level && !row.inherit {
                continue;
            }
            found.insert(
                n.as_str(),
                Resolved {
                    entry_id: level.id,
                    entry_path: &level.path,
                    name: n,
                    row,
                },
            );
        }
        first_level = false;
    }
    Ok(found.into_values().collect())
}

pub fn resolve_environs<'t>(
    tx: &'t Transaction,
    entry: EntryId,
    name: Option<&str>,
) -> Result<Vec<Resolved<'t, EnvironRow>>> {
    let tables = tx.tables();
    let mut found: BTreeMap<&'t str, Resolved<'t, EnvironRow>> = BTreeMap::new();
    for level in tables.lineage(entry) {
        tx.check_cancelled()?;
        for (n, row) in tables.environs_of(level.id) {
            if name.is_some_and(|want| want != n) {
                continue;
            }
            found.entry(n.as_str()).or_insert(Resolved {
                entry_id: level.id,
                entry_path: &level.path,
                name: n,
                row,
            });
        }
    }
    Ok(found.into_values().collect())
}

pub fn to_property(tx: &Transaction, r: &Resolved<'_, PropertyRow>) -> Result<Property> {
    let cx = ValueContext::new(r.entry_path, tx.tables());
    Ok(Property {
        entry_path: r.entry_path.to_string(),
        name: r.name.to_string(),
        type_name: r.row.type_name,
        value: r.row.type_name.evaluate(&cx, &r.row.value)?,
        raw_value: r.row.value.clone(),
        inherit: r.row.inherit,
        updated_at: r.row.updated_at,
    })
}

pub fn to_environ(tx: &Transaction, r: &Resolved<'_, EnvironRow>) -> Result<Environ> {
    let cx = ValueContext::new(r.entry_path, tx.tables());
    Ok(Environ {
        entry_path: r.entry_path.to_string(),
        name: r.name.to_string(),
        type_name: r.row.type_name,
        value: r.row.type_name.evaluate(&cx, &r.row.value)?,
        raw_value: r.row.value.clone(),
        updated_at: r.row.updated_at,
    })
}

/// Effective properties of `entry`, sorted by name.
pub fn entry_properties(tx: &Transaction, entry: EntryId) -> Result<Vec<Property>> {
    resolve_properties(tx, entry, None)?
        .iter()
        .map(|r| to_property(tx, r))
        .collect()
}

/// Effective environs of `entry`, sorted by name.
pub fn entry_environs(tx: &Transaction, entry: EntryId) -> Result<Vec<Environ>> {
    resolve_environs(tx, entry, None)?
        .iter()
        .map(|r| to_environ(tx, r))
        .collect()
}

/// The caller-facing entry with its effective properties attached.
/// `archived` reports archived ancestors too.
pub fn entry_with_properties(tx: &Transaction, row: &EntryRow) -> Result<Entry> {
    let mut entry = row.to_entry();
    entry.archived = tx.tables().is_archived(row.id);
    for p in entry_properties(tx, row.id)? {
        entry.properties.insert(p.name.clone(), p);
    }
    Ok(entry)
}
