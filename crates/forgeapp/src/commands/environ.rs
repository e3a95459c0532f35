//! Environ CRUD. Unlike properties, environs are free-form: the caller picks
//! name and type, and they always inherit.

use crate::error::{ForgeError, Result};
use crate::model::{AuditAction, Category, Environ, EnvironUpdater};
use crate::paths;
use crate::resolve::{access, inherit};
use crate::store::tables::EnvironRow;
use crate::store::Transaction;
use crate::types::{AttrType, ValueContext};

pub fn entry_environs(tx: &Transaction, path: &str) -> Result<Vec<Environ>> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    inherit::entry_environs(tx, row.id)
}

pub fn get(tx: &Transaction, path: &str, name: &str) -> Result<Environ> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    let stored = tx
        .tables()
        .environ(row.id, name)
        .ok_or_else(|| ForgeError::not_found(format!("environ {} of {}", name, row.path)))?;
    let cx = ValueContext::new(&row.path, tx.tables());
    Ok(Environ {
        entry_path: row.path.clone(),
        name: name.to_string(),
        type_name: stored.type_name,
        value: stored.type_name.evaluate(&cx, &stored.value)?,
        raw_value: stored.value.clone(),
        updated_at: stored.updated_at,
    })
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ForgeError::invalid(format!("invalid environ name: {:?}", name)));
    }
    Ok(())
}

pub fn add(tx: &mut Transaction, path: &str, name: &str, type_name: AttrType, value: &str) -> Result<Environ> {
    check_name(name)?;
    let path = paths::clean(path);
    let id = access::writable_entry(tx, &path)?;
    let value = {
        let cx = ValueContext::new(&path, tx.tables());
        type_name.validate(&cx, value, None)?
    };
    let now = tx.now();
    let row = EnvironRow {
        type_name,
        value: value.clone(),
        updated_at: now,
    };
    let t = tx.tables_mut();
    t.insert_environ(id, name, row)?;
    t.touch(id, now);
    tx.log(id, AuditAction::Create, Category::Environ, name, type_name.as_str(), &value)?;
    get(tx, &path, name)
}

pub fn update(tx: &mut Transaction, upd: &EnvironUpdater) -> Result<()> {
    let path = paths::clean(&upd.entry_path);
    let id = access::writable_entry(tx, &path)?;
    let old = tx
        .tables()
        .environ(id, &upd.name)
        .cloned()
        .ok_or_else(|| ForgeError::not_found(format!("environ {} of {}", upd.name, path)))?;
    let Some(input) = &upd.value else {
        return Ok(());
    };
    let value = {
        let cx = ValueContext::new(&path, tx.tables());
        old.type_name.validate(&cx, input, Some(&old.value))?
    };
    if value == old.value {
        return Ok(());
    }
    let now = tx.now();
    let t = tx.tables_mut();
    if let Some(row) = t.environ_mut(id, &upd.name) {
        row.value = value.clone();
        row.updated_at = now;
    }
    t.touch(id, now);
    tx.log(id, AuditAction::Update, Category::Environ, &upd.name, old.type_name.as_str(), &value)
}

pub fn delete(tx: &mut Transaction, path: &str, name: &str) -> Result<()> {
    let path = paths::clean(path);
    let id = access::writable_entry(tx, &path)?;
    let type_name = tx
        .tables()
        .environ(id, name)
        .map(|e| e.type_name)
        .ok_or_else(|| ForgeError::not_found(format!("environ {} of {}", name, path)))?;
    tx.log(id, AuditAction::Delete, Category::Environ, name, type_name.as_str(), "")?;
    let now = tx.now();
    let t = tx.tables_mut();
    t.remove_environ(id, name);
    t.touch(id, now);
    Ok(())
}
