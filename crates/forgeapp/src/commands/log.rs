//! Audit record queries.
//!
//! Records are matched by entry id, so the history of an entry survives
//! renames of it or its ancestors.

use crate::error::{ForgeError, Result};
use crate::model::{Category, LogRecord};
use crate::paths;
use crate::resolve::access;
use crate::store::Transaction;
use crate::types::{self, ValueContext};

/// Every record of the entry at `path`, oldest first, with raw values.
pub fn find_logs(tx: &Transaction, path: &str) -> Result<Vec<LogRecord>> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    Ok(tx
        .tables()
        .logs()
        .iter()
        .filter(|r| r.entry_id == row.id)
        .cloned()
        .collect())
}

/// Records of one attribute of the entry, values in display form.
pub fn get_logs(tx: &Transaction, path: &str, category: Category, name: &str) -> Result<Vec<LogRecord>> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    let tables = tx.tables();
    let found: Vec<LogRecord> = tables
        .logs()
        .iter()
        .filter(|r| r.entry_id == row.id && r.category == category && r.name == name)
        .map(|r| {
            let mut r = r.clone();
            if matches!(category, Category::Property | Category::Environ) {
                let cx = ValueContext::new(&row.path, tables);
                r.value = match types::evaluate(&r.type_name, &cx, &r.value) {
                    Ok(v) => v,
                    Err(_) => format!("eval error: {}", r.value),
                };
            }
            r
        })
        .collect();
    if found.is_empty() {
        return Err(ForgeError::not_found(format!(
            "{} logs of {} on {}",
            category, name, row.path
        )));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Caller;
    use crate::commands::{entry, property};
    use crate::model::{AuditAction, PropertyUpdater};
    use crate::store::DataStore;
    use crate::test_utils::sample_store;

    #[test]
    fn create_logs_entry_and_defaults() {
        let store = sample_store();
        let logs = store.read(&Caller::system(), |tx| find_logs(tx, "/show/s01")).unwrap();
        assert_eq!(logs[0].action, AuditAction::Create);
        assert_eq!(logs[0].category, Category::Entry);
        assert_eq!(logs[0].user, "system");
        assert!(logs
            .iter()
            .any(|r| r.category == Category::Property && r.name == "status" && r.value == "wait"));
        assert!(logs.iter().any(|r| r.category == Category::Access && r.name == "coord"));
    }

    #[test]
    fn history_survives_rename() {
        let store = sample_store();
        let ada = Caller::new("ada");
        store
            .write(&ada, |tx| {
                property::update(tx, &PropertyUpdater::new("/show/s01", "status").with_value("wip"))
            })
            .unwrap();
        store.write(&ada, |tx| entry::rename(tx, "/show", "film").map(|_| ())).unwrap();
        let logs = store
            .read(&ada, |tx| get_logs(tx, "/film/s01", Category::Property, "status"))
            .unwrap();
        let values: Vec<&str> = logs.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["wait", "wip"]);
        assert_eq!(logs[1].user, "ada");
        // records keep the path at the time of writing
        assert_eq!(logs[1].entry_path, "/show/s01");
    }

    #[test]
    fn user_values_are_evaluated() {
        let store = sample_store();
        store
            .write(&Caller::system(), |tx| {
                property::update(tx, &PropertyUpdater::new("/show", "sup").with_value("kim"))
            })
            .unwrap();
        let logs = store
            .read(&Caller::system(), |tx| get_logs(tx, "/show", Category::Property, "sup"))
            .unwrap();
        assert_eq!(logs.last().unwrap().value, "Kim");
    }

    #[test]
    fn missing_history_is_not_found() {
        let store = sample_store();
        assert!(store
            .read(&Caller::system(), |tx| get_logs(tx, "/show", Category::Environ, "NOPE"))
            .unwrap_err()
            .is_not_found());
    }
}
