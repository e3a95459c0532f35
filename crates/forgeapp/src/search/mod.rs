//! # Search
//!
//! A search is a root path plus a whitespace separated query string:
//!
//! ```text
//! type=shot status:wip,done !assignee= comp.status=done due<@today+7 lighting
//! ```
//!
//! | Token              | Meaning                                                    |
//! |--------------------|------------------------------------------------------------|
//! | `term`             | path glob, or any non-hidden property value contains term  |
//! | `key=v`            | property `key` is exactly `v`                              |
//! | `key:v`            | property `key` contains `v` (glob)                         |
//! | `key!=v`, `!key=v` | property `key` exists and is not `v`                       |
//! | `key<v` ... `>=`   | ordering; dates compare as padded `yyyy/mm/dd`             |
//! | `sub.key=v`        | direct sub-entry `sub` has `key=v`; selects the parent     |
//! | `(sub).key=v`      | any direct sub-entry has `key=v`; selects the parent       |
//! | `path`/`name`/`type` | constrain the entry itself                               |
//!
//! Values split on `,` into alternatives. `@today[+-N]` and `@user` expand
//! before matching.
//!
//! Results are strict descendants of the root, skip archived branches unless
//! the caller may see them, pass the read gate, and carry their effective
//! properties. Unreadable entries are dropped without an error. An empty
//! query returns nothing.

use crate::error::{ForgeError, Result};
use crate::model::Entry;
use crate::paths;
use crate::resolve::{access, inherit};
use crate::store::Transaction;
use crate::types::AttrType;

pub mod compile;
pub mod parse;

pub use compile::{Expander, Filter};
pub use parse::{parse_keyword, Keyword};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySearch {
    pub root: String,
    pub keywords: Vec<String>,
}

impl EntrySearch {
    pub fn new(root: impl Into<String>, query: &str) -> Self {
        Self {
            root: root.into(),
            keywords: query.split_whitespace().map(str::to_string).collect(),
        }
    }
}

pub fn search_entries(tx: &Transaction, search: &EntrySearch) -> Result<Vec<Entry>> {
    let root = paths::clean(&search.root);
    let keywords: Vec<Keyword> = search
        .keywords
        .iter()
        .filter_map(|k| parse_keyword(k))
        .collect();
    if keywords.is_empty() {
        return Ok(Vec::new());
    }
    let tables = tx.tables();
    let root_id = access::readable_entry(tx, &root)?.id;

    let ex = Expander::new(tx.caller().user());
    let filters: Vec<Filter> = keywords
        .iter()
        .map(|kw| compile::compile(kw, &root, &ex))
        .collect();
    let show_archived = access::archived_visible(tx);

    let mut found = Vec::new();
    for id in tables.descendants(root_id) {
        tx.check_cancelled()?;
        let Some(row) = tables.entry(id) else {
            continue;
        };
        if !show_archived && tables.is_archived(id) {
            continue;
        }
        if !filters.iter().all(|f| f.matches(tables, row)) {
            continue;
        }
        if !access::can_read(tx, id)? {
            continue;
        }
        found.push(row);
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(
        root = %root,
        keywords = keywords.len(),
        results = found.len(),
        "search"
    );

    found
        .into_iter()
        .map(|row| inherit::entry_with_properties(tx, row))
        .collect()
}

/// Runs the query saved as `search_name` in the `search`-typed property
/// `property` of the entry at `path`, rooted at that entry. The property may
/// be inherited.
pub fn run_saved_search(tx: &Transaction, path: &str, property: &str, search_name: &str) -> Result<Vec<Entry>> {
    let row = access::readable_entry(tx, &paths::clean(path))?;
    let resolved = inherit::resolve_properties(tx, row.id, Some(property))?;
    let prop = resolved
        .first()
        .ok_or_else(|| ForgeError::not_found(format!("property {} of {}", property, row.path)))?;
    if prop.row.type_name != AttrType::Search {
        return Err(ForgeError::invalid(format!(
            "property {} is not a search: {}",
            property, prop.row.type_name
        )));
    }
    let query = prop
        .row
        .value
        .lines()
        .filter_map(|line| line.split_once('|'))
        .find(|(name, _)| *name == search_name)
        .map(|(_, query)| query)
        .ok_or_else(|| ForgeError::not_found(format!("saved search {} in {}", search_name, property)))?;
    search_entries(tx, &EntrySearch::new(row.path.clone(), query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Caller;
    use crate::model::{AccessorKind, Permission};
    use crate::schema::TypeSchema;
    use crate::store::tables::{AccessRow, PropertyRow};
    use crate::store::{DataStore, InMemoryStore};
    use crate::types::AttrType;
    use std::sync::Arc;

    struct Tree {
        store: InMemoryStore,
    }

    impl Tree {
        // /show
        //   s01 (shot, status=wip)   comp (task, status=done)
        //   s02 (shot, status=blocked)
        //   s03 (shot)
        //   t01 (task, status=wip)
        fn new() -> Self {
            let store = InMemoryStore::in_memory(Arc::new(TypeSchema::new()));
            store
                .write(&Caller::system(), |tx| {
                    let now = tx.now();
                    let t = tx.tables_mut();
                    let root = t.root_id()?;
                    let show = t.insert_entry(root, "show", "show", now)?;
                    t.insert_entry(show, "s01", "shot", now)?;
                    t.insert_entry(show, "s02", "shot", now)?;
                    t.insert_entry(show, "s03", "shot", now)?;
                    t.insert_entry(show, "t01", "task", now)?;
                    let s01 = t.entry_id("/show/s01").unwrap();
                    t.insert_entry(s01, "comp", "task", now)?;
                    let kim = t.insert_accessor("kim", "Kim Lee", AccessorKind::User)?;
                    t.insert_access(
                        show,
                        kim,
                        AccessRow {
                            permission: Permission::Read,
                            updated_at: now,
                        },
                    )?;
                    Ok(())
                })
                .unwrap();
            let tree = Self { store };
            tree.set("/show/s01", "status", AttrType::Text, "wip");
            tree.set("/show/s02", "status", AttrType::Text, "blocked");
            tree.set("/show/t01", "status", AttrType::Text, "wip");
            tree.set("/show/s01/comp", "status", AttrType::Text, "done");
            tree
        }

        fn set(&self, path: &str, name: &str, type_name: AttrType, value: &str) {
            self.store
                .write(&Caller::system(), |tx| {
                    let id = tx.entry_row(path)?.id;
                    let now = tx.now();
                    let t = tx.tables_mut();
                    t.remove_property(id, name);
                    t.insert_property(
                        id,
                        name,
                        PropertyRow {
                            type_name,
                            value: value.to_string(),
                            inherit: false,
                            updated_at: now,
                        },
                    )
                })
                .unwrap();
        }

        fn search_as(&self, user: &str, root: &str, query: &str) -> Vec<String> {
            self.store
                .read(&Caller::new(user), |tx| {
                    search_entries(tx, &EntrySearch::new(root, query))
                })
                .unwrap()
                .into_iter()
                .map(|e| e.path)
                .collect()
        }

        fn search(&self, query: &str) -> Vec<String> {
            self.search_as("system", "/", query)
        }
    }

    #[test]
    fn type_and_property_alternatives() {
        let t = Tree::new();
        assert_eq!(t.search("type=shot status:wip,done"), vec!["/show/s01"]);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let t = Tree::new();
        assert!(t.search("   ").is_empty());
    }

    #[test]
    fn negation_requires_the_property() {
        let t = Tree::new();
        assert_eq!(t.search("type=shot status!=wip"), vec!["/show/s02"]);
        assert_eq!(t.search("type=shot !status=wip"), vec!["/show/s02"]);
    }

    #[test]
    fn dotted_key_selects_parent() {
        let t = Tree::new();
        assert_eq!(t.search("comp.status=done"), vec!["/show/s01"]);
        assert_eq!(t.search("(sub).status=done"), vec!["/show/s01"]);
        assert!(t.search("comp.status=wip").is_empty());
    }

    #[test]
    fn bare_term_matches_path_or_value() {
        let t = Tree::new();
        assert_eq!(t.search("blocked"), vec!["/show/s02"]);
        assert_eq!(t.search("comp"), vec!["/show/s01/comp"]);
        assert_eq!(
            t.search("/show/s0"),
            vec!["/show/s01", "/show/s01/comp", "/show/s02", "/show/s03"]
        );
    }

    #[test]
    fn results_are_scoped_under_root() {
        let t = Tree::new();
        assert_eq!(t.search_as("system", "/show/s01", "status:done"), vec!["/show/s01/comp"]);
        assert!(t.search_as("system", "/show/s01", "type=shot").is_empty());
    }

    #[test]
    fn unreadable_entries_are_dropped() {
        let t = Tree::new();
        assert_eq!(t.search_as("kim", "/", "type=shot status=wip"), vec!["/show/s01"]);
        assert!(t.search_as("nobody", "/", "type=shot").is_empty());
    }

    #[test]
    fn unreadable_root_looks_missing() {
        let t = Tree::new();
        t.store
            .write(&Caller::system(), |tx| {
                let root = tx.tables().root_id()?;
                let now = tx.now();
                tx.tables_mut().insert_entry(root, "secret", "show", now)?;
                Ok(())
            })
            .unwrap();
        t.set("/secret", "shots", AttrType::Search, "all|type=shot");

        let kim = Caller::new("kim");
        let search_err = |root: &str| {
            t.store
                .read(&kim, |tx| search_entries(tx, &EntrySearch::new(root, "type=shot")))
                .unwrap_err()
        };
        let hidden = search_err("/secret");
        let missing = search_err("/nope");
        assert!(hidden.is_not_found());
        assert!(missing.is_not_found());
        assert_eq!(hidden.user_message(), missing.user_message());

        let saved = t
            .store
            .read(&kim, |tx| run_saved_search(tx, "/secret", "shots", "all"))
            .unwrap_err();
        assert!(saved.is_not_found());
        assert_eq!(t.search_as("system", "/secret", "type=shot"), Vec::<String>::new());
    }

    #[test]
    fn tag_exact_matches_one_line() {
        let t = Tree::new();
        t.set("/show/s01", "tags", AttrType::Tag, "\nhero\nfx\n");
        t.set("/show/s02", "tags", AttrType::Tag, "\nheroic\n");
        assert_eq!(t.search("tags=hero"), vec!["/show/s01"]);
        assert_eq!(t.search("tags:hero"), vec!["/show/s01", "/show/s02"]);
    }

    #[test]
    fn user_values_match_by_name() {
        let t = Tree::new();
        let kim = t
            .store
            .read(&Caller::system(), |tx| {
                Ok(crate::types::AccessorLookup::accessor_by_name(tx.tables(), "kim")
                    .map(|a| a.id)
                    .unwrap())
            })
            .unwrap();
        t.set("/show/s02", "assignee", AttrType::User, &kim.to_string());
        assert_eq!(t.search("assignee=kim"), vec!["/show/s02"]);
        assert_eq!(t.search("assignee:Lee"), vec!["/show/s02"]);
        assert_eq!(t.search_as("kim", "/", "assignee=@user"), vec!["/show/s02"]);
    }

    #[test]
    fn date_ordering() {
        let t = Tree::new();
        t.set("/show/s01", "due", AttrType::Date, "2024/03/15");
        t.set("/show/s02", "due", AttrType::Date, "2024/04/02");
        t.set("/show/s03", "due", AttrType::Date, "");
        assert_eq!(t.search("due<2024/04"), vec!["/show/s01"]);
        assert_eq!(t.search("due>=2024/04"), vec!["/show/s02"]);
        assert_eq!(t.search("due<=2024/04"), vec!["/show/s01", "/show/s02"]);
    }

    #[test]
    fn name_and_path_keys() {
        let t = Tree::new();
        assert_eq!(t.search("name=s0?"), vec!["/show/s01", "/show/s02", "/show/s03"]);
        assert_eq!(t.search("type=shot !name:2"), vec!["/show/s01", "/show/s03"]);
        assert_eq!(t.search("path=/show/t01"), vec!["/show/t01"]);
    }

    #[test]
    fn results_carry_effective_properties() {
        let t = Tree::new();
        let found = t
            .store
            .read(&Caller::system(), |tx| {
                search_entries(tx, &EntrySearch::new("/", "status=blocked"))
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].properties["status"].value, "blocked");
    }

    #[test]
    fn saved_search_runs_under_its_entry() {
        let t = Tree::new();
        t.set("/show", "shots", AttrType::Search, "wip|type=shot status=wip\nall|type=shot");
        let run = |name: &str| -> Result<Vec<String>> {
            t.store.read(&Caller::system(), |tx| {
                Ok(run_saved_search(tx, "/show", "shots", name)?
                    .into_iter()
                    .map(|e| e.path)
                    .collect())
            })
        };
        assert_eq!(run("wip").unwrap(), vec!["/show/s01"]);
        assert_eq!(run("all").unwrap().len(), 3);
        assert!(run("none").unwrap_err().is_not_found());
    }

    #[test]
    fn saved_search_needs_search_property() {
        let t = Tree::new();
        let err = t
            .store
            .read(&Caller::system(), |tx| run_saved_search(tx, "/show/s01", "status", "x"))
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidInput(_)));
    }
}
