//! Row storage for one snapshot of the whole store.
//!
//! `Tables` is the arena every transaction works on. Entries are keyed by an
//! integer id and carry a parent id. The path and children indexes are
//! derived data, rebuilt by [`Tables::reindex`] after deserialization.
//!
//! Methods here enforce referential constraints only (parent exists, unique
//! path, unique attribute name per entry). Permission checks and audit
//! logging live in the command layer.

use crate::error::{ForgeError, Result};
use crate::model::{
    Accessor, AccessorId, AccessorKind, Entry, EntryId, LogRecord, Permission, UserSetting, ADMIN_GROUP,
    EVERYONE_GROUP, ROOT_TYPE,
};
use crate::paths;
use crate::types::{AccessorLookup, AttrType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRow {
    pub id: EntryId,
    pub parent: Option<EntryId>,
    pub path: String,
    pub type_name: String,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntryRow {
    /// The caller-facing entry, without attached properties.
    pub fn to_entry(&self) -> Entry {
        Entry {
            id: self.id,
            parent: self.parent,
            path: self.path.clone(),
            type_name: self.type_name.clone(),
            archived: self.archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
            properties: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRow {
    pub type_name: AttrType,
    pub value: String,
    pub inherit: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironRow {
    pub type_name: AttrType,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRow {
    pub permission: Permission,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct Index {
    paths: HashMap<String, EntryId>,
    children: HashMap<EntryId, Vec<EntryId>>,
    accessor_names: HashMap<String, AccessorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tables {
    next_id: u64,
    entries: BTreeMap<EntryId, EntryRow>,
    #[serde(default)]
    properties: BTreeMap<EntryId, BTreeMap<String, PropertyRow>>,
    #[serde(default)]
    environs: BTreeMap<EntryId, BTreeMap<String, EnvironRow>>,
    #[serde(default)]
    access: BTreeMap<EntryId, BTreeMap<AccessorId, AccessRow>>,
    #[serde(default)]
    accessors: BTreeMap<AccessorId, Accessor>,
    #[serde(default)]
    members: BTreeMap<AccessorId, Vec<AccessorId>>,
    #[serde(default)]
    logs: Vec<LogRecord>,
    #[serde(default)]
    settings: BTreeMap<AccessorId, UserSetting>,
    #[serde(skip)]
    index: Index,
}

impl Tables {
    /// A fresh store: the root entry plus the `admin` and `everyone` groups.
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        let mut tables = Tables {
            next_id: 1,
            entries: BTreeMap::new(),
            properties: BTreeMap::new(),
            environs: BTreeMap::new(),
            access: BTreeMap::new(),
            accessors: BTreeMap::new(),
            members: BTreeMap::new(),
            logs: Vec::new(),
            settings: BTreeMap::new(),
            index: Index::default(),
        };
        let root = tables.alloc_id();
        tables.entries.insert(
            root,
            EntryRow {
                id: root,
                parent: None,
                path: paths::ROOT.to_string(),
                type_name: ROOT_TYPE.to_string(),
                archived: false,
                created_at: now,
                updated_at: now,
            },
        );
        for (name, called) in [(ADMIN_GROUP, "Admin"), (EVERYONE_GROUP, "Everyone")] {
            let id = tables.alloc_id();
            tables.accessors.insert(
                id,
                Accessor {
                    id,
                    name: name.to_string(),
                    called: called.to_string(),
                    kind: AccessorKind::Group,
                },
            );
        }
        tables.reindex();
        tables
    }

    /// Rebuilds the derived indexes. Children keep creation (id) order.
    pub fn reindex(&mut self) {
        let mut index = Index::default();
        for (id, row) in &self.entries {
            index.paths.insert(row.path.clone(), *id);
            if let Some(parent) = row.parent {
                index.children.entry(parent).or_default().push(*id);
            }
        }
        for (id, a) in &self.accessors {
            index.accessor_names.insert(a.name.clone(), *id);
        }
        self.index = index;
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // --- Entries ---

    pub fn root_id(&self) -> Result<EntryId> {
        self.entry_id(paths::ROOT)
            .ok_or_else(|| ForgeError::Store("root entry missing".to_string()))
    }

    pub fn entry_id(&self, path: &str) -> Option<EntryId> {
        self.index.paths.get(path).copied()
    }

    pub fn entry(&self, id: EntryId) -> Option<&EntryRow> {
        self.entries.get(&id)
    }

    pub fn entry_by_path(&self, path: &str) -> Option<&EntryRow> {
        self.entry_id(path).and_then(|id| self.entries.get(&id))
    }

    pub fn children(&self, id: EntryId) -> &[EntryId] {
        self.index
            .children
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// The entry itself followed by each ancestor up to the root.
    pub fn lineage(&self, id: EntryId) -> Lineage<'_> {
        Lineage {
            tables: self,
            next: self.entries.get(&id).map(|e| e.id),
        }
    }

    /// Every entry below `id`, parents before children.
    pub fn descendants(&self, id: EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut stack: Vec<EntryId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn insert_entry(
        &mut self,
        parent: EntryId,
        name: &str,
        type_name: &str,
        now: DateTime<Utc>,
    ) -> Result<EntryId> {
        let parent_path = self
            .entry(parent)
            .map(|p| p.path.clone())
            .ok_or_else(|| ForgeError::not_found(format!("parent entry {}", parent)))?;
        let path = paths::child(&parent_path, name);
        if self.index.paths.contains_key(&path) {
            return Err(ForgeError::conflict(format!("entry exists: {}", path)));
        }
        let id = self.alloc_id();
        self.entries.insert(
            id,
            EntryRow {
                id,
                parent: Some(parent),
                path: path.clone(),
                type_name: type_name.to_string(),
                archived: false,
                created_at: now,
                updated_at: now,
            },
        );
        self.index.paths.insert(path, id);
        self.index.children.entry(parent).or_default().push(id);
        Ok(id)
    }

    /// Renames `id` and rewrites the path prefix of every descendant.
    /// Returns the new path.
    pub fn rename_entry(&mut self, id: EntryId, new_name: &str, now: DateTime<Utc>) -> Result<String> {
        let row = self
            .entry(id)
            .ok_or_else(|| ForgeError::not_found(format!("entry {}", id)))?;
        let parent = row
            .parent
            .ok_or_else(|| ForgeError::invalid("cannot rename root entry"))?;
        let old_path = row.path.clone();
        let parent_path = self
            .entry(parent)
            .map(|p| p.path.clone())
            .ok_or_else(|| ForgeError::Store(format!("dangling parent of {}", old_path)))?;
        let new_path = paths::child(&parent_path, new_name);
        if new_path == old_path {
            return Ok(new_path);
        }
        if self.index.paths.contains_key(&new_path) {
            return Err(ForgeError::conflict(format!(
                "rename target path already exists: {}",
                new_path
            )));
        }
        let mut moved = vec![id];
        moved.extend(self.descendants(id));
        for eid in moved {
            if let Some(e) = self.entries.get_mut(&eid) {
                let rewritten = format!("{}{}", new_path, &e.path[old_path.len()..]);
                self.index.paths.remove(&e.path);
                self.index.paths.insert(rewritten.clone(), eid);
                e.path = rewritten;
                if eid == id {
                    e.updated_at = now;
                }
            }
        }
        Ok(new_path)
    }

    /// Removes a childless entry with everything it owns.
    pub fn remove_entry(&mut self, id: EntryId) -> Result<EntryRow> {
        if !self.children(id).is_empty() {
            let path = self.entry(id).map(|e| e.path.as_str()).unwrap_or_default();
            return Err(ForgeError::conflict(format!(
                "entry shouldn't have sub entries: {}",
                path
            )));
        }
        let row = self
            .entries
            .remove(&id)
            .ok_or_else(|| ForgeError::not_found(format!("entry {}", id)))?;
        if row.parent.is_none() {
            self.entries.insert(id, row);
            return Err(ForgeError::invalid("cannot delete root entry"));
        }
        self.properties.remove(&id);
        self.environs.remove(&id);
        self.access.remove(&id);
        self.index.paths.remove(&row.path);
        if let Some(parent) = row.parent {
            if let Some(siblings) = self.index.children.get_mut(&parent) {
                siblings.retain(|c| *c != id);
            }
        }
        self.index.children.remove(&id);
        Ok(row)
    }

    pub fn set_archived(&mut self, id: EntryId, archived: bool, now: DateTime<Utc>) -> Result<()> {
        let row = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| ForgeError::not_found(format!("entry {}", id)))?;
        row.archived = archived;
        row.updated_at = now;
        Ok(())
    }

    /// True when the entry or one of its ancestors is archived.
    pub fn is_archived(&self, id: EntryId) -> bool {
        self.lineage(id).any(|e| e.archived)
    }

    pub fn touch(&mut self, id: EntryId, now: DateTime<Utc>) {
        if let Some(row) = self.entries.get_mut(&id) {
            row.updated_at = now;
        }
    }

    // --- Properties ---

    pub fn properties_of(&self, id: EntryId) -> impl Iterator<Item = (&String, &PropertyRow)> {
        self.properties.get(&id).into_iter().flat_map(|m| m.iter())
    }

    pub fn property(&self, id: EntryId, name: &str) -> Option<&PropertyRow> {
        self.properties.get(&id).and_then(|m| m.get(name))
    }

    pub fn property_mut(&mut self, id: EntryId, name: &str) -> Option<&mut PropertyRow> {
        self.properties.get_mut(&id).and_then(|m| m.get_mut(name))
    }

    pub fn insert_property(&mut self, id: EntryId, name: &str, row: PropertyRow) -> Result<()> {
        let map = self.properties.entry(id).or_default();
        if map.contains_key(name) {
            return Err(ForgeError::conflict(format!("property exists: {}", name)));
        }
        map.insert(name.to_string(), row);
        Ok(())
    }

    pub fn remove_property(&mut self, id: EntryId, name: &str) -> Option<PropertyRow> {
        self.properties.get_mut(&id).and_then(|m| m.remove(name))
    }

    // --- Environs ---

    pub fn environs_of(&self, id: EntryId) -> impl Iterator<Item = (&String, &EnvironRow)> {
        self.environs.get(&id).into_iter().flat_map(|m| m.iter())
    }

    pub fn environ(&self, id: EntryId, name: &str) -> Option<&EnvironRow> {
        self.environs.get(&id).and_then(|m| m.get(name))
    }

    pub fn environ_mut(&mut self, id: EntryId, name: &str) -> Option<&mut EnvironRow> {
        self.environs.get_mut(&id).and_then(|m| m.get_mut(name))
    }

    pub fn insert_environ(&mut self, id: EntryId, name: &str, row: EnvironRow) -> Result<()> {
        let map = self.environs.entry(id).or_default();
        if map.contains_key(name) {
            return Err(ForgeError::conflict(format!("environ exists: {}", name)));
        }
        map.insert(name.to_string(), row);
        Ok(())
    }

    pub fn remove_environ(&mut self, id: EntryId, name: &str) -> Option<EnvironRow> {
        self.environs.get_mut(&id).and_then(|m| m.remove(name))
    }

    // --- Access ---

    pub fn access_of(&self, id: EntryId) -> impl Iterator<Item = (&AccessorId, &AccessRow)> {
        self.access.get(&id).into_iter().flat_map(|m| m.iter())
    }

    pub fn access_rule(&self, id: EntryId, accessor: AccessorId) -> Option<&AccessRow> {
        self.access.get(&id).and_then(|m| m.get(&accessor))
    }

    pub fn access_rule_mut(&mut self, id: EntryId, accessor: AccessorId) -> Option<&mut AccessRow> {
        self.access.get_mut(&id).and_then(|m| m.get_mut(&accessor))
    }

    pub fn insert_access(&mut self, id: EntryId, accessor: AccessorId, row: AccessRow) -> Result<()> {
        let map = self.access.entry(id).or_default();
        if map.contains_key(&accessor) {
            return Err(ForgeError::conflict(format!(
                "access control exists for accessor {}",
                accessor
            )));
        }
        map.insert(accessor, row);
        Ok(())
    }

    pub fn remove_access(&mut self, id: EntryId, accessor: AccessorId) -> Option<AccessRow> {
        self.access.get_mut(&id).and_then(|m| m.remove(&accessor))
    }

    // --- Accessors ---

    pub fn accessors(&self) -> impl Iterator<Item = &Accessor> {
        self.accessors.values()
    }

    pub fn accessor_mut(&mut self, id: AccessorId) -> Option<&mut Accessor> {
        self.accessors.get_mut(&id)
    }

    pub fn user_count(&self) -> usize {
        self.accessors.values().filter(|a| !a.is_group()).count()
    }

    pub fn insert_accessor(&mut self, name: &str, called: &str, kind: AccessorKind) -> Result<AccessorId> {
        if self.index.accessor_names.contains_key(name) {
            return Err(ForgeError::conflict(format!("accessor exists: {}", name)));
        }
        let id = self.alloc_id();
        self.accessors.insert(
            id,
            Accessor {
                id,
                name: name.to_string(),
                called: called.to_string(),
                kind,
            },
        );
        self.index.accessor_names.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn rename_accessor(&mut self, id: AccessorId, new_name: &str) -> Result<()> {
        if self.index.accessor_names.contains_key(new_name) {
            return Err(ForgeError::conflict(format!("accessor exists: {}", new_name)));
        }
        let accessor = self
            .accessors
            .get_mut(&id)
            .ok_or_else(|| ForgeError::not_found(format!("accessor {}", id)))?;
        self.index.accessor_names.remove(&accessor.name);
        accessor.name = new_name.to_string();
        self.index.accessor_names.insert(new_name.to_string(), id);
        Ok(())
    }

    // --- Members ---

    pub fn members_of(&self, group: AccessorId) -> &[AccessorId] {
        self.members.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn groups_of(&self, user: AccessorId) -> impl Iterator<Item = AccessorId> + '_ {
        self.members
            .iter()
            .filter(move |(_, users)| users.contains(&user))
            .map(|(group, _)| *group)
    }

    pub fn is_member(&self, group: AccessorId, user: AccessorId) -> bool {
        self.members_of(group).contains(&user)
    }

    pub fn add_member(&mut self, group: AccessorId, user: AccessorId) -> Result<()> {
        let users = self.members.entry(group).or_default();
        if users.contains(&user) {
            return Err(ForgeError::conflict("already a member of the group"));
        }
        users.push(user);
        Ok(())
    }

    pub fn remove_member(&mut self, group: AccessorId, user: AccessorId) -> Result<()> {
        let users = self.members.entry(group).or_default();
        let before = users.len();
        users.retain(|u| *u != user);
        if users.len() == before {
            return Err(ForgeError::not_found("group member"));
        }
        Ok(())
    }

    // --- Logs & Settings ---

    pub fn push_log(&mut self, mut record: LogRecord) -> LogRecord {
        record.id = self.alloc_id();
        self.logs.push(record.clone());
        record
    }

    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    pub fn setting(&self, user: AccessorId) -> UserSetting {
        self.settings.get(&user).cloned().unwrap_or_default()
    }

    pub fn setting_mut(&mut self, user: AccessorId) -> &mut UserSetting {
        self.settings.entry(user).or_default()
    }
}

impl AccessorLookup for Tables {
    fn accessor_by_name(&self, name: &str) -> Option<&Accessor> {
        self.index
            .accessor_names
            .get(name)
            .and_then(|id| self.accessors.get(id))
    }

    fn accessor_by_id(&self, id: AccessorId) -> Option<&Accessor> {
        self.accessors.get(&id)
    }
}

pub struct Lineage<'a> {
    tables: &'a Tables,
    next: Option<EntryId>,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a EntryRow;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.tables.entries.get(&self.next?)?;
        self.next = row.parent;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Tables, EntryId, EntryId, EntryId) {
        let now = Utc::now();
        let mut t = Tables::bootstrap(now);
        let root = t.root_id().unwrap();
        let show = t.insert_entry(root, "show", "show", now).unwrap();
        let s01 = t.insert_entry(show, "s01", "shot", now).unwrap();
        let comp = t.insert_entry(s01, "comp", "task", now).unwrap();
        (t, show, s01, comp)
    }

    #[test]
    fn bootstrap_has_root_and_groups() {
        let t = Tables::bootstrap(Utc::now());
        assert_eq!(t.entry_by_path("/").unwrap().type_name, ROOT_TYPE);
        assert!(t.accessor_by_name(ADMIN_GROUP).unwrap().is_group());
        assert!(t.accessor_by_name(EVERYONE_GROUP).unwrap().is_group());
    }

    #[test]
    fn children_keep_creation_order() {
        let now = Utc::now();
        let (mut t, show, _, _) = tree();
        let b = t.insert_entry(show, "b", "shot", now).unwrap();
        let a = t.insert_entry(show, "a", "shot", now).unwrap();
        let names: Vec<&str> = t
            .children(show)
            .iter()
            .map(|id| t.entry(*id).unwrap().path.as_str())
            .collect();
        assert_eq!(names, vec!["/show/s01", "/show/b", "/show/a"]);
        assert!(b < a);
    }

    #[test]
    fn duplicate_path_conflicts() {
        let (mut t, show, _, _) = tree();
        assert!(matches!(
            t.insert_entry(show, "s01", "shot", Utc::now()),
            Err(ForgeError::Conflict(_))
        ));
    }

    #[test]
    fn lineage_walks_to_root() {
        let (t, _, _, comp) = tree();
        let paths: Vec<&str> = t.lineage(comp).map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/show/s01/comp", "/show/s01", "/show", "/"]);
    }

    #[test]
    fn rename_rewrites_descendants() {
        let (mut t, show, s01, comp) = tree();
        t.rename_entry(show, "film", Utc::now()).unwrap();
        assert_eq!(t.entry(s01).unwrap().path, "/film/s01");
        assert_eq!(t.entry(comp).unwrap().path, "/film/s01/comp");
        assert_eq!(t.entry_id("/film/s01/comp"), Some(comp));
        assert_eq!(t.entry_id("/show/s01/comp"), None);
    }

    #[test]
    fn rename_does_not_touch_prefix_siblings() {
        let now = Utc::now();
        let (mut t, show, _, _) = tree();
        let root = t.root_id().unwrap();
        let shows = t.insert_entry(root, "shows", "show", now).unwrap();
        t.rename_entry(show, "film", now).unwrap();
        assert_eq!(t.entry(shows).unwrap().path, "/shows");
    }

    #[test]
    fn remove_with_children_conflicts() {
        let (mut t, _, s01, comp) = tree();
        assert!(matches!(t.remove_entry(s01), Err(ForgeError::Conflict(_))));
        t.remove_entry(comp).unwrap();
        t.remove_entry(s01).unwrap();
        assert_eq!(t.entry_id("/show/s01"), None);
    }

    #[test]
    fn descendants_parent_first() {
        let (t, show, s01, comp) = tree();
        assert_eq!(t.descendants(show), vec![s01, comp]);
    }

    #[test]
    fn reindex_after_round_trip() {
        let (t, _, _, comp) = tree();
        let json = serde_json::to_string(&t).unwrap();
        let mut back: Tables = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entry_id("/show/s01/comp"), None);
        back.reindex();
        assert_eq!(back.entry_id("/show/s01/comp"), Some(comp));
        assert!(back.accessor_by_name(ADMIN_GROUP).is_some());
    }
}
