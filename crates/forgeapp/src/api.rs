//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for forge operations, whatever the client.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Opens a transaction** per call, read-only or writing
//! - **Dispatches** to the command function inside it
//! - **Commits** on success; any error drops the transaction, so nothing of a
//!   failed call is persisted
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **Retry**: a [`ForgeError::TxConflict`](crate::error::ForgeError::TxConflict)
//!   is returned as is
//! - **Presentation**: returns data structures, not strings
//!
//! ## Caller Identity
//!
//! Every method takes the [`Caller`] explicitly. There is no session state in
//! the facade, so one `ForgeApi` can serve many users at once.
//!
//! ## Generic Over DataStore
//!
//! `ForgeApi<S: DataStore>` is generic over the storage backend:
//! - Production: `ForgeApi<FileStore>`
//! - Testing: `ForgeApi<InMemoryStore>`

use crate::caller::Caller;
use crate::commands::{access, accessor, entry, environ, log, property, setting};
use crate::error::Result;
use crate::model::{
    AccessRule, AccessUpdater, Accessor, Category, Entry, Environ, EnvironUpdater, LogRecord, Member,
    Permission, Property, PropertyUpdater, UserSetting,
};
use crate::search::{self, EntrySearch};
use crate::store::DataStore;
use crate::types::AttrType;

pub struct ForgeApi<S: DataStore> {
    store: S,
}

impl<S: DataStore> ForgeApi<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Entries ---

    pub fn get_entry(&self, caller: &Caller, path: &str) -> Result<Entry> {
        self.store.read(caller, |tx| entry::get(tx, path))
    }

    pub fn find_entries(&self, caller: &Caller, parent_path: &str) -> Result<Vec<Entry>> {
        self.store.read(caller, |tx| entry::find(tx, parent_path))
    }

    pub fn count_all_sub_entries(&self, caller: &Caller, path: &str) -> Result<usize> {
        self.store.read(caller, |tx| entry::count_all_sub_entries(tx, path))
    }

    pub fn add_entry(&self, caller: &Caller, parent_path: &str, name: &str, entry_type: &str) -> Result<Entry> {
        self.store
            .write(caller, |tx| entry::create(tx, parent_path, name, entry_type))
    }

    pub fn rename_entry(&self, caller: &Caller, path: &str, new_name: &str) -> Result<Entry> {
        self.store.write(caller, |tx| entry::rename(tx, path, new_name))
    }

    pub fn delete_entry(&self, caller: &Caller, path: &str) -> Result<()> {
        self.store.write(caller, |tx| entry::delete(tx, path))
    }

    pub fn delete_entry_recursive(&self, caller: &Caller, path: &str) -> Result<()> {
        self.store.write(caller, |tx| entry::delete_recursive(tx, path))
    }

    pub fn archive_entry(&self, caller: &Caller, path: &str) -> Result<()> {
        self.store.write(caller, |tx| entry::archive(tx, path))
    }

    pub fn unarchive_entry(&self, caller: &Caller, path: &str) -> Result<()> {
        self.store.write(caller, |tx| entry::unarchive(tx, path))
    }

    // --- Search ---

    pub fn search_entries(&self, caller: &Caller, root: &str, query: &str) -> Result<Vec<Entry>> {
        let search = EntrySearch::new(root, query);
        self.store
            .read(caller, |tx| search::search_entries(tx, &search))
    }

    pub fn run_saved_search(
        &self,
        caller: &Caller,
        path: &str,
        property: &str,
        search_name: &str,
    ) -> Result<Vec<Entry>> {
        self.store.read(caller, |tx| {
            search::run_saved_search(tx, path, property, search_name)
        })
    }

    // --- Properties ---

    pub fn entry_properties(&self, caller: &Caller, path: &str) -> Result<Vec<Property>> {
        self.store.read(caller, |tx| property::entry_properties(tx, path))
    }

    pub fn get_property(&self, caller: &Caller, path: &str, name: &str) -> Result<Property> {
        self.store.read(caller, |tx| property::get(tx, path, name))
    }

    pub fn add_property(
        &self,
        caller: &Caller,
        path: &str,
        name: &str,
        type_name: Option<AttrType>,
        value: &str,
        inherit: Option<bool>,
    ) -> Result<Property> {
        self.store.write(caller, |tx| {
            property::add(tx, path, name, type_name, value, inherit)
        })
    }

    pub fn update_property(&self, caller: &Caller, upd: PropertyUpdater) -> Result<()> {
        self.store.write(caller, |tx| property::update(tx, &upd))
    }

    pub fn update_properties(&self, caller: &Caller, updaters: &[PropertyUpdater]) -> Result<()> {
        self.store.write(caller, |tx| property::update_many(tx, updaters))
    }

    pub fn delete_property(&self, caller: &Caller, path: &str, name: &str) -> Result<()> {
        self.store.write(caller, |tx| property::delete(tx, path, name))
    }

    // --- Environs ---

    pub fn entry_environs(&self, caller: &Caller, path: &str) -> Result<Vec<Environ>> {
        self.store.read(caller, |tx| environ::entry_environs(tx, path))
    }

    pub fn get_environ(&self, caller: &Caller, path: &str, name: &str) -> Result<Environ> {
        self.store.read(caller, |tx| environ::get(tx, path, name))
    }

    pub fn add_environ(
        &self,
        caller: &Caller,
        path: &str,
        name: &str,
        type_name: AttrType,
        value: &str,
    ) -> Result<Environ> {
        self.store
            .write(caller, |tx| environ::add(tx, path, name, type_name, value))
    }

    pub fn update_environ(&self, caller: &Caller, upd: EnvironUpdater) -> Result<()> {
        self.store.write(caller, |tx| environ::update(tx, &upd))
    }

    pub fn delete_environ(&self, caller: &Caller, path: &str, name: &str) -> Result<()> {
        self.store.write(caller, |tx| environ::delete(tx, path, name))
    }

    // --- Access ---

    pub fn entry_access_list(&self, caller: &Caller, path: &str) -> Result<Vec<AccessRule>> {
        self.store.read(caller, |tx| access::entry_access_list(tx, path))
    }

    pub fn get_access(&self, caller: &Caller, path: &str, name: &str) -> Result<AccessRule> {
        self.store.read(caller, |tx| access::get(tx, path, name))
    }

    pub fn add_access(&self, caller: &Caller, path: &str, name: &str, permission: Permission) -> Result<AccessRule> {
        self.store
            .write(caller, |tx| access::add(tx, path, name, permission))
    }

    pub fn update_access(&self, caller: &Caller, upd: AccessUpdater) -> Result<()> {
        self.store.write(caller, |tx| access::update(tx, &upd))
    }

    pub fn delete_access(&self, caller: &Caller, path: &str, name: &str) -> Result<()> {
        self.store.write(caller, |tx| access::delete(tx, path, name))
    }

    // --- Accessors ---

    pub fn add_user(&self, caller: &Caller, name: &str, called: &str) -> Result<Accessor> {
        self.store.write(caller, |tx| accessor::add_user(tx, name, called))
    }

    pub fn get_user(&self, caller: &Caller, name: &str) -> Result<Accessor> {
        self.store.read(caller, |tx| accessor::get_user(tx, name))
    }

    pub fn find_users(&self, caller: &Caller) -> Result<Vec<Accessor>> {
        self.store.read(caller, |tx| Ok(accessor::find_users(tx)))
    }

    pub fn update_user_called(&self, caller: &Caller, name: &str, called: &str) -> Result<()> {
        self.store
            .write(caller, |tx| accessor::update_user_called(tx, name, called))
    }

    pub fn whoami(&self, caller: &Caller) -> Result<Accessor> {
        self.store.read(caller, accessor::whoami)
    }

    pub fn add_group(&self, caller: &Caller, name: &str, called: &str) -> Result<Accessor> {
        self.store.write(caller, |tx| accessor::add_group(tx, name, called))
    }

    pub fn get_group(&self, caller: &Caller, name: &str) -> Result<Accessor> {
        self.store.read(caller, |tx| accessor::get_group(tx, name))
    }

    pub fn find_groups(&self, caller: &Caller) -> Result<Vec<Accessor>> {
        self.store.read(caller, |tx| Ok(accessor::find_groups(tx)))
    }

    pub fn rename_group(&self, caller: &Caller, name: &str, new_name: &str) -> Result<()> {
        self.store
            .write(caller, |tx| accessor::rename_group(tx, name, new_name))
    }

    pub fn add_group_member(&self, caller: &Caller, group: &str, member: &str) -> Result<()> {
        self.store
            .write(caller, |tx| accessor::add_group_member(tx, group, member))
    }

    pub fn delete_group_member(&self, caller: &Caller, group: &str, member: &str) -> Result<()> {
        self.store
            .write(caller, |tx| accessor::delete_group_member(tx, group, member))
    }

    pub fn find_group_members(&self, caller: &Caller, group: &str) -> Result<Vec<Member>> {
        self.store
            .read(caller, |tx| accessor::find_group_members(tx, group))
    }

    // --- Logs & Settings ---

    pub fn find_logs(&self, caller: &Caller, path: &str) -> Result<Vec<LogRecord>> {
        self.store.read(caller, |tx| log::find_logs(tx, path))
    }

    pub fn get_logs(&self, caller: &Caller, path: &str, category: Category, name: &str) -> Result<Vec<LogRecord>> {
        self.store
            .read(caller, |tx| log::get_logs(tx, path, category, name))
    }

    pub fn user_setting(&self, caller: &Caller) -> Result<UserSetting> {
        self.store.read(caller, setting::get_setting)
    }

    pub fn set_show_archived(&self, caller: &Caller, show: bool) -> Result<()> {
        self.store
            .write(caller, |tx| setting::set_show_archived(tx, show))
    }
}
