//! # Command Layer
//!
//! This module holds the **business logic** of forge. Every operation is a
//! plain function over a [`Transaction`]: read operations take `&Transaction`,
//! mutations take `&mut Transaction`. The API facade opens and commits the
//! transaction around each call, so one command is one atomic unit.
//!
//! ## What Commands Do
//!
//! - Resolve paths and enforce access (read failures are `NotFound`, write
//!   failures are `PermissionDenied`)
//! - Validate values through the type registry before anything is stored
//! - Append an audit record for every mutation, through [`Transaction::log`]
//! - Return domain types ([`Entry`], [`Property`](crate::model::Property), ...)
//!
//! ## What Commands Do NOT Do
//!
//! - Open or commit transactions
//! - Any I/O or presentation
//! - Retry on transaction conflicts
//!
//! ## Testing Strategy
//!
//! Command tests run against `InMemoryStore` with the sample schema from
//! [`crate::test_utils`].
//!
//! ## Command Modules
//!
//! - [`entry`]: lookup, listing, create with defaults, rename, delete, archive
//! - [`property`]: property CRUD and effective properties
//! - [`environ`]: environ CRUD and effective environs
//! - [`access`]: access rule CRUD and the effective access list
//! - [`accessor`]: users, groups and group members
//! - [`log`]: audit record queries
//! - [`setting`]: per-user settings

use crate::error::{ForgeError, Result};
use crate::model::AccessorId;
use crate::store::Transaction;
use crate::types::AccessorLookup;

pub mod access;
pub mod accessor;
pub mod entry;
pub mod environ;
pub mod log;
pub mod property;
pub mod setting;

/// Accessor id of the calling user. Fails for callers that are not
/// registered users, like `system`.
pub(crate) fn caller_id(tx: &Transaction) -> Result<AccessorId> {
    let user = tx.caller().user();
    tx.tables()
        .accessor_by_name(user)
        .filter(|a| !a.is_group())
        .map(|a| a.id)
        .ok_or_else(|| ForgeError::invalid(format!("caller is not a registered user: {}", user)))
}
