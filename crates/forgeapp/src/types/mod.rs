//! # Attribute Type Registry
//!
//! Every property and environ carries a type name. The type decides two things:
//!
//! - **Validate**: how raw caller input is checked and normalized before it is
//!   stored. Storage only ever holds the validated form.
//! - **Evaluate**: how a stored value is turned back into what a caller sees.
//!
//! The set of types is closed: [`AttrType`] is an enum and unknown names are
//! rejected when parsed, with [`ForgeError::UnknownType`].
//!
//! ## Variants
//!
//! | Type         | Stored form                      | Display form                     |
//! |--------------|----------------------------------|----------------------------------|
//! | `text`       | as given                         | as stored                        |
//! | `user`       | accessor id                      | accessor display name            |
//! | `timecode`   | `hh:mm:ss:ff`                    | as stored                        |
//! | `date`       | `yyyy/mm/dd`                     | as stored                        |
//! | `int`        | base-10 integer                  | as stored                        |
//! | `entry_path` | `.`                              | path of the declaring entry      |
//! | `entry_name` | `.`                              | name of the declaring entry      |
//! | `tag`        | `\nt1\nt2\n` (sorted, unique)    | one tag per line                 |
//! | `search`     | `name|query` lines               | as stored                        |
//! | `entry_link` | `\n/p1\n/p2\n` (sorted, unique)  | one path per line                |
//!
//! Every type accepts the empty string, which means "unset".
//!
//! Validation is idempotent: feeding a validated value back through
//! [`AttrType::validate`] yields the same value.

use crate::error::{ForgeError, Result};
use crate::model::{Accessor, AccessorId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod eval;
mod validate;

pub use validate::DATE_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    Text,
    User,
    Timecode,
    Date,
    Int,
    EntryPath,
    EntryName,
    Tag,
    Search,
    EntryLink,
}

pub const ALL_TYPES: &[AttrType] = &[
    AttrType::Text,
    AttrType::User,
    AttrType::Timecode,
    AttrType::Date,
    AttrType::Int,
    AttrType::EntryPath,
    AttrType::EntryName,
    AttrType::Tag,
    AttrType::Search,
    AttrType::EntryLink,
];

/// Read access to accessors, needed by the `user` type.
pub trait AccessorLookup {
    fn accessor_by_name(&self, name: &str) -> Option<&Accessor>;
    fn accessor_by_id(&self, id: AccessorId) -> Option<&Accessor>;
}

/// What a validator or evaluator may look at besides the value itself.
pub struct ValueContext<'a> {
    /// Path of the entry that declares the value.
    pub entry_path: &'a str,
    pub accessors: &'a dyn AccessorLookup,
}

impl<'a> ValueContext<'a> {
    pub fn new(entry_path: &'a str, accessors: &'a dyn AccessorLookup) -> Self {
        Self {
            entry_path,
            accessors,
        }
    }
}

impl AttrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrType::Text => "text",
            AttrType::User => "user",
            AttrType::Timecode => "timecode",
            AttrType::Date => "date",
            AttrType::Int => "int",
            AttrType::EntryPath => "entry_path",
            AttrType::EntryName => "entry_name",
            AttrType::Tag => "tag",
            AttrType::Search => "search",
            AttrType::EntryLink => "entry_link",
        }
    }

    /// Values whose stored form is a newline-delimited set.
    pub fn is_line_set(&self) -> bool {
        matches!(self, AttrType::Tag | AttrType::EntryLink)
    }

    /// Checks and normalizes raw input. `old` is the currently stored value,
    /// used by types that accept edits relative to it (`date`, `tag`,
    /// `entry_link`).
    pub fn validate(&self, cx: &ValueContext<'_>, input: &str, old: Option<&str>) -> Result<String> {
        let input = input.trim().replace("\r\n", "\n");
        if input.is_empty() {
            return Ok(String::new());
        }
        match self {
            AttrType::Text => Ok(input),
            AttrType::User => validate::user(cx, &input),
            AttrType::Timecode => validate::timecode(&input),
            AttrType::Date => validate::date(&input, old),
            AttrType::Int => validate::int(&input),
            AttrType::EntryPath | AttrType::EntryName => validate::entry_ref(&input),
            AttrType::Tag => Ok(validate::line_set(&input, old, validate::clean_tag)),
            AttrType::Search => validate::search(&input),
            AttrType::EntryLink => Ok(validate::line_set(&input, old, validate::clean_link)),
        }
    }

    /// Turns a stored value into its display form.
    pub fn evaluate(&self, cx: &ValueContext<'_>, stored: &str) -> Result<String> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        match self {
            AttrType::Text | AttrType::Search => Ok(stored.to_string()),
            AttrType::User => eval::user(cx, stored),
            AttrType::Timecode => eval::timecode(stored),
            AttrType::Date => eval::date(stored),
            AttrType::Int => eval::int(stored),
            AttrType::EntryPath => eval::entry_path(cx, stored),
            AttrType::EntryName => eval::entry_name(cx, stored),
            AttrType::Tag | AttrType::EntryLink => Ok(eval::line_set(stored)),
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttrType {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        ALL_TYPES
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| ForgeError::UnknownType(format!("attribute type {:?}", s)))
    }
}

/// Validates by type name. Unknown names fail with `UnknownType`.
pub fn validate(type_name: &str, cx: &ValueContext<'_>, input: &str, old: Option<&str>) -> Result<String> {
    type_name.parse::<AttrType>()?.validate(cx, input, old)
}

/// Evaluates by type name. Unknown names fail with `UnknownType`.
pub fn evaluate(type_name: &str, cx: &ValueContext<'_>, stored: &str) -> Result<String> {
    type_name.parse::<AttrType>()?.evaluate(cx, stored)
}
