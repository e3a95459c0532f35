//! # Resolvers
//!
//! Everything an entry "has" is resolved by walking the ancestor chain inside
//! one transaction snapshot:
//!
//! - [`inherit`]: effective properties and environs, with provenance.
//! - [`access`]: the read/write gate and the effective access list.
//!
//! Both walks are plain loops over the entry arena following parent ids. The
//! tree is never cyclic, since an entry can only be created under one that
//! already exists.

pub mod access;
pub mod inherit;
