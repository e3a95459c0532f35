//! # Forge Architecture
//!
//! Forge is a **production tracking core**: a single-rooted tree of entries
//! (shows, shots, tasks, ...) carrying typed attributes that flow down the
//! tree, guarded by access rules that flow down the same way. It is a library
//! that happens to have a CLI client.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (crates/forge)                                         │
//! │  - Parses arguments, prints results, exit codes             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - One transaction per call, explicit Caller                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs, search/)                     │
//! │  - Business logic over a Transaction                        │
//! │  - Uses the resolvers (resolve/) and type registry (types/) │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - DataStore trait, snapshot transactions, audit hand-off   │
//! │  - FileStore (production), InMemoryStore (testing)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Inheritance in One Picture
//!
//! ```text
//! /show          fps=24 (inherit)   SHOW=show (environ)   kim: r
//! └── s01        status=wait        SHOT=/show/s01        coord: rw
//!     └── comp   sees fps=24, SHOW, SHOT; kim reads, coord writes
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes Rust values, returns Rust types, and
//! never touches stdout/stderr. Diagnostics go through `tracing`; the host
//! decides where they end up.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Business logic per concern
//! - [`search`]: Query parsing and matching
//! - [`resolve`]: Attribute inheritance and access control
//! - [`types`]: Attribute type registry (validate / evaluate)
//! - [`schema`]: Entry type definitions and defaults
//! - [`store`]: Tables, transactions and storage backends
//! - [`audit`]: Audit sinks
//! - [`model`]: Core data types
//! - [`config`] / [`init`]: Configuration and startup
//! - [`error`]: Error types

pub mod api;
pub mod audit;
pub mod caller;
pub mod commands;
pub mod config;
pub mod error;
pub mod init;
pub mod model;
pub mod paths;
pub mod resolve;
pub mod schema;
pub mod search;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
