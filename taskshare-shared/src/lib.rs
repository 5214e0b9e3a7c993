//! # TaskShare Shared Library
//!
//! Domain types, access-control rules, and storage plumbing shared by the
//! TaskShare API server.
//!
//! ## Module Organization
//!
//! - `models`: users, tasks and collaboration groups
//! - `auth`: identity context, JWT handling, password hashing, role resolution
//! - `store`: the document-store contract and its in-memory/Postgres backends
//! - `db`: Postgres connection pool and migrations backing the document store
//! - `services`: task merging, visibility aggregation, membership consistency
//! - `error`: the core error kinds every operation reports

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::{CoreError, CoreResult};

/// Current version of the TaskShare shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
