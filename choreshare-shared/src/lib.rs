//! # ChoreShare Shared Library
//!
//! Data model, permission model and persistence shared by the ChoreShare
//! services.
//!
//! ## Module Organization
//!
//! - `models`: groups, roles, memberships, chores and their IDs
//! - `auth`: permission checks against a member's SuperRole
//! - `repository`: storage traits with PostgreSQL and in-memory backends
//! - `db`: connection pool and migrations
//! - `error`: storage error type
//! - `telemetry`: tracing subscriber setup

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod telemetry;

pub use error::{StorageError, StorageResult};

/// Current version of the ChoreShare shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
