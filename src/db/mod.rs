//! SQLite persistence for the deposit ledger.
//!
//! This module provides:
//! - Database initialization, pragmas, and idempotent migrations
//! - `Repository`, the sqlx-backed `LedgerStore`

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
