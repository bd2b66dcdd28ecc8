//! SQLite storage for the ledger.
//!
//! This module provides:
//! - Database initialization, schema and pragma configuration
//! - The `Repository` with raw SQL for users, rewards, squares and payments

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
