//! Talebox Database Layer
//!
//! SQLite storage for collections, tracks and saved listening positions,
//! using sqlx for queries.

pub mod connection;
pub mod migrations;
pub mod queries;

pub use connection::{connect, connect_in_memory, DatabaseConfig, DbPool};
pub use migrations::{current_version, run_migrations, verify_integrity};
