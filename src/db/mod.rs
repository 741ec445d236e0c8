//! Database access layer.
//!
//! This module provides everything that talks to a live PostgreSQL server:
//! - Connection pool creation
//! - Catalog introspection (index/table/column existence)
//! - Automatic migration of mapped tables
//! - The `hstore` column type

pub mod migrate;
pub mod pool;
pub mod schema;
pub mod types;

pub use migrate::{IndexSpec, MigrationReport, Migrator, TableDefinition};
pub use pool::connect;
pub use schema::SchemaInspector;
pub use types::Hstore;
