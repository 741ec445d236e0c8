//! PostgreSQL dialect adapter.
//!
//! This library translates an ORM's field model into PostgreSQL column types
//! and bind variables, runs the catalog checks migrations depend on, and maps
//! the `hstore` extension type.

pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::{Hstore, SchemaInspector};
pub use dialect::{Dialect, PostgresDialect};
pub use error::{DialectError, DialectResult};
