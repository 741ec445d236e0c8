//! Data models for mapped fields.
//!
//! This module re-exports the types the dialect uses to describe struct fields.

pub mod field;
pub mod tags;

// Re-export commonly used types
pub use field::{FieldDescriptor, FieldKind, HasFieldKind, to_snake_case};
pub use tags::TagSettings;
