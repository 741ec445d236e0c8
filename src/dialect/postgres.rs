//! PostgreSQL dialect.
//!
//! Maps field kinds to PostgreSQL column types and provides `$n` bind
//! variables. PostgreSQL has no last-insert-id call; generated keys come back
//! through a `RETURNING` clause.

use crate::dialect::Dialect;
use crate::error::{DialectError, DialectResult};
use crate::models::{FieldDescriptor, FieldKind};
use tracing::warn;

/// Strings at least this long are stored as `text` instead of `varchar(n)`.
pub const MAX_VARCHAR_SIZE: usize = 65532;

/// Identifiers longer than this are truncated by the server (`NAMEDATALEN - 1`).
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn bind_var(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn data_type_of(&self, field: &FieldDescriptor) -> DialectResult<String> {
        let tags = &field.tags;
        if let Some(sql_type) = tags.sql_type() {
            return Ok(sql_type.to_string());
        }

        let size = tags.size();
        let sql_type = match field.kind {
            FieldKind::Bool => "boolean".to_string(),
            FieldKind::I8
            | FieldKind::I16
            | FieldKind::I32
            | FieldKind::U8
            | FieldKind::U16
            | FieldKind::U32 => {
                if tags.is_auto_increment() {
                    "serial".to_string()
                } else {
                    "integer".to_string()
                }
            }
            FieldKind::I64 | FieldKind::Isize | FieldKind::U64 | FieldKind::Usize => {
                if tags.is_auto_increment() {
                    "bigserial".to_string()
                } else {
                    "bigint".to_string()
                }
            }
            FieldKind::F32 | FieldKind::F64 => "numeric".to_string(),
            FieldKind::Text => {
                if size > 0 && size < MAX_VARCHAR_SIZE {
                    format!("varchar({})", size)
                } else {
                    "text".to_string()
                }
            }
            FieldKind::Timestamp => "timestamp with time zone".to_string(),
            FieldKind::Hstore => "hstore".to_string(),
            FieldKind::Bytes | FieldKind::ByteArray(_) => "bytea".to_string(),
            FieldKind::Uuid => "uuid".to_string(),
            FieldKind::Unsupported(type_name) => {
                warn!(field = %field.name, type_name, "No postgres column type for field");
                return Err(DialectError::unsupported_type(
                    type_name,
                    field.kind.kind_name(),
                ));
            }
        };

        Ok(sql_type)
    }

    fn last_insert_id_returning_suffix(&self, table: &str, key: &str) -> String {
        format!("RETURNING {}.{}", table, key)
    }

    fn supports_last_insert_id(&self) -> bool {
        false
    }

    fn max_identifier_len(&self) -> Option<usize> {
        Some(MAX_IDENTIFIER_LEN)
    }
}
