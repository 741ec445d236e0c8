//! SQL dialect contract.
//!
//! The ORM talks to every database through a [`Dialect`]: bind variable
//! syntax, identifier quoting, column type derivation and the small pieces of
//! statement syntax that differ between databases. Catalog queries that need a
//! live connection live in [`crate::db::schema`].

pub mod postgres;
pub mod rebind;

pub use postgres::PostgresDialect;

use crate::error::DialectResult;
use crate::models::FieldDescriptor;

/// Database-specific SQL generation.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "postgres").
    fn name(&self) -> &'static str;

    /// Bind variable for the given 1-based parameter index.
    fn bind_var(&self, index: usize) -> String;

    /// Quote an identifier (table name, column name, etc.).
    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quote a possibly schema-qualified name, e.g. `public.idx_users_email`.
    fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Column type for a mapped field.
    ///
    /// Returns [`crate::error::DialectError::UnsupportedType`] when the field's
    /// kind has no column type in this database.
    fn data_type_of(&self, field: &FieldDescriptor) -> DialectResult<String>;

    /// Clause appended to an INSERT to get the generated key back.
    fn last_insert_id_returning_suffix(&self, table: &str, key: &str) -> String;

    /// Whether the driver reports the last inserted id without a RETURNING clause.
    fn supports_last_insert_id(&self) -> bool;

    /// Rewrite `?` placeholders into this dialect's bind variables.
    fn rebind(&self, sql: &str) -> String {
        rebind::rebind_with(sql, |i| self.bind_var(i))
    }

    /// LIMIT/OFFSET clause, empty when neither is set.
    fn limit_and_offset_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut sql = String::new();
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }

    /// Body of an INSERT with no explicit columns.
    fn default_values_sql(&self) -> &'static str {
        "DEFAULT VALUES"
    }

    /// Longest identifier the server keeps, in bytes. `None` means no limit.
    fn max_identifier_len(&self) -> Option<usize> {
        None
    }

    /// Shorten an identifier the way the server would on creation.
    fn fit_identifier(&self, name: &str) -> String {
        match self.max_identifier_len() {
            Some(max) => truncate_identifier(name, max).to_string(),
            None => name.to_string(),
        }
    }

    /// Name for an index or constraint, e.g. `idx_users_email`.
    fn build_key_name(&self, kind: &str, table: &str, fields: &[&str]) -> String {
        let mut parts = Vec::with_capacity(fields.len() + 2);
        parts.push(kind);
        parts.push(table);
        parts.extend_from_slice(fields);
        let name: String = parts
            .join("_")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.fit_identifier(&name)
    }
}

/// Cut `name` to at most `max` bytes without splitting a character.
pub fn truncate_identifier(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
