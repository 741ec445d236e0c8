//! Integration tests for PostgreSQL SQL generation.
//!
//! Tests verify that:
//! - A mapped struct's fields produce the expected column types
//! - Unsupported field types are rejected instead of guessed
//! - `?` placeholders become `$n` bind variables
//! - Migration DDL is assembled from field tags

use chrono::{DateTime, Utc};
use pg_dialect::db::migrate::{create_table_sql, index_specs};
use pg_dialect::db::{Hstore, TableDefinition};
use pg_dialect::dialect::{Dialect, PostgresDialect};
use pg_dialect::error::DialectError;
use pg_dialect::models::{FieldDescriptor, FieldKind};

/// Fields of a typical `Product` model.
fn product_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::of::<u64>("ID").with_tags("primary_key;auto_increment"),
        FieldDescriptor::of::<String>("Code").with_tags("size:32;not null;unique_index"),
        FieldDescriptor::of::<String>("Description"),
        FieldDescriptor::of::<f64>("Price"),
        FieldDescriptor::of::<u32>("Stock").with_tags("default:0"),
        FieldDescriptor::of::<bool>("Active"),
        FieldDescriptor::of::<Option<Hstore>>("Attributes"),
        FieldDescriptor::of::<Vec<u8>>("Thumbnail"),
        FieldDescriptor::of::<uuid::Uuid>("ExternalID"),
        FieldDescriptor::of::<DateTime<Utc>>("CreatedAt"),
        FieldDescriptor::of::<Option<DateTime<Utc>>>("DeletedAt").with_tags("index"),
    ]
}

#[test]
fn test_product_column_types() {
    let dialect = PostgresDialect::new();
    let types: Vec<(String, String)> = product_fields()
        .iter()
        .map(|f| (f.column_name(), dialect.data_type_of(f).unwrap()))
        .collect();

    let expected = [
        ("id", "bigserial"),
        ("code", "varchar(32)"),
        ("description", "text"),
        ("price", "numeric"),
        ("stock", "integer"),
        ("active", "boolean"),
        ("attributes", "hstore"),
        ("thumbnail", "bytea"),
        ("external_id", "uuid"),
        ("created_at", "timestamp with time zone"),
        ("deleted_at", "timestamp with time zone"),
    ];
    let expected: Vec<(String, String)> = expected
        .iter()
        .map(|(c, t)| (c.to_string(), t.to_string()))
        .collect();

    assert_eq!(types, expected);
}

#[test]
fn test_unsupported_field_rejected() {
    let dialect = PostgresDialect::new();
    let field = FieldDescriptor::of::<serde_json::Value>("Payload");
    let err = dialect.data_type_of(&field).unwrap_err();
    assert!(matches!(err, DialectError::UnsupportedType { .. }));
    assert!(err.to_string().contains("serde_json::Value"));
}

#[test]
fn test_unsupported_field_with_type_tag_allowed() {
    let dialect = PostgresDialect::new();
    let field = FieldDescriptor::new("Payload", FieldKind::Unsupported("Payload"))
        .with_tags("type:jsonb");
    assert_eq!(dialect.data_type_of(&field).unwrap(), "jsonb");
}

#[test]
fn test_rebind_orm_query() {
    let dialect = PostgresDialect::new();
    let sql = "SELECT * FROM \"products\" WHERE code = ? AND note <> 'why?' \
               AND price BETWEEN ? AND ?";
    assert_eq!(
        dialect.rebind(sql),
        "SELECT * FROM \"products\" WHERE code = $1 AND note <> 'why?' \
         AND price BETWEEN $2 AND $3"
    );
}

#[test]
fn test_insert_with_returning() {
    let dialect = PostgresDialect::new();
    let sql = format!(
        "INSERT INTO products {} {}",
        dialect.default_values_sql(),
        dialect.last_insert_id_returning_suffix("products", "id")
    );
    assert_eq!(
        sql,
        "INSERT INTO products DEFAULT VALUES RETURNING products.id"
    );
}

#[test]
fn test_product_create_table() {
    let table = product_fields()
        .into_iter()
        .fold(TableDefinition::new("products"), TableDefinition::field);

    let sql = create_table_sql(&PostgresDialect, &table).unwrap();
    assert!(sql.starts_with("CREATE TABLE \"products\" (\"id\" bigserial, "));
    assert!(sql.contains("\"code\" varchar(32) NOT NULL"));
    assert!(sql.contains("\"stock\" integer DEFAULT 0"));
    assert!(sql.ends_with("PRIMARY KEY (\"id\"))"));

    let names: Vec<String> = index_specs(&PostgresDialect, &table)
        .into_iter()
        .map(|spec| spec.name)
        .collect();
    assert_eq!(names, vec!["uix_products_code", "idx_products_deleted_at"]);
}
