//! Automatic migration of mapped tables.
//!
//! A [`TableDefinition`] lists the fields of a mapped struct. [`Migrator`]
//! compares it with the catalog and issues only the DDL that is missing:
//! the table itself, columns added to the struct later, and tagged indexes.
//! Existing columns are never altered or dropped.

use crate::db::schema::SchemaInspector;
use crate::dialect::{Dialect, PostgresDialect};
use crate::error::{DialectError, DialectResult};
use crate::models::FieldDescriptor;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

/// A mapped table and its fields, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, returning the updated definition.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Fields that map to columns (fields tagged `-` are skipped).
    pub fn columns(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.tags.is_ignored())
    }

    pub fn primary_keys(&self) -> Vec<String> {
        self.columns()
            .filter(|f| f.tags.is_primary_key())
            .map(FieldDescriptor::column_name)
            .collect()
    }

    fn needs_hstore(&self) -> bool {
        self.columns().any(FieldDescriptor::needs_hstore)
    }
}

/// An index derived from `INDEX` / `UNIQUE_INDEX` tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Column definition: quoted name, type and constraints.
pub fn column_definition(dialect: &dyn Dialect, field: &FieldDescriptor) -> DialectResult<String> {
    let tags = &field.tags;
    let mut def = format!(
        "{} {}",
        dialect.quote(&field.column_name()),
        dialect.data_type_of(field)?
    );
    if tags.is_not_null() {
        def.push_str(" NOT NULL");
    }
    if tags.is_unique() {
        def.push_str(" UNIQUE");
    }
    if let Some(default) = tags.default_value() {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    Ok(def)
}

/// `CREATE TABLE` statement for a definition.
pub fn create_table_sql(dialect: &dyn Dialect, table: &TableDefinition) -> DialectResult<String> {
    let mut parts = table
        .columns()
        .map(|f| column_definition(dialect, f))
        .collect::<DialectResult<Vec<_>>>()?;

    if parts.is_empty() {
        return Err(DialectError::invalid_input(format!(
            "Table '{}' has no columns",
            table.name
        )));
    }

    let primary_keys = table.primary_keys();
    if !primary_keys.is_empty() {
        let quoted = primary_keys
            .iter()
            .map(|c| dialect.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("PRIMARY KEY ({})", quoted));
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        dialect.quote(&table.name),
        parts.join(", ")
    ))
}

/// `ALTER TABLE .. ADD COLUMN` statement for one field.
pub fn add_column_sql(
    dialect: &dyn Dialect,
    table: &str,
    field: &FieldDescriptor,
) -> DialectResult<String> {
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        dialect.quote(table),
        column_definition(dialect, field)?
    ))
}

/// `CREATE [UNIQUE] INDEX` statement.
pub fn create_index_sql(dialect: &dyn Dialect, table: &str, index: &IndexSpec) -> String {
    let columns = index
        .columns
        .iter()
        .map(|c| dialect.quote(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        dialect.quote(&index.name),
        dialect.quote(table),
        columns
    )
}

/// Collect tagged indexes.
///
/// Fields naming the same index are combined in declaration order. A tag
/// without a name gets a single-column index named by the dialect. Names are
/// shortened to what the server will actually store.
pub fn index_specs(dialect: &dyn Dialect, table: &TableDefinition) -> Vec<IndexSpec> {
    let mut specs: Vec<IndexSpec> = Vec::new();

    for field in table.columns() {
        let column = field.column_name();
        let tagged = [
            (false, field.tags.index()),
            (true, field.tags.unique_index()),
        ];

        for (unique, names) in tagged {
            let Some(mut names) = names else { continue };
            if names.is_empty() {
                let kind = if unique { "uix" } else { "idx" };
                names.push(dialect.build_key_name(kind, &table.name, &[column.as_str()]));
            }

            for name in names {
                let name = dialect.fit_identifier(&name);
                match specs.iter_mut().find(|s| s.name == name) {
                    Some(spec) => {
                        spec.unique |= unique;
                        spec.columns.push(column.clone());
                    }
                    None => specs.push(IndexSpec {
                        name,
                        unique,
                        columns: vec![column.clone()],
                    }),
                }
            }
        }
    }

    specs
}

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub table: String,
    pub created_table: bool,
    pub added_columns: Vec<String>,
    pub created_indexes: Vec<String>,
    /// Statements in execution order.
    pub statements: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Brings tables in line with their definitions.
pub struct Migrator<'a> {
    pool: &'a PgPool,
    dialect: PostgresDialect,
}

impl<'a> Migrator<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            dialect: PostgresDialect::new(),
        }
    }

    /// Create the table or add its missing columns, then create missing indexes.
    pub async fn auto_migrate(&self, table: &TableDefinition) -> DialectResult<MigrationReport> {
        let mut report = MigrationReport {
            table: table.name.clone(),
            ..Default::default()
        };

        if !SchemaInspector::has_table(self.pool, &table.name).await? {
            if table.needs_hstore() {
                SchemaInspector::ensure_hstore_extension(self.pool).await?;
            }
            let sql = create_table_sql(&self.dialect, table)?;
            self.execute(&sql, &mut report).await?;
            report.created_table = true;
        } else {
            for field in table.columns() {
                let column = field.column_name();
                if SchemaInspector::has_column(self.pool, &table.name, &column).await? {
                    continue;
                }
                if field.needs_hstore() {
                    SchemaInspector::ensure_hstore_extension(self.pool).await?;
                }
                let sql = add_column_sql(&self.dialect, &table.name, field)?;
                self.execute(&sql, &mut report).await?;
                report.added_columns.push(column);
            }
        }

        for index in index_specs(&self.dialect, table) {
            if SchemaInspector::has_index(self.pool, &table.name, &index.name).await? {
                continue;
            }
            let sql = create_index_sql(&self.dialect, &table.name, &index);
            self.execute(&sql, &mut report).await?;
            report.created_indexes.push(index.name);
        }

        info!(
            table = %table.name,
            created_table = report.created_table,
            added_columns = report.added_columns.len(),
            created_indexes = report.created_indexes.len(),
            "Migration finished"
        );
        Ok(report)
    }

    async fn execute(&self, sql: &str, report: &mut MigrationReport) -> DialectResult<()> {
        info!(sql, "Executing migration statement");
        sqlx::query(sql).execute(self.pool).await?;
        report.statements.push(sql.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::Hstore;
    use crate::models::FieldKind;
    use chrono::{DateTime, Utc};

    fn users() -> TableDefinition {
        TableDefinition::new("users")
            .field(FieldDescriptor::of::<i64>("ID").with_tags("primary_key;auto_increment"))
            .field(FieldDescriptor::of::<String>("Email").with_tags("size:255;not null;unique_index"))
            .field(FieldDescriptor::of::<Option<Hstore>>("Attrs"))
            .field(FieldDescriptor::of::<DateTime<Utc>>("CreatedAt").with_tags("default:now()"))
            .field(FieldDescriptor::of::<String>("Password").with_tags("-"))
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&PostgresDialect, &users()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"users\" (\"id\" bigserial, \
             \"email\" varchar(255) NOT NULL, \
             \"attrs\" hstore, \
             \"created_at\" timestamp with time zone DEFAULT now(), \
             PRIMARY KEY (\"id\"))"
        );
    }

    #[test]
    fn test_create_table_without_columns() {
        let table = TableDefinition::new("empty")
            .field(FieldDescriptor::of::<String>("Skip").with_tags("-"));
        let err = create_table_sql(&PostgresDialect, &table).unwrap_err();
        assert!(matches!(err, DialectError::InvalidInput { .. }));
    }

    #[test]
    fn test_create_table_unsupported_field() {
        let table = TableDefinition::new("t")
            .field(FieldDescriptor::new("Meta", FieldKind::Unsupported("Meta")));
        let err = create_table_sql(&PostgresDialect, &table).unwrap_err();
        assert!(matches!(err, DialectError::UnsupportedType { .. }));
    }

    #[test]
    fn test_add_column_sql() {
        let field = FieldDescriptor::of::<bool>("Active").with_tags("not null;default:true");
        assert_eq!(
            add_column_sql(&PostgresDialect, "users", &field).unwrap(),
            r#"ALTER TABLE "users" ADD COLUMN "active" boolean NOT NULL DEFAULT true"#
        );
    }

    #[test]
    fn test_index_specs() {
        let table = TableDefinition::new("people")
            .field(FieldDescriptor::of::<String>("FirstName").with_tags("index:idx_name"))
            .field(FieldDescriptor::of::<String>("LastName").with_tags("index:idx_name"))
            .field(FieldDescriptor::of::<String>("Email").with_tags("unique_index"));

        let specs = index_specs(&PostgresDialect, &table);
        assert_eq!(
            specs,
            vec![
                IndexSpec {
                    name: "idx_name".to_string(),
                    unique: false,
                    columns: vec!["first_name".to_string(), "last_name".to_string()],
                },
                IndexSpec {
                    name: "uix_people_email".to_string(),
                    unique: true,
                    columns: vec!["email".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_create_index_sql() {
        let spec = IndexSpec {
            name: "uix_people_email".to_string(),
            unique: true,
            columns: vec!["email".to_string()],
        };
        assert_eq!(
            create_index_sql(&PostgresDialect, "people", &spec),
            r#"CREATE UNIQUE INDEX "uix_people_email" ON "people" ("email")"#
        );
    }

    #[test]
    fn test_needs_hstore() {
        assert!(users().needs_hstore());
        let plain = TableDefinition::new("t").field(FieldDescriptor::of::<i32>("N"));
        assert!(!plain.needs_hstore());

        let overridden = TableDefinition::new("t")
            .field(FieldDescriptor::of::<String>("Attrs").with_tags("type:hstore"));
        assert!(overridden.needs_hstore());
        let as_text = TableDefinition::new("t")
            .field(FieldDescriptor::of::<Hstore>("Attrs").with_tags("type:text"));
        assert!(!as_text.needs_hstore());
    }

    #[test]
    fn test_index_specs_long_names_truncated() {
        let table = TableDefinition::new("customer_order_line_item_archive_entries")
            .field(FieldDescriptor::of::<String>("ExternalReferenceCode").with_tags("index"))
            .field(FieldDescriptor::of::<String>("Note").with_tags(
                "index:idx_customer_order_line_item_archive_entries_note_and_more_text_extra",
            ));

        let names: Vec<String> = index_specs(&PostgresDialect, &table)
            .into_iter()
            .map(|spec| spec.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "idx_customer_order_line_item_archive_entries_external_reference",
                "idx_customer_order_line_item_archive_entries_note_and_more_text",
            ]
        );
        assert!(names.iter().all(|n| n.len() <= 63));
    }
}
