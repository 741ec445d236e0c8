//! Schema introspection module.
//!
//! Existence checks the ORM runs before migrating: indexes, tables, columns and
//! foreign keys, plus the DDL statements that go with them.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule. Every check is a
//! `count(*)` against `pg_catalog` or `information_schema` bound with `$n`
//! parameters; any count above zero means the object exists.

use crate::dialect::{Dialect, PostgresDialect};
use crate::error::DialectResult;
use sqlx::{PgPool, Postgres};
use tracing::{debug, info};

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Check whether `index` exists on `table`.
    pub async fn has_index(pool: &PgPool, table: &str, index: &str) -> DialectResult<bool> {
        let count = count(pool, queries::HAS_INDEX, &[table, index]).await?;
        debug!(table, index, exists = count > 0, "Checked index");
        Ok(count > 0)
    }

    /// Drop an index by name. `schema.index` names are accepted.
    pub async fn remove_index(pool: &PgPool, index: &str) -> DialectResult<()> {
        let sql = drop_index_sql(&PostgresDialect, index);
        sqlx::query(&sql).execute(pool).await?;
        info!(index, "Dropped index");
        Ok(())
    }

    /// Check whether a base table (not a view) named `table` exists.
    pub async fn has_table(pool: &PgPool, table: &str) -> DialectResult<bool> {
        let count = count(pool, queries::HAS_TABLE, &[table]).await?;
        debug!(table, exists = count > 0, "Checked table");
        Ok(count > 0)
    }

    /// Check whether `table` has a column named `column`.
    pub async fn has_column(pool: &PgPool, table: &str, column: &str) -> DialectResult<bool> {
        let count = count(pool, queries::HAS_COLUMN, &[table, column]).await?;
        debug!(table, column, exists = count > 0, "Checked column");
        Ok(count > 0)
    }

    /// Check whether `table` has a foreign key constraint named `name`.
    pub async fn has_foreign_key(pool: &PgPool, table: &str, name: &str) -> DialectResult<bool> {
        let count = count(pool, queries::HAS_FOREIGN_KEY, &[table, name]).await?;
        debug!(table, name, exists = count > 0, "Checked foreign key");
        Ok(count > 0)
    }

    /// Name of the database the pool is connected to.
    pub async fn current_database(pool: &PgPool) -> DialectResult<String> {
        let name: String = sqlx::query_scalar(queries::CURRENT_DATABASE)
            .fetch_one(pool)
            .await?;
        Ok(name)
    }

    /// Change a column's type.
    pub async fn modify_column(
        pool: &PgPool,
        table: &str,
        column: &str,
        sql_type: &str,
    ) -> DialectResult<()> {
        let sql = modify_column_sql(&PostgresDialect, table, column, sql_type);
        sqlx::query(&sql).execute(pool).await?;
        info!(table, column, sql_type, "Modified column type");
        Ok(())
    }

    /// Install the hstore extension if it is missing.
    pub async fn ensure_hstore_extension(pool: &PgPool) -> DialectResult<()> {
        sqlx::query(queries::CREATE_HSTORE_EXTENSION)
            .execute(pool)
            .await?;
        debug!("Ensured hstore extension");
        Ok(())
    }
}

/// `ALTER TABLE .. ALTER COLUMN .. TYPE ..` for the given dialect.
pub fn drop_index_sql(dialect: &dyn Dialect, index: &str) -> String {
    format!("DROP INDEX {}", dialect.quote_qualified(index))
}

pub fn modify_column_sql(
    dialect: &dyn Dialect,
    table: &str,
    column: &str,
    sql_type: &str,
) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
        dialect.quote(table),
        dialect.quote(column),
        sql_type
    )
}

async fn count(pool: &PgPool, sql: &str, args: &[&str]) -> DialectResult<i64> {
    let mut query = sqlx::query_scalar::<Postgres, i64>(sql);
    for arg in args {
        query = query.bind(*arg);
    }
    Ok(query.fetch_one(pool).await?)
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const HAS_INDEX: &str =
        "SELECT count(*) FROM pg_indexes WHERE tablename = $1 AND indexname = $2";

    pub const HAS_TABLE: &str = "SELECT count(*) FROM INFORMATION_SCHEMA.tables \
         WHERE table_name = $1 AND table_type = 'BASE TABLE'";

    pub const HAS_COLUMN: &str = "SELECT count(*) FROM INFORMATION_SCHEMA.columns \
         WHERE table_name = $1 AND column_name = $2";

    pub const HAS_FOREIGN_KEY: &str = r#"
        SELECT count(con.conname)
        FROM pg_constraint con
        JOIN pg_class rel ON rel.oid = con.conrelid
        WHERE rel.relname = $1
        AND con.conname = $2
        AND con.contype = 'f'
        "#;

    pub const CURRENT_DATABASE: &str = "SELECT CURRENT_DATABASE()";

    pub const CREATE_HSTORE_EXTENSION: &str = "CREATE EXTENSION IF NOT EXISTS hstore";
}
