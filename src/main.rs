//! pg-dialect - Main entry point.
//!
//! Prints PostgreSQL column types and rewritten queries offline, and runs the
//! ORM's catalog checks against a live database. Results go to stdout as JSON;
//! logs go to stderr.

use clap::Parser;
use pg_dialect::config::{Command, Config};
use pg_dialect::db::{SchemaInspector, connect};
use pg_dialect::dialect::{Dialect, PostgresDialect};
use pg_dialect::error::{DialectError, DialectResult};
use pg_dialect::models::{FieldDescriptor, FieldKind};
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(&config);

    match run(&config).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!(error = %e, "Command failed");
            let mut body = json!({ "error": e.to_string() });
            if let Some(suggestion) = e.suggestion() {
                body["suggestion"] = json!(suggestion);
            }
            if let Some(code) = e.sql_state() {
                body["sql_state"] = json!(code);
            }
            println!("{}", body);
            std::process::exit(1);
        }
    }
}

async fn run(config: &Config) -> DialectResult<Value> {
    let dialect = PostgresDialect::new();

    if !config.command.needs_database() {
        return run_offline(&dialect, &config.command);
    }

    let db_config = config
        .database_config()
        .map_err(DialectError::invalid_input)?;
    let pool = connect(&db_config).await?;
    debug!(command = ?config.command, "Running catalog command");

    let result = run_catalog(&pool, &config.command).await;
    pool.close().await;
    result
}

fn run_offline(dialect: &PostgresDialect, command: &Command) -> DialectResult<Value> {
    match command {
        Command::TypeOf { kind, tags } => {
            let kind = FieldKind::parse(kind).ok_or_else(|| {
                DialectError::invalid_input(format!("Unknown field kind: {}", kind))
            })?;
            let field = FieldDescriptor::new("field", kind).with_tags(tags);
            let sql_type = dialect.data_type_of(&field)?;
            Ok(json!({ "kind": kind.to_string(), "type": sql_type }))
        }
        Command::Rebind { sql } => Ok(json!({ "sql": dialect.rebind(sql) })),
        other => Err(DialectError::internal(format!(
            "{:?} needs a database connection",
            other
        ))),
    }
}

async fn run_catalog(pool: &PgPool, command: &Command) -> DialectResult<Value> {
    let result = match command {
        Command::HasTable { table } => {
            json!({ "exists": SchemaInspector::has_table(pool, table).await? })
        }
        Command::HasColumn { table, column } => {
            json!({ "exists": SchemaInspector::has_column(pool, table, column).await? })
        }
        Command::HasIndex { table, index } => {
            json!({ "exists": SchemaInspector::has_index(pool, table, index).await? })
        }
        Command::HasForeignKey { table, name } => {
            json!({ "exists": SchemaInspector::has_foreign_key(pool, table, name).await? })
        }
        Command::DropIndex { index } => {
            SchemaInspector::remove_index(pool, index).await?;
            json!({ "dropped": index })
        }
        Command::CurrentDatabase => {
            json!({ "database": SchemaInspector::current_database(pool).await? })
        }
        Command::TypeOf { .. } | Command::Rebind { .. } => {
            return Err(DialectError::internal("offline command reached database path"));
        }
    };
    Ok(result)
}
