//! Connection pool setup and schema.

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        is_superuser BOOLEAN NOT NULL DEFAULT 0,
        signup_date TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS statuses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_on TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_on TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        creator_id INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
        performer_id INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
        status_id INTEGER NOT NULL REFERENCES statuses(id) ON DELETE RESTRICT,
        created_on TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS task_labels (
        task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        label_id INTEGER NOT NULL REFERENCES labels(id) ON DELETE RESTRICT,
        PRIMARY KEY (task_id, label_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_performer ON tasks(performer_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_creator ON tasks(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_task_labels_label ON task_labels(label_id)",
];

/// Opens the pool, creating the database file if needed, and applies the schema.
///
/// An in-memory URL gets a single connection that is never recycled, since every
/// SQLite memory connection is its own database.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options.connect_with(options).await?;
    migrate(&pool).await?;
    info!("database ready at {}", database_url);
    Ok(pool)
}

/// Applies the idempotent schema.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// True when `err` is a UNIQUE constraint failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// True when `err` is a FOREIGN KEY constraint failure.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_foreign_key_violation())
        .unwrap_or(false)
}
