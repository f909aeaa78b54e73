//! Database access layer
//!
//! SQLite metadata for stored recordings.

pub mod recordings;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database file and make sure the schema exists.
pub async fn init_database_pool(db_path: &Path) -> tokwav_common::Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        tokwav_common::config::ensure_directory(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Create tables if missing. Idempotent.
pub async fn init_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            original_path TEXT NOT NULL,
            duration REAL,
            sample_rate INTEGER NOT NULL DEFAULT 22050,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
