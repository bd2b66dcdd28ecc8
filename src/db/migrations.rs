//! SQLite initialization for the ledger backend.
//!
//! The schema is versioned through `PRAGMA user_version`: each entry of
//! [`MIGRATIONS`] runs once, in its own transaction, and bumps the version
//! in that same transaction.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Ordered schema steps; the version after step `i` is `i + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("ledger tables", include_str!("schema.sql")),
    (
        "investment audit index",
        "CREATE INDEX IF NOT EXISTS idx_investment_conversions_user \
         ON investment_conversions(user_id, recorded_at)",
    ),
];

/// Writers queue behind each other for this long before failing with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the ledger database and bring its schema up to date.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    let version = migrate(&pool).await?;
    info!(path = db_path, schema_version = version, "ledger database ready");
    Ok(pool)
}

/// Apply every migration newer than the stored `user_version`.
/// Returns the schema version the database ends at.
async fn migrate(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let mut version = schema_version(pool).await?;
    let mut conn = pool.acquire().await?;

    for (name, sql) in MIGRATIONS.iter().skip(usize::try_from(version).unwrap_or(0)) {
        let mut tx = conn.begin().await?;
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        version += 1;
        // PRAGMA arguments cannot be bound.
        sqlx::query(&format!("PRAGMA user_version = {}", version))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(version, migration = name, "applied schema migration");
    }

    debug!(version, "schema up to date");
    Ok(version)
}

async fn schema_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}
