use crate::error::DbError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Explicit pool construction parameters. Built from the application
/// configuration and injected; there is no ambient engine or session global.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Path of the SQLite database file. Created if missing.
    pub path: PathBuf,
    pub max_connections: u32,
    /// Upper bound on waiting for a free pooled connection.
    pub acquire_timeout: Duration,
    /// Upper bound on waiting for a conflicting write lock inside SQLite.
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("battmon.db"),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Establishes a connection pool to the SQLite database.
///
/// Foreign-key enforcement is switched on for every connection; the schema
/// relies on `ON DELETE SET NULL` to detach batteries when their device is
/// deleted. WAL mode keeps readers from blocking the single writer.
pub async fn connect(settings: &PoolSettings) -> Result<SqlitePool, DbError> {
    if settings.max_connections == 0 {
        return Err(DbError::ConnectionConfig(
            "max_connections must be at least 1".to_string(),
        ));
    }

    let options = SqliteConnectOptions::new()
        .filename(&settings.path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations.
///
/// Called once at startup before the server binds, so the `devices` and
/// `batteries` tables always exist by the time the first request arrives.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("database migrations applied");
    Ok(())
}
