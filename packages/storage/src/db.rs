// ABOUTME: Database connection management and schema migrations
// ABOUTME: Provides the SQLite pool shared by every storage layer

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::{StorageError, StorageResult};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection settings for a file-backed database
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl DbOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: setkeep_config::constants::DEFAULT_MAX_CONNECTIONS,
            busy_timeout_seconds: 30,
        }
    }

    pub fn from_config(config: &setkeep_config::Config) -> Self {
        Self {
            path: config.database_path.clone(),
            max_connections: config.max_connections,
            busy_timeout_seconds: 30,
        }
    }
}

/// Open (creating if needed) the settings database and bring its schema up to date
pub async fn connect(options: &DbOptions) -> StorageResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = options.path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    let database_url = format!("sqlite:{}", options.path.display());
    debug!("Connecting to database: {}", database_url);

    let connect_options = SqliteConnectOptions::from_str(&database_url)
        .map_err(StorageError::Sqlx)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(options.busy_timeout_seconds));

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .acquire_timeout(Duration::from_secs(options.busy_timeout_seconds))
        .connect_with(connect_options)
        .await
        .map_err(StorageError::Sqlx)?;

    // Configure SQLite settings
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    info!("Database connection established");

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied.
///
/// Every connection to `:memory:` is a separate database, so the pool is
/// capped at one connection.
pub async fn connect_in_memory() -> StorageResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(":memory:")
        .map_err(StorageError::Sqlx)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(StorageError::Sqlx)?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Apply every pending schema migration
pub async fn run_migrations(pool: &SqlitePool) -> StorageResult<()> {
    MIGRATOR.run(pool).await?;
    debug!("Database migrations completed");
    Ok(())
}

/// Revert every applied schema migration, dropping the settings table
pub async fn revert_migrations(pool: &SqlitePool) -> StorageResult<()> {
    MIGRATOR.undo(pool, 0).await?;
    info!("Database migrations reverted");
    Ok(())
}
