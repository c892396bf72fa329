// ABOUTME: Data layer and persistence for Setkeep
// ABOUTME: SQLite pool setup, embedded schema migrations and the cache capability

pub mod cache;
pub mod db;

use thiserror::Error;

pub use cache::{BaseCache, MokaCache};
pub use db::{connect, connect_in_memory, revert_migrations, run_migrations, DbOptions};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cache error: {0}")]
    Cache(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
