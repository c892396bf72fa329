use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::constants::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid number in {0}: {1}")]
    InvalidNumber(&'static str, ParseIntError),
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
    #[error("Unable to determine home directory")]
    NoHomeDirectory,
}

/// Get the path to the Setkeep directory (~/.setkeep)
pub fn setkeep_dir() -> Result<PathBuf, ConfigError> {
    // HOME first so tests can redirect it
    if let Ok(home) = env::var(HOME) {
        Ok(PathBuf::from(home).join(".setkeep"))
    } else {
        dirs::home_dir()
            .map(|home| home.join(".setkeep"))
            .ok_or(ConfigError::NoHomeDirectory)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub cache_capacity: u64,
    pub upload_dir: PathBuf,
    pub upload_url_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = setkeep_dir()?;

        let database_path = env::var(SETKEEP_DATABASE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| base.join(DEFAULT_DATABASE_FILE));

        let max_connections = parse_positive(SETKEEP_DB_MAX_CONNECTIONS)?
            .map(|n| n as u32)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let cache_capacity =
            parse_positive(SETKEEP_CACHE_CAPACITY)?.unwrap_or(DEFAULT_CACHE_CAPACITY);

        let upload_dir = env::var(SETKEEP_UPLOAD_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| base.join("uploads").join("settings"));

        let upload_url_prefix = env::var(SETKEEP_UPLOAD_URL_PREFIX)
            .map(|prefix| prefix.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_UPLOAD_URL_PREFIX.to_string());

        let config = Config {
            database_path,
            max_connections,
            cache_capacity,
            upload_dir,
            upload_url_prefix,
        };
        debug!(?config, "Loaded configuration from environment");

        Ok(config)
    }
}

fn parse_positive(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(raw) => {
            let n = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidNumber(var, e))?;
            if n == 0 {
                return Err(ConfigError::MustBePositive(var));
            }
            Ok(Some(n))
        }
        Err(_) => Ok(None),
    }
}
