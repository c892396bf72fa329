// ABOUTME: Runtime context for CLI commands
// ABOUTME: Opens the database and assembles the resolver, validators and upload store

use anyhow::{Context, Result};
use setkeep_config::Config;
use setkeep_settings::{
    LocalUploadStore, SettingStorage, SettingsResolver, SettingsService, ValidatorRegistry,
};
use setkeep_storage::{connect, DbOptions, MokaCache};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub service: SettingsService,
}

impl AppContext {
    /// Load `.env`, read configuration and connect
    pub async fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Config::from_env().context("Failed to load configuration")?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: Config) -> Result<Self> {
        let pool = connect(&DbOptions::from_config(&config))
            .await
            .with_context(|| {
                format!("Failed to open database {}", config.database_path.display())
            })?;

        let service = build_service(pool.clone(), &config);
        debug!(database = %config.database_path.display(), "CLI context ready");

        Ok(Self {
            config,
            pool,
            service,
        })
    }

    pub fn storage(&self) -> &SettingStorage {
        self.service.resolver().storage()
    }
}

/// Settings service over `pool` with a bounded value cache and local uploads
pub fn build_service(pool: SqlitePool, config: &Config) -> SettingsService {
    let cache = MokaCache::<Option<String>>::new("settings", Some(config.cache_capacity), None);
    let resolver = SettingsResolver::new(SettingStorage::new(pool), Arc::new(cache));
    let uploads = LocalUploadStore::from_config(config);

    SettingsService::new(resolver, Arc::new(ValidatorRegistry::with_builtins()))
        .with_upload_store(Arc::new(uploads))
}
