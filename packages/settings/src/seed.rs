// ABOUTME: Deploy-time seeding of setting rows with positional bookkeeping
// ABOUTME: Inserts a declared batch of settings and removes it again on rollback

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use setkeep_storage::StorageError;
use sqlx::{Acquire, SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{FieldErrors, SettingsError};
use crate::rules::scalar_to_string;
use crate::storage::queries;
use crate::types::{Setting, SettingType};

/// One declared setting in a seed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRow {
    pub section: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Default value; scalars are stored in their text form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_key: Option<SettingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Value>,
}

impl SeedRow {
    pub fn new(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            name: None,
            hint: None,
            value: None,
            type_key: None,
            position: None,
            variants: None,
            rules: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn type_key(mut self, type_key: SettingType) -> Self {
        self.type_key = Some(type_key);
        self
    }

    pub fn position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn variants(mut self, variants: Value) -> Self {
        self.variants = Some(variants);
        self
    }

    pub fn rules(mut self, rules: Value) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn path(&self) -> String {
        format!("{}.{}", self.section, self.key)
    }

    /// Record to insert, with undeclared fields defaulted
    pub fn candidate(&self) -> Setting {
        Setting {
            section: self.section.clone(),
            key: self.key.clone(),
            name: self.name.clone().unwrap_or_else(|| self.key.clone()),
            hint: self.hint.clone(),
            value: Some(self.value.as_ref().map(scalar_to_string).unwrap_or_default()),
            type_key: self.type_key.unwrap_or_default(),
            position: self.position,
            variants: Some(self.variants.clone().unwrap_or_else(|| json!(["safe"]))),
            rules: Some(self.rules.clone().unwrap_or_else(|| json!(["safe"]))),
        }
    }
}

/// A row left out of a seed run and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub path: String,
    pub reason: String,
}

/// Outcome of applying a seed batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// `section.key` of every inserted row, in batch order
    pub inserted: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

/// A named, ordered batch of settings applied at deploy time
#[derive(Debug, Clone)]
pub struct SettingsMigration {
    name: String,
    rows: Vec<SeedRow>,
}

impl SettingsMigration {
    pub fn new(name: impl Into<String>, rows: Vec<SeedRow>) -> Result<Self, SettingsError> {
        if rows.is_empty() {
            return Err(SettingsError::EmptyMigration);
        }
        Ok(Self {
            name: name.into(),
            rows,
        })
    }

    /// Parse a JSON array of seed rows
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, SettingsError> {
        let rows: Vec<SeedRow> = serde_json::from_str(json).map_err(StorageError::Json)?;
        Self::new(name, rows)
    }

    /// Load a migration from a JSON file, named after the file stem
    pub async fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(StorageError::Io)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "settings".to_string());
        Self::from_json(name, &json)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[SeedRow] {
        &self.rows
    }

    /// Insert every row in batch order.
    ///
    /// Runs in one transaction; each row gets its own savepoint so an invalid
    /// or rejected row is rolled back alone and reported as skipped.
    pub async fn up(&self, pool: &SqlitePool) -> Result<SeedReport, SettingsError> {
        let mut tx = pool.begin().await.map_err(StorageError::Sqlx)?;
        let mut report = SeedReport::default();

        for row in &self.rows {
            let mut candidate = row.candidate();
            let path = candidate.path();

            if let Err(errors) = candidate.validate_new() {
                let reason = describe(&errors);
                warn!(migration = %self.name, path = %path, reason = %reason, "Skipping invalid seed row");
                report.skipped.push(SkippedRow { path, reason });
                continue;
            }

            let mut savepoint = Acquire::begin(&mut tx).await.map_err(StorageError::Sqlx)?;
            match insert_positioned(&mut savepoint, &mut candidate).await {
                Ok(()) => {
                    savepoint.commit().await.map_err(StorageError::Sqlx)?;
                    report.inserted.push(path);
                }
                Err(e) => {
                    savepoint.rollback().await.map_err(StorageError::Sqlx)?;
                    warn!(migration = %self.name, path = %path, error = %e, "Seed row not saved");
                    report.skipped.push(SkippedRow {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!(
            migration = %self.name,
            inserted = report.inserted.len(),
            skipped = report.skipped.len(),
            "Settings migration applied"
        );
        Ok(report)
    }

    /// Delete every row of the batch.
    ///
    /// Any row that is already gone aborts the rollback and leaves the
    /// table unchanged.
    pub async fn down(&self, pool: &SqlitePool) -> Result<usize, SettingsError> {
        let mut tx = pool.begin().await.map_err(StorageError::Sqlx)?;

        for row in &self.rows {
            let deleted = queries::delete(&mut tx, &row.section, &row.key).await?;
            if deleted == 0 {
                tx.rollback().await.map_err(StorageError::Sqlx)?;
                warn!(migration = %self.name, path = %row.path(), "Settings migration rollback aborted");
                return Err(SettingsError::RollbackFailed {
                    section: row.section.clone(),
                    key: row.key.clone(),
                });
            }
            debug!(migration = %self.name, path = %row.path(), "Seed row deleted");
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;
        info!(migration = %self.name, deleted = self.rows.len(), "Settings migration reverted");
        Ok(self.rows.len())
    }
}

/// Make room at an occupied position, then insert
async fn insert_positioned(
    conn: &mut SqliteConnection,
    setting: &mut Setting,
) -> Result<(), StorageError> {
    if let Some(position) = setting.requested_position() {
        if queries::exists_at_position(conn, &setting.section, position).await? {
            let shifted = queries::shift_positions(conn, &setting.section, position).await?;
            debug!(section = %setting.section, position, shifted, "Shifted setting positions");
        }
    }
    queries::insert(conn, setting).await
}

fn describe(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}
