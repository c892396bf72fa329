// ABOUTME: Error taxonomy for the settings layer
// ABOUTME: Lookup, input, validation and persistence failures

use setkeep_storage::StorageError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error messages keyed by field (setting key or record attribute)
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Key {section}.{key} not found")]
    NotFound { section: String, key: String },

    #[error("Section {0} not found")]
    SectionNotFound(String),

    #[error("Key must be in section.key format, got: {0}")]
    InvalidPath(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed for: {}", field_list(.0))]
    ValidationFailed(FieldErrors),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Unknown validator: {0}")]
    UnknownValidator(String),

    #[error("Migration is empty")]
    EmptyMigration,

    #[error("Rollback failed: {section}.{key} was not deleted")]
    RollbackFailed { section: String, key: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SettingsError {
    pub fn not_found(section: &str, key: &str) -> Self {
        SettingsError::NotFound {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

fn field_list(errors: &FieldErrors) -> String {
    errors.keys().cloned().collect::<Vec<_>>().join(", ")
}
