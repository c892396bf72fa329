// ABOUTME: Section-scoped application settings
// ABOUTME: Runtime configuration with database persistence, caching, dynamic forms and seeding

pub mod action;
pub mod codec;
pub mod error;
pub mod form;
pub mod resolver;
pub mod rules;
pub mod seed;
pub mod storage;
pub mod types;
pub mod upload;
pub mod validation;

#[cfg(test)]
mod storage_tests;

pub use action::{Flash, SectionPage, SettingsService, Submission};
pub use error::{FieldErrors, SettingsError};
pub use form::{FieldView, FormState, FormView, SettingForm};
pub use resolver::{Resolved, SettingPath, SettingsResolver, ValueCache};
pub use rules::Rule;
pub use seed::{SeedReport, SeedRow, SettingsMigration, SkippedRow};
pub use storage::SettingStorage;
pub use types::*;
pub use upload::{LocalUploadStore, UploadStore, UploadedFile};
pub use validation::{ValidationError, Validator, ValidatorRegistry};
