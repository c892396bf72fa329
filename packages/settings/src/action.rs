// ABOUTME: Section edit action tying forms, resolver and uploads together
// ABOUTME: Loads a section form, applies a submission and reports a flash message

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::SettingsError;
use crate::form::{FormView, SettingForm};
use crate::resolver::SettingsResolver;
use crate::upload::{UploadStore, UploadedFile};
use crate::validation::ValidatorRegistry;

pub const SAVED_MESSAGE: &str = "Saved";
pub const SAVE_ERROR_MESSAGE: &str = "Save error!";

/// One-shot status message shown after a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Success(String),
    Error(String),
}

impl Flash {
    pub fn message(&self) -> &str {
        match self {
            Flash::Success(message) | Flash::Error(message) => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Flash::Success(_))
    }
}

/// Values and files posted for a section
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub values: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_file(mut self, key: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(key.into(), file);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }
}

/// Result of showing or submitting a section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionPage {
    pub form: FormView,
    pub flash: Option<Flash>,
}

/// Settings facade shared by the front ends
#[derive(Clone)]
pub struct SettingsService {
    resolver: SettingsResolver,
    registry: Arc<ValidatorRegistry>,
    uploads: Option<Arc<dyn UploadStore>>,
}

impl SettingsService {
    pub fn new(resolver: SettingsResolver, registry: Arc<ValidatorRegistry>) -> Self {
        Self {
            resolver,
            registry,
            uploads: None,
        }
    }

    pub fn with_upload_store(mut self, uploads: Arc<dyn UploadStore>) -> Self {
        self.uploads = Some(uploads);
        self
    }

    pub fn resolver(&self) -> &SettingsResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub async fn load_form(&self, section: &str) -> Result<SettingForm, SettingsError> {
        SettingForm::load_by_section(self.resolver.storage(), &self.registry, section).await
    }

    /// Show a section, or apply `submission` to it when one is given.
    ///
    /// Validation and persistence failures are reported through the flash
    /// message; an unknown section or broken rule definition is an error.
    pub async fn handle_section(
        &self,
        section: &str,
        submission: Option<Submission>,
    ) -> Result<SectionPage, SettingsError> {
        let mut form = self.load_form(section).await?;

        let submission = match submission {
            Some(submission) => submission,
            None => {
                return Ok(SectionPage {
                    form: form.view(),
                    flash: None,
                })
            }
        };

        form.load(&submission.values);
        for (key, file) in submission.files {
            form.attach_file(&key, file)?;
        }

        let flash = match form.save(&self.resolver, self.uploads.as_deref()).await {
            Ok(()) => {
                info!(section, "Section settings saved");
                Flash::Success(SAVED_MESSAGE.to_string())
            }
            Err(SettingsError::ValidationFailed(_)) => Flash::Error(SAVE_ERROR_MESSAGE.to_string()),
            Err(e @ SettingsError::PersistenceFailed(_)) => {
                warn!(section, error = %e, "Section settings not saved");
                Flash::Error(SAVE_ERROR_MESSAGE.to_string())
            }
            Err(e) => return Err(e),
        };

        Ok(SectionPage {
            form: form.view(),
            flash: Some(flash),
        })
    }
}
