// ABOUTME: Editable form over every setting in one section
// ABOUTME: Assembles per-field validators from stored rules and saves through the resolver

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FieldErrors, SettingsError};
use crate::resolver::SettingsResolver;
use crate::rules::Rule;
use crate::storage::SettingStorage;
use crate::types::{Setting, SettingType, VariantOption};
use crate::upload::{UploadStore, UploadedFile};
use crate::validation::{Validator, ValidatorRegistry};

/// Lifecycle of a loaded form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loaded,
    Validated,
    Saved,
    Failed,
}

/// A stored rule paired with the validator it names
#[derive(Clone)]
pub struct BoundRule {
    pub rule: Rule,
    validator: Arc<dyn Validator>,
}

impl BoundRule {
    fn check(&self, label: &str, value: Option<&str>) -> Option<String> {
        let value = value.unwrap_or("");
        let skip_on_empty = self
            .rule
            .option_bool("skipOnEmpty")
            .unwrap_or_else(|| self.validator.skip_on_empty());

        if skip_on_empty && value.is_empty() {
            return None;
        }

        self.validator
            .validate(value, &self.rule)
            .err()
            .map(|err| err.message_for(label, &self.rule))
    }
}

struct FormField {
    setting: Setting,
    rules: Vec<BoundRule>,
    upload: Option<UploadedFile>,
}

/// Build the validator chain for one setting; settings without rules accept anything
pub fn assemble_rules(
    setting: &Setting,
    registry: &ValidatorRegistry,
) -> Result<Vec<BoundRule>, SettingsError> {
    let mut rules = setting.rules()?;
    if rules.is_empty() {
        rules.push(Rule::new("safe"));
    }

    rules
        .into_iter()
        .map(|rule| {
            let validator = registry
                .get(&rule.validator)
                .ok_or_else(|| SettingsError::UnknownValidator(rule.validator.clone()))?;
            Ok(BoundRule { rule, validator })
        })
        .collect()
}

pub struct SettingForm {
    section: String,
    fields: Vec<FormField>,
    state: FormState,
    errors: FieldErrors,
}

impl SettingForm {
    /// Load every setting of `section` ordered by position.
    ///
    /// A section with no settings does not exist.
    pub async fn load_by_section(
        storage: &SettingStorage,
        registry: &ValidatorRegistry,
        section: &str,
    ) -> Result<Self, SettingsError> {
        let settings = storage.find_by_section(section).await?;
        if settings.is_empty() {
            return Err(SettingsError::SectionNotFound(section.to_string()));
        }

        let fields = settings
            .into_iter()
            .map(|setting| {
                let rules = assemble_rules(&setting, registry)?;
                Ok(FormField {
                    setting,
                    rules,
                    upload: None,
                })
            })
            .collect::<Result<Vec<_>, SettingsError>>()?;

        debug!(section, fields = fields.len(), "Loaded settings form");

        Ok(Self {
            section: section.to_string(),
            fields,
            state: FormState::Loaded,
            errors: FieldErrors::new(),
        })
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Loaded settings in display order
    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.fields.iter().map(|field| &field.setting)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.setting.key.as_str()).collect()
    }

    /// Field key to display label
    pub fn labels(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|f| (f.setting.key.as_str(), f.setting.name.as_str()))
            .collect()
    }

    /// Field key to current value
    pub fn attributes(&self) -> Vec<(&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|f| (f.setting.key.as_str(), f.setting.value.as_deref()))
            .collect()
    }

    /// Rules the given field is validated with
    pub fn rules_for(&self, key: &str) -> Option<Vec<&Rule>> {
        self.field(key).map(|f| f.rules.iter().map(|b| &b.rule).collect())
    }

    /// Current value of a field; unloaded keys read as `None`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(|f| f.setting.value.as_deref())
    }

    /// Assign a field value. Unloaded keys are ignored and reported as `false`.
    pub fn set(&mut self, key: &str, value: Option<String>) -> bool {
        match self.field_mut(key) {
            Some(field) => {
                field.setting.value = value;
                true
            }
            None => false,
        }
    }

    /// Assign every submitted value whose key belongs to this form
    pub fn load(&mut self, submission: &HashMap<String, String>) -> usize {
        let mut applied = 0;
        for (key, value) in submission {
            if self.set(key, Some(value.clone())) {
                applied += 1;
            } else {
                debug!(section = %self.section, key = %key, "Ignoring unknown field");
            }
        }
        applied
    }

    /// Queue an upload for a FILE field; unloaded keys are ignored
    pub fn attach_file(&mut self, key: &str, file: UploadedFile) -> Result<bool, SettingsError> {
        let section = self.section.clone();
        match self.field_mut(key) {
            Some(field) if field.setting.type_key == SettingType::File => {
                field.upload = Some(file);
                Ok(true)
            }
            Some(_) => Err(SettingsError::InvalidInput(format!(
                "Setting {}.{} must be a file!",
                section, key
            ))),
            None => Ok(false),
        }
    }

    /// Run every field's validators, collecting all messages
    pub fn validate(&mut self) -> bool {
        self.errors.clear();

        for field in &self.fields {
            let messages: Vec<String> = field
                .rules
                .iter()
                .filter_map(|bound| bound.check(&field.setting.name, field.setting.value.as_deref()))
                .collect();

            if !messages.is_empty() {
                self.errors.insert(field.setting.key.clone(), messages);
            }
        }

        self.state = if self.errors.is_empty() {
            FormState::Validated
        } else {
            FormState::Failed
        };
        self.errors.is_empty()
    }

    /// Validate every field and, only if all pass, persist every value.
    ///
    /// Pending uploads are stored first and their URLs become the field values.
    pub async fn save(
        &mut self,
        resolver: &SettingsResolver,
        uploads: Option<&dyn UploadStore>,
    ) -> Result<(), SettingsError> {
        if !self.validate() {
            warn!(
                section = %self.section,
                fields = ?self.errors.keys().collect::<Vec<_>>(),
                "Settings form failed validation"
            );
            return Err(SettingsError::ValidationFailed(self.errors.clone()));
        }

        if let Err(e) = self.store_uploads(uploads).await {
            self.state = FormState::Failed;
            return Err(e);
        }

        for field in &self.fields {
            let path = field.setting.path();
            let saved = match resolver.set(&path, field.setting.value.as_deref()).await {
                Ok(saved) => saved,
                Err(e) => {
                    self.state = FormState::Failed;
                    return Err(e);
                }
            };
            if !saved {
                self.state = FormState::Failed;
                return Err(SettingsError::PersistenceFailed(format!(
                    "{} was not updated",
                    path
                )));
            }
        }

        self.state = FormState::Saved;
        debug!(section = %self.section, "Settings form saved");
        Ok(())
    }

    async fn store_uploads(&mut self, uploads: Option<&dyn UploadStore>) -> Result<(), SettingsError> {
        for field in self.fields.iter_mut().filter(|f| f.upload.is_some()) {
            let store = uploads.ok_or_else(|| {
                SettingsError::InvalidInput("no upload store configured".to_string())
            })?;
            if let Some(file) = field.upload.take() {
                let url = store
                    .store(&field.setting.section, &field.setting.key, &file)
                    .await?;
                field.setting.value = Some(url);
            }
        }
        Ok(())
    }

    /// Render-ready description of the form
    pub fn view(&self) -> FormView {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let setting = &field.setting;
                let options = if setting.type_key.uses_variants() {
                    setting.variant_options().unwrap_or_else(|e| {
                        warn!(path = %setting.path(), error = %e, "Unreadable variants");
                        Vec::new()
                    })
                } else {
                    Vec::new()
                };
                FieldView {
                    key: setting.key.clone(),
                    label: setting.name.clone(),
                    hint: setting.hint.clone(),
                    value: setting.value.clone(),
                    widget: setting.type_key,
                    options,
                    errors: self.errors.get(&setting.key).cloned().unwrap_or_default(),
                }
            })
            .collect();

        FormView {
            section: self.section.clone(),
            fields,
        }
    }

    fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.setting.key == key)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|f| f.setting.key == key)
    }
}

/// Form rendering model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub section: String,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub key: String,
    pub label: String,
    pub hint: Option<String>,
    pub value: Option<String>,
    pub widget: SettingType,
    pub options: Vec<VariantOption>,
    pub errors: Vec<String>,
}
