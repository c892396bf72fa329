// ABOUTME: Type definitions for section settings
// ABOUTME: The setting record, its input type and the option lists derived from it

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::into_list;
use crate::error::{FieldErrors, SettingsError};
use crate::rules::{scalar_to_string, Rule};

pub const MAX_SECTION_LENGTH: usize = 50;
pub const MAX_KEY_LENGTH: usize = 50;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_HINT_LENGTH: usize = 255;

/// Input widget used to edit a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum SettingType {
    #[default]
    Text,
    Textarea,
    Editor,
    Selectbox,
    SelectboxMultiple,
    Checkbox,
    Radio,
    Radiolist,
    /// Upload-backed value; the stored value is the file's URL
    File,
}

impl SettingType {
    pub const ALL: [SettingType; 9] = [
        SettingType::Text,
        SettingType::Textarea,
        SettingType::Editor,
        SettingType::Selectbox,
        SettingType::SelectboxMultiple,
        SettingType::Checkbox,
        SettingType::Radio,
        SettingType::Radiolist,
        SettingType::File,
    ];

    pub fn code(self) -> i16 {
        match self {
            SettingType::Text => 0,
            SettingType::Textarea => 1,
            SettingType::Editor => 2,
            SettingType::Selectbox => 3,
            SettingType::SelectboxMultiple => 4,
            SettingType::Checkbox => 5,
            SettingType::Radio => 6,
            SettingType::Radiolist => 7,
            SettingType::File => 8,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SettingType::Text => "text",
            SettingType::Textarea => "textarea",
            SettingType::Editor => "editor",
            SettingType::Selectbox => "selectbox",
            SettingType::SelectboxMultiple => "selectbox_multiple",
            SettingType::Checkbox => "checkbox",
            SettingType::Radio => "radio",
            SettingType::Radiolist => "radiolist",
            SettingType::File => "file",
        }
    }

    /// Whether the widget offers a choice from the setting's variants
    pub fn uses_variants(self) -> bool {
        matches!(
            self,
            SettingType::Selectbox | SettingType::SelectboxMultiple | SettingType::Radiolist
        )
    }
}

impl TryFrom<i16> for SettingType {
    type Error = SettingsError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        SettingType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| SettingsError::InvalidInput(format!("unknown input type {}", code)))
    }
}

impl From<SettingType> for i16 {
    fn from(t: SettingType) -> Self {
        t.code()
    }
}

/// One configuration entry, identified by (section, key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub section: String,
    pub key: String,
    pub name: String,
    pub hint: Option<String>,
    pub value: Option<String>,
    pub type_key: SettingType,
    /// Display order within the section; `None` (or 0) appends on insert
    pub position: Option<i64>,
    /// Structured option list, or the raw stored text if it never decoded
    pub variants: Option<Value>,
    /// Structured rule list, or the raw stored text if it never decoded
    pub rules: Option<Value>,
}

impl Setting {
    pub fn new(section: impl Into<String>, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            name: name.into(),
            hint: None,
            value: None,
            type_key: SettingType::Text,
            position: None,
            variants: None,
            rules: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_type(mut self, type_key: SettingType) -> Self {
        self.type_key = type_key;
        self
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_variants(mut self, variants: Vec<Value>) -> Self {
        self.variants = Some(Value::Array(variants));
        self
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = Some(Value::Array(rules.iter().map(Rule::to_value).collect()));
        self
    }

    /// `section.key`
    pub fn path(&self) -> String {
        format!("{}.{}", self.section, self.key)
    }

    /// Position if one was explicitly requested (0 counts as unset)
    pub fn requested_position(&self) -> Option<i64> {
        self.position.filter(|p| *p != 0)
    }

    /// Decoded variants list
    pub fn variants(&self) -> Result<Vec<Value>, SettingsError> {
        match &self.variants {
            None => Ok(Vec::new()),
            Some(value) => into_list(value.clone()).map_err(|e| self.column_error("variants", e)),
        }
    }

    /// Decoded rule descriptors
    pub fn rules(&self) -> Result<Vec<Rule>, SettingsError> {
        let items = match &self.rules {
            None => return Ok(Vec::new()),
            Some(value) => into_list(value.clone()).map_err(|e| self.column_error("rules", e))?,
        };

        items
            .into_iter()
            .map(|item| {
                Rule::try_from(item).map_err(|e| {
                    SettingsError::InvalidInput(format!("{}: invalid rule: {}", self.path(), e))
                })
            })
            .collect()
    }

    /// Choices for selection widgets as value/label pairs
    pub fn variant_options(&self) -> Result<Vec<VariantOption>, SettingsError> {
        Ok(self.variants()?.iter().map(VariantOption::from_variant).collect())
    }

    /// Attribute checks applied before a new record is inserted
    pub fn validate_new(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        check_required_text(&mut errors, "section", "Section", &self.section, MAX_SECTION_LENGTH);
        check_required_text(&mut errors, "key", "Key", &self.key, MAX_KEY_LENGTH);
        check_required_text(&mut errors, "name", "Name", &self.name, MAX_NAME_LENGTH);

        if let Some(hint) = &self.hint {
            if hint.chars().count() > MAX_HINT_LENGTH {
                push_error(
                    &mut errors,
                    "hint",
                    format!("Hint should contain at most {} characters.", MAX_HINT_LENGTH),
                );
            }
        }

        for (attribute, value) in [("variants", &self.variants), ("rules", &self.rules)] {
            if let Some(value) = value {
                if !value.is_array() {
                    push_error(&mut errors, attribute, "Must be array".to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn column_error(&self, column: &str, err: SettingsError) -> SettingsError {
        SettingsError::InvalidInput(format!("{}: {} {}", self.path(), column, err))
    }
}

fn check_required_text(
    errors: &mut FieldErrors,
    attribute: &str,
    label: &str,
    value: &str,
    max: usize,
) {
    if value.trim().is_empty() {
        push_error(errors, attribute, format!("{} cannot be blank.", label));
    } else if value.chars().count() > max {
        push_error(
            errors,
            attribute,
            format!("{} should contain at most {} characters.", label, max),
        );
    }
}

fn push_error(errors: &mut FieldErrors, attribute: &str, message: String) {
    errors.entry(attribute.to_string()).or_default().push(message);
}

/// One selectable choice for a selection widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOption {
    pub value: String,
    pub label: String,
}

impl VariantOption {
    /// Accepts `"a"`, `["a", "Label"]`, `{"value": "a", "label": "Label"}` and `{"a": "Label"}`
    pub fn from_variant(variant: &Value) -> Self {
        match variant {
            Value::Array(pair) if !pair.is_empty() => {
                let value = scalar_to_string(&pair[0]);
                let label = pair.get(1).map(scalar_to_string).unwrap_or_else(|| value.clone());
                Self { value, label }
            }
            Value::Object(map) if map.contains_key("value") => {
                let value = map.get("value").map(scalar_to_string).unwrap_or_default();
                let label = map
                    .get("label")
                    .map(scalar_to_string)
                    .unwrap_or_else(|| value.clone());
                Self { value, label }
            }
            Value::Object(map) if map.len() == 1 => {
                let (value, label) = map
                    .iter()
                    .next()
                    .map(|(k, v)| (k.clone(), scalar_to_string(v)))
                    .unwrap_or_default();
                Self { value, label }
            }
            other => {
                let value = scalar_to_string(other);
                Self {
                    label: value.clone(),
                    value,
                }
            }
        }
    }
}
