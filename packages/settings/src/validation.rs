// ABOUTME: Validator registry for setting values
// ABOUTME: Maps rule names stored with each setting to validator implementations

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::rules::{scalar_to_string, Rule};

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?$"
    )
    .expect("email pattern compiles");
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("cannot be blank.")]
    Required,

    #[error("should contain at least {0} characters.")]
    TooShort(i64),

    #[error("should contain at most {0} characters.")]
    TooLong(i64),

    #[error("should contain {0} characters.")]
    WrongLength(i64),

    #[error("must be an integer.")]
    NotInteger,

    #[error("must be a number.")]
    NotNumber,

    #[error("must be no less than {0}.")]
    TooSmall(String),

    #[error("must be no greater than {0}.")]
    TooBig(String),

    #[error("must be either \"{0}\" or \"{1}\".")]
    NotBoolean(String, String),

    #[error("is invalid.")]
    Invalid,

    #[error("is not a valid email address.")]
    InvalidEmail,

    #[error("is not a valid URL.")]
    InvalidUrl,

    #[error("has a misconfigured rule: {0}")]
    Misconfigured(String),
}

impl ValidationError {
    /// Full message for a field, honouring a rule's `message` override
    pub fn message_for(&self, label: &str, rule: &Rule) -> String {
        match rule.option_string("message") {
            Some(custom) => custom.replace("{attribute}", label),
            None => format!("{} {}", label, self),
        }
    }
}

/// A named check applied to a submitted setting value
pub trait Validator: Send + Sync {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError>;

    /// Empty values pass without running the check unless the rule says otherwise
    fn skip_on_empty(&self) -> bool {
        true
    }
}

impl<F> Validator for F
where
    F: Fn(&str, &Rule) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        self(value, rule)
    }
}

/// Lookup table from rule names to validators
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("safe", SafeValidator);
        registry.register("required", RequiredValidator);
        registry.register("string", StringValidator);
        registry.register("integer", IntegerValidator);
        registry.register("number", NumberValidator);
        registry.register("double", NumberValidator);
        registry.register("boolean", BooleanValidator);
        registry.register("in", RangeValidator);
        registry.register("email", EmailValidator);
        registry.register("url", UrlValidator);
        registry.register("match", MatchValidator);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, validator: impl Validator + 'static) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Validator>> {
        self.validators.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Accepts anything
pub struct SafeValidator;

impl Validator for SafeValidator {
    fn validate(&self, _value: &str, _rule: &Rule) -> Result<(), ValidationError> {
        Ok(())
    }
}

pub struct RequiredValidator;

impl Validator for RequiredValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        if let Some(required) = rule.option_string("requiredValue") {
            if value != required {
                return Err(ValidationError::Invalid);
            }
            return Ok(());
        }
        if value.trim().is_empty() {
            return Err(ValidationError::Required);
        }
        Ok(())
    }

    fn skip_on_empty(&self) -> bool {
        false
    }
}

/// Character length bounds: `min`, `max`, `length`
pub struct StringValidator;

impl Validator for StringValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        let length = value.chars().count() as i64;

        if let Some(exact) = rule.option_i64("length") {
            if length != exact {
                return Err(ValidationError::WrongLength(exact));
            }
        }
        if let Some(min) = rule.option_i64("min") {
            if length < min {
                return Err(ValidationError::TooShort(min));
            }
        }
        if let Some(max) = rule.option_i64("max") {
            if length > max {
                return Err(ValidationError::TooLong(max));
            }
        }
        Ok(())
    }
}

/// Whole numbers with optional `min`/`max` bounds
pub struct IntegerValidator;

impl Validator for IntegerValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        let parsed = value
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::NotInteger)?;
        check_bounds(parsed as f64, rule)
    }
}

/// Finite decimal numbers with optional `min`/`max` bounds
pub struct NumberValidator;

impl Validator for NumberValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        let parsed = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or(ValidationError::NotNumber)?;
        check_bounds(parsed, rule)
    }
}

fn check_bounds(value: f64, rule: &Rule) -> Result<(), ValidationError> {
    if let Some(min) = rule.option_f64("min") {
        if value < min {
            return Err(ValidationError::TooSmall(bound_label(rule, "min")));
        }
    }
    if let Some(max) = rule.option_f64("max") {
        if value > max {
            return Err(ValidationError::TooBig(bound_label(rule, "max")));
        }
    }
    Ok(())
}

fn bound_label(rule: &Rule, name: &str) -> String {
    rule.option_string(name).unwrap_or_default()
}

/// `trueValue`/`falseValue` (default "1"/"0"); `strict` disables the bool aliases
pub struct BooleanValidator;

impl Validator for BooleanValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        let true_value = rule.option_string("trueValue").unwrap_or_else(|| "1".to_string());
        let false_value = rule.option_string("falseValue").unwrap_or_else(|| "0".to_string());

        if value == true_value || value == false_value {
            return Ok(());
        }
        if !rule.option_bool("strict").unwrap_or(false) && matches!(value, "true" | "false") {
            return Ok(());
        }
        Err(ValidationError::NotBoolean(true_value, false_value))
    }
}

/// Membership in the `range` list; `not` inverts, `allowArray` checks comma separated values
pub struct RangeValidator;

impl Validator for RangeValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        let range: Vec<String> = match rule.option("range") {
            Some(Value::Array(items)) => items.iter().map(scalar_to_string).collect(),
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => {
                return Err(ValidationError::Misconfigured(
                    "\"in\" needs a range list".to_string(),
                ))
            }
        };
        let negate = rule.option_bool("not").unwrap_or(false);

        let candidates: Vec<&str> = if rule.option_bool("allowArray").unwrap_or(false) {
            value.split(',').map(str::trim).collect()
        } else {
            vec![value]
        };

        let all_in_range = candidates
            .iter()
            .all(|candidate| range.iter().any(|allowed| allowed == candidate));

        if all_in_range != negate {
            Ok(())
        } else {
            Err(ValidationError::Invalid)
        }
    }
}

pub struct EmailValidator;

impl Validator for EmailValidator {
    fn validate(&self, value: &str, _rule: &Rule) -> Result<(), ValidationError> {
        if value.len() <= 254 && EMAIL_PATTERN.is_match(value) {
            Ok(())
        } else {
            Err(ValidationError::InvalidEmail)
        }
    }
}

/// Absolute URLs with a host; `validSchemes` defaults to http and https
pub struct UrlValidator;

impl Validator for UrlValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        // Check for spaces (invalid in URLs)
        if value.contains(char::is_whitespace) {
            return Err(ValidationError::InvalidUrl);
        }

        let parsed = url::Url::parse(value).map_err(|_| ValidationError::InvalidUrl)?;

        let schemes: Vec<String> = match rule.option("validSchemes") {
            Some(Value::Array(items)) => items.iter().map(scalar_to_string).collect(),
            _ => vec!["http".to_string(), "https".to_string()],
        };

        if !schemes.iter().any(|s| s.eq_ignore_ascii_case(parsed.scheme())) {
            return Err(ValidationError::InvalidUrl);
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ValidationError::InvalidUrl);
        }
        Ok(())
    }
}

/// Regular expression match on `pattern`; `not` inverts
pub struct MatchValidator;

impl Validator for MatchValidator {
    fn validate(&self, value: &str, rule: &Rule) -> Result<(), ValidationError> {
        let pattern = rule.option_string("pattern").ok_or_else(|| {
            ValidationError::Misconfigured("\"match\" needs a pattern".to_string())
        })?;
        let regex = compile_pattern(&pattern)?;
        let negate = rule.option_bool("not").unwrap_or(false);

        if regex.is_match(value) != negate {
            Ok(())
        } else {
            Err(ValidationError::Invalid)
        }
    }
}

/// Accepts bare patterns and delimited ones with trailing flags (`/^[a-z]+$/i`)
fn compile_pattern(pattern: &str) -> Result<Regex, ValidationError> {
    let (body, flags) = match pattern.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((body, flags)) => (body, flags),
        None => (pattern, ""),
    };

    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' => builder.unicode(true),
            other => {
                return Err(ValidationError::Misconfigured(format!(
                    "unsupported pattern flag '{}'",
                    other
                )))
            }
        };
    }

    builder
        .build()
        .map_err(|e| ValidationError::Misconfigured(e.to_string()))
}
