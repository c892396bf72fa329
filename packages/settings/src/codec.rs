// ABOUTME: Text encoding of the structured variants/rules columns
// ABOUTME: Lists are stored as JSON text and decoded on demand

use serde_json::Value;

use crate::error::SettingsError;

/// Encode a structured list for storage
pub fn encode_list(list: &[Value]) -> String {
    Value::Array(list.to_vec()).to_string()
}

/// Decode stored text, requiring a list
pub fn decode_list(text: &str) -> Result<Vec<Value>, SettingsError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SettingsError::InvalidInput(format!("not valid JSON: {}", e)))?;
    into_list(value)
}

/// Unwrap a structured value that must be a list
pub fn into_list(value: Value) -> Result<Vec<Value>, SettingsError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(SettingsError::InvalidInput(format!(
            "must be a list, got {}",
            other
        ))),
    }
}

/// Pre-save conversion of an in-memory column to its stored text.
///
/// Text that never decoded is written back untouched.
pub(crate) fn encode_column(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(raw) => Some(raw.clone()),
        structured => Some(structured.to_string()),
    }
}

/// Post-load conversion of a stored column; undecodable text is kept raw
pub(crate) fn decode_column(text: Option<String>) -> Option<Value> {
    let text = text?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(text)),
    }
}
