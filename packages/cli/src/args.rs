use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgError {
    #[error("Expected key=value, got: {0}")]
    MissingSeparator(String),
    #[error("Key cannot be empty in: {0}")]
    EmptyKey(String),
}

/// Split a `key=value` argument at the first `=`; the value may be empty
pub fn parse_assignment(raw: &str) -> Result<(String, String), ArgError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| ArgError::MissingSeparator(raw.to_string()))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(ArgError::EmptyKey(raw.to_string()));
    }

    Ok((key.to_string(), value.to_string()))
}
