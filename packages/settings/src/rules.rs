// ABOUTME: Validation rule descriptors stored alongside each setting
// ABOUTME: A validator name plus named options, persisted as a JSON array

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One validator invocation: `["integer", {"min": 1, "max": 500}]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rule {
    pub validator: String,
    pub options: Map<String, Value>,
}

impl Rule {
    pub fn new(validator: impl Into<String>) -> Self {
        Self {
            validator: validator.into(),
            options: Map::new(),
        }
    }

    /// Builder-style option setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    pub fn option_i64(&self, name: &str) -> Option<i64> {
        match self.options.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn option_f64(&self, name: &str) -> Option<f64> {
        match self.options.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn option_bool(&self, name: &str) -> Option<bool> {
        match self.options.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.as_str() {
                "1" | "true" => Some(true),
                "0" | "false" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Option rendered as the plain string a submitted value is compared against
    pub fn option_string(&self, name: &str) -> Option<String> {
        self.options.get(name).map(scalar_to_string)
    }

    /// Encoded form: `[name]` or `[name, {options}]`
    pub fn to_value(&self) -> Value {
        let mut items = vec![Value::String(self.validator.clone())];
        if !self.options.is_empty() {
            items.push(Value::Object(self.options.clone()));
        }
        Value::Array(items)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl TryFrom<Value> for Rule {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            // Bare name, e.g. the seed default ["safe"]
            Value::String(name) => Ok(Rule::new(name)),
            Value::Array(items) => {
                let mut items = items.into_iter();
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    Some(other) => return Err(format!("validator name must be a string, got {}", other)),
                    None => return Err("rule descriptor is empty".to_string()),
                };
                let mut rule = Rule::new(name);
                for item in items {
                    match item {
                        Value::Object(options) => rule.options.extend(options),
                        other => return Err(format!("rule options must be objects, got {}", other)),
                    }
                }
                Ok(rule)
            }
            // Associative form: {"0": "integer", "max": 500}
            Value::Object(mut map) => {
                let name = match map.remove("0") {
                    Some(Value::String(name)) => name,
                    _ => return Err("rule object needs a validator name under \"0\"".to_string()),
                };
                Ok(Rule {
                    validator: name,
                    options: map,
                })
            }
            other => Err(format!("unsupported rule descriptor: {}", other)),
        }
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Rule::try_from(value).map_err(de::Error::custom)
    }
}

/// String form of a JSON scalar as a submitted form value would carry it
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}
