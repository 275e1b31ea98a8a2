//! Instance validation
//!
//! Models declare their rules in configuration. Rules are checked on create
//! and replace (every rule) and on patch (only the fields being changed).
//! Uniqueness needs the store and is checked by the caller through
//! [`uniqueness_fields`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Field name -> messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Email,
    Date,
}

/// A declared validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum ValidationRule {
    Presence {
        fields: Vec<String>,
    },
    Inclusion {
        field: String,
        #[serde(rename = "in")]
        allowed: Vec<String>,
    },
    Format {
        field: String,
        format: FieldFormat,
    },
    Length {
        field: String,
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    Uniqueness {
        field: String,
    },
}

/// How much of the instance is being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Create or replace: the data is the whole instance
    Full,
    /// Patch: only the supplied fields are checked
    Partial,
}

/// Validator: value is present and not blank
pub fn required() -> impl Fn(&Value) -> Result<(), String> + Send + Sync + Clone {
    |value: &Value| match value {
        Value::Null => Err("can't be blank".to_string()),
        Value::String(s) if s.trim().is_empty() => Err("can't be blank".to_string()),
        _ => Ok(()),
    }
}

/// Validator: string value is one of `allowed`
pub fn in_list(allowed: Vec<String>) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + Clone {
    move |value: &Value| match value {
        Value::Null => Ok(()),
        Value::String(s) if allowed.iter().any(|a| a == s) => Ok(()),
        _ => Err("is not included in the list".to_string()),
    }
}

/// Validator: string value matches `format`
pub fn formatted(format: FieldFormat) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + Clone {
    move |value: &Value| {
        let Some(s) = value.as_str() else {
            return if value.is_null() {
                Ok(())
            } else {
                Err("is invalid".to_string())
            };
        };
        let valid = match format {
            FieldFormat::Email => email_regex().is_match(s),
            FieldFormat::Date => chrono::DateTime::parse_from_rfc3339(s).is_ok()
                || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        };
        if valid {
            Ok(())
        } else {
            Err("is invalid".to_string())
        }
    }
}

/// Validator: string length within bounds (in characters)
pub fn string_length(
    min: Option<usize>,
    max: Option<usize>,
) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + Clone {
    move |value: &Value| {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let len = s.chars().count();
        match (min, max) {
            (Some(min), _) if len < min => Err(format!("is too short (minimum is {})", min)),
            (_, Some(max)) if len > max => Err(format!("is too long (maximum is {})", max)),
            _ => Ok(()),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern compiles")
    })
}

fn check<F>(errors: &mut FieldErrors, field: &str, value: &Value, validator: F)
where
    F: Fn(&Value) -> Result<(), String>,
{
    if let Err(message) = validator(value) {
        errors.entry(field.to_string()).or_default().push(message);
    }
}

/// Check every non-store rule against `data`
pub fn validate(
    rules: &[ValidationRule],
    data: &Map<String, Value>,
    mode: ValidationMode,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let applies = |field: &str| mode == ValidationMode::Full || data.contains_key(field);

    for rule in rules {
        match rule {
            ValidationRule::Presence { fields } => {
                for field in fields.iter().filter(|f| applies(f.as_str())) {
                    check(&mut errors, field, field_value(data, field), required());
                }
            }
            ValidationRule::Inclusion { field, allowed } if applies(field.as_str()) => {
                check(&mut errors, field, field_value(data, field), in_list(allowed.clone()));
            }
            ValidationRule::Format { field, format } if applies(field.as_str()) => {
                check(&mut errors, field, field_value(data, field), formatted(*format));
            }
            ValidationRule::Length { field, min, max } if applies(field.as_str()) => {
                check(&mut errors, field, field_value(data, field), string_length(*min, *max));
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Fields of `data` that carry a uniqueness rule and a value
pub fn uniqueness_fields<'a>(
    rules: &'a [ValidationRule],
    data: &'a Map<String, Value>,
) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
    rules.iter().filter_map(move |rule| match rule {
        ValidationRule::Uniqueness { field } => data
            .get(field)
            .filter(|value| !value.is_null())
            .map(|value| (field.as_str(), value)),
        _ => None,
    })
}

fn field_value<'a>(data: &'a Map<String, Value>, field: &str) -> &'a Value {
    static NULL: Value = Value::Null;
    data.get(field).unwrap_or(&NULL)
}
