//! Helpers shared by the form inputs: error construction, the custom validators and the
//! conversion of `ValidationErrors` into the `{field: [message]}` map sent back with a
//! rejected form.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{ValidationError, ValidationErrors};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Key under which errors not tied to a single field are reported.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Starts an error set from a derived `validate()` result so handler-side checks
/// (uniqueness, foreign keys) can be added before deciding.
pub fn collect(result: Result<(), ValidationErrors>) -> ValidationErrors {
    result.err().unwrap_or_else(ValidationErrors::new)
}

pub fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `deserialize_with` helper for text fields: surrounding whitespace is dropped before
/// validation, so a blank value is reported as missing.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

pub fn not_entirely_numeric(password: &str) -> Result<(), ValidationError> {
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        return Err(field_error(
            "password_entirely_numeric",
            "This password is entirely numeric.",
        ));
    }
    Ok(())
}

/// Parses an optional id field: blank means absent, anything else must be an integer.
pub fn parse_choice(raw: &str) -> Result<Option<i64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| field_error("invalid_choice", INVALID_CHOICE))
}

/// Flattens validation errors into stable, human readable messages per field.
pub fn messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs.iter().map(describe).collect()))
        .collect()
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "required" => REQUIRED.to_string(),
        "length" => {
            let len = error
                .params
                .get("value")
                .and_then(Value::as_str)
                .map(|v| v.chars().count() as u64);
            let min = error.params.get("min").and_then(Value::as_u64);
            let max = error.params.get("max").and_then(Value::as_u64);
            match (len, min, max) {
                (Some(0), _, _) => REQUIRED.to_string(),
                (Some(len), _, Some(max)) if len > max => format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max, len
                ),
                (Some(len), Some(min), _) => format!(
                    "Ensure this value has at least {} characters (it has {}).",
                    min, len
                ),
                _ => "Ensure this value has a valid length.".to_string(),
            }
        }
        code => format!("Enter a valid value ({}).", code),
    }
}
