//! Field rules
//!
//! Adapters turning the stateless validators into closures attachable to a
//! [`FieldDescriptor`](crate::core::field::FieldDescriptor). A rule receives the
//! field name and the already coerced value, and returns the (possibly
//! transformed) value or a user-facing message.
//!
//! Values of an unexpected JSON type pass through untouched; coercion has
//! already rejected them.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;

use crate::core::error::ValidationError;
use crate::core::field::Attachment;
use crate::core::helpers::{today, upload_path};
use crate::core::validation::validators;

fn first_message(err: ValidationError) -> String {
    err.errors()
        .values()
        .flatten()
        .next()
        .cloned()
        .unwrap_or_else(|| "Invalid value.".to_string())
}

fn on_str<F>(check: F) -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone
where
    F: for<'a> Fn(&'a str) -> Result<&'a str, ValidationError> + Send + Sync + Clone,
{
    move |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            check(s).map_err(first_message)?;
        }
        Ok(value)
    }
}

/// Rule: letters and spaces only
pub fn name() -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    on_str(validators::validate_name)
}

/// Rule: phone number with optional country code
pub fn phone_number() -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    on_str(validators::validate_phone_number)
}

/// Rule: bare 7 to 10 digit phone number
pub fn phone_number_without_country_code()
-> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    on_str(validators::validate_phone_number_without_country_code)
}

/// Rule: `<code>-<number>` phone number
pub fn coded_phone_number() -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone
{
    on_str(validators::validate_coded_phone_number)
}

/// Rule: one-time code of the configured length
pub fn otp(length: usize) -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    move |_: &str, value: Value| {
        let otp = match &value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Ok(value),
        };
        validators::validate_otp(&otp, length).map_err(first_message)?;
        Ok(Value::String(otp))
    }
}

/// Rule: date of birth within the accepted age range, measured against today
pub fn dob() -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(date) = value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        {
            validators::validate_dob(date, today()).map_err(first_message)?;
        }
        Ok(value)
    }
}

/// Rule: datetime strictly in the future
pub fn future_datetime() -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(moment) = value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            validators::is_future_datetime(moment.to_utc(), Utc::now()).map_err(first_message)?;
        }
        Ok(value)
    }
}

/// Rule: value must be one of `choices`
pub fn choices(
    choices: &'static [&'static str],
) -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    move |_: &str, value: Value| match value.as_str() {
        Some(s) if !choices.contains(&s) => Err(format!("\"{}\" is not a valid choice.", s)),
        _ => Ok(value),
    }
}

/// Rule: value must match `pattern`
///
/// Panics at construction on an invalid pattern, like a static regex would.
pub fn matches(
    pattern: &str,
    message: &'static str,
) -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    let regex = Regex::new(pattern).expect("rule pattern must be a valid regex");
    move |_: &str, value: Value| match value.as_str() {
        Some(s) if !regex.is_match(s) => Err(message.to_string()),
        _ => Ok(value),
    }
}

/// Rule: uploaded file extension must be in the allow-list
pub fn file_extension(
    allowed: &'static [&'static str],
) -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    move |_: &str, value: Value| {
        let Ok(attachment) = serde_json::from_value::<Attachment>(value.clone()) else {
            return Ok(value);
        };
        let extension = attachment.extension().unwrap_or_default();
        if !allowed.contains(&extension.as_str()) {
            return Err(format!(
                "File extension \"{}\" is not allowed. Allowed extensions are: {}.",
                extension,
                allowed.join(", ")
            ));
        }
        Ok(value)
    }
}

/// Rule: uploaded file must not exceed `max_size` bytes
pub fn attachment_size(
    max_size: u64,
) -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    move |_: &str, value: Value| {
        if let Ok(attachment) = serde_json::from_value::<Attachment>(value.clone()) {
            validators::validate_attachment(attachment.size, max_size).map_err(first_message)?;
        }
        Ok(value)
    }
}

/// Rule: replace an uploaded file by its storage path under `owner_type`
///
/// Attach it last: later rules see a path string instead of the upload.
pub fn upload_to(
    owner_type: &'static str,
) -> impl Fn(&str, Value) -> Result<Value, String> + Send + Sync + Clone {
    move |_: &str, value: Value| match serde_json::from_value::<Attachment>(value.clone()) {
        Ok(attachment) => Ok(Value::String(upload_path(owner_type, &attachment.filename))),
        Err(_) => Ok(value),
    }
}
