//! Input normalizers
//!
//! Filters run before coercion and validation, so a value like `" Ada@X.com "`
//! reaches the email check as `"ada@x.com"`.

use anyhow::Result;
use serde_json::Value;

fn map_str<F>(transform: F) -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone
where
    F: Fn(&str) -> String + Send + Sync + Clone,
{
    move |_: &str, value: Value| match value.as_str() {
        Some(s) => Ok(Value::String(transform(s))),
        None => Ok(value),
    }
}

/// Filter: trim surrounding whitespace
pub fn trim() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    map_str(|s| s.trim().to_string())
}

/// Filter: lowercase
pub fn lowercase() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    map_str(str::to_lowercase)
}

/// Filter: uppercase
pub fn uppercase() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    map_str(str::to_uppercase)
}

/// Filter: drop every whitespace character (e.g. `"981 111 1111"`)
pub fn strip_whitespace() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    map_str(|s| s.chars().filter(|c| !c.is_whitespace()).collect())
}

/// Filter: an empty or whitespace-only string becomes `null`
pub fn blank_as_null() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value.as_str() {
        Some(s) if s.trim().is_empty() => Ok(Value::Null),
        _ => Ok(value),
    }
}
