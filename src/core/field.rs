//! Field descriptors: per-field metadata driving projection and validation

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

/// Rule run on a coerced value; may return a transformed value
pub type FieldRule = Arc<dyn Fn(&str, Value) -> Result<Value, String> + Send + Sync>;

/// Input normalizer run before coercion
pub type FieldFilter = Arc<dyn Fn(&str, Value) -> anyhow::Result<Value> + Send + Sync>;

/// Wire type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Email,
    Password,
    Boolean,
    Integer,
    Date,
    DateTime,
    File,
}

impl FieldKind {
    /// Coerce an incoming JSON value to this kind's canonical form
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        match self {
            FieldKind::Text | FieldKind::Password => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err("Not a valid string.".to_string()),
            },
            FieldKind::Email => match value.as_str() {
                Some(s) if s.is_empty() || s.to_string().validate_email() => Ok(value),
                _ => Err("Enter a valid email address.".to_string()),
            },
            FieldKind::Uuid => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(|id| json!(id))
                .ok_or_else(|| "Must be a valid UUID.".to_string()),
            FieldKind::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::Number(n) if n.as_i64() == Some(0) => Ok(json!(false)),
                Value::Number(n) if n.as_i64() == Some(1) => Ok(json!(true)),
                Value::String(s) => match s.to_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Ok(json!(true)),
                    "false" | "0" | "no" | "off" => Ok(json!(false)),
                    _ => Err("Must be a valid boolean.".to_string()),
                },
                _ => Err("Must be a valid boolean.".to_string()),
            },
            FieldKind::Integer => match &value {
                Value::Number(n) if n.is_i64() => Ok(value),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(|n| json!(n))
                    .map_err(|_| "A valid integer is required.".to_string()),
                _ => Err("A valid integer is required.".to_string()),
            },
            FieldKind::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(|d| json!(d))
                .ok_or_else(|| "Date has wrong format. Use YYYY-MM-DD.".to_string()),
            FieldKind::DateTime => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| json!(dt.to_utc()))
                .ok_or_else(|| "Datetime has wrong format. Use RFC 3339.".to_string()),
            FieldKind::File => match value {
                // Already stored: the path is kept as is
                Value::String(_) => Ok(value),
                Value::Object(_) => serde_json::from_value::<Attachment>(value)
                    .map(|attachment| json!(attachment))
                    .map_err(|_| "The submitted data was not a file.".to_string()),
                _ => Err("The submitted data was not a file.".to_string()),
            },
        }
    }
}

/// Metadata of an uploaded file, as submitted by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Attachment {
    /// Lower-cased extension, if the filename has one
    pub fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }
}

/// Uniqueness enforced during validation, before any write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueRule {
    pub case_insensitive: bool,
    pub message: String,
}

/// Per-field metadata, built fresh for every serializer instantiation
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub create_only: bool,
    pub allow_blank: bool,
    pub allow_null: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Accepted on input but never persisted nor represented
    pub is_virtual: bool,
    pub filters: Vec<FieldFilter>,
    pub rules: Vec<FieldRule>,
    pub unique: Option<UniqueRule>,
}

impl FieldDescriptor {
    /// Optional, writable field. Password fields are write-only.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            read_only: false,
            write_only: kind == FieldKind::Password,
            create_only: false,
            allow_blank: false,
            allow_null: false,
            min_length: None,
            max_length: None,
            is_virtual: false,
            filters: Vec::new(),
            rules: Vec::new(),
            unique: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// Writable on creation, read-only once the instance exists
    pub fn create_only(mut self) -> Self {
        self.create_only = true;
        self
    }

    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn virtual_field(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&str, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn unique(mut self, case_insensitive: bool, message: impl Into<String>) -> Self {
        self.unique = Some(UniqueRule {
            case_insensitive,
            message: message.into(),
        });
        self
    }

    /// Whether the field shows up in representations
    pub fn is_readable(&self) -> bool {
        !self.write_only && !self.is_virtual
    }

    /// Run the per-value pipeline: null check, filters, coercion, blank check,
    /// length bounds, then rules in declaration order.
    ///
    /// Stops at the first failure and returns its message.
    pub fn clean(&self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return if self.allow_null {
                Ok(Value::Null)
            } else {
                Err("This field may not be null.".to_string())
            };
        }

        let mut value = value;
        for filter in &self.filters {
            value = filter(&self.name, value).map_err(|e| e.to_string())?;
        }

        let value = self.kind.coerce(value)?;

        if let Some(text) = value.as_str() {
            if text.is_empty() {
                return if self.allow_blank {
                    Ok(value)
                } else {
                    Err("This field may not be blank.".to_string())
                };
            }
            let length = text.chars().count();
            if let Some(min) = self.min_length
                && length < min
            {
                return Err(format!("Ensure this field has at least {} characters.", min));
            }
            if let Some(max) = self.max_length
                && length > max
            {
                return Err(format!("Ensure this field has no more than {} characters.", max));
            }
        }

        self.rules
            .iter()
            .try_fold(value, |value, rule| rule(&self.name, value))
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("read_only", &self.read_only)
            .field("write_only", &self.write_only)
            .field("create_only", &self.create_only)
            .field("is_virtual", &self.is_virtual)
            .field("filters", &self.filters.len())
            .field("rules", &self.rules.len())
            .field("unique", &self.unique)
            .finish()
    }
}
