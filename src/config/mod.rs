//! Settings loading and management
//!
//! Settings are read from YAML, then overridden by `APP_*` environment
//! variables (`APP_OTP_LENGTH=4` overrides `otp_length`), then validated.
//!
//! ```yaml
//! otp_length: 6
//! attachment_max_upload_size: 5242880
//! api_prefix: /api/v1
//! cors_allow_all: false
//! page_size: 20
//! max_page_size: 100
//! log_filter: info
//! bind_address: 127.0.0.1:8000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use validator::Validate;

use crate::core::error::ConfigurationError;

/// Prefix of environment variables overriding settings
pub const ENV_PREFIX: &str = "APP_";

/// Application settings shared by validators, viewsets and the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Exact length of one-time codes
    #[validate(range(min = 1, max = 32))]
    pub otp_length: usize,

    /// Largest accepted upload, in bytes
    #[validate(range(min = 1))]
    pub attachment_max_upload_size: u64,

    /// Path every resource router is nested under
    pub api_prefix: String,

    /// Install a permissive CORS layer
    pub cors_allow_all: bool,

    /// Default number of items per list page
    #[validate(range(min = 1))]
    pub page_size: usize,

    /// Upper bound on the `limit` query parameter
    #[validate(range(min = 1))]
    pub max_page_size: usize,

    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[validate(length(min = 1))]
    pub log_filter: String,

    pub bind_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            otp_length: 6,
            attachment_max_upload_size: 5 * 1024 * 1024,
            api_prefix: "/api/v1".to_string(),
            cors_allow_all: false,
            page_size: 20,
            max_page_size: 100,
            log_filter: "info".to_string(),
            bind_address: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(yaml)?;
        Ok(settings)
    }

    /// File (or defaults), then process environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        let settings = settings.with_env_overrides(std::env::vars())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `APP_<FIELD>` overrides from the given variables.
    ///
    /// Values are parsed as YAML scalars, except for text settings which take
    /// the raw string. Variables not naming a setting are ignored.
    pub fn with_env_overrides<I, K, V>(self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let Value::Object(mut fields) = serde_json::to_value(&self)? else {
            anyhow::bail!("settings do not serialize to a map");
        };

        for (key, raw) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let name = name.to_lowercase();
            let Some(current) = fields.get(&name) else {
                continue;
            };
            let raw = raw.as_ref();
            let value = if current.is_string() {
                Value::String(raw.to_string())
            } else {
                serde_yaml::from_str::<Value>(raw)
                    .with_context(|| format!("invalid value for {}{}", ENV_PREFIX, name.to_uppercase()))?
            };
            tracing::debug!(setting = %name, "overridden from environment");
            fields.insert(name, value);
        }

        serde_json::from_value(Value::Object(fields)).context("invalid settings override")
    }

    /// Check cross-field and format constraints
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        Validate::validate(self).map_err(|errors| ConfigurationError::InvalidSettings {
            message: errors.to_string(),
        })?;

        let invalid = |message: String| ConfigurationError::InvalidSettings { message };

        if !self.api_prefix.starts_with('/') || self.api_prefix.ends_with('/') {
            return Err(invalid(format!(
                "api_prefix must start with '/' and not end with one (got '{}')",
                self.api_prefix
            )));
        }
        if self.page_size > self.max_page_size {
            return Err(invalid(format!(
                "page_size ({}) exceeds max_page_size ({})",
                self.page_size, self.max_page_size
            )));
        }
        self.socket_addr()?;
        Ok(())
    }

    /// Parsed bind address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigurationError> {
        self.bind_address
            .parse()
            .map_err(|_| ConfigurationError::InvalidSettings {
                message: format!("bind_address '{}' is not a socket address", self.bind_address),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.otp_length, 6);
        assert_eq!(settings.attachment_max_upload_size, 5_242_880);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml_str("otp_length: 4\ncors_allow_all: true\n").unwrap();
        assert_eq!(settings.otp_length, 4);
        assert!(settings.cors_allow_all);
        assert_eq!(settings.page_size, 20);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::default()
            .with_env_overrides([
                ("APP_OTP_LENGTH", "8"),
                ("APP_API_PREFIX", "/api/v2"),
                ("APP_CORS_ALLOW_ALL", "true"),
                ("APP_UNKNOWN", "ignored"),
                ("HOME", "/root"),
            ])
            .unwrap();
        assert_eq!(settings.otp_length, 8);
        assert_eq!(settings.api_prefix, "/api/v2");
        assert!(settings.cors_allow_all);
    }

    #[test]
    fn test_env_override_with_wrong_type_fails() {
        let result = Settings::default().with_env_overrides([("APP_PAGE_SIZE", "many")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_otp = Settings {
            otp_length: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_otp.validate(),
            Err(ConfigurationError::InvalidSettings { .. })
        ));

        let bad_prefix = Settings {
            api_prefix: "api".into(),
            ..Default::default()
        };
        assert!(bad_prefix.validate().is_err());

        let inverted_pages = Settings {
            page_size: 200,
            ..Default::default()
        };
        assert!(inverted_pages.validate().is_err());

        let bad_addr = Settings {
            bind_address: "localhost".into(),
            ..Default::default()
        };
        assert!(bad_addr.validate().is_err());
    }
}
