//! The user entity

use chrono::{DateTime, Utc};

use crate::accounts::password::{hash_password, verify_password};
use crate::core::error::FoundationError;
use crate::impl_base_model;

impl_base_model!(User, "user", "users", {
    username: Option<String>,
    full_name: Option<String>,
    email: String,
    phone_number: Option<String>,
    gender: Option<String>,
    /// Upload path of the picture, see `helpers::upload_path`
    profile_picture: Option<String>,
    is_staff: bool,
    last_login: Option<DateTime<Utc>>,
    /// Argon2 PHC string, empty until a password is set
    password: String,
}, unique = ["email", "phone_number", "username"], unique_ignore_case = ["email"]);

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    /// Full name, or email when the name is unset or blank
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }

    pub fn set_password(&mut self, raw: &str) -> Result<(), FoundationError> {
        self.password = hash_password(raw)?;
        Ok(())
    }

    pub fn check_password(&self, raw: &str) -> bool {
        verify_password(raw, &self.password)
    }

    pub fn has_usable_password(&self) -> bool {
        !self.password.is_empty()
    }
}
