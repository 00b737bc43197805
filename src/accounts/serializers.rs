//! User serializers

use crate::accounts::model::User;
use crate::core::entity::Entity;
use crate::core::error::{FoundationError, ValidationError};
use crate::core::field::{FieldDescriptor, FieldKind};
use crate::core::serializer::{ModelSerializer, Serializer, SerializerContext, ValidatedData};
use crate::core::validation::{filters, rules};

pub const GENDER_CHOICES: &[&str] = &["male", "female", "other"];

pub const PROFILE_PICTURE_EXTENSIONS: &[&str] = &["jpg", "png"];

pub const PASSWORD_MIN_LENGTH: usize = 5;
pub const PASSWORD_MAX_LENGTH: usize = 20;

const PASSWORD_MISMATCH: &str = "Both Password must be same";

fn password_field(name: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldKind::Password)
        .required()
        .length(Some(PASSWORD_MIN_LENGTH), Some(PASSWORD_MAX_LENGTH))
}

fn check_passwords_match(data: &ValidatedData) -> Result<(), ValidationError> {
    match (data.get_str("password1"), data.get_str("password2")) {
        (Some(first), Some(second)) if first != second => {
            Err(ValidationError::message(PASSWORD_MISMATCH))
        }
        _ => Ok(()),
    }
}

/// Detail representation of a user
///
/// Creating a user (`POST`) additionally takes `password1`, `password2` and
/// an optional `referral_code`; none of them is ever represented.
pub struct UserDetailSerializer;

impl Serializer for UserDetailSerializer {
    fn fields(&self, ctx: &SerializerContext) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldKind::Uuid).read_only(),
            FieldDescriptor::new("full_name", FieldKind::Text)
                .required()
                .length(None, Some(150))
                .filter(filters::trim()),
            FieldDescriptor::new("email", FieldKind::Email)
                .required()
                .filter(filters::trim())
                .unique(true, "You cannot create account with this email address."),
            FieldDescriptor::new("gender", FieldKind::Text)
                .allow_blank()
                .allow_null()
                .length(None, Some(20))
                .rule(rules::choices(GENDER_CHOICES)),
            FieldDescriptor::new("phone_number", FieldKind::Text)
                .allow_null()
                .length(None, Some(25))
                .filter(filters::trim())
                .rule(rules::phone_number())
                .unique(false, "You cannot create user with this phone number."),
            FieldDescriptor::new("created_at", FieldKind::DateTime).read_only(),
            // granted by administrators, never self-assigned
            FieldDescriptor::new("is_staff", FieldKind::Boolean).read_only(),
            FieldDescriptor::new("last_login", FieldKind::DateTime).read_only(),
            FieldDescriptor::new("profile_picture", FieldKind::File)
                .allow_null()
                .rule(rules::file_extension(PROFILE_PICTURE_EXTENSIONS))
                .rule(rules::attachment_size(ctx.settings.attachment_max_upload_size))
                .rule(rules::upload_to(User::entity_type())),
        ]
    }

    fn creation_fields(&self, _ctx: &SerializerContext) -> Vec<FieldDescriptor> {
        vec![
            password_field("password1"),
            password_field("password2"),
            FieldDescriptor::new("referral_code", FieldKind::Text)
                .allow_blank()
                .allow_null()
                .length(None, Some(10)),
        ]
    }

    fn validate(
        &self,
        data: ValidatedData,
        _ctx: &SerializerContext,
    ) -> Result<ValidatedData, ValidationError> {
        check_passwords_match(&data)?;
        Ok(data)
    }
}

impl ModelSerializer<User> for UserDetailSerializer {
    fn create(&self, data: &ValidatedData, _ctx: &SerializerContext) -> Result<User, FoundationError> {
        let mut user = User::default();
        user.apply_fields(&data.persisted())?;
        if let Some(password) = data.get_str("password1") {
            user.set_password(password)?;
        }
        Ok(user)
    }
}

/// Body of the password change action
pub struct PasswordChangeSerializer;

impl Serializer for PasswordChangeSerializer {
    fn fields(&self, _ctx: &SerializerContext) -> Vec<FieldDescriptor> {
        vec![password_field("password1"), password_field("password2")]
    }

    fn validate(
        &self,
        data: ValidatedData,
        _ctx: &SerializerContext,
    ) -> Result<ValidatedData, ValidationError> {
        check_passwords_match(&data)?;
        Ok(data)
    }
}
