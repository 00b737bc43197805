//! Validation library
//!
//! Three layers, from the bottom up:
//!
//! - [`validators`]: pure functions over typed values (phone numbers, OTPs,
//!   dates, attachment sizes)
//! - [`rules`]: closures adapting validators to field descriptors
//! - [`filters`]: normalizers applied before a value is validated
//!
//! ```rust,ignore
//! FieldDescriptor::new("phone_number", FieldKind::Text)
//!     .allow_null()
//!     .filter(filters::strip_whitespace())
//!     .rule(rules::phone_number())
//!     .unique(false, "You cannot create user with this phone number.")
//! ```

pub mod filters;
pub mod rules;
pub mod validators;

pub use validators::{
    is_future_datetime, validate_attachment, validate_coded_phone_number, validate_dob,
    validate_future_date, validate_name, validate_not_future_date, validate_otp,
    validate_phone_number, validate_phone_number_without_country_code,
};
