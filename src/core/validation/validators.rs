//! Stateless input validators
//!
//! Each validator returns its input back on success, or a [`ValidationError`]
//! carrying one user-facing message under `non_field_errors`. Rules attached
//! to field descriptors re-key that message to the field being validated.
//!
//! Validators that compare against the current date take `today` / `now` as an
//! argument so callers decide which clock is authoritative.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::core::error::ValidationError;
use crate::core::helpers::combine_date_parts;

/// Optional 3-digit country code (with optional `+` and `-`) then 7 to 10 digits
///
/// Digits are ASCII only, like every other phone check in this module.
pub const PHONE_NUMBER_PATTERN: &str = r"^(([+]?[0-9]{3})-?)?[0-9]{7,10}$";

/// Inclusive lower and exclusive upper bound on age in calendar years
pub const MIN_AGE_YEARS: i32 = 16;
pub const MAX_AGE_YEARS: i32 = 100;

fn phone_number_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| Regex::new(PHONE_NUMBER_PATTERN).expect("valid phone pattern"))
}

/// Letters and spaces only, at least one letter
pub fn validate_name(name: &str) -> Result<&str, ValidationError> {
    let mut letters = name.chars().filter(|c| *c != ' ').peekable();
    if letters.peek().is_none() || !letters.all(char::is_alphabetic) {
        return Err(ValidationError::message(
            "Name Should not contain any special characters.",
        ));
    }
    Ok(name)
}

/// A bare local number: 7 to 10 digits
pub fn validate_phone_number_without_country_code(number: &str) -> Result<&str, ValidationError> {
    let length = number.chars().count();
    if !(7..=10).contains(&length) {
        return Err(ValidationError::message("Phone Number should range from 7-10."));
    }
    if !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::message("Phone Number Should Be Integer"));
    }
    Ok(number)
}

/// Local number with an optional country code prefix
pub fn validate_phone_number(number: &str) -> Result<&str, ValidationError> {
    if !phone_number_regex().is_match(number) {
        return Err(ValidationError::message(
            "Phone Number format is not valid. Some examples of supported phone numbers \
             are 9811111111, 08256666, 977-9833333333, +977-9833333333, 977-08256666",
        ));
    }
    Ok(number)
}

/// `<country code>-<number>` with a mandatory dash
pub fn validate_coded_phone_number(number: &str) -> Result<&str, ValidationError> {
    let mut parts = number.split('-');
    let (country_code, local) = match (parts.next(), parts.next(), parts.next()) {
        (Some(code), Some(local), None) => (code, local),
        _ => return Err(ValidationError::message("Phone Number format is incorrect.")),
    };

    validate_phone_number_without_country_code(local)?;

    if country_code.is_empty() || !country_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::message("Country Code Should Be Integer"));
    }
    Ok(number)
}

/// One-time code of exactly `length` characters
pub fn validate_otp(otp: &str, length: usize) -> Result<&str, ValidationError> {
    if otp.chars().count() != length {
        return Err(ValidationError::message(format!(
            "Otp should have length of {}",
            length
        )));
    }
    Ok(otp)
}

/// Age, counted as the difference of calendar years, must be in `16..100`
pub fn validate_dob(dob: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let age = today.year() - dob.year();
    if !(MIN_AGE_YEARS..MAX_AGE_YEARS).contains(&age) {
        return Err(ValidationError::message(
            "Age must be in between 16 years and 100 years.",
        ));
    }
    Ok(dob)
}

/// Strictly after `now`
pub fn is_future_datetime(
    value: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    if value <= now {
        return Err(ValidationError::message("DateTime Must Be Future."));
    }
    Ok(value)
}

/// Upload size in bytes must not exceed `max_size`
pub fn validate_attachment(size: u64, max_size: u64) -> Result<u64, ValidationError> {
    if size > max_size {
        let megabytes = max_size as f64 / (1024.0 * 1024.0);
        return Err(ValidationError::message(format!(
            "File Size Should not Exceed {:?} MB",
            megabytes
        )));
    }
    Ok(size)
}

/// The assembled date must exist and must not be after `today`
pub fn validate_not_future_date(
    year: i32,
    month: u32,
    day: u32,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let date = combine_date_parts(year, month, day)
        .ok_or_else(|| ValidationError::message("Invalid Date Passed."))?;
    if date > today {
        return Err(ValidationError::message("Date Must not be in future."));
    }
    Ok(date)
}

/// The assembled date must exist and must not be before `today`
pub fn validate_future_date(
    year: i32,
    month: u32,
    day: u32,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let date = combine_date_parts(year, month, day)
        .ok_or_else(|| ValidationError::message("Invalid Date Passed."))?;
    if date < today {
        return Err(ValidationError::message("Date Must be in future."));
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::NON_FIELD_ERRORS;
    use chrono::{Duration, TimeZone};

    fn message(err: ValidationError) -> String {
        err.messages(NON_FIELD_ERRORS)
            .and_then(|m| m.first().cloned())
            .unwrap_or_default()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // === validate_name ===

    #[test]
    fn test_name_letters_and_spaces() {
        assert_eq!(validate_name("Ada Lovelace").unwrap(), "Ada Lovelace");
        assert!(validate_name("José Ñúñez").is_ok());
    }

    #[test]
    fn test_name_rejects_digits_and_symbols() {
        for name in ["R2D2", "ada_l", "Ada-Lovelace", "", "   "] {
            let err = validate_name(name).unwrap_err();
            assert_eq!(message(err), "Name Should not contain any special characters.");
        }
    }

    // === phone numbers ===

    #[test]
    fn test_phone_number_supported_formats() {
        for number in [
            "9811111111",
            "08256666",
            "977-9833333333",
            "+977-9833333333",
            "977-08256666",
            "9779833333333",
        ] {
            assert!(validate_phone_number(number).is_ok(), "{number} should pass");
        }
    }

    #[test]
    fn test_phone_number_rejects_malformed() {
        for number in ["123", "abcdefghij", "98111", "+97-9833333333", ""] {
            assert!(validate_phone_number(number).is_err(), "{number} should fail");
        }
    }

    #[test]
    fn test_phone_without_code_length_checked_first() {
        assert_eq!(
            message(validate_phone_number_without_country_code("123").unwrap_err()),
            "Phone Number should range from 7-10."
        );
        assert_eq!(
            message(validate_phone_number_without_country_code("98111a1111").unwrap_err()),
            "Phone Number Should Be Integer"
        );
        assert!(validate_phone_number_without_country_code("9811111").is_ok());
    }

    #[test]
    fn test_phone_validators_agree_on_non_ascii_digits() {
        let arabic_indic = "\u{669}\u{668}\u{661}\u{661}\u{661}\u{661}\u{661}";
        assert!(validate_phone_number(arabic_indic).is_err());
        assert!(validate_phone_number_without_country_code(arabic_indic).is_err());
        assert!(validate_coded_phone_number(&format!("977-{}", arabic_indic)).is_err());
        assert!(validate_phone_number("\u{967}\u{966}9833333333").is_err());
    }

    #[test]
    fn test_coded_phone_number() {
        assert!(validate_coded_phone_number("977-9811111111").is_ok());
        assert_eq!(
            message(validate_coded_phone_number("9779811111111").unwrap_err()),
            "Phone Number format is incorrect."
        );
        assert_eq!(
            message(validate_coded_phone_number("977-98-11111111").unwrap_err()),
            "Phone Number format is incorrect."
        );
        assert_eq!(
            message(validate_coded_phone_number("97a-9811111111").unwrap_err()),
            "Country Code Should Be Integer"
        );
        assert_eq!(
            message(validate_coded_phone_number("977-98").unwrap_err()),
            "Phone Number should range from 7-10."
        );
    }

    // === validate_otp ===

    #[test]
    fn test_otp_length() {
        assert!(validate_otp("123456", 6).is_ok());
        assert_eq!(
            message(validate_otp("12345", 6).unwrap_err()),
            "Otp should have length of 6"
        );
        assert!(validate_otp("1234567", 6).is_err());
        assert!(validate_otp("1234", 4).is_ok());
    }

    // === validate_dob ===

    #[test]
    fn test_dob_age_bounds() {
        let today = date(2024, 6, 1);
        assert!(validate_dob(date(2009, 1, 1), today).is_err());
        assert!(validate_dob(date(2008, 12, 31), today).is_ok());
        assert!(validate_dob(date(1925, 1, 1), today).is_ok());
        let err = validate_dob(date(1924, 1, 1), today).unwrap_err();
        assert_eq!(message(err), "Age must be in between 16 years and 100 years.");
    }

    // === is_future_datetime ===

    #[test]
    fn test_future_datetime() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert!(is_future_datetime(now + Duration::seconds(1), now).is_ok());
        assert_eq!(
            message(is_future_datetime(now, now).unwrap_err()),
            "DateTime Must Be Future."
        );
    }

    // === validate_attachment ===

    #[test]
    fn test_attachment_size() {
        let max = 5 * 1024 * 1024;
        assert!(validate_attachment(max, max).is_ok());
        assert_eq!(
            message(validate_attachment(max + 1, max).unwrap_err()),
            "File Size Should not Exceed 5.0 MB"
        );
    }

    // === date parts ===

    #[test]
    fn test_not_future_date() {
        let today = date(2024, 6, 1);
        assert_eq!(validate_not_future_date(2024, 6, 1, today).unwrap(), today);
        assert_eq!(
            message(validate_not_future_date(2024, 6, 2, today).unwrap_err()),
            "Date Must not be in future."
        );
        assert_eq!(
            message(validate_not_future_date(2024, 2, 30, today).unwrap_err()),
            "Invalid Date Passed."
        );
    }

    #[test]
    fn test_future_date() {
        let today = date(2024, 6, 1);
        assert!(validate_future_date(2024, 6, 1, today).is_ok());
        assert_eq!(
            message(validate_future_date(2024, 5, 31, today).unwrap_err()),
            "Date Must be in future."
        );
        assert_eq!(
            message(validate_future_date(0, 5, 31, today).unwrap_err()),
            "Invalid Date Passed."
        );
    }
}
