//! Argon2 password hashing

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use uuid::Uuid;

use crate::core::error::FoundationError;

/// Hash a raw password into a PHC string
pub fn hash_password(password: &str) -> Result<String, FoundationError> {
    // 16 random bytes from a v4 UUID
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| FoundationError::Internal(format!("failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| FoundationError::Internal(format!("failed to hash password: {}", e)))
}

/// Whether `password` matches the stored hash; malformed hashes never match
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
