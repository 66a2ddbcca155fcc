//! Account password policy and argon2 hashing.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AppError;

pub const MIN_LEN: usize = 8;

/// Checks the policy, then hashes. Used by signup and by profile updates.
pub fn hash_new(plain: &str) -> Result<String, AppError> {
    if plain.chars().count() < MIN_LEN {
        return Err(AppError::Validation("Password too short".into()));
    }
    Ok(hash(plain)?)
}

pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(argon_failure("hash"))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(argon_failure("parse stored hash"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

fn argon_failure(op: &'static str) -> impl Fn(password_hash::Error) -> anyhow::Error {
    move |e| {
        error!(error = %e, op, "argon2 failure");
        anyhow::anyhow!("argon2 {op}: {e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_matches_only_its_password() {
        let stored = hash_new("correct-horse").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verify("correct-horse", &stored).unwrap());
        assert!(!verify("wrong-horse", &stored).unwrap());
    }

    #[test]
    fn salts_differ_per_hash() {
        assert_ne!(hash("same-input").unwrap(), hash("same-input").unwrap());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let err = hash_new("short").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(hash_new("12345678").is_ok());
    }

    #[test]
    fn unreadable_stored_hash_is_an_error() {
        assert!(verify("anything", "plaintext-in-db").is_err());
    }
}
