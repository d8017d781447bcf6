//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$...`), which carry the
//! algorithm parameters and salt alongside the digest.

use argon2::Argon2;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use transitgate_core::DomainError;

/// Stored password verifier in PHC string format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a new password with a fresh random salt.
    pub fn derive(password: &str) -> Result<Self, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DomainError::validation(format!("password cannot be hashed: {e}")))?;
        Ok(Self(phc.to_string()))
    }

    /// A malformed stored hash never verifies.
    pub fn verify(&self, password: &str) -> bool {
        match password_hash::PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_only_the_original_password() {
        let hash = PasswordHash::derive("correct horse").unwrap();
        assert!(hash.verify("correct horse"));
        assert!(!hash.verify("correct horse "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = PasswordHash::derive("pw").unwrap();
        let b = PasswordHash::derive("pw").unwrap();
        assert_ne!(a, b);
        assert!(a.verify("pw") && b.verify("pw"));
    }

    #[test]
    fn stored_form_is_an_argon2id_phc_string() {
        let hash = PasswordHash::derive("correct horse").unwrap();
        assert!(hash.as_phc().starts_with("$argon2id$"));
        assert!(!hash.as_phc().contains("correct horse"));

        let json = serde_json::to_string(&hash).unwrap();
        let back: PasswordHash = serde_json::from_str(&json).unwrap();
        assert!(back.verify("correct horse"));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        let broken = PasswordHash("not-a-phc-string".into());
        assert!(!broken.verify("not-a-phc-string"));
        assert!(!broken.verify(""));
    }
}
