//! Argon2id password hashing.
//!
//! Hashes are PHC strings, so the salt and cost parameters travel with the
//! hash and verification needs nothing else.

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Password processing error.
///
/// Messages never contain the plaintext.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing failed")]
    HashingFailed,
    #[error("stored password hash is malformed")]
    InvalidHashFormat,
    #[error("password verification failed")]
    VerificationFailed,
}

/// Salted one-way password hasher.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Argon2id with the given memory cost (KiB) and iteration count.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| PasswordError::HashingFailed)?;

        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// Uses the parameters embedded in `hash` and compares digests in
    /// constant time. A mismatch is `Ok(false)`, not an error.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(PasswordError::VerificationFailed),
        }
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::new(8, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_same_input_different_hashes() {
        let hasher = cheap();
        let first = hasher.hash("p").unwrap();
        let second = hasher.hash("p").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("p", &first).unwrap());
        assert!(hasher.verify("p", &second).unwrap());
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hash = cheap().hash("plaintext-secret").unwrap();
        assert!(!hash.contains("plaintext-secret"));
    }

    #[test]
    fn test_verify_uses_embedded_parameters() {
        let hash = PasswordHasher::new(16, 2).unwrap().hash("p").unwrap();
        assert!(cheap().verify("p", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let err = cheap().verify("p", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, PasswordError::InvalidHashFormat));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(
            PasswordHasher::new(0, 0),
            Err(PasswordError::InvalidParams(_))
        ));
    }
}
