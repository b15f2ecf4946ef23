use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::ServiceError;

/// Hash a password using Argon2id with a fresh random salt.
///
/// Two calls on the same plaintext produce different strings, so equality
/// of hashes must never be used to compare passwords; use
/// [`verify_password`] instead.
pub fn hash_password(plaintext: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC hash string.
///
/// The salt and algorithm parameters are embedded in the hash itself; the
/// comparison is constant-time inside the argon2 crate. A malformed hash
/// verifies as `false` rather than erroring: a stored hash this crate did
/// not produce is indistinguishable from a wrong password.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_plaintext_hashes_differently() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
    }

    #[test]
    fn verify_accepts_any_hash_of_the_right_plaintext() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert!(verify_password("secret", &a));
        assert!(verify_password("secret", &b));
    }

    #[test]
    fn verify_rejects_wrong_plaintext() {
        let hash = hash_password("secret").unwrap();
        assert!(!verify_password("Secret", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn verify_rejects_garbage_hashes() {
        assert!(!verify_password("secret", "not-a-phc-string"));
        assert!(!verify_password("secret", ""));
    }

    #[test]
    fn hash_is_not_the_plaintext() {
        let hash = hash_password("secret").unwrap();
        assert_ne!(hash, "secret");
        assert!(!hash.contains("secret"));
    }
}
