// Password hashing with Argon2id; cost parameters come from AuthConfig
// (defaults follow the OWASP 2023 recommendation).

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

pub fn hash_password(password: &str, config: &AuthConfig) -> Result<String> {
    if password.is_empty() {
        return Err(AppError::Validation(
            "Password cannot be empty".to_string(),
        ));
    }

    let params = Params::new(
        config.argon2_memory_kib,
        config.argon2_iterations,
        config.argon2_parallelism,
        Some(32),
    )
    .map_err(|e| AppError::Cryptographic(format!("Invalid Argon2 parameters: {}", e)))?;

    let hasher = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Cryptographic(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash. The hash string encodes
/// the parameters it was created with, so older hashes keep verifying
/// after the configured costs change.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Cryptographic(format!("Failed to parse password hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Cryptographic(format!(
            "Password verification error: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap costs keep the tests fast; parameter flow is asserted
    // against the PHC string directly.
    fn fast_config() -> AuthConfig {
        AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_password_salts() {
        let password = "Correct-horse-9";
        let hash = hash_password(password, &fast_config()).unwrap();
        assert!(hash.starts_with("$argon2id$"));

        // Random salt: same input, different hash
        let hash2 = hash_password(password, &fast_config()).unwrap();
        assert_ne!(hash, hash2);
    }

    #[test]
    fn test_configured_costs_flow_into_hash() {
        let hash = hash_password("Correct-horse-9", &fast_config()).unwrap();
        assert!(hash.contains("m=1024,t=1,p=1"), "got {}", hash);

        let default_hash = hash_password("Correct-horse-9", &AuthConfig::default()).unwrap();
        assert!(default_hash.contains("m=19456,t=2,p=1"), "got {}", default_hash);
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let password = "Correct-horse-9";
        let hash = hash_password(password, &fast_config()).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_empty_password() {
        let result = hash_password("", &fast_config());
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
