// Input validation and normalization for the auth endpoints

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};

const EMAIL_MAX_LENGTH: usize = 254;
const NAME_MAX_LENGTH: usize = 100;

/// Validate an email address, returning the normalized (trimmed,
/// lowercased) form.
pub fn validate_email(email: &str) -> Result<String> {
    let normalized = email.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    if normalized.len() > EMAIL_MAX_LENGTH {
        return Err(AppError::Validation("Email is too long".to_string()));
    }

    let mut parts = normalized.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    let well_formed = parts.next().is_none()
        && !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !normalized.chars().any(char::is_whitespace);

    if !well_formed {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }

    Ok(normalized)
}

/// Validate a password against the configured strength rules
pub fn validate_password(password: &str, config: &AuthConfig) -> Result<()> {
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    if password.len() < config.password_min_length {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            config.password_min_length
        )));
    }

    if config.password_require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(
            "Password must contain at least one uppercase letter".to_string(),
        ));
    }

    if config.password_require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::Validation(
            "Password must contain at least one lowercase letter".to_string(),
        ));
    }

    if config.password_require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password must contain at least one number".to_string(),
        ));
    }

    if config.password_require_special && !password.chars().any(|c| c.is_ascii_punctuation()) {
        return Err(AppError::Validation(
            "Password must contain at least one special character".to_string(),
        ));
    }

    Ok(())
}

/// Validate an optional display name, deriving one from the email's
/// local part when absent.
pub fn resolve_name(name: Option<&str>, email: &str) -> Result<String> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            if name.len() > NAME_MAX_LENGTH {
                return Err(AppError::Validation("Name is too long".to_string()));
            }
            Ok(name.to_string())
        }
        None => {
            let local = email.split('@').next().unwrap_or_default();
            Ok(local.replace(['.', '_', '-'], " "))
        }
    }
}
