// JWT access token generation and validation

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "authgate";
const AUDIENCE: &str = "authgate-api";

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// JWT ID (unique token identifier)
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: Vec<String>,
}

impl Claims {
    pub fn new(user_id: Uuid, email: &str, duration_seconds: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(duration_seconds);

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            iss: ISSUER.to_string(),
            aud: vec![AUDIENCE.to_string()],
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// Get the subject as a user ID
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|e| AppError::TokenValidation(format!("Invalid subject UUID: {}", e)))
    }
}

/// JWT token manager for generation and validation
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_seconds: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("expiration_seconds", &self.expiration_seconds)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Create new JWT manager from configuration.
    ///
    /// The signing secret comes from the AUTHGATE__AUTH__JWT_SECRET
    /// environment variable and must be at least 32 bytes.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let secret = std::env::var("AUTHGATE__AUTH__JWT_SECRET").map_err(|_| {
            AppError::Configuration(
                "JWT secret must be set via AUTHGATE__AUTH__JWT_SECRET environment variable"
                    .to_string(),
            )
        })?;

        Self::from_secret(&secret, config)
    }

    /// Create a manager from an explicit secret
    pub fn from_secret(secret: &str, config: &AuthConfig) -> Result<Self> {
        if secret.len() < 32 {
            return Err(AppError::Configuration(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_seconds: config.jwt_expiration_seconds,
        })
    }

    /// Generate an access token for a user
    pub fn generate_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        let claims = Claims::new(user_id, email, self.expiration_seconds);
        let header = Header::new(Algorithm::HS256);

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AppError::TokenGeneration(format!("Failed to encode JWT: {}", e)))
    }

    /// Validate and decode an access token
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        let claims = token_data.claims;

        if claims.is_expired() {
            return Err(AppError::TokenExpired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_manager() -> JwtManager {
        JwtManager::from_secret(
            "test-secret-key-for-jwt-signing-minimum-length",
            &AuthConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "user@example.com", 900);

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.iss, "authgate");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_token_roundtrip() {
        let manager = test_manager();
        let user_id = Uuid::new_v4();

        let token = manager.generate_token(user_id, "user@example.com").unwrap();
        assert!(!token.is_empty());

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "user@example.com");
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = test_manager();
        let token = manager
            .generate_token(Uuid::new_v4(), "user@example.com")
            .unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(manager.validate_token(&tampered).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = JwtManager::from_secret("too-short", &AuthConfig::default());
        assert!(matches!(result.unwrap_err(), AppError::Configuration(_)));
    }
}
