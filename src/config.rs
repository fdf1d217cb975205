use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_expiration_seconds: i64,
    pub password_min_length: usize,
    pub password_require_uppercase: bool,
    pub password_require_lowercase: bool,
    pub password_require_digit: bool,
    pub password_require_special: bool,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // 24 hours
            jwt_expiration_seconds: 86400,
            password_min_length: 8,
            password_require_uppercase: true,
            password_require_lowercase: true,
            password_require_digit: true,
            password_require_special: false,
            // OWASP 2023 recommendation: 19 MiB, 2 passes, 1 lane
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// A single fixed-window rate limit rule
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimiterRule {
    pub window_ms: u64,
    pub max_requests: u64,
    pub message: String,
}

impl Default for LimiterRule {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 100,
            message: "Too many requests, please try again later".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// General API traffic limit
    pub api: LimiterRule,
    /// Strict limit on login attempts to slow brute force
    pub login: LimiterRule,
    /// Limit on account creation to slow spam registration
    pub registration: LimiterRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api: LimiterRule::default(),
            login: LimiterRule {
                window_ms: 15 * 60 * 1000,
                max_requests: 5,
                message: "Too many login attempts, please try again after 15 minutes".to_string(),
            },
            registration: LimiterRule {
                window_ms: 60 * 60 * 1000,
                max_requests: 3,
                message: "Too many registration attempts, please try again later".to_string(),
            },
        }
    }
}

/// Log output format; unknown values are rejected at load time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        // Determine environment
        let environment = env::var("AUTHGATE_ENV").unwrap_or_else(|_| "development".to_string());

        // Build configuration
        let config = config::Config::builder()
            // Optional base config file
            .add_source(config::File::with_name("config/default").required(false))
            // Optional environment-specific config
            .add_source(config::File::with_name(&format!("config/{}", environment)).required(false))
            // Environment variables with prefix AUTHGATE
            // e.g., AUTHGATE__SERVER__PORT=8080
            .add_source(
                config::Environment::with_prefix("AUTHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        // Deserialize into our Config struct; serde defaults fill the gaps
        config
            .try_deserialize()
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration("Invalid port number".to_string()));
        }

        if self.auth.jwt_expiration_seconds <= 0 {
            return Err(AppError::Configuration(
                "JWT expiration must be positive".to_string(),
            ));
        }

        if self.auth.password_min_length < 8 {
            return Err(AppError::Configuration(
                "Password min length must be at least 8".to_string(),
            ));
        }

        if self.auth.argon2_iterations == 0 || self.auth.argon2_parallelism == 0 {
            return Err(AppError::Configuration(
                "Argon2 cost parameters must be positive".to_string(),
            ));
        }

        for (name, rule) in [
            ("api", &self.rate_limit.api),
            ("login", &self.rate_limit.login),
            ("registration", &self.rate_limit.registration),
        ] {
            if rule.window_ms == 0 {
                return Err(AppError::Configuration(format!(
                    "Rate limit window for '{}' must be positive",
                    name
                )));
            }
            if rule.max_requests == 0 {
                return Err(AppError::Configuration(format!(
                    "Rate limit quota for '{}' must be positive",
                    name
                )));
            }
        }

        Ok(())
    }
}
