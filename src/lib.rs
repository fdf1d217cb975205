// Authgate library

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod observability;
pub mod rate_limit;
pub mod store;
pub mod validation;

pub use config::Config;
pub use errors::{AppError, Result};
