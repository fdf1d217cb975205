pub mod auth;
pub mod health;
pub mod routes;

pub use routes::{create_router, AppState};
