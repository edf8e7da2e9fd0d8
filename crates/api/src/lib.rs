//! Union Payments API - REST surface for payment issuance
//!
//! Callers authenticate with a bearer token resolved through the
//! directory; every response uses the `{success, message?, data?}`
//! envelope.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{PageLimits, ServerConfig};
pub use error::ApiError;
pub use handlers::ApiResponse;
pub use routes::create_router;
pub use state::AppState;
