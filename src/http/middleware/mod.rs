//! Transport decorators. Each wraps the next transport and forwards the
//! request; composition order lives in [`crate::http::ClientFactory`].

mod auth;
mod error_handling;
mod logging;

pub use auth::AuthMiddleware;
pub use error_handling::ErrorHandlingMiddleware;
pub use logging::LoggingMiddleware;
