//! Centralized error handling for the ytbridge application.
//!
//! Mirrors a typed-kind-to-HTTP-status mapping: handlers return
//! `AppResult<T>` and let [`AppError`]'s `IntoResponse` impl (see
//! `web::responses`) translate the kind into the right status code and a
//! short, client-safe body.

pub mod types;

pub use types::AppError;

/// Convenience alias for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
