//! Error type definitions for the ytbridge application.
//!
//! This module defines the application-wide error hierarchy, providing a
//! small set of kinds that map directly onto the HTTP status codes the
//! playback pipeline is allowed to return.

use thiserror::Error;

/// Top-level application error type.
///
/// Each variant corresponds to one of the kinds named by the playback
/// pipeline's error handling design: `BadRequest`, `NotFound`,
/// `BadGateway`, `InternalError`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid request parameter (unknown policy, malformed itag, ...).
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// No HLS manifest available when the endpoint requires one.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Extractor failed, origin returned a non-recoverable status, HLS
    /// manifest fetch failed, or JSON parsing failed.
    #[error("bad gateway: {message}")]
    BadGateway { message: String },

    /// Required external binary missing, or configuration missing for
    /// the selected extractor mode.
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn bad_gateway<S: Into<String>>(message: S) -> Self {
        Self::BadGateway {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Truncate `text` to at most `max_chars` trailing characters, used to
    /// keep extractor stderr tails short in user-visible error bodies.
    pub fn tail(text: &str, max_chars: usize) -> String {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= max_chars {
            text.to_string()
        } else {
            chars[chars.len() - max_chars..].iter().collect()
        }
    }
}
