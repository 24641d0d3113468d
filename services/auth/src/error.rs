//! Custom error types for the session service

use api::ApiError;
use common::error::StoreError;
use thiserror::Error;

/// Errors reported by the session lifecycle controller
#[derive(Error, Debug)]
pub enum SessionError {
    /// The login form was incomplete
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backend rejected the username or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The stored token is missing, malformed or already expired
    #[error("Session token is missing, malformed or expired")]
    InvalidToken,

    /// Backend call failed
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Session store failed
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

/// Type alias for session results
pub type SessionResult<T> = Result<T, SessionError>;
