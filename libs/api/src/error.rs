//! Custom error types for the REST client

use common::error::StoreError;
use reqwest::StatusCode;
use thiserror::Error;

/// Custom error type for calls to the LabTrac backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend could not be reached or the response could not be read
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the credentials or the bearer token
    #[error("Unauthorized ({status})")]
    Unauthorized { status: StatusCode },

    /// Any other non-2xx response
    #[error("Backend responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The bearer token could not be read from the session store
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Whether this error means the current credentials are no longer valid
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { status } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            ApiError::Store(_) => None,
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
