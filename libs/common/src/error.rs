//! Custom error types for the common library
//!
//! This module defines the error types shared by the session store bridge
//! and the configuration loader.

use redis::RedisError;
use thiserror::Error;

/// Custom error type for session store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error returned by the Redis backend
    #[error("Redis store error: {0}")]
    Redis(#[from] RedisError),

    /// A mutation event could not be encoded or decoded
    #[error("Storage event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Store configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised while loading the client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration sources could not be merged or deserialized
    #[error("Configuration error: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A value was present but unusable
    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
