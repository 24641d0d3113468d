//! REST client for the LabTrac backend
//!
//! Only the endpoints used by the session and label-printing flows are
//! exposed here.

pub mod client;
pub mod error;
pub mod models;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use reqwest::StatusCode;
