//! Bearer token codec
//!
//! The client never verifies token signatures; it only reads the claims
//! payload to learn when the session expires. Any malformed input yields
//! `None` rather than an error, and a token whose claims cannot be read is
//! treated as expired.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// URL-safe base64 that tolerates both padded and unpadded segments
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Seconds beyond which an expiry cannot be a timestamp (and would not fit `i64`)
const MAX_TIMESTAMP_SECS: f64 = 1e15;

/// Claims carried by a LabTrac bearer token
///
/// Only `exp` has a required type. Every other claim is kept as raw JSON so
/// an unexpected type in a claim the client does not rely on never makes the
/// token unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time, seconds since the epoch
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Whether the token is expired at `now_secs` (seconds since the epoch)
    ///
    /// A token is live only while its expiry is strictly in the future; a
    /// token without an expiry never is.
    pub fn is_expired_at(&self, now_secs: f64) -> bool {
        match self.exp {
            Some(exp) => exp <= now_secs,
            None => true,
        }
    }

    /// Expiry as a timestamp, `None` when absent or outside chrono's range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.exp?;
        if !exp.is_finite() || exp.abs() >= MAX_TIMESTAMP_SECS {
            debug!("Token expiry {} is not a representable timestamp", exp);
            return None;
        }

        let secs = exp.floor();
        let nanos = ((exp - secs) * 1e9) as u32;
        let expires_at = DateTime::from_timestamp(secs as i64, nanos);
        if expires_at.is_none() {
            debug!("Token expiry {} is outside the supported date range", exp);
        }
        expires_at
    }

    /// Subject, usually the username
    pub fn subject(&self) -> Option<&str> {
        self.extra.get("sub").and_then(Value::as_str)
    }

    /// Backend user id, whether sent as a number or a numeric string
    pub fn user_id(&self) -> Option<i64> {
        match self.extra.get("userId")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Issued at time, seconds since the epoch
    pub fn issued_at(&self) -> Option<f64> {
        self.extra.get("iat").and_then(Value::as_f64)
    }
}

#[derive(Debug, Error)]
enum TokenError {
    #[error("token has no payload segment")]
    InvalidFormat,
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    // header.payload.signature
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or(TokenError::InvalidFormat)?;

    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode the claims payload of a token
pub fn decode(token: &str) -> Option<Claims> {
    match decode_claims(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!("Invalid bearer token: {}", e);
            None
        }
    }
}

/// Current wall-clock time in seconds since the epoch, with sub-second precision
pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Whether the token is unreadable or expired at `now_secs`
pub fn is_expired_at(token: &str, now_secs: f64) -> bool {
    decode(token).is_none_or(|claims| claims.is_expired_at(now_secs))
}

/// Whether the token is unreadable or expired right now
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_secs())
}
