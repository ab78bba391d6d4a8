//! Bearer token decoding.
//!
//! DESIGN
//! ======
//! Tokens are three dot-separated segments with a base64url JSON payload in
//! the middle. This module only decodes; signatures are never checked here.
//! Integrity comes from the TLS channel to the issuing backend.

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use std::collections::BTreeSet;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Backends differ on whether they pad the payload segment; accept both.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Structural failures while decoding a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: expected 3 segments, found {0}")]
    SegmentCount(usize),
    #[error("malformed token: payload is not base64url: {0}")]
    Base64(String),
    #[error("malformed token: payload is not UTF-8")]
    Utf8,
    #[error("malformed token: invalid claims JSON: {0}")]
    Json(String),
}

/// Decoded token payload as issued by the blog backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Issuer.
    #[serde(default)]
    pub iss: String,
    /// Subject; the username.
    pub sub: String,
    /// Issued-at, seconds since the Unix epoch.
    #[serde(default, deserialize_with = "deserialize_i64_from_number")]
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub exp: i64,
    /// Numeric user identifier.
    #[serde(default, deserialize_with = "deserialize_i64_from_number")]
    pub user_id: i64,
    /// Space-delimited authority names (e.g. `"ROLE_READER ROLE_WRITER"`).
    #[serde(default)]
    pub authorities: String,
    /// Display name.
    #[serde(default)]
    pub profile_name: String,
}

impl Claims {
    /// Authorities as a role set. Blank input yields an empty set.
    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        self.authorities.split_whitespace().map(str::to_owned).collect()
    }
}

/// Decode the claims carried by `token`.
///
/// # Errors
///
/// Returns a [`TokenError`] when the token does not have three segments or
/// its payload is not base64url-encoded claims JSON.
pub fn decode(token: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(TokenError::SegmentCount(segments.len()));
    };

    let bytes = PAYLOAD_ENGINE
        .decode(payload)
        .map_err(|e| TokenError::Base64(e.to_string()))?;
    let json = std::str::from_utf8(&bytes).map_err(|_| TokenError::Utf8)?;
    serde_json::from_str(json).map_err(|e| TokenError::Json(e.to_string()))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(int);
            }
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Ok(float as i64);
            }
            Err(D::Error::custom("expected integer-compatible number"))
        }
        _ => Err(D::Error::custom("expected number")),
    }
}
