//! Session-token decoding.
//!
//! Tokens are three dot-separated base64url segments (header, payload,
//! signature). Only the payload is read; the signature is not checked.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;
use thiserror::Error;

use crate::Claims;

/// Standard alphabet, padding optional. The URL-safe characters are mapped
/// onto it before decoding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is empty")]
    Empty,

    #[error("token must have exactly three segments, found {0}")]
    Structure(usize),

    #[error("token payload segment is empty")]
    EmptyPayload,

    #[error("payload is not valid base64: {0}")]
    Base64(String),

    #[error("payload is not valid UTF-8")]
    Utf8,

    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Decode the payload segment of a session token into [`Claims`].
///
/// Pure function: no IO, no clock, no panics.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Structure(segments.len()));
    }

    let payload = segments[1];
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let standard: String = payload
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = PAYLOAD_ENGINE
        .decode(standard.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    let text = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;

    match serde_json::from_str::<Value>(&text).map_err(|e| DecodeError::Json(e.to_string()))? {
        Value::Object(map) => Ok(Claims::new(map)),
        _ => Err(DecodeError::NotAnObject),
    }
}
