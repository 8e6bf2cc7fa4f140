//! Client error model.

use capstock_auth::StorageError;
use thiserror::Error;

/// Failures surfaced to callers of the HTTP client.
///
/// Network and HTTP failures are returned as-is; nothing here retries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request could not be built or the transport failed (DNS, connect,
    /// reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status.
    #[error("API error ({0}): {1}")]
    Api(u16, String),

    /// Response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Login succeeded at the HTTP level but the response had no token.
    #[error("login response did not contain a token")]
    MissingToken,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(status, _) => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
