//! Client configuration.

use std::path::PathBuf;

use capstock_auth::{FileStorage, StorageError};
use thiserror::Error;

pub const API_URL_VAR: &str = "CAPSTOCK_API_URL";
pub const STORAGE_PATH_VAR: &str = "CAPSTOCK_STORAGE_PATH";
pub const DEFAULT_API_URL: &str = "http://localhost:5117/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },

    #[error("cannot determine storage path: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is joined onto.
    pub api_url: String,
    /// Where the session token is persisted.
    pub storage_path: PathBuf,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, storage_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let api_url = normalize_api_url(api_url.into())?;
        Ok(Self {
            api_url,
            storage_path: storage_path.into(),
        })
    }

    /// Read `CAPSTOCK_API_URL` and `CAPSTOCK_STORAGE_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup(API_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("{API_URL_VAR} not set; using {DEFAULT_API_URL}");
                DEFAULT_API_URL.to_string()
            });

        let storage_path = match lookup(STORAGE_PATH_VAR).filter(|v| !v.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => FileStorage::default_path()?,
        };

        Self::new(api_url, storage_path)
    }
}

fn normalize_api_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    let parsed = reqwest::Url::parse(&trimmed).map_err(|e| ConfigError::InvalidApiUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl {
            url: raw,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(trimmed)
}
