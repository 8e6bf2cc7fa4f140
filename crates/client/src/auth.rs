//! Session lifecycle: login and logout.
//!
//! Both operations mutate the session store as a side effect of the network
//! call. Login only stores a token it actually received. Logout always clears
//! the local token, whether or not the backend call went through.

use reqwest::Method;
use serde_json::json;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::types::{LoginRequest, TokenResponse};

pub const LOGIN_PATH: &str = "auth/login";
pub const LOGOUT_PATH: &str = "auth/logout";

#[derive(Debug, Clone)]
pub struct AuthApi {
    api: ApiClient,
}

impl AuthApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Authenticate and persist the issued token.
    ///
    /// Transport and HTTP failures are returned untouched. A success response
    /// without a token is a [`ClientError::MissingToken`] and stores nothing.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<TokenResponse, ClientError> {
        let builder = self.api.request(Method::POST, LOGIN_PATH).json(credentials);
        let response: TokenResponse = self.api.execute_json(builder).await?;

        let Some(token) = response.token.as_deref().filter(|t| !t.is_empty()) else {
            tracing::error!("login response contained no token");
            return Err(ClientError::MissingToken);
        };

        self.api.session().set_token(token)?;

        let claims = self.api.session().claims();
        tracing::info!(
            subject = claims.as_ref().and_then(|c| c.sub()),
            expires_at = ?claims.as_ref().and_then(|c| c.expires_at()),
            roles = ?self.api.session().roles(),
            "login succeeded"
        );

        Ok(response)
    }

    /// Invalidate the server-side session, then clear the local token.
    ///
    /// The local token is cleared even when the call fails; the network
    /// error is still returned so the caller can report it.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let builder = self.api.request(Method::POST, LOGOUT_PATH).json(&json!({}));
        let remote = self.api.execute(builder).await;

        let local = self.api.session().clear_token();
        match (&remote, &local) {
            (Ok(_), Ok(())) => tracing::info!("logout succeeded"),
            (Err(err), _) => tracing::warn!(error = %err, "logout call failed; local session cleared"),
            (Ok(_), Err(err)) => tracing::error!(error = %err, "failed to clear local session"),
        }

        remote?;
        local?;
        Ok(())
    }
}
