//! Application state shared by every consumer of the session.

use std::sync::Arc;

use capstock_auth::{FileStorage, SessionStore, TokenStorage};

use crate::api::ApiClient;
use crate::auth::AuthApi;
use crate::config::ClientConfig;
use crate::routes::Navigator;
use crate::users::UserApi;

/// One session store, built at startup and handed to the request pipeline,
/// the navigator and the API wrappers by reference.
pub struct AppState {
    pub session: Arc<SessionStore>,
    pub api: ApiClient,
    pub auth: AuthApi,
    pub users: UserApi,
    pub navigator: Navigator<Arc<SessionStore>>,
}

impl AppState {
    /// Build state backed by the on-disk token store named in `config`.
    pub fn new(config: &ClientConfig) -> Self {
        let storage = Arc::new(FileStorage::new(&config.storage_path));
        tracing::debug!(path = %config.storage_path.display(), "using file token storage");
        Self::with_storage(&config.api_url, storage)
    }

    /// Build state over any storage backend (tests use memory storage).
    pub fn with_storage(api_url: &str, storage: Arc<dyn TokenStorage>) -> Self {
        Self::with_session(api_url, Arc::new(SessionStore::with_system_clock(storage)))
    }

    pub fn with_session(api_url: &str, session: Arc<SessionStore>) -> Self {
        let api = ApiClient::new(api_url, session.clone());

        Self {
            auth: AuthApi::new(api.clone()),
            users: UserApi::new(api.clone()),
            navigator: Navigator::new(session.clone()),
            api,
            session,
        }
    }
}
