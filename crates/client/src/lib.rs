//! `capstock-client`
//!
//! HTTP client for the CapStock backend, built around the session core in
//! `capstock-auth`:
//! - Request pipeline that attaches the session credential to every call
//! - Login/logout that keep the persisted session in step with the backend
//! - Dashboard route table with authentication and role gates
//!
//! The backend remains the authority on every decision made here.

pub mod api;
pub mod augment;
pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod users;

pub use api::ApiClient;
pub use augment::augment;
pub use auth::AuthApi;
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use routes::{Navigation, Navigator, RouteDef, RouteMatch};
pub use state::AppState;
pub use types::{LoginRequest, Picture, ProfileUpdate, TokenResponse, UserResponse, UserUpdate};
pub use users::UserApi;
