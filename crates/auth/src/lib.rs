//! `capstock-auth`: client-side session and authorization core.
//!
//! This crate has no HTTP dependency: it decodes session
//! tokens, owns the persisted token, derives roles, and evaluates navigation
//! gates. The HTTP client crate wires it into outgoing requests.
//!
//! Token signatures are never verified here; the backend is the authority.

pub mod claims;
pub mod codec;
pub mod guard;
pub mod roles;
pub mod session;
pub mod storage;

pub use claims::Claims;
pub use codec::{DecodeError, decode};
pub use guard::{
    GateOutcome, NavigationContext, NavigationPipeline, authentication_gate, role_gate,
    HOME_ROUTE, SIGN_IN_ROUTE,
};
pub use roles::{Role, RoleSet, extract_roles};
pub use session::{Clock, SessionState, SessionStore, SessionView, SystemClock, TOKEN_KEY};
pub use storage::{FileStorage, MemoryStorage, StorageError, TokenStorage};
