//! Request augmentation: attach the session credential to outgoing calls.

use reqwest::Request;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use capstock_auth::SessionView;

/// Pre-send stage of the request pipeline.
///
/// With an authenticated, unexpired session the request gets
/// `Authorization: Bearer <token>`. Otherwise it is returned untouched and
/// still sent; rejecting it is the backend's call.
pub fn augment(session: &dyn SessionView, mut request: Request) -> Request {
    // Checked first: it evicts a stale token before we read it.
    if !session.is_authenticated() {
        tracing::debug!(url = %request.url(), "no valid session; sending without credentials");
        return request;
    }

    let Some(token) = session.token() else {
        return request;
    };

    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
            tracing::trace!(url = %request.url(), "attached bearer credential");
        }
        Err(_) => {
            tracing::warn!("session token is not a valid header value; sending without credentials");
        }
    }

    request
}
