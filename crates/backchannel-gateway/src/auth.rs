//! The authentication seam.
//!
//! The transport handshake and its authentication are external
//! collaborators: this gateway only needs *an authenticated user ID, or
//! none* for each incoming upgrade request. Deployments plug their own
//! [`Authenticator`]; the default reads a trusted proxy header.
//!
//! Unauthenticated sockets are still permitted — the registry simply
//! treats them as invisible.

use axum::http::HeaderMap;
use backchannel_core::UserId;

/// The default header consulted by [`HeaderAuthenticator`].
pub const USER_ID_HEADER: &str = "x-backchannel-user";

/// Resolves an upgrade request to an authenticated user, if any.
pub trait Authenticator: Send + Sync {
    /// Return the authenticated user for this request, or `None` for an
    /// anonymous socket.
    fn authenticate(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// Authenticates from a trusted reverse-proxy header.
#[derive(Debug, Clone)]
pub struct HeaderAuthenticator {
    header: String,
}

impl HeaderAuthenticator {
    /// Use a custom header name.
    #[must_use]
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl Default for HeaderAuthenticator {
    fn default() -> Self {
        Self::new(USER_ID_HEADER)
    }
}

impl Authenticator for HeaderAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<UserId> {
        headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }
}
