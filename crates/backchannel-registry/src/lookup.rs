//! User display lookup.
//!
//! Identity stores are external collaborators; the registry only needs a
//! plain key-to-record probe when rendering snapshots for diagnostics.

use backchannel_core::UserId;

/// A display record for a user, resolved from an external identity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// The user this profile describes.
    pub user_id: UserId,
    /// Human-readable display name.
    pub display_name: String,
}

/// A key-to-record probe into an external identity store.
pub trait UserLookup: Send + Sync {
    /// Resolve a user ID to a display record, if known.
    fn lookup(&self, user_id: &UserId) -> Option<UserProfile>;
}

/// A lookup that knows no one. Snapshots fall back to raw user IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUserLookup;

impl UserLookup for NoUserLookup {
    fn lookup(&self, _user_id: &UserId) -> Option<UserProfile> {
        None
    }
}
