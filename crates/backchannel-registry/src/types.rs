//! Records persisted by the registry.

use backchannel_core::{ConnectionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record.
///
/// Created lazily on the first open of any connection under the user ID
/// and never deleted by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedUser {
    /// Unique identifier for the user.
    pub user_id: UserId,
    /// When the user last opened a connection.
    pub last_connect_at: Option<DateTime<Utc>>,
    /// When the user last closed a connection.
    pub last_disconnect_at: Option<DateTime<Utc>>,
}

impl ConnectedUser {
    /// Create a fresh record with no timestamps.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            last_connect_at: None,
            last_disconnect_at: None,
        }
    }
}

/// A connection record.
///
/// Created in the open handler and deleted in the close handler or by
/// the staleness sweeper; mutated by no one else. On honest shutdown the
/// row is deleted, not flipped to inactive; inactive rows only linger
/// after a crash and are removed by the purge rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier for the connection.
    pub connection_id: ConnectionId,
    /// The user holding this connection.
    pub user_id: UserId,
    /// Free-form label captured at open, when tracked.
    pub user_agent: Option<String>,
    /// Whether the channel was live when last written.
    pub active: bool,
    /// When the connection was opened; drives staleness eviction.
    pub opened_at: DateTime<Utc>,
}

/// A point-in-time view of one user and their connections.
#[derive(Debug, Clone, Serialize)]
pub struct UserSnapshot {
    /// The user.
    pub user_id: UserId,
    /// When the user last opened a connection.
    pub last_connect_at: Option<DateTime<Utc>>,
    /// The user's live connections at snapshot time.
    pub connections: Vec<ConnectionSnapshot>,
}

/// A point-in-time view of one connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSnapshot {
    /// The connection.
    pub connection_id: ConnectionId,
    /// Free-form label captured at open, when tracked.
    pub user_agent: Option<String>,
    /// When the connection was opened.
    pub opened_at: DateTime<Utc>,
}
