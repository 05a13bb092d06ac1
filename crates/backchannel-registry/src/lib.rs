//! Durable connection registry for the backchannel RPC fabric.
//!
//! This crate persists which authenticated users currently hold which
//! live connections, using `RocksDB` with column families for efficient
//! per-user lookups.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `users`: user records, keyed by `user_id`
//! - `connections`: connection records, keyed by `connection_id`
//! - `connections_by_user`: index for listing a user's connections
//!
//! On top of the store sits [`Registry`], which owns the open/close
//! lifecycle: staleness sweeps, the duplicate-replay guard, and the
//! close-verification retry that protect the registry against missed
//! disconnects, replays, and crashes.
//!
//! # Example
//!
//! ```no_run
//! use backchannel_registry::{Registry, RegistryConfig, RocksStore};
//! use backchannel_core::{ConnectionId, UserId};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RocksStore::open("/tmp/backchannel-db").unwrap());
//! let registry = Registry::new(store, RegistryConfig::default());
//!
//! let user: UserId = "alice".parse().unwrap();
//! let conn = ConnectionId::generate();
//! registry.on_open(Some(&user), &conn, Some("Mozilla/5.0")).unwrap();
//! assert!(registry.is_connected(&user).unwrap());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod lookup;
pub mod registry;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use lookup::{NoUserLookup, UserLookup, UserProfile};
pub use registry::{OpenOutcome, Registry, RegistryConfig};
pub use rocks::RocksStore;
pub use types::{ConnectedUser, Connection, ConnectionSnapshot, UserSnapshot};

use backchannel_core::{ConnectionId, UserId};

/// The storage trait behind the registry.
///
/// Implementations persist user and connection records. Multi-key writes
/// must be atomic per call; the registry sequences calls so that the
/// staleness purge commits before a new row is inserted.
pub trait ConnectionStore: Send + Sync {
    /// Insert or update a user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put_user(&self, user: &ConnectedUser) -> Result<()>;

    /// Get a user record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<ConnectedUser>>;

    /// Insert or update a connection record, maintaining the user index.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put_connection(&self, connection: &Connection) -> Result<()>;

    /// Get a connection record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_connection(&self, connection_id: &ConnectionId) -> Result<Option<Connection>>;

    /// Delete a connection record and its index entry.
    ///
    /// Returns `false` when no record existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete_connection(&self, connection_id: &ConnectionId) -> Result<bool>;

    /// List all connection records for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn connections_of_user(&self, user_id: &UserId) -> Result<Vec<Connection>>;

    /// List every connection record in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn all_connections(&self) -> Result<Vec<Connection>>;

    /// Count connection records.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn count_connections(&self) -> Result<usize>;
}
