//! Connection lifecycle operations.
//!
//! The registry owns the open/close procedures on top of a
//! [`ConnectionStore`]: staleness sweeps, the duplicate-replay guard, the
//! close-verification retry, and the per-user / global purges. It is the
//! authoritative record of who holds a live channel; the in-memory
//! dispatcher map only reflects what is addressable right now.

use std::sync::Arc;
use std::time::Duration;

use backchannel_core::{ConnectionId, UserId};
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{ConnectedUser, Connection, ConnectionSnapshot, UserSnapshot};
use crate::ConnectionStore;

/// Tunables for the registry lifecycle.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Rows older than this are evicted by any sweep. Honest clients
    /// either finish their handshake within this window or they lost the
    /// transport before issuing a close.
    pub stale_age: Duration,
    /// Sweep all inactive rows globally on every open.
    pub auto_purge_offline: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            stale_age: Duration::from_secs(300),
            auto_purge_offline: true,
        }
    }
}

/// What an open did, for lifecycle broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Whether the open replaced an existing row for the same
    /// connection ID (duplicate-replay guard fired).
    pub replaced: bool,
}

/// The durable connection registry.
pub struct Registry<S> {
    store: Arc<S>,
    config: RegistryConfig,
}

impl<S: ConnectionStore> Registry<S> {
    /// Create a registry over a store.
    #[must_use]
    pub fn new(store: Arc<S>, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    /// The registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Record a newly opened connection.
    ///
    /// Returns `Ok(None)` for unauthenticated opens (no record is
    /// created and no event should fire). Otherwise returns whether a
    /// duplicate row was replaced, so the caller can broadcast
    /// `Reopened` instead of `Opened`.
    ///
    /// Idempotent under replays of the same connection ID.
    ///
    /// # Errors
    ///
    /// Store failures abort the open and bubble up; the registry stays
    /// consistent because the next operation re-reads the store.
    pub fn on_open(
        &self,
        user_id: Option<&UserId>,
        connection_id: &ConnectionId,
        user_agent: Option<&str>,
    ) -> Result<Option<OpenOutcome>> {
        let Some(user_id) = user_id else {
            tracing::debug!(
                connection_id = %connection_id,
                "Open without an authenticated user; connection is invisible to the registry"
            );
            return Ok(None);
        };

        let now = Utc::now();

        // Purge this user's dead rows before the new one is inserted.
        let swept = self.sweep_user(user_id, now)?;
        if swept > 0 {
            tracing::debug!(user_id = %user_id, swept, "Purged dead connection rows on open");
        }

        // Duplicate-replay guard: the same connection ID must designate
        // at most one live channel.
        let replaced = if self.store.get_connection(connection_id)?.is_some() {
            tracing::warn!(
                connection_id = %connection_id,
                user_id = %user_id,
                "Open replayed an existing connection ID; replacing the row"
            );
            self.store.delete_connection(connection_id)?;
            true
        } else {
            false
        };

        let mut user = self
            .store
            .get_user(user_id)?
            .unwrap_or_else(|| ConnectedUser::new(user_id.clone()));
        user.last_connect_at = Some(now);
        self.store.put_user(&user)?;

        self.store.put_connection(&Connection {
            connection_id: connection_id.clone(),
            user_id: user_id.clone(),
            user_agent: user_agent.map(String::from),
            active: true,
            opened_at: now,
        })?;

        if self.config.auto_purge_offline {
            let purged = self.sweep_offline_global()?;
            if purged > 0 {
                tracing::debug!(purged, "Purged offline connection rows globally");
            }
        }

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            replaced,
            "Connection opened"
        );

        Ok(Some(OpenOutcome { replaced }))
    }

    /// Record a closed connection.
    ///
    /// Returns `true` when the close was attributable to a user, i.e.
    /// when a `Closed` event may be broadcast. Idempotent under
    /// redundant closes.
    ///
    /// # Errors
    ///
    /// Store failures abort the close and bubble up.
    pub fn on_close(&self, user_id: Option<&UserId>, connection_id: &ConnectionId) -> Result<bool> {
        let Some(user_id) = user_id else {
            tracing::debug!(
                connection_id = %connection_id,
                "Close without an authenticated user; skipping registry and broadcast"
            );
            return Ok(false);
        };

        let now = Utc::now();

        if let Some(mut user) = self.store.get_user(user_id)? {
            user.last_disconnect_at = Some(now);
            self.store.put_user(&user)?;
        }

        let removed = self.store.delete_connection(connection_id)?;
        if !removed {
            tracing::warn!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Close for a connection that was not registered"
            );
        }

        // Verify the deletion took; a stale identity-map cache upstream
        // can resurrect the row.
        if self.store.get_connection(connection_id)?.is_some() {
            tracing::warn!(
                connection_id = %connection_id,
                "Connection row survived deletion; retrying once"
            );
            self.store.delete_connection(connection_id)?;
        }

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            removed,
            "Connection closed"
        );

        Ok(true)
    }

    /// Whether the user holds at least one connection that passes the
    /// staleness predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn is_connected(&self, user_id: &UserId) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .store
            .connections_of_user(user_id)?
            .iter()
            .any(|c| self.is_live(c, now)))
    }

    /// The user's live connection IDs.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn connections_of(&self, user_id: &UserId) -> Result<Vec<ConnectionId>> {
        let now = Utc::now();
        Ok(self
            .store
            .connections_of_user(user_id)?
            .into_iter()
            .filter(|c| self.is_live(c, now))
            .map(|c| c.connection_id)
            .collect())
    }

    /// Live connection IDs across a set of users.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn connections_of_users(&self, user_ids: &[UserId]) -> Result<Vec<ConnectionId>> {
        let mut all = Vec::new();
        for user_id in user_ids {
            all.extend(self.connections_of(user_id)?);
        }
        Ok(all)
    }

    /// Whether a connection row exists and is flagged active.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn connection_active(&self, connection_id: &ConnectionId) -> Result<bool> {
        Ok(self
            .store
            .get_connection(connection_id)?
            .is_some_and(|c| c.active))
    }

    /// Number of users currently holding at least one live connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn count_users(&self) -> Result<usize> {
        let now = Utc::now();
        let mut users: Vec<UserId> = self
            .store
            .all_connections()?
            .into_iter()
            .filter(|c| self.is_live(c, now))
            .map(|c| c.user_id)
            .collect();
        users.sort();
        users.dedup();
        Ok(users.len())
    }

    /// Number of connection rows in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn count_connections(&self) -> Result<usize> {
        self.store.count_connections()
    }

    /// A point-in-time view of connected users and their connections.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn snapshot_users(&self) -> Result<Vec<UserSnapshot>> {
        let now = Utc::now();
        let mut by_user: Vec<(UserId, Vec<Connection>)> = Vec::new();

        for connection in self.store.all_connections()? {
            if !self.is_live(&connection, now) {
                continue;
            }
            match by_user.iter_mut().find(|(u, _)| *u == connection.user_id) {
                Some((_, list)) => list.push(connection),
                None => by_user.push((connection.user_id.clone(), vec![connection])),
            }
        }
        by_user.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut snapshots = Vec::with_capacity(by_user.len());
        for (user_id, connections) in by_user {
            let last_connect_at = self
                .store
                .get_user(&user_id)?
                .and_then(|u| u.last_connect_at);
            snapshots.push(UserSnapshot {
                user_id,
                last_connect_at,
                connections: connections
                    .into_iter()
                    .map(|c| ConnectionSnapshot {
                        connection_id: c.connection_id,
                        user_agent: c.user_agent,
                        opened_at: c.opened_at,
                    })
                    .collect(),
            });
        }
        Ok(snapshots)
    }

    /// Delete this user's rows that are inactive or past the staleness
    /// horizon. Returns how many rows were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub fn sweep_stale(&self, user_id: &UserId) -> Result<usize> {
        self.sweep_user(user_id, Utc::now())
    }

    /// Delete every inactive row in the store. Returns how many rows
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub fn sweep_offline_global(&self) -> Result<usize> {
        let mut removed = 0;
        for connection in self.store.all_connections()? {
            if !connection.active && self.store.delete_connection(&connection.connection_id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn sweep_user(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        for connection in self.store.connections_of_user(user_id)? {
            if !self.is_live(&connection, now)
                && self.store.delete_connection(&connection.connection_id)?
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn is_live(&self, connection: &Connection, now: DateTime<Utc>) -> bool {
        if !connection.active {
            return false;
        }
        // A future `opened_at` (clock skew) yields a negative delta,
        // which `to_std` rejects; such rows count as live.
        now.signed_duration_since(connection.opened_at)
            .to_std()
            .ok()
            .is_none_or(|age| age <= self.config.stale_age)
    }
}
