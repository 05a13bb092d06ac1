//! Registry statistics and snapshots.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use backchannel_core::UserId;
use backchannel_registry::{ConnectionStore, UserLookup, UserSnapshot};

use crate::error::ApiError;
use crate::state::HubState;

/// Registry counters plus in-memory dispatcher state.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Users with at least one live connection.
    pub users: usize,
    /// Connection rows in the registry.
    pub connections: usize,
    /// Connections addressable right now.
    pub addressable: usize,
    /// Requests currently awaiting a reply.
    pub in_flight: usize,
}

/// One user in the snapshot, with the display name resolved through the
/// identity lookup seam.
#[derive(Debug, Serialize)]
pub struct SnapshotEntry {
    /// Resolved display name; the raw user ID when the lookup knows
    /// nothing about the user.
    pub display_name: String,
    /// The registry view of this user and their connections.
    #[serde(flatten)]
    pub user: UserSnapshot,
}

/// Counters for connected users, connections, and in-flight requests.
///
/// # Errors
///
/// Returns an internal error when the registry store fails.
pub async fn stats<S>(State(state): State<HubState<S>>) -> Result<Json<StatsResponse>, ApiError>
where
    S: ConnectionStore + 'static,
{
    let registry = state.hub.registry();
    let response = StatsResponse {
        users: registry
            .count_users()
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        connections: registry
            .count_connections()
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        addressable: state.connections.len(),
        in_flight: state.hub.in_flight(),
    };
    Ok(Json(response))
}

/// A point-in-time view of connected users and their connections, with
/// display names resolved through the gateway's identity lookup.
///
/// # Errors
///
/// Returns an internal error when the registry store fails.
pub async fn snapshot<S>(
    State(state): State<HubState<S>>,
) -> Result<Json<Vec<SnapshotEntry>>, ApiError>
where
    S: ConnectionStore + 'static,
{
    let snapshot = state
        .hub
        .registry()
        .snapshot_users()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let entries = snapshot
        .into_iter()
        .map(|user| SnapshotEntry {
            display_name: display_name(&*state.lookup, &user.user_id),
            user,
        })
        .collect();
    Ok(Json(entries))
}

/// Resolve a user's display name, falling back to the raw user ID.
fn display_name(lookup: &dyn UserLookup, user_id: &UserId) -> String {
    lookup
        .lookup(user_id)
        .map_or_else(|| user_id.to_string(), |profile| profile.display_name)
}
