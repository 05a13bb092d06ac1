//! Targeting: mapping a logical target to concrete connection IDs.

use backchannel_core::{ConnectionId, UserId};
use backchannel_registry::{ConnectionStore, Registry};

use crate::error::{HubError, Result};

/// Who a call is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every connected client.
    All,
    /// Every connection held by one user.
    User(UserId),
    /// Every connection held by any of these users.
    Users(Vec<UserId>),
    /// One specific connection.
    Connection(ConnectionId),
    /// A caller-supplied set of connections, passed through unprobed.
    Connections(Vec<ConnectionId>),
}

/// A target resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Send to every connection; no explicit list is needed.
    Broadcast,
    /// Send to this non-empty set of connections.
    Set(Vec<ConnectionId>),
}

/// Resolve a target to concrete connections.
///
/// Per-user targets sweep stale registry rows first, so a row past the
/// staleness horizon never survives a resolution pass.
///
/// # Errors
///
/// - `HubError::NoTarget` when the resolved set is empty
/// - `HubError::InactiveConnection` when an explicitly targeted
///   connection is not active
/// - `HubError::Store` when the registry store fails
pub fn resolve<S: ConnectionStore>(registry: &Registry<S>, target: &Target) -> Result<Resolved> {
    match target {
        Target::All => Ok(Resolved::Broadcast),

        Target::User(user_id) => {
            registry.sweep_stale(user_id)?;
            let connections = registry.connections_of(user_id)?;
            if connections.is_empty() {
                return Err(HubError::NoTarget);
            }
            Ok(Resolved::Set(connections))
        }

        Target::Users(user_ids) => {
            for user_id in user_ids {
                registry.sweep_stale(user_id)?;
            }
            let connections = registry.connections_of_users(user_ids)?;
            if connections.is_empty() {
                return Err(HubError::NoTarget);
            }
            Ok(Resolved::Set(connections))
        }

        Target::Connection(connection_id) => {
            if registry.connection_active(connection_id)? {
                Ok(Resolved::Set(vec![connection_id.clone()]))
            } else {
                Err(HubError::InactiveConnection(connection_id.clone()))
            }
        }

        Target::Connections(connection_ids) => {
            if connection_ids.is_empty() {
                return Err(HubError::NoTarget);
            }
            Ok(Resolved::Set(connection_ids.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backchannel_registry::{RegistryConfig, RocksStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (Registry<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (Registry::new(store, RegistryConfig::default()), dir)
    }

    fn user(id: &str) -> UserId {
        id.parse().unwrap()
    }

    fn conn(id: &str) -> ConnectionId {
        id.parse().unwrap()
    }

    #[test]
    fn all_is_broadcast() {
        let (registry, _dir) = setup();
        assert_eq!(resolve(&registry, &Target::All).unwrap(), Resolved::Broadcast);
    }

    #[test]
    fn user_resolves_to_their_connections() {
        let (registry, _dir) = setup();
        let u1 = user("U1");
        registry.on_open(Some(&u1), &conn("C1"), None).unwrap();
        registry.on_open(Some(&u1), &conn("C2"), None).unwrap();

        let resolved = resolve(&registry, &Target::User(u1)).unwrap();
        match resolved {
            Resolved::Set(mut ids) => {
                ids.sort();
                assert_eq!(ids, vec![conn("C1"), conn("C2")]);
            }
            Resolved::Broadcast => panic!("expected an explicit set"),
        }
    }

    #[test]
    fn disconnected_user_is_no_target() {
        let (registry, _dir) = setup();
        let result = resolve(&registry, &Target::User(user("U_offline")));
        assert!(matches!(result, Err(HubError::NoTarget)));
    }

    #[test]
    fn resolution_sweeps_stale_rows() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let registry = Registry::new(
            Arc::clone(&store),
            RegistryConfig {
                stale_age: Duration::from_secs(300),
                ..RegistryConfig::default()
            },
        );

        use backchannel_registry::{Connection, ConnectionStore as _};
        store
            .put_connection(&Connection {
                connection_id: conn("C_old"),
                user_id: user("U1"),
                user_agent: None,
                active: true,
                opened_at: chrono::Utc::now() - chrono::Duration::seconds(600),
            })
            .unwrap();

        let result = resolve(&registry, &Target::User(user("U1")));
        assert!(matches!(result, Err(HubError::NoTarget)));
        // The pass deleted the row, not just filtered it.
        assert!(store.get_connection(&conn("C_old")).unwrap().is_none());
    }

    #[test]
    fn users_merge_across_the_set() {
        let (registry, _dir) = setup();
        registry
            .on_open(Some(&user("U1")), &conn("C1"), None)
            .unwrap();
        registry
            .on_open(Some(&user("U2")), &conn("C2"), None)
            .unwrap();

        let resolved = resolve(
            &registry,
            &Target::Users(vec![user("U1"), user("U2"), user("U3")]),
        )
        .unwrap();
        match resolved {
            Resolved::Set(mut ids) => {
                ids.sort();
                assert_eq!(ids, vec![conn("C1"), conn("C2")]);
            }
            Resolved::Broadcast => panic!("expected an explicit set"),
        }
    }

    #[test]
    fn active_connection_passes_probe() {
        let (registry, _dir) = setup();
        registry
            .on_open(Some(&user("U1")), &conn("C1"), None)
            .unwrap();

        let resolved = resolve(&registry, &Target::Connection(conn("C1"))).unwrap();
        assert_eq!(resolved, Resolved::Set(vec![conn("C1")]));
    }

    #[test]
    fn unknown_connection_is_inactive() {
        let (registry, _dir) = setup();
        let result = resolve(&registry, &Target::Connection(conn("C_gone")));
        assert!(matches!(result, Err(HubError::InactiveConnection(_))));
    }

    #[test]
    fn connection_set_passes_through() {
        let (registry, _dir) = setup();
        // No registry probe: unknown IDs simply never reply.
        let resolved = resolve(
            &registry,
            &Target::Connections(vec![conn("C1"), conn("C_unknown")]),
        )
        .unwrap();
        assert_eq!(resolved, Resolved::Set(vec![conn("C1"), conn("C_unknown")]));

        let result = resolve(&registry, &Target::Connections(Vec::new()));
        assert!(matches!(result, Err(HubError::NoTarget)));
    }
}
