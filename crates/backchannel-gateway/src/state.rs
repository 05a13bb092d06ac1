//! Gateway application state.

use std::sync::Arc;

use backchannel_hub::Hub;
use backchannel_registry::{ConnectionStore, UserLookup};

use crate::auth::Authenticator;
use crate::config::GatewayConfig;
use crate::connections::ConnectionMap;

/// Shared application state for the gateway.
///
/// The hub and the connection map are the same objects the registry and
/// correlator use; handlers only hold references.
pub struct HubState<S: ConnectionStore> {
    /// The coordination core.
    pub hub: Arc<Hub<S, ConnectionMap>>,
    /// The per-connection outbound channels (the transport).
    pub connections: Arc<ConnectionMap>,
    /// The authentication seam.
    pub auth: Arc<dyn Authenticator>,
    /// The identity display probe, used when rendering snapshots.
    pub lookup: Arc<dyn UserLookup>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S: ConnectionStore> HubState<S> {
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        hub: Arc<Hub<S, ConnectionMap>>,
        connections: Arc<ConnectionMap>,
        auth: Arc<dyn Authenticator>,
        lookup: Arc<dyn UserLookup>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            hub,
            connections,
            auth,
            lookup,
            config,
        }
    }
}

impl<S: ConnectionStore> Clone for HubState<S> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            connections: Arc::clone(&self.connections),
            auth: Arc::clone(&self.auth),
            lookup: Arc::clone(&self.lookup),
            config: self.config.clone(),
        }
    }
}
