//! The in-process connection map.
//!
//! One outbound channel per live socket. This map IS the frame
//! transport: the hub's fan-out lands here, and the per-connection
//! writer task drains the channel onto the wire.
//!
//! The map reflects what is addressable *right now*; the durable
//! registry is the authority on who is connected. The two may briefly
//! diverge during open and close, which the hub tolerates by sending
//! optimistically.

use std::collections::HashMap;

use async_trait::async_trait;
use backchannel_core::{ConnectionId, Frame};
use backchannel_hub::{Transport, TransportError};
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Buffered frames per connection before sends start failing.
pub const OUTBOUND_BUFFER: usize = 64;

/// The table of per-connection outbound channels.
#[derive(Default)]
pub struct ConnectionMap {
    channels: RwLock<HashMap<ConnectionId, mpsc::Sender<Frame>>>,
}

impl ConnectionMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel.
    pub fn register(&self, connection_id: ConnectionId, sender: mpsc::Sender<Frame>) {
        let previous = self.channels.write().insert(connection_id.clone(), sender);
        if previous.is_some() {
            tracing::warn!(
                connection_id = %connection_id,
                "Replaced an existing outbound channel for this connection"
            );
        }
    }

    /// Remove a connection's outbound channel.
    pub fn deregister(&self, connection_id: &ConnectionId) {
        self.channels.write().remove(connection_id);
    }

    /// Number of addressable connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// Whether no connections are addressable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }
}

#[async_trait]
impl Transport for ConnectionMap {
    async fn send(&self, connection_id: &ConnectionId, frame: Frame) -> Result<(), TransportError> {
        // Clone the sender out of the lock; never hold it across await.
        let sender = self
            .channels
            .read()
            .get(connection_id)
            .cloned()
            .ok_or_else(|| TransportError::UnknownConnection(connection_id.clone()))?;

        sender
            .send(frame)
            .await
            .map_err(|_| TransportError::Send(format!("outbound channel closed: {connection_id}")))
    }

    async fn broadcast(&self, frame: Frame) -> Result<(), TransportError> {
        let senders: Vec<(ConnectionId, mpsc::Sender<Frame>)> = self
            .channels
            .read()
            .iter()
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect();

        for (connection_id, sender) in senders {
            if sender.send(frame.clone()).await.is_err() {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Skipping dead connection during broadcast"
                );
            }
        }
        Ok(())
    }
}
