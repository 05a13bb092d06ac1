//! The seam to the frame transport.
//!
//! The hub never talks to sockets directly; it hands frames to an
//! implementation of [`Transport`], and the transport's inbound loop
//! hands replies back via [`crate::Hub::complete`]. The registry and the
//! correlator share one transport, so connection IDs coincide across
//! both.

use async_trait::async_trait;
use backchannel_core::{ConnectionId, Frame};
use thiserror::Error;

/// Per-connection send plus broadcast over a fire-and-forget transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a frame to one connection.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection is not addressable or the
    /// send fails. The hub logs and swallows these for fan-out sends.
    async fn send(&self, connection_id: &ConnectionId, frame: Frame) -> Result<(), TransportError>;

    /// Send a frame to every addressable connection.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport-wide failures; individual
    /// dead connections are skipped.
    async fn broadcast(&self, frame: Frame) -> Result<(), TransportError>;
}

/// Errors from the frame transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is not in the dispatcher table right now. The
    /// registry and the dispatcher may briefly diverge during open and
    /// close; callers send optimistically and let the deadline handle
    /// replies that never come.
    #[error("connection {0} is not addressable")]
    UnknownConnection(ConnectionId),

    /// The frame could not be handed to the connection's channel.
    #[error("send failed: {0}")]
    Send(String),
}
