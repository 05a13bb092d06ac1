//! The hub: correlator, lifecycle hooks, and response decoding.

use std::future::Future;
use std::sync::Arc;

use backchannel_blob::{BlobError, BlobStore};
use backchannel_core::{
    ConnectionEvent, ConnectionId, EventKind, Frame, RequestId, Response, UserId,
};
use backchannel_registry::{ConnectionStore, Registry};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::admission::Admission;
use crate::config::HubConfig;
use crate::decode;
use crate::error::{HubError, Result};
use crate::pending::PendingRequests;
use crate::target::{self, Resolved, Target};
use crate::transport::Transport;

/// The coordination core: connection registry, request correlator, and
/// large-payload spillover, combined over one shared transport.
pub struct Hub<S, T> {
    registry: Registry<S>,
    transport: Arc<T>,
    blobs: Arc<dyn BlobStore>,
    pending: PendingRequests,
    admission: Admission,
    config: HubConfig,
}

impl<S: ConnectionStore, T: Transport> Hub<S, T> {
    /// Create a hub over a registry store, a frame transport, and a blob
    /// side-channel.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        transport: Arc<T>,
        blobs: Arc<dyn BlobStore>,
        config: HubConfig,
    ) -> Self {
        let registry = Registry::new(store, config.registry_config());
        let admission = Admission::new(config.max_concurrent_requests, config.semaphore_timeout());
        Self {
            registry,
            transport,
            blobs,
            pending: PendingRequests::new(),
            admission,
            config,
        }
    }

    /// The durable connection registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// The hub configuration.
    #[must_use]
    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Number of requests currently awaiting a reply.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Number of admission permits currently available.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.admission.available()
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Record a newly opened connection and broadcast the lifecycle
    /// event when enabled.
    ///
    /// Unauthenticated opens create no record and fire no event; the
    /// transport may still keep the socket, but it is invisible here.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Store` when the registry store fails; the open
    /// is aborted and the registry stays consistent.
    pub async fn handle_open(
        &self,
        user_id: Option<&UserId>,
        connection_id: &ConnectionId,
        user_agent: Option<&str>,
    ) -> Result<()> {
        let user_agent = if self.config.track_user_agent {
            user_agent
        } else {
            None
        };

        let Some(user_id) = user_id else {
            self.registry.on_open(None, connection_id, user_agent)?;
            return Ok(());
        };

        let Some(outcome) = self
            .registry
            .on_open(Some(user_id), connection_id, user_agent)?
        else {
            return Ok(());
        };

        if self.config.broadcast_connection_events {
            let kind = if outcome.replaced {
                EventKind::Reopened
            } else {
                EventKind::Opened
            };
            self.broadcast_event(user_id, connection_id, user_agent, kind)
                .await;
        }
        Ok(())
    }

    /// Record a closed connection and broadcast the lifecycle event when
    /// enabled. Closes without a user never broadcast.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Store` when the registry store fails.
    pub async fn handle_close(
        &self,
        user_id: Option<&UserId>,
        connection_id: &ConnectionId,
    ) -> Result<()> {
        let Some(user_id) = user_id else {
            self.registry.on_close(None, connection_id)?;
            return Ok(());
        };

        let broadcast = self.registry.on_close(Some(user_id), connection_id)?;
        if broadcast && self.config.broadcast_connection_events {
            self.broadcast_event(user_id, connection_id, None, EventKind::Closed)
                .await;
        }
        Ok(())
    }

    async fn broadcast_event(
        &self,
        user_id: &UserId,
        connection_id: &ConnectionId,
        user_agent: Option<&str>,
        kind: EventKind,
    ) {
        let frame = Frame::Event {
            method: self.config.connection_event_method.clone(),
            event: ConnectionEvent {
                user_id: user_id.clone(),
                connection_id: connection_id.clone(),
                user_agent: user_agent.map(String::from),
                kind,
                at: Utc::now(),
            },
        };
        if let Err(e) = self.transport.broadcast(frame).await {
            tracing::warn!(error = %e, ?kind, "Failed to broadcast connection event");
        }
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Invoke `method` on the target and return the raw reply envelope.
    ///
    /// The first reply to arrive wins; later replies are dropped with a
    /// warning. An `Error` envelope is returned unchanged here — use
    /// [`Hub::invoke_typed`] for decoded results.
    ///
    /// # Errors
    ///
    /// - `HubError::Overloaded` when no admission permit frees up in time
    /// - `HubError::NoTarget` / `HubError::InactiveConnection` from
    ///   target resolution
    /// - `HubError::Timeout` when no reply arrives by the deadline
    pub async fn invoke(&self, target: Target, method: &str, param: Value) -> Result<Response> {
        let deadline = Instant::now() + self.config.request_timeout();
        self.invoke_until(target, method, param, deadline, std::future::pending())
            .await
    }

    /// Like [`Hub::invoke`], with a caller-supplied cancellation signal.
    /// Whichever of the signal and the request timeout fires first wins.
    ///
    /// # Errors
    ///
    /// As [`Hub::invoke`], plus `HubError::Cancelled` when the signal
    /// fires before a reply arrives.
    pub async fn invoke_with_cancel<C>(
        &self,
        target: Target,
        method: &str,
        param: Value,
        cancel: C,
    ) -> Result<Response>
    where
        C: Future<Output = ()> + Send,
    {
        let deadline = Instant::now() + self.config.request_timeout();
        self.invoke_until(target, method, param, deadline, cancel)
            .await
    }

    /// Invoke `method` on the target and decode the reply into `R`.
    ///
    /// Returns `Ok(None)` for a `Null` reply. Blob replies are read from
    /// the side-channel under the same deadline as the call, and deleted
    /// after a successful decode when read-once cleanup applies.
    ///
    /// # Errors
    ///
    /// As [`Hub::invoke`], plus `HubError::Client` when the peer's
    /// executor failed, `HubError::BlobMissing` when a referenced blob
    /// is gone, and `HubError::Decode` when the payload does not match
    /// `R`.
    pub async fn invoke_typed<R: DeserializeOwned>(
        &self,
        target: Target,
        method: &str,
        param: Value,
    ) -> Result<Option<R>> {
        let deadline = Instant::now() + self.config.request_timeout();
        let response = self
            .invoke_until(target, method, param, deadline, std::future::pending())
            .await?;
        self.decode_response(response, deadline).await
    }

    async fn invoke_until<C>(
        &self,
        target: Target,
        method: &str,
        param: Value,
        deadline: Instant,
        cancel: C,
    ) -> Result<Response>
    where
        C: Future<Output = ()> + Send,
    {
        // The permit is an RAII guard: released on every exit path.
        let _permit = self.admission.acquire().await?;

        let resolved = target::resolve(&self.registry, &target)?;
        let request_id = RequestId::generate();
        let receiver = self.pending.register(request_id)?;

        tracing::debug!(
            request_id = %request_id,
            method,
            target = ?target,
            "Dispatching call"
        );

        let frame = Frame::Call {
            request_id,
            method: method.to_string(),
            param,
        };
        self.fan_out(&resolved, frame).await;

        tokio::pin!(cancel);
        let result = tokio::select! {
            reply = receiver => match reply {
                Ok(response) => Ok(response),
                // The sender only disappears when the slot is removed
                // without completing, which no other path does.
                Err(_) => {
                    tracing::warn!(request_id = %request_id, "Completion slot vanished");
                    Err(HubError::Timeout)
                }
            },
            () = tokio::time::sleep_until(deadline) => Err(HubError::Timeout),
            () = &mut cancel => Err(HubError::Cancelled),
        };

        self.pending.remove(&request_id);

        match &result {
            Ok(response) => {
                tracing::debug!(request_id = %request_id, kind = response.kind(), "Call completed");
            }
            Err(e) => {
                tracing::debug!(request_id = %request_id, error = %e, "Call failed");
            }
        }
        result
    }

    /// Fan a call frame out to its resolved targets. Partial send
    /// failures are logged and swallowed; the call still succeeds if any
    /// remaining target replies.
    async fn fan_out(&self, resolved: &Resolved, frame: Frame) {
        match resolved {
            Resolved::Broadcast => {
                if let Err(e) = self.transport.broadcast(frame).await {
                    tracing::warn!(error = %e, "Broadcast send failed");
                }
            }
            Resolved::Set(connection_ids) => {
                let mut sent = 0usize;
                for connection_id in connection_ids {
                    match self.transport.send(connection_id, frame.clone()).await {
                        Ok(()) => sent += 1,
                        Err(e) => {
                            tracing::warn!(
                                connection_id = %connection_id,
                                error = %e,
                                "Send to target failed; continuing with the rest"
                            );
                        }
                    }
                }
                if sent == 0 {
                    tracing::warn!("No target accepted the frame; awaiting the deadline");
                }
            }
        }
    }

    /// Hand an inbound reply to its pending request.
    ///
    /// Returns `false` when the request is unknown or already completed;
    /// the reply is dropped with a warning.
    pub fn complete(&self, request_id: &RequestId, response: Response) -> bool {
        let accepted = self.pending.complete(request_id, response);
        if !accepted {
            tracing::warn!(
                request_id = %request_id,
                "Dropping reply for an unknown or already-completed request"
            );
        }
        accepted
    }

    // =========================================================================
    // Response decoding
    // =========================================================================

    async fn decode_response<R: DeserializeOwned>(
        &self,
        response: Response,
        deadline: Instant,
    ) -> Result<Option<R>> {
        match response {
            Response::Null => Ok(None),
            Response::Error { message } => {
                tracing::error!(error = %message, "Client executor returned an error");
                Err(HubError::Client(message))
            }
            Response::Inline { payload } => decode::decode_payload(payload).map(Some),
            Response::Blob { path } => {
                let bytes = tokio::time::timeout_at(deadline, self.blobs.read(&path))
                    .await
                    .map_err(|_| HubError::Timeout)?
                    .map_err(|e| match e {
                        BlobError::NotFound(p) => HubError::BlobMissing(p),
                        other => HubError::Blob(other),
                    })?;

                let value: Value = serde_json::from_slice(&bytes)
                    .map_err(|e| HubError::Decode(e.to_string()))?;
                let decoded = decode::decode_payload(value)?;

                if self.config.auto_delete_temp_files
                    && path_in_folder(&path, &self.config.temp_folder)
                {
                    match self.blobs.delete(&path).await {
                        Ok(true) => {
                            tracing::debug!(path = %path, "Deleted reply blob after read");
                        }
                        Ok(false) => {
                            tracing::debug!(path = %path, "Reply blob already gone");
                        }
                        Err(e) => {
                            tracing::warn!(path = %path, error = %e, "Failed to delete reply blob");
                        }
                    }
                }

                Ok(Some(decoded))
            }
        }
    }
}

/// Whether `path` has `folder` as a directory component. Read-once
/// cleanup only applies to blobs inside the configured temp folder.
fn path_in_folder(path: &str, folder: &str) -> bool {
    std::path::Path::new(path)
        .parent()
        .is_some_and(|parent| {
            parent
                .components()
                .any(|c| c.as_os_str() == std::ffi::OsStr::new(folder))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use backchannel_blob::FsBlobStore;
    use backchannel_registry::RocksStore;
    use crate::transport::TransportError;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTransport {
        frames: Mutex<Vec<Frame>>,
    }

    impl RecordingTransport {
        fn events(&self) -> Vec<(String, EventKind)> {
            self.frames
                .lock()
                .iter()
                .filter_map(|frame| match frame {
                    Frame::Event { method, event } => Some((method.clone(), event.kind)),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(
            &self,
            _connection_id: &ConnectionId,
            frame: Frame,
        ) -> std::result::Result<(), TransportError> {
            self.frames.lock().push(frame);
            Ok(())
        }

        async fn broadcast(&self, frame: Frame) -> std::result::Result<(), TransportError> {
            self.frames.lock().push(frame);
            Ok(())
        }
    }

    fn hub_with(
        config: HubConfig,
    ) -> (
        Hub<RocksStore, RecordingTransport>,
        Arc<RecordingTransport>,
        TempDir,
        TempDir,
    ) {
        let db_dir = TempDir::new().unwrap();
        let blob_dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(db_dir.path()).unwrap());
        let transport = Arc::new(RecordingTransport::default());
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(blob_dir.path()));
        let hub = Hub::new(store, Arc::clone(&transport), blobs, config);
        (hub, transport, db_dir, blob_dir)
    }

    fn user(id: &str) -> UserId {
        id.parse().unwrap()
    }

    fn conn(id: &str) -> ConnectionId {
        id.parse().unwrap()
    }

    #[tokio::test]
    async fn open_and_close_broadcast_events() {
        let (hub, transport, _db, _blobs) = hub_with(HubConfig::default());
        let u1 = user("U1");

        hub.handle_open(Some(&u1), &conn("C1"), Some("firefox"))
            .await
            .unwrap();
        hub.handle_close(Some(&u1), &conn("C1")).await.unwrap();

        assert_eq!(
            transport.events(),
            vec![
                ("OnConnectionEvent".to_string(), EventKind::Opened),
                ("OnConnectionEvent".to_string(), EventKind::Closed),
            ]
        );
    }

    #[tokio::test]
    async fn replayed_open_broadcasts_reopened() {
        let (hub, transport, _db, _blobs) = hub_with(HubConfig::default());
        let u1 = user("U1");

        hub.handle_open(Some(&u1), &conn("C1"), None).await.unwrap();
        hub.handle_open(Some(&u1), &conn("C1"), None).await.unwrap();

        let kinds: Vec<EventKind> = transport.events().into_iter().map(|(_, k)| k).collect();
        assert_eq!(kinds, vec![EventKind::Opened, EventKind::Reopened]);
    }

    #[tokio::test]
    async fn unauthenticated_lifecycle_stays_silent() {
        let (hub, transport, _db, _blobs) = hub_with(HubConfig::default());

        hub.handle_open(None, &conn("C1"), None).await.unwrap();
        hub.handle_close(None, &conn("C1")).await.unwrap();

        assert!(transport.events().is_empty());
        assert_eq!(hub.registry().count_connections().unwrap(), 0);
    }

    #[tokio::test]
    async fn broadcasting_can_be_disabled() {
        let config = HubConfig {
            broadcast_connection_events: false,
            ..HubConfig::default()
        };
        let (hub, transport, _db, _blobs) = hub_with(config);

        hub.handle_open(Some(&user("U1")), &conn("C1"), None)
            .await
            .unwrap();
        assert!(transport.events().is_empty());
    }

    #[tokio::test]
    async fn user_agent_tracking_can_be_disabled() {
        let config = HubConfig {
            track_user_agent: false,
            ..HubConfig::default()
        };
        let (hub, _transport, _db, _blobs) = hub_with(config);
        let u1 = user("U1");

        hub.handle_open(Some(&u1), &conn("C1"), Some("firefox"))
            .await
            .unwrap();

        let snapshot = hub.registry().snapshot_users().unwrap();
        assert!(snapshot[0].connections[0].user_agent.is_none());
    }

    #[test]
    fn temp_folder_membership() {
        assert!(path_in_folder("signalr-temp/Big_1.json", "signalr-temp"));
        assert!(path_in_folder(
            "http://blobs/signalr-temp/Big_1.json",
            "signalr-temp"
        ));
        assert!(!path_in_folder("persistent/Big_1.json", "signalr-temp"));
        // The folder must be a directory component, not the file name.
        assert!(!path_in_folder("signalr-temp", "signalr-temp"));
    }
}
