//! WebSocket client for the hub.
//!
//! Connects to the hub's `/hub/ws` endpoint and runs the frame loop:
//! every inbound `Call` is executed concurrently with its siblings and
//! answered with exactly one `Reply`; lifecycle `Event` frames are
//! routed to the executor as notifications with no reply.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;

use backchannel_blob::BlobStore;
use backchannel_core::{Frame, RequestId};

use crate::envelope::envelope_for;
use crate::error::{ClientError, Result};
use crate::executor::ClientExecutor;

/// Options for a hub client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Inline-vs-blob threshold for reply payloads, in bytes.
    pub max_direct_data_size: usize,
    /// Blob folder for spilled replies.
    pub temp_folder: String,
    /// Extra headers for the connection handshake, e.g. the
    /// authentication header expected by the gateway.
    pub headers: Vec<(String, String)>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_direct_data_size: 10 * 1024,
            temp_folder: "signalr-temp".to_string(),
            headers: Vec::new(),
        }
    }
}

/// A connected hub client.
pub struct HubClient {
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    executor: Arc<dyn ClientExecutor>,
    blobs: Arc<dyn BlobStore>,
    options: ClientOptions,
}

impl HubClient {
    /// Connect to a hub endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Connection` when the handshake fails or a
    /// configured header is malformed.
    pub async fn connect(
        url: &str,
        executor: Arc<dyn ClientExecutor>,
        blobs: Arc<dyn BlobStore>,
        options: ClientOptions,
    ) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        for (name, value) in &options.headers {
            let name: HeaderName = name
                .parse()
                .map_err(|_| ClientError::Connection(format!("invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::Connection("invalid header value".to_string()))?;
            request.headers_mut().insert(name, value);
        }

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        tracing::info!(url, "Connected to hub");

        Ok(Self {
            stream,
            executor,
            blobs,
            options,
        })
    }

    /// Run the frame loop until the hub closes the connection.
    ///
    /// Errors inside individual frames are logged and never tear down
    /// the loop; sibling calls keep processing.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Send` when the outbound channel to the hub
    /// breaks.
    pub async fn run(self) -> Result<()> {
        let Self {
            stream,
            executor,
            blobs,
            options,
        } = self;
        let (mut sink, mut source) = stream.split();
        let (reply_tx, mut reply_rx) = mpsc::channel::<String>(64);

        let writer = tokio::spawn(async move {
            while let Some(text) = reply_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::error!(error = %e, "Failed to send reply frame");
                    break;
                }
            }
        });

        while let Some(message) = source.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(error = %e, "WebSocket read failed");
                    break;
                }
            };

            match message {
                Message::Text(text) => {
                    Self::dispatch(&executor, &blobs, &options, text.as_ref(), &reply_tx);
                }
                Message::Close(_) => {
                    tracing::info!("Hub closed the connection");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
            }
        }

        drop(reply_tx);
        writer
            .await
            .map_err(|e| ClientError::Send(e.to_string()))?;
        Ok(())
    }

    /// Parse one inbound frame and act on it. Calls execute on their own
    /// task so frames on one connection may process in parallel.
    fn dispatch(
        executor: &Arc<dyn ClientExecutor>,
        blobs: &Arc<dyn BlobStore>,
        options: &ClientOptions,
        text: &str,
        reply_tx: &mpsc::Sender<String>,
    ) {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Dropping unparseable frame");
                return;
            }
        };

        match frame {
            Frame::Call {
                request_id,
                method,
                param,
            } => {
                let executor = Arc::clone(executor);
                let blobs = Arc::clone(blobs);
                let options = options.clone();
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let reply =
                        run_call(&*executor, &*blobs, &options, request_id, &method, param).await;
                    match serde_json::to_string(&reply) {
                        Ok(text) => {
                            if reply_tx.send(text).await.is_err() {
                                tracing::warn!(
                                    request_id = %request_id,
                                    "Connection closed before the reply could be sent"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!(request_id = %request_id, error = %e, "Failed to encode reply");
                        }
                    }
                });
            }
            Frame::Event { method, event } => {
                let executor = Arc::clone(executor);
                tokio::spawn(async move {
                    let param = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
                    // Notifications carry no reply.
                    if let Err(e) = executor.execute(&method, param).await {
                        tracing::debug!(method, error = %e, "Connection event handler failed");
                    }
                });
            }
            Frame::Reply { request_id, .. } => {
                tracing::warn!(request_id = %request_id, "Ignoring unexpected Reply frame");
            }
        }
    }
}

/// Execute a call and wrap the outcome as the single `Reply` frame.
async fn run_call(
    executor: &dyn ClientExecutor,
    blobs: &dyn BlobStore,
    options: &ClientOptions,
    request_id: RequestId,
    method: &str,
    param: serde_json::Value,
) -> Frame {
    let result = executor.execute(method, param).await;
    let response = envelope_for(
        result,
        method,
        blobs,
        options.max_direct_data_size,
        &options.temp_folder,
    )
    .await;
    Frame::Reply {
        request_id,
        response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use backchannel_blob::FsBlobStore;
    use backchannel_core::Response;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct ScriptedExecutor;

    #[async_trait]
    impl ClientExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            method: &str,
            _param: Value,
        ) -> std::result::Result<Option<Value>, String> {
            match method {
                "Ping" => Ok(Some(json!({"Message": "Pong"}))),
                "Nothing" => Ok(None),
                "Big" => Ok(Some(json!({"Data": "x".repeat(2048)}))),
                other => Err(format!("unknown method: {other}")),
            }
        }
    }

    fn options(max_direct: usize) -> ClientOptions {
        ClientOptions {
            max_direct_data_size: max_direct,
            ..ClientOptions::default()
        }
    }

    #[tokio::test]
    async fn call_yields_exactly_one_reply_frame() {
        let dir = TempDir::new().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let request_id = RequestId::generate();

        let frame = run_call(
            &ScriptedExecutor,
            &blobs,
            &options(10 * 1024),
            request_id,
            "Ping",
            Value::Null,
        )
        .await;

        let Frame::Reply {
            request_id: id,
            response,
        } = frame
        else {
            panic!("expected a Reply frame");
        };
        assert_eq!(id, request_id);
        assert_eq!(response, Response::inline(json!({"Message": "Pong"})));
    }

    #[tokio::test]
    async fn null_and_error_results_wrap() {
        let dir = TempDir::new().unwrap();
        let blobs = FsBlobStore::new(dir.path());

        let frame = run_call(
            &ScriptedExecutor,
            &blobs,
            &options(10 * 1024),
            RequestId::generate(),
            "Nothing",
            Value::Null,
        )
        .await;
        assert!(matches!(
            frame,
            Frame::Reply {
                response: Response::Null,
                ..
            }
        ));

        let frame = run_call(
            &ScriptedExecutor,
            &blobs,
            &options(10 * 1024),
            RequestId::generate(),
            "Unknown",
            Value::Null,
        )
        .await;
        let Frame::Reply { response, .. } = frame else {
            panic!("expected a Reply frame");
        };
        assert_eq!(response, Response::error("unknown method: Unknown"));
    }

    #[tokio::test]
    async fn oversized_call_replies_with_blob_path() {
        let dir = TempDir::new().unwrap();
        let blobs = FsBlobStore::new(dir.path());

        let frame = run_call(
            &ScriptedExecutor,
            &blobs,
            &options(16),
            RequestId::generate(),
            "Big",
            Value::Null,
        )
        .await;
        let Frame::Reply { response, .. } = frame else {
            panic!("expected a Reply frame");
        };
        assert!(response.is_blob());
    }

    #[test]
    fn default_options_match_hub_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.max_direct_data_size, 10 * 1024);
        assert_eq!(options.temp_folder, "signalr-temp");
        assert!(options.headers.is_empty());
    }
}
