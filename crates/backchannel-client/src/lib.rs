//! Client side of the backchannel RPC fabric.
//!
//! A connected peer implements a single entry point — the
//! [`ClientExecutor`] — and this crate takes care of the rest: receiving
//! `Call` frames, executing them, size-checking the encoded result,
//! spilling oversized payloads to the blob side-channel, and sending
//! exactly one `Reply` per call.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use backchannel_blob::FsBlobStore;
//! use backchannel_client::{ClientExecutor, ClientOptions, HubClient};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct PingExecutor;
//!
//! #[async_trait]
//! impl ClientExecutor for PingExecutor {
//!     async fn execute(&self, method: &str, _param: Value) -> Result<Option<Value>, String> {
//!         match method {
//!             "Ping" => Ok(Some(json!({"Message": "Pong"}))),
//!             other => Err(format!("unknown method: {other}")),
//!         }
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let blobs = Arc::new(FsBlobStore::new("/tmp/backchannel-blobs"));
//! let client = HubClient::connect(
//!     "ws://localhost:8080/hub/ws",
//!     Arc::new(PingExecutor),
//!     blobs,
//!     ClientOptions::default(),
//! )
//! .await?;
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod envelope;
pub mod error;
pub mod executor;

pub use client::{ClientOptions, HubClient};
pub use envelope::envelope_for;
pub use error::{ClientError, Result};
pub use executor::ClientExecutor;
