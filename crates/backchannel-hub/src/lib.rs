//! Request correlator for the backchannel RPC fabric.
//!
//! This crate turns a fire-and-forget frame transport into
//! single-request / single-response RPC from the server to its connected
//! clients, bounded in concurrency and time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Hub                                │
//! │  ┌───────────┐ ┌───────────┐ ┌──────────┐ ┌─────────────┐  │
//! │  │ Admission │ │ Targeting │ │ Pending  │ │  Response   │  │
//! │  │ (permits) │ │ resolver  │ │ requests │ │  decoder    │  │
//! │  └───────────┘ └───────────┘ └──────────┘ └─────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!          │               │                        │
//!          ▼               ▼                        ▼
//!   ┌────────────┐  ┌────────────┐          ┌────────────┐
//!   │ Transport  │  │  Registry  │          │ Blob store │
//!   │ (frames)   │  │ (RocksDB)  │          │ (spillover)│
//!   └────────────┘  └────────────┘          └────────────┘
//! ```
//!
//! An [`Hub::invoke`] call acquires an admission permit, resolves its
//! target to a set of connection IDs, registers a one-shot completion
//! slot keyed by a fresh request ID, fans the `Call` frame out, and
//! awaits the first reply, the deadline, or caller cancellation —
//! whichever comes first. Replies arriving on the inbound frame loop are
//! handed to [`Hub::complete`]; the first one wins and later ones are
//! dropped with a warning.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod admission;
pub mod config;
pub mod decode;
pub mod error;
pub mod hub;
pub mod pending;
pub mod target;
pub mod transport;

pub use admission::Admission;
pub use config::HubConfig;
pub use error::{HubError, Result};
pub use hub::Hub;
pub use pending::PendingRequests;
pub use target::{Resolved, Target};
pub use transport::{Transport, TransportError};

// Re-export commonly used types from dependencies for convenience
pub use backchannel_core::{ConnectionId, Frame, RequestId, Response, UserId};
