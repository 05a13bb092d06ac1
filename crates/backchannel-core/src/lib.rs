//! Core types for the backchannel RPC fabric.
//!
//! This crate provides the foundational types shared by every other
//! backchannel crate:
//!
//! - **Identifiers**: Strongly-typed IDs for users, connections, and
//!   in-flight requests
//! - **Wire types**: The `Response` envelope, transport `Frame`s, and
//!   connection lifecycle events
//!
//! # Example
//!
//! ```
//! use backchannel_core::{ConnectionId, RequestId, Response, UserId};
//!
//! let user_id: UserId = "alice".parse().unwrap();
//! let connection_id = ConnectionId::generate();
//! let request_id = RequestId::generate();
//!
//! let envelope = Response::inline(serde_json::json!({"Message": "Pong"}));
//! assert!(envelope.is_inline());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod envelope;
pub mod frame;
pub mod ids;

pub use envelope::{EnvelopeError, Response};
pub use frame::{ConnectionEvent, EventKind, Frame};
pub use ids::{ConnectionId, IdError, RequestId, UserId};
