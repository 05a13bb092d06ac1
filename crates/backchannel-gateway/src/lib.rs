//! WebSocket gateway for the backchannel RPC fabric.
//!
//! This crate is the frame transport adapter: it accepts incoming
//! WebSocket connections, resolves their authenticated user through the
//! [`Authenticator`] seam, keeps a per-connection outbound channel in
//! the [`ConnectionMap`], and feeds inbound `Reply` frames back into the
//! hub's correlator.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Web clients (WS)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   backchannel-gateway                       │
//! │  ┌─────────────┐ ┌──────────────┐ ┌────────────────────┐   │
//! │  │Authenticator│ │ ConnectionMap│ │  /hub/ws handler   │   │
//! │  │   (seam)    │ │ (= Transport)│ │  (frame loops)     │   │
//! │  └─────────────┘ └──────────────┘ └────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                      ┌──────────────┐
//!                      │ backchannel  │
//!                      │     hub      │
//!                      └──────────────┘
//! ```
//!
//! The registry and the correlator consume this same transport, so there
//! is exactly one connection-ID space per process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod connections;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{Authenticator, HeaderAuthenticator, USER_ID_HEADER};
pub use config::GatewayConfig;
pub use connections::ConnectionMap;
pub use error::ApiError;
pub use routes::create_router;
pub use state::HubState;
