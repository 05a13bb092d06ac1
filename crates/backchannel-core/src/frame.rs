//! Logical transport frames.
//!
//! Frames are the unit of exchange on a duplex channel between the hub
//! and a client. `Call` travels server → client, `Reply` travels client
//! → server, and `Event` fans out connection lifecycle notifications to
//! all peers when broadcasting is enabled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Response;
use crate::ids::{ConnectionId, RequestId, UserId};

/// A frame on the duplex channel.
///
/// Frames are externally tagged JSON, e.g.
/// `{"Call": {"RequestId": "...", "Method": "Ping", "Param": null}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Frame {
    /// A server-initiated method invocation.
    #[serde(rename_all = "PascalCase")]
    Call {
        /// Correlation token, echoed back on the reply.
        request_id: RequestId,
        /// Name of the method the client executor should run.
        method: String,
        /// Free JSON argument, possibly null.
        param: Value,
    },

    /// A client's single reply to a `Call`.
    #[serde(rename_all = "PascalCase")]
    Reply {
        /// The token of the call being answered.
        request_id: RequestId,
        /// The reply envelope.
        response: Response,
    },

    /// A connection lifecycle notification, fanned out to all peers.
    #[serde(rename_all = "PascalCase")]
    Event {
        /// The client-side method name that should receive the event.
        method: String,
        /// The lifecycle event.
        event: ConnectionEvent,
    },
}

/// A connection lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionEvent {
    /// The user whose connection changed.
    pub user_id: UserId,
    /// The connection that changed.
    pub connection_id: ConnectionId,
    /// Free-form label captured at open, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// What happened.
    pub kind: EventKind,
    /// When it happened.
    pub at: DateTime<Utc>,
}

/// The kind of a connection lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A new connection was registered.
    Opened,
    /// A connection was deregistered.
    Closed,
    /// An open replaced an existing row for the same connection ID.
    Reopened,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_frame_shape() {
        let frame = Frame::Call {
            request_id: RequestId::generate(),
            method: "Ping".to_string(),
            param: Value::Null,
        };
        let wire = serde_json::to_value(&frame).unwrap();
        let call = wire.get("Call").unwrap();
        assert!(call.get("RequestId").is_some());
        assert_eq!(call.get("Method"), Some(&json!("Ping")));
        assert_eq!(call.get("Param"), Some(&Value::Null));
    }

    #[test]
    fn reply_frame_roundtrip() {
        let request_id = RequestId::generate();
        let frame = Frame::Reply {
            request_id,
            response: Response::inline(json!({"K": 1})),
        };
        let text = serde_json::to_string(&frame).unwrap();
        let parsed: Frame = serde_json::from_str(&text).unwrap();
        match parsed {
            Frame::Reply {
                request_id: id,
                response,
            } => {
                assert_eq!(id, request_id);
                assert_eq!(response, Response::inline(json!({"K": 1})));
            }
            other => panic!("expected a Reply frame, got {other:?}"),
        }
    }

    #[test]
    fn event_frame_omits_absent_user_agent() {
        let frame = Frame::Event {
            method: "OnConnectionEvent".to_string(),
            event: ConnectionEvent {
                user_id: "U1".parse().unwrap(),
                connection_id: ConnectionId::generate(),
                user_agent: None,
                kind: EventKind::Closed,
                at: Utc::now(),
            },
        };
        let wire = serde_json::to_value(&frame).unwrap();
        let event = wire.get("Event").unwrap().get("Event").unwrap();
        assert!(event.get("UserAgent").is_none());
        assert_eq!(event.get("Kind"), Some(&json!("Closed")));
    }
}
