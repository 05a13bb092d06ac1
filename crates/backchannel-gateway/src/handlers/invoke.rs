//! Server-initiated invocation over HTTP.
//!
//! Trusted server-side callers (jobs, internal services) trigger client
//! invocations here and receive the raw reply envelope. Error envelopes
//! are returned in-band; hub failures map to HTTP statuses.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use backchannel_core::Response;
use backchannel_hub::Target;
use backchannel_registry::ConnectionStore;

use crate::error::ApiError;
use crate::state::HubState;

/// Request body for `POST /hub/invoke`.
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    /// Who to call.
    pub target: TargetSpec,
    /// The method name to invoke on the client executor.
    pub method: String,
    /// Free JSON argument; defaults to null.
    #[serde(default)]
    pub param: Value,
}

/// Wire form of a call target.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    /// Every connected client.
    All,
    /// All connections of one user.
    User(String),
    /// All connections of a set of users.
    Users(Vec<String>),
    /// One specific connection.
    Connection(String),
    /// A set of connections.
    Connections(Vec<String>),
}

impl TryFrom<TargetSpec> for Target {
    type Error = ApiError;

    fn try_from(spec: TargetSpec) -> Result<Self, Self::Error> {
        let bad_id = |e| ApiError::BadRequest(format!("invalid identifier: {e}"));
        Ok(match spec {
            TargetSpec::All => Self::All,
            TargetSpec::User(user) => Self::User(user.parse().map_err(bad_id)?),
            TargetSpec::Users(users) => Self::Users(
                users
                    .into_iter()
                    .map(|u| u.parse().map_err(bad_id))
                    .collect::<Result<_, _>>()?,
            ),
            TargetSpec::Connection(connection) => {
                Self::Connection(connection.parse().map_err(bad_id)?)
            }
            TargetSpec::Connections(connections) => Self::Connections(
                connections
                    .into_iter()
                    .map(|c| c.parse().map_err(bad_id))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

/// Invoke a method on connected clients and return the reply envelope.
///
/// # Errors
///
/// Maps hub failures to HTTP statuses: `Overloaded` → 503, `NoTarget`
/// and `InactiveConnection` → 404, `Timeout` → 504.
pub async fn invoke<S>(
    State(state): State<HubState<S>>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<Response>, ApiError>
where
    S: ConnectionStore + 'static,
{
    let target = Target::try_from(request.target)?;
    let response = state
        .hub
        .invoke(target, &request.method, request.param)
        .await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_specs_deserialize() {
        let request: InvokeRequest = serde_json::from_value(json!({
            "target": "all",
            "method": "Ping",
        }))
        .unwrap();
        assert!(matches!(request.target, TargetSpec::All));
        assert_eq!(request.param, Value::Null);

        let request: InvokeRequest = serde_json::from_value(json!({
            "target": {"user": "U1"},
            "method": "K",
            "param": {"depth": 2},
        }))
        .unwrap();
        assert!(matches!(request.target, TargetSpec::User(ref u) if u == "U1"));

        let request: InvokeRequest = serde_json::from_value(json!({
            "target": {"connections": ["C1", "C2"]},
            "method": "Ping",
        }))
        .unwrap();
        assert!(matches!(request.target, TargetSpec::Connections(ref c) if c.len() == 2));
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        let result = Target::try_from(TargetSpec::User(String::new()));
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn specs_convert_to_targets() {
        let target = Target::try_from(TargetSpec::All).unwrap();
        assert_eq!(target, Target::All);

        let target = Target::try_from(TargetSpec::Users(vec!["U1".into(), "U2".into()])).unwrap();
        assert!(matches!(target, Target::Users(ref users) if users.len() == 2));
    }
}
