//! The client executor contract.

use async_trait::async_trait;
use serde_json::Value;

/// The single entry point every connected peer implements.
///
/// The hub invokes methods by name; the executor routes them to user
/// code. Returning `Ok(None)` yields a `Null` reply envelope, and the
/// error string of `Err` is carried back verbatim as an `Error`
/// envelope.
#[async_trait]
pub trait ClientExecutor: Send + Sync {
    /// Execute a named method with a free JSON parameter.
    ///
    /// # Errors
    ///
    /// Returns a message describing the failure; it is surfaced to the
    /// hub-side caller as a client error.
    async fn execute(&self, method: &str, param: Value) -> Result<Option<Value>, String>;
}
