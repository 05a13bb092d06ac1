//! Bounded admission for concurrent invokes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{HubError, Result};

/// A counting semaphore bounding concurrent `invoke` calls.
///
/// The returned permit is an RAII guard, so release happens on every
/// exit path of an invoke, including cancellation and panic.
pub struct Admission {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl Admission {
    /// Create an admission gate with `max_concurrent` permits and a
    /// bounded acquisition wait.
    #[must_use]
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            timeout,
        }
    }

    /// Acquire one permit, waiting at most the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Overloaded` when no permit frees up in time.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        match tokio::time::timeout(self.timeout, Arc::clone(&self.permits).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            // The semaphore is never closed; a closed error still maps
            // to the caller-visible overload.
            Ok(Err(_)) | Err(_) => Err(HubError::Overloaded),
        }
    }

    /// Number of permits currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_are_released_on_drop() {
        let admission = Admission::new(2, Duration::from_millis(100));

        let a = admission.acquire().await.unwrap();
        let _b = admission.acquire().await.unwrap();
        assert_eq!(admission.available(), 0);

        drop(a);
        assert_eq!(admission.available(), 1);
        let _c = admission.acquire().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_gate_reports_overloaded() {
        let admission = Admission::new(1, Duration::from_millis(100));

        let _held = admission.acquire().await.unwrap();
        let start = tokio::time::Instant::now();
        let result = admission.acquire().await;

        assert!(matches!(result, Err(HubError::Overloaded)));
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }
}
