//! Reply envelope construction.
//!
//! This is the size-check seam: encoded results at or under the inline
//! threshold travel in the frame, larger ones are uploaded to the blob
//! side-channel under a fresh name and replaced by their path.

use backchannel_blob::BlobStore;
use backchannel_core::Response;
use serde_json::Value;

/// Wrap an executor result as a reply envelope.
///
/// - `Err(message)` becomes an `Error` envelope
/// - `Ok(None)` becomes `Null`
/// - `Ok(Some(value))` travels inline when its encoding is at most
///   `max_direct_data_size` bytes, and is otherwise uploaded to
///   `temp_folder` as `<method>_<fresh-token>.json`
///
/// Upload failures degrade to an `Error` envelope so the hub-side caller
/// still receives exactly one reply.
pub async fn envelope_for(
    result: Result<Option<Value>, String>,
    method: &str,
    blobs: &dyn BlobStore,
    max_direct_data_size: usize,
    temp_folder: &str,
) -> Response {
    let value = match result {
        Err(message) => return Response::Error { message },
        Ok(None) => return Response::Null,
        Ok(Some(value)) => value,
    };

    let encoded = match serde_json::to_vec(&value) {
        Ok(encoded) => encoded,
        Err(e) => {
            return Response::Error {
                message: format!("failed to encode result: {e}"),
            }
        }
    };

    if encoded.len() <= max_direct_data_size {
        return Response::Inline { payload: value };
    }

    let name = format!("{method}_{}.json", uuid::Uuid::new_v4());
    match blobs.upload(&encoded, &name, temp_folder).await {
        Ok(path) => {
            tracing::debug!(
                method,
                path = %path,
                size = encoded.len(),
                "Spilled oversized reply to the blob store"
            );
            Response::Blob { path }
        }
        Err(e) => {
            tracing::error!(method, error = %e, "Failed to upload oversized reply");
            Response::Error {
                message: format!("payload upload failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backchannel_blob::FsBlobStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn blob_store() -> (FsBlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (FsBlobStore::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn small_results_travel_inline() {
        let (blobs, _dir) = blob_store();
        let value = json!({"Message": "Pong"});

        let envelope = envelope_for(Ok(Some(value.clone())), "Ping", &blobs, 10 * 1024, "t").await;
        assert_eq!(envelope, Response::Inline { payload: value });
    }

    #[tokio::test]
    async fn oversized_results_spill_to_blob() {
        let (blobs, _dir) = blob_store();
        let value = json!({"Data": "x".repeat(2048)});

        let envelope = envelope_for(Ok(Some(value.clone())), "Big", &blobs, 16, "signalr-temp").await;
        let Response::Blob { path } = envelope else {
            panic!("expected a blob envelope, got {envelope:?}");
        };
        assert!(path.starts_with("signalr-temp/Big_"));
        assert!(path.ends_with(".json"));

        // The blob holds the encoded value.
        use backchannel_blob::BlobStore as _;
        let bytes = blobs.read(&path).await.unwrap();
        let stored: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(stored, value);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let (blobs, _dir) = blob_store();
        let value = json!("abc");
        let size = serde_json::to_vec(&value).unwrap().len();

        let envelope = envelope_for(Ok(Some(value.clone())), "M", &blobs, size, "t").await;
        assert_eq!(envelope, Response::Inline { payload: value });
    }

    #[tokio::test]
    async fn errors_and_null_wrap_directly() {
        let (blobs, _dir) = blob_store();

        let envelope = envelope_for(Err("boom".to_string()), "M", &blobs, 16, "t").await;
        assert_eq!(envelope, Response::error("boom"));

        let envelope = envelope_for(Ok(None), "M", &blobs, 16, "t").await;
        assert_eq!(envelope, Response::Null);
    }
}
