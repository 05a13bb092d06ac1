//! Hub configuration.

use std::time::Duration;

use backchannel_registry::RegistryConfig;
use serde::Deserialize;

/// Configuration recognized by the hub core.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Emit `ConnectionEvent` frames to all peers on open/close.
    #[serde(default = "HubConfig::default_broadcast_connection_events")]
    pub broadcast_connection_events: bool,

    /// The client-side method name used for connection event frames.
    #[serde(default = "HubConfig::default_connection_event_method")]
    pub connection_event_method: String,

    /// Sweep all inactive registry rows globally on every open.
    #[serde(default = "HubConfig::default_auto_purge_offline")]
    pub auto_purge_offline: bool,

    /// Staleness horizon for registry rows, in seconds.
    #[serde(default = "HubConfig::default_stale_age_seconds")]
    pub stale_age_seconds: u64,

    /// Capture the user agent supplied at connection open.
    #[serde(default = "HubConfig::default_track_user_agent")]
    pub track_user_agent: bool,

    /// Upper bound on concurrently in-flight `invoke` calls.
    #[serde(default = "HubConfig::default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// How long a call waits for a reply, in seconds.
    #[serde(default = "HubConfig::default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// How long a call waits for an admission permit, in milliseconds.
    #[serde(default = "HubConfig::default_semaphore_timeout_millis")]
    pub semaphore_timeout_millis: u64,

    /// Inline-vs-blob threshold for reply payloads, in bytes.
    #[serde(default = "HubConfig::default_max_direct_data_size")]
    pub max_direct_data_size: usize,

    /// Blob folder used for spilled replies; governs read-once cleanup.
    #[serde(default = "HubConfig::default_temp_folder")]
    pub temp_folder: String,

    /// Delete spilled reply blobs after a successful decode.
    #[serde(default = "HubConfig::default_auto_delete_temp_files")]
    pub auto_delete_temp_files: bool,
}

impl HubConfig {
    const fn default_broadcast_connection_events() -> bool {
        true
    }

    fn default_connection_event_method() -> String {
        "OnConnectionEvent".to_string()
    }

    const fn default_auto_purge_offline() -> bool {
        true
    }

    const fn default_stale_age_seconds() -> u64 {
        300
    }

    const fn default_track_user_agent() -> bool {
        true
    }

    const fn default_max_concurrent_requests() -> usize {
        10
    }

    const fn default_request_timeout_seconds() -> u64 {
        300
    }

    const fn default_semaphore_timeout_millis() -> u64 {
        5_000
    }

    const fn default_max_direct_data_size() -> usize {
        10 * 1024
    }

    fn default_temp_folder() -> String {
        "signalr-temp".to_string()
    }

    const fn default_auto_delete_temp_files() -> bool {
        true
    }

    /// The staleness horizon as a `Duration`.
    #[must_use]
    pub const fn stale_age(&self) -> Duration {
        Duration::from_secs(self.stale_age_seconds)
    }

    /// The reply deadline as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// The admission wait bound as a `Duration`.
    #[must_use]
    pub const fn semaphore_timeout(&self) -> Duration {
        Duration::from_millis(self.semaphore_timeout_millis)
    }

    /// The registry view of this configuration.
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            stale_age: self.stale_age(),
            auto_purge_offline: self.auto_purge_offline,
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            broadcast_connection_events: Self::default_broadcast_connection_events(),
            connection_event_method: Self::default_connection_event_method(),
            auto_purge_offline: Self::default_auto_purge_offline(),
            stale_age_seconds: Self::default_stale_age_seconds(),
            track_user_agent: Self::default_track_user_agent(),
            max_concurrent_requests: Self::default_max_concurrent_requests(),
            request_timeout_seconds: Self::default_request_timeout_seconds(),
            semaphore_timeout_millis: Self::default_semaphore_timeout_millis(),
            max_direct_data_size: Self::default_max_direct_data_size(),
            temp_folder: Self::default_temp_folder(),
            auto_delete_temp_files: Self::default_auto_delete_temp_files(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = HubConfig::default();
        assert!(config.broadcast_connection_events);
        assert_eq!(config.connection_event_method, "OnConnectionEvent");
        assert!(config.auto_purge_offline);
        assert_eq!(config.stale_age(), Duration::from_secs(300));
        assert!(config.track_user_agent);
        assert_eq!(config.max_concurrent_requests, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert_eq!(config.semaphore_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_direct_data_size, 10 * 1024);
        assert_eq!(config.temp_folder, "signalr-temp");
        assert!(config.auto_delete_temp_files);
    }

    #[test]
    fn partial_deserialization_fills_defaults() {
        let config: HubConfig =
            serde_json::from_str(r#"{"max_concurrent_requests": 3}"#).unwrap();
        assert_eq!(config.max_concurrent_requests, 3);
        assert_eq!(config.request_timeout_seconds, 300);
        assert_eq!(config.temp_folder, "signalr-temp");
    }
}
