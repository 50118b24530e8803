//! Configuration for the connector hub
//!
//! Settings load from a TOML file, from environment variables, or fall back
//! to built-in defaults. Environment overrides win over file values.

use crate::registry::AdapterDescriptor;
use crate::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Behavior when the inbound event buffer is full
///
/// Producers always return immediately regardless of policy; `Block` exists
/// because operators may declare it, but it is rejected by validation since
/// session callback threads are never allowed to block on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the incoming event (default)
    DropNewest,
    /// Evict the oldest queued event to make room
    DropOldest,
    /// Block the producer until space frees up (unsupported)
    Block,
}

/// Heartbeat monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// How often the monitor scans last-data timestamps, in milliseconds
    pub interval_ms: u64,

    /// Age past which an adapter counts as stalled, in milliseconds
    pub stale_after_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            stale_after_ms: 120_000,
        }
    }
}

/// Reconnection controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Attempt budget before an adapter enters the terminal error state
    pub max_attempts: u32,

    /// Backoff schedule in milliseconds; attempts beyond the last entry
    /// reuse it
    pub backoff_ms: Vec<u64>,

    /// Delay between replayed subscriptions after a reconnect, in
    /// milliseconds
    pub resubscribe_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_ms: vec![
                1_000, 2_000, 5_000, 10_000, 30_000, 60_000, 120_000, 300_000, 600_000, 900_000,
            ],
            resubscribe_delay_ms: 50,
        }
    }
}

/// Inbound event buffer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Maximum queued events before the overflow policy applies
    pub capacity: usize,

    /// What happens to events that arrive while the buffer is full
    pub overflow: OverflowPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 8_192,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

/// Top-level hub configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Adapters known at startup; enabled ones connect on `connect()`
    pub adapters: Vec<AdapterDescriptor>,

    /// Fallback adapter when a symbol carries no routing hints
    pub default_adapter: Option<String>,

    /// Wait for the connected signal, in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Per-adapter disconnect budget, in milliseconds
    pub disconnect_timeout_ms: Option<u64>,

    /// Heartbeat monitor settings
    pub heartbeat: HeartbeatConfig,

    /// Reconnection settings
    pub reconnect: ReconnectConfig,

    /// Inbound event buffer settings
    pub buffer: BufferConfig,
}

impl HubConfig {
    const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;
    const DEFAULT_DISCONNECT_TIMEOUT_MS: u64 = 10_000;

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            HubError::Configuration(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config: HubConfig = toml::from_str(&raw)
            .map_err(|e| HubError::Configuration(format!("Invalid TOML: {}", e)))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(adapter) = env::var("FEEDHUB_DEFAULT_ADAPTER") {
            if !adapter.is_empty() {
                self.default_adapter = Some(adapter);
            }
        }

        if let Some(v) = env_u64("FEEDHUB_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = Some(v);
        }
        if let Some(v) = env_u64("FEEDHUB_DISCONNECT_TIMEOUT_MS") {
            self.disconnect_timeout_ms = Some(v);
        }
        if let Some(v) = env_u64("FEEDHUB_HEARTBEAT_INTERVAL_MS") {
            self.heartbeat.interval_ms = v;
        }
        if let Some(v) = env_u64("FEEDHUB_HEARTBEAT_STALE_MS") {
            self.heartbeat.stale_after_ms = v;
        }
        if let Some(v) = env_u64("FEEDHUB_RECONNECT_MAX_ATTEMPTS") {
            self.reconnect.max_attempts = v as u32;
        }
        if let Some(v) = env_u64("FEEDHUB_RESUBSCRIBE_DELAY_MS") {
            self.reconnect.resubscribe_delay_ms = v;
        }
        if let Some(v) = env_u64("FEEDHUB_BUFFER_CAPACITY") {
            self.buffer.capacity = v as usize;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.buffer.capacity == 0 {
            return Err(HubError::Configuration(
                "Buffer capacity must be greater than 0".to_string(),
            ));
        }

        if self.buffer.overflow == OverflowPolicy::Block {
            return Err(HubError::Configuration(
                "Overflow policy 'block' is not supported: session callbacks must never block"
                    .to_string(),
            ));
        }

        if self.heartbeat.interval_ms == 0 {
            return Err(HubError::Configuration(
                "Heartbeat interval must be greater than 0".to_string(),
            ));
        }

        if self.heartbeat.stale_after_ms < self.heartbeat.interval_ms {
            return Err(HubError::Configuration(
                "Heartbeat staleness threshold must be at least one interval".to_string(),
            ));
        }

        if self.reconnect.max_attempts == 0 {
            return Err(HubError::Configuration(
                "Reconnect max attempts must be greater than 0".to_string(),
            ));
        }

        if self.reconnect.backoff_ms.is_empty() {
            return Err(HubError::Configuration(
                "Backoff schedule must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for descriptor in &self.adapters {
            if descriptor.id.is_empty() {
                return Err(HubError::Configuration(
                    "Adapter id must not be empty".to_string(),
                ));
            }
            if !seen.insert(descriptor.id.as_str()) {
                return Err(HubError::Configuration(format!(
                    "Duplicate adapter id: {}",
                    descriptor.id
                )));
            }
        }

        Ok(())
    }

    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.connect_timeout_ms
                .unwrap_or(Self::DEFAULT_CONNECT_TIMEOUT_MS),
        )
    }

    /// Per-adapter disconnect timeout as a `Duration`
    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.disconnect_timeout_ms
                .unwrap_or(Self::DEFAULT_DISCONNECT_TIMEOUT_MS),
        )
    }

    /// Heartbeat scan interval as a `Duration`
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat.interval_ms)
    }

    /// Staleness threshold as a `Duration`
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.heartbeat.stale_after_ms)
    }

    /// Delay between replayed subscriptions as a `Duration`
    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect.resubscribe_delay_ms)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
