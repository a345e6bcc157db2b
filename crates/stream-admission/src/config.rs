//! Configuration for stream admission.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Largest header block whose length fits the 16-bit length prefix.
pub const MAX_HEADER_LEN: usize = u16::MAX as usize;

/// Default maximum header + payload size (1 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Default dedup window (2 minutes).
pub const DEFAULT_DUPLICATE_WINDOW: Duration = Duration::from_secs(120);

/// Storage backend of the stream, used for footprint estimation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    File,
    Memory,
}

/// Retention policy of the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    #[default]
    Limits,
    Interest,
    WorkQueue,
}

/// What happens when a limit is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscardPolicy {
    #[default]
    Old,
    New,
}

/// Per-stream configuration consulted by admission.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Stream name, checked against the expected-stream directive
    pub name: String,
    /// Storage backend
    pub storage: StorageType,
    /// Retention policy
    pub retention: RetentionPolicy,
    /// Discard policy
    pub discard: DiscardPolicy,
    /// Maximum messages (<= 0 means unlimited)
    pub max_msgs: i64,
    /// Maximum bytes (<= 0 means unlimited)
    pub max_bytes: i64,
    /// Per-message TTL support
    pub allow_msg_ttl: bool,
    /// Counter semantics
    pub allow_msg_counter: bool,
    /// Dedup window retention
    pub duplicate_window: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            storage: StorageType::File,
            retention: RetentionPolicy::Limits,
            discard: DiscardPolicy::Old,
            max_msgs: -1,
            max_bytes: -1,
            allow_msg_ttl: false,
            allow_msg_counter: false,
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
        }
    }
}

impl StreamConfig {
    /// Creates a config for the named stream with default limits.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether quota must be decided by the proposer rather than each replica.
    ///
    /// Under interest retention the outcome of discard-new depends on consumer
    /// ack state, which can differ between replicas.
    pub fn enforces_inflight_quota(&self) -> bool {
        self.retention == RetentionPolicy::Interest
            && self.discard == DiscardPolicy::New
            && (self.max_msgs > 0 || self.max_bytes > 0)
    }
}

/// Server-wide limits applied to every stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionLimits {
    /// Maximum header + payload size
    pub max_payload: usize,
    /// Maximum header block length
    pub max_header_len: usize,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_header_len: MAX_HEADER_LEN,
        }
    }
}

impl AdmissionLimits {
    /// Reads limits from the environment.
    ///
    /// - `SA_MAX_PAYLOAD`: maximum header + payload bytes (default: 1 MiB)
    pub fn from_env() -> Self {
        Self {
            max_payload: env::var("SA_MAX_PAYLOAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_PAYLOAD),
            max_header_len: MAX_HEADER_LEN,
        }
    }
}
