//! Outbound (Driven) ports for stream admission.
//!
//! Admission only reads committed state; appends happen downstream.

use crate::domain::{StoreError, StoredMessage, StreamState};

/// Read access to the stream's committed log.
pub trait StreamStore: Send + Sync {
    /// Loads the last committed message on `subject`.
    ///
    /// # Returns
    /// - `Ok(Some(msg))`: the last message
    /// - `Ok(None)`: no message on the subject
    /// - `Err`: the store could not be read
    fn load_last_msg(&self, subject: &str) -> Result<Option<StoredMessage>, StoreError>;

    /// Committed message and byte totals.
    fn fast_state(&self) -> StreamState;
}

/// Time source for dedup timestamps.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> u64;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_nanos(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64
    }
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: u64) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, nanos: u64) {
        self.time
            .fetch_add(nanos, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now_nanos(&self) -> u64 {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}
