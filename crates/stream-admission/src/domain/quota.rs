//! # Inflight Quota Estimator
//!
//! Under interest retention with discard-new, whether a message fits the
//! stream limits depends on consumer ack state that replicas may disagree on.
//! The proposer therefore decides, counting the committed state plus every
//! proposal it has admitted but not yet seen commit.
//!
//! ```text
//! committed.msgs  + inflight.len()  > max_msgs   → MaxMessagesExceeded
//! committed.bytes + inflight.bytes  > max_bytes  → MaxBytesExceeded
//! ```
//!
//! The message-count check runs first.

use super::entities::{ProposalHint, StreamState};
use super::errors::AdmissionError;
use std::collections::HashMap;

/// Estimated stored footprints of admitted, uncommitted proposals.
#[derive(Debug, Default)]
pub struct InflightFootprints {
    footprints: HashMap<ProposalHint, u64>,
    total_bytes: u64,
}

impl InflightFootprints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `size` for `hint` and checks the limits including it.
    ///
    /// On rejection the reservation is removed again.
    ///
    /// # Errors
    /// - `MaxMessagesExceeded` when the message limit would be exceeded
    /// - `MaxBytesExceeded` when the byte limit would be exceeded
    pub fn reserve(
        &mut self,
        hint: ProposalHint,
        size: u64,
        committed: StreamState,
        max_msgs: i64,
        max_bytes: i64,
    ) -> Result<(), AdmissionError> {
        self.insert(hint, size);

        if let Err(err) = self.check(committed, max_msgs, max_bytes) {
            self.release(hint);
            return Err(err);
        }
        Ok(())
    }

    /// Checks the committed state plus all reservations against the limits.
    pub fn check(
        &self,
        committed: StreamState,
        max_msgs: i64,
        max_bytes: i64,
    ) -> Result<(), AdmissionError> {
        if max_msgs > 0 {
            let msgs = committed.msgs.saturating_add(self.footprints.len() as u64);
            if msgs > max_msgs as u64 {
                return Err(AdmissionError::MaxMessagesExceeded { limit: max_msgs });
            }
        }
        if max_bytes > 0 {
            let bytes = committed.bytes.saturating_add(self.total_bytes);
            if bytes > max_bytes as u64 {
                return Err(AdmissionError::MaxBytesExceeded { limit: max_bytes });
            }
        }
        Ok(())
    }

    /// Drops the reservation for `hint`, returning its size.
    pub fn release(&mut self, hint: ProposalHint) -> Option<u64> {
        let size = self.footprints.remove(&hint)?;
        self.total_bytes = self.total_bytes.saturating_sub(size);
        Some(size)
    }

    fn insert(&mut self, hint: ProposalHint, size: u64) {
        if let Some(previous) = self.footprints.insert(hint, size) {
            self.total_bytes = self.total_bytes.saturating_sub(previous);
        }
        self.total_bytes = self.total_bytes.saturating_add(size);
    }

    /// Number of reservations.
    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    /// Sum of reserved footprints.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn contains(&self, hint: ProposalHint) -> bool {
        self.footprints.contains_key(&hint)
    }
}
