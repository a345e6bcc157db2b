//! # Message Deduplication Cache
//!
//! Maps client message ids to their commit outcome.
//!
//! ## Entry Lifecycle
//!
//! ```text
//! (absent) ──stage──→ [seq 0, staged] ──confirm(seq)──→ [seq N] ──window──→ (purged)
//!                          │
//!                          └── proposal failed ──→ (removed)
//! ```
//!
//! A staged entry is visible to the next admission call immediately, so two
//! concurrent publishes with the same id can never both be proposed.

use super::entities::DedupEntry;
use super::errors::AdmissionError;
use std::collections::HashMap;
use std::time::Duration;

/// Per-stream dedup table.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: HashMap<String, DedupEntry>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an id.
    pub fn get(&self, msg_id: &str) -> Option<&DedupEntry> {
        self.entries.get(msg_id)
    }

    /// Rejects a known id, otherwise stages it at sequence 0.
    ///
    /// # Errors
    /// - `DuplicateMessage` if the id is committed (idempotent no-op for the caller)
    /// - `DuplicateInFlight` if the id is staged by another proposal
    pub fn check_and_stage(&mut self, msg_id: &str, now_nanos: u64) -> Result<(), AdmissionError> {
        if let Some(entry) = self.entries.get(msg_id) {
            return Err(if entry.sequence > 0 {
                AdmissionError::DuplicateMessage {
                    msg_id: msg_id.to_string(),
                    sequence: entry.sequence,
                }
            } else {
                AdmissionError::DuplicateInFlight {
                    msg_id: msg_id.to_string(),
                }
            });
        }
        self.entries
            .insert(msg_id.to_string(), DedupEntry::staged(msg_id, now_nanos));
        Ok(())
    }

    /// Records the committed sequence of a staged id.
    ///
    /// Returns false if the id is unknown. Sequence 0 is not a commit: the
    /// staged entry is dropped instead, so it cannot stay staged forever.
    pub fn confirm(&mut self, msg_id: &str, sequence: u64) -> bool {
        if sequence == 0 {
            self.remove(msg_id);
            return false;
        }
        match self.entries.get_mut(msg_id) {
            Some(entry) => {
                entry.sequence = sequence;
                true
            }
            None => false,
        }
    }

    /// Drops a staged id so the client may resubmit. Committed ids are kept.
    pub fn remove(&mut self, msg_id: &str) -> Option<DedupEntry> {
        match self.entries.get(msg_id) {
            Some(entry) if entry.is_staged() => self.entries.remove(msg_id),
            _ => None,
        }
    }

    /// Purges committed entries older than the dedup window.
    ///
    /// Staged entries survive until reconciled. Returns the number purged.
    pub fn purge_expired(&mut self, now_nanos: u64, window: Duration) -> usize {
        let window_nanos = u64::try_from(window.as_nanos()).unwrap_or(u64::MAX);
        let cutoff = now_nanos.saturating_sub(window_nanos);
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.is_staged() || entry.timestamp_nanos >= cutoff);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ids staged but not yet committed.
    pub fn staged_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_staged()).count()
    }
}
