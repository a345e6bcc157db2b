//! Value objects for stream admission.

use serde::Serialize;

/// Point-in-time view of a stream's admission bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionStatus {
    /// Stream name.
    pub stream: String,
    /// Dedup entries, staged and committed.
    pub dedup_entries: usize,
    /// Dedup entries staged but not committed.
    pub dedup_staged: usize,
    /// Counter subjects with a running total in memory.
    pub counter_subjects: usize,
    /// Proposals holding a quota reservation.
    pub inflight_messages: usize,
    /// Sum of reserved footprints.
    pub inflight_bytes: u64,
    /// Subjects with an inflight sequence assertion.
    pub subjects_in_process: usize,
    /// Last proposal hint handed out.
    pub last_proposal_hint: u64,
}
