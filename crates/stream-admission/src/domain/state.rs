//! Per-stream admission state.
//!
//! Everything admission reads and mutates for one stream lives here, behind
//! a single lock held by the service for the whole of one admission call.

use super::counter::CounterLedger;
use super::dedup::DedupCache;
use super::entities::ProposalHint;
use super::quota::InflightFootprints;
use super::sequence::SubjectSequenceTracker;
use super::value_objects::AdmissionStatus;

#[derive(Debug, Default)]
pub struct AdmissionState {
    pub dedup: DedupCache,
    pub counters: CounterLedger,
    pub inflight: InflightFootprints,
    pub sequences: SubjectSequenceTracker,
    last_hint: ProposalHint,
}

impl AdmissionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next proposal hint. Hints start at 1.
    pub fn next_hint(&mut self) -> ProposalHint {
        self.last_hint += 1;
        self.last_hint
    }

    pub fn status(&self, stream: &str) -> AdmissionStatus {
        AdmissionStatus {
            stream: stream.to_string(),
            dedup_entries: self.dedup.len(),
            dedup_staged: self.dedup.staged_count(),
            counter_subjects: self.counters.len(),
            inflight_messages: self.inflight.len(),
            inflight_bytes: self.inflight.total_bytes(),
            subjects_in_process: self.sequences.len(),
            last_proposal_hint: self.last_hint,
        }
    }
}
