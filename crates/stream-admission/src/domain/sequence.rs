//! # Per-Subject Sequence Tracker
//!
//! Optimistic concurrency on a subject: a publisher asserts the subject's last
//! sequence. Only one such assertion per subject may be inflight, otherwise two
//! proposals could both pass against the same committed sequence.
//!
//! | State | Meaning |
//! |-------|---------|
//! | `in_process` | subjects claimed by an uncommitted assertion |
//! | `by_hint` | proposal hint → claimed subject, for release |

use super::entities::ProposalHint;
use super::errors::{AdmissionError, StoreError};
use super::inspector::SubjectSequenceAssertion;
use std::collections::{HashMap, HashSet};

/// Per-stream tracker of subjects with an inflight sequence assertion.
#[derive(Debug, Default)]
pub struct SubjectSequenceTracker {
    in_process: HashSet<String>,
    by_hint: HashMap<ProposalHint, String>,
}

impl SubjectSequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies the assertion and claims the subject for `hint`.
    ///
    /// `last_seq` returns the subject's last committed sequence (0 if none)
    /// and is only called when the subject is not already claimed.
    ///
    /// # Errors
    /// - `SequenceConflictInProcess` if another assertion on the subject is inflight
    /// - `Store` if the last sequence cannot be read; nothing is claimed
    /// - `WrongLastSequence` if the committed sequence differs from the assertion
    pub fn check_and_claim<F>(
        &mut self,
        hint: ProposalHint,
        assertion: &SubjectSequenceAssertion,
        last_seq: F,
    ) -> Result<(), AdmissionError>
    where
        F: FnOnce(&str) -> Result<u64, StoreError>,
    {
        if self.in_process.contains(&assertion.subject) {
            return Err(AdmissionError::SequenceConflictInProcess {
                subject: assertion.subject.clone(),
            });
        }

        let found = last_seq(&assertion.subject)?;
        if found != assertion.expected {
            return Err(AdmissionError::WrongLastSequence {
                expected: assertion.expected,
                found,
            });
        }

        self.in_process.insert(assertion.subject.clone());
        self.by_hint.insert(hint, assertion.subject.clone());
        Ok(())
    }

    /// Releases the subject claimed by `hint`.
    pub fn release(&mut self, hint: ProposalHint) -> Option<String> {
        let subject = self.by_hint.remove(&hint)?;
        self.in_process.remove(&subject);
        Some(subject)
    }

    pub fn is_in_process(&self, subject: &str) -> bool {
        self.in_process.contains(subject)
    }

    /// Number of claimed subjects.
    pub fn len(&self) -> usize {
        self.in_process.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_process.is_empty()
    }
}
