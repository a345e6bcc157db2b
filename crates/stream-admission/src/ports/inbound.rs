//! # Inbound Port - AdmissionApi
//!
//! Primary driving port of the admission pipeline.
//!
//! | Method | Caller |
//! |--------|--------|
//! | `admit` | publish path, before proposing to the replicated log |
//! | `reconcile` | commit stage, once the proposal outcome is known |
//! | `status` | metrics and operators |

use crate::domain::{
    AdmissionError, AdmissionStatus, AdmissionTicket, Admitted, CandidateMessage,
    ProposalOutcome,
};

/// Admission API for one stream.
///
/// # Example
///
/// ```rust,ignore
/// use stream_admission::ports::AdmissionApi;
///
/// fn publish(admission: &impl AdmissionApi, mut msg: CandidateMessage) {
///     match admission.admit(&mut msg) {
///         Ok(admitted) => {
///             let outcome = propose(&msg);
///             admission.reconcile(admitted.ticket, outcome);
///         }
///         Err(err) if err.is_idempotent_duplicate() => ack(err.duplicate_sequence()),
///         Err(err) => reject(err),
///     }
/// }
/// ```
pub trait AdmissionApi: Send + Sync {
    /// Decides whether `msg` may be proposed.
    ///
    /// On success the message may have been rewritten (counter payload,
    /// increment and sources headers) and the returned ticket must be
    /// reconciled exactly once. On rejection nothing stays staged.
    ///
    /// # Errors
    /// Any [`AdmissionError`]; see [`AdmissionError::kind`].
    fn admit(&self, msg: &mut CandidateMessage) -> Result<Admitted, AdmissionError>;

    /// Releases what admission staged for a proposal, given its outcome.
    fn reconcile(&self, ticket: AdmissionTicket, outcome: ProposalOutcome);

    /// Snapshot of the admission bookkeeping.
    fn status(&self) -> AdmissionStatus;
}
