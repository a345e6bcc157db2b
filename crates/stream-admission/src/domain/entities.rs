//! Core domain entities for stream admission.

use super::counter::AppliedIncrement;
use super::errors::HeaderError;
use super::headers::Headers;
use super::inspector::MessageTtl;

/// Proposal sequence hint, assigned monotonically per stream before the real
/// log sequence is known.
pub type ProposalHint = u64;

/// A message about to be proposed into the stream's replicated log.
///
/// Admission may rewrite `headers` and `payload` (counter streams); the
/// rewritten form is what gets proposed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateMessage {
    /// Subject the message is published on.
    pub subject: String,
    /// Ordered metadata.
    pub headers: Headers,
    /// Message body.
    pub payload: Vec<u8>,
    /// Temporary key for inflight bookkeeping.
    pub proposal_hint: ProposalHint,
    /// Arrived via cross-stream sourcing rather than a client publish.
    pub sourced: bool,
    /// Length of the header block as received, until the headers are rewritten.
    pub raw_header_len: Option<usize>,
}

impl CandidateMessage {
    /// Creates an empty message on `subject`.
    pub fn new(subject: impl Into<String>, proposal_hint: ProposalHint) -> Self {
        Self {
            subject: subject.into(),
            proposal_hint,
            ..Self::default()
        }
    }

    /// Creates a message from a raw wire header block, keeping its length.
    pub fn from_wire(
        subject: impl Into<String>,
        raw_headers: &[u8],
        payload: Vec<u8>,
        proposal_hint: ProposalHint,
    ) -> Result<Self, HeaderError> {
        Ok(Self {
            subject: subject.into(),
            headers: Headers::decode(raw_headers)?,
            payload,
            proposal_hint,
            sourced: false,
            raw_header_len: Some(raw_headers.len()),
        })
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a header. The block no longer matches what arrived on the wire.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set(name, value);
        self.raw_header_len = None;
    }

    /// Header block length: as received, or as re-encoded once rewritten.
    pub fn header_len(&self) -> usize {
        self.raw_header_len.unwrap_or_else(|| self.headers.encoded_len())
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Marks the message as sourced from another stream.
    pub fn sourced(mut self) -> Self {
        self.sourced = true;
        self
    }

    /// Header block length plus payload length.
    pub fn total_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }
}

/// A committed message as returned by the storage port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMessage {
    pub subject: String,
    pub sequence: u64,
    pub headers: Headers,
    pub payload: Vec<u8>,
}

/// Committed message and byte totals of the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamState {
    pub msgs: u64,
    pub bytes: u64,
}

/// Dedup record for a client message id.
///
/// `sequence == 0` means a proposal for the id is staged but not committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DedupEntry {
    pub msg_id: String,
    pub sequence: u64,
    pub timestamp_nanos: u64,
}

impl DedupEntry {
    pub fn staged(msg_id: impl Into<String>, timestamp_nanos: u64) -> Self {
        Self {
            msg_id: msg_id.into(),
            sequence: 0,
            timestamp_nanos,
        }
    }

    pub fn is_staged(&self) -> bool {
        self.sequence == 0
    }
}

/// What admission staged for one candidate, to be reconciled once the
/// replication stage knows the outcome.
///
/// Tickets are consumed by [`reconcile`](crate::ports::AdmissionApi::reconcile),
/// so each one is released exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an unreconciled ticket leaks dedup, counter and in-process state"]
pub struct AdmissionTicket {
    pub proposal_hint: ProposalHint,
    pub msg_id: Option<String>,
    pub counter: Option<AppliedIncrement>,
    pub sequence_subject: Option<String>,
    pub inflight_reserved: bool,
}

impl AdmissionTicket {
    pub(crate) fn new(proposal_hint: ProposalHint) -> Self {
        Self {
            proposal_hint,
            msg_id: None,
            counter: None,
            sequence_subject: None,
            inflight_reserved: false,
        }
    }
}

/// Successful admission.
#[derive(Debug)]
pub struct Admitted {
    /// Always zero; the commit stage assigns the real sequence.
    pub sequence: u64,
    /// Expiry the commit stage stores with the message.
    pub ttl: MessageTtl,
    pub ticket: AdmissionTicket,
}

/// Outcome of a proposal reported back by the replication stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// Appended to the log at `sequence`.
    Committed { sequence: u64 },
    /// Never appended (proposal dropped, leader change, caller timeout).
    Failed,
}
