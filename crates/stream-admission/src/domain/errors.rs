//! Admission error types.
//!
//! Every rejection maps onto a stable [`RejectionKind`]; the variant itself
//! carries the detail the caller needs for control decisions (an already
//! applied duplicate is success, an in-flight duplicate is retry-later).

use serde::Serialize;
use thiserror::Error;

/// Errors parsing a wire header block.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header block is not valid UTF-8")]
    NotUtf8,

    #[error("header block does not start with the version line")]
    MissingVersionLine,

    #[error("malformed header line: {0}")]
    MalformedLine(String),
}

/// Errors returned by the storage port.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store read failed: {0}")]
    ReadFailed(String),
}

/// Stable, user-facing rejection taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    HeaderTooLarge,
    IncrementInvalid,
    IncrementDisabled,
    IncrementPayloadNotEmpty,
    IncrementMissing,
    IncrementCombinationInvalid,
    StreamNameMismatch,
    TtlDisabled,
    TtlInvalid,
    DuplicateMessage,
    DuplicateInFlight,
    CounterStateBroken,
    PayloadTooLarge,
    MaxMessagesExceeded,
    MaxBytesExceeded,
    SequenceConflictInProcess,
    WrongLastSequence,
    StorageUnavailable,
}

impl RejectionKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeaderTooLarge => "header_too_large",
            Self::IncrementInvalid => "increment_invalid",
            Self::IncrementDisabled => "increment_disabled",
            Self::IncrementPayloadNotEmpty => "increment_payload_not_empty",
            Self::IncrementMissing => "increment_missing",
            Self::IncrementCombinationInvalid => "increment_combination_invalid",
            Self::StreamNameMismatch => "stream_name_mismatch",
            Self::TtlDisabled => "ttl_disabled",
            Self::TtlInvalid => "ttl_invalid",
            Self::DuplicateMessage => "duplicate_message",
            Self::DuplicateInFlight => "duplicate_in_flight",
            Self::CounterStateBroken => "counter_state_broken",
            Self::PayloadTooLarge => "payload_too_large",
            Self::MaxMessagesExceeded => "max_messages_exceeded",
            Self::MaxBytesExceeded => "max_bytes_exceeded",
            Self::SequenceConflictInProcess => "sequence_conflict_in_process",
            Self::WrongLastSequence => "wrong_last_sequence",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }
}

/// Admission rejection.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// Header block does not fit a 16-bit length.
    #[error("headers exceed maximum: {len} > {max}")]
    HeaderTooLarge { len: usize, max: usize },

    /// Increment directive is not a base-10 integer.
    #[error("invalid increment: {value:?}")]
    IncrementInvalid { value: String },

    /// Increment sent to a stream without counter semantics.
    #[error("counters disabled")]
    IncrementDisabled,

    /// Direct increments must carry an empty payload.
    #[error("payload must be empty for counter messages")]
    IncrementPayloadNotEmpty,

    /// Counter streams require an increment on every message.
    #[error("missing increment")]
    IncrementMissing,

    /// Increment combined with another conditional-publish directive.
    #[error("invalid increment combination with {directive}")]
    IncrementCombinationInvalid { directive: &'static str },

    #[error("stream name mismatch: expected {expected}, stream is {stream}")]
    StreamNameMismatch { expected: String, stream: String },

    #[error("TTL disabled")]
    TtlDisabled,

    #[error("invalid TTL: {value:?}")]
    TtlInvalid { value: String },

    /// Already committed; the caller treats this as success without reapply.
    #[error("duplicate message, already at sequence {sequence}")]
    DuplicateMessage { msg_id: String, sequence: u64 },

    /// Another proposal with the same id is staged but not committed.
    #[error("duplicate in flight: {msg_id}")]
    DuplicateInFlight { msg_id: String },

    /// Stored counter lineage cannot be parsed. Needs operator repair.
    #[error("counter state broken for {subject}: {reason}")]
    CounterStateBroken { subject: String, reason: String },

    #[error("message exceeds maximum size: {size} > {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("max messages exceeded: limit {limit}")]
    MaxMessagesExceeded { limit: i64 },

    #[error("max bytes exceeded: limit {limit}")]
    MaxBytesExceeded { limit: i64 },

    #[error("last-sequence-by-subject mismatch, concurrent modification on {subject}")]
    SequenceConflictInProcess { subject: String },

    #[error("wrong last sequence, expected {expected} got {found}")]
    WrongLastSequence { expected: u64, found: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdmissionError {
    /// Stable kind of this rejection.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::HeaderTooLarge { .. } => RejectionKind::HeaderTooLarge,
            Self::IncrementInvalid { .. } => RejectionKind::IncrementInvalid,
            Self::IncrementDisabled => RejectionKind::IncrementDisabled,
            Self::IncrementPayloadNotEmpty => RejectionKind::IncrementPayloadNotEmpty,
            Self::IncrementMissing => RejectionKind::IncrementMissing,
            Self::IncrementCombinationInvalid { .. } => RejectionKind::IncrementCombinationInvalid,
            Self::StreamNameMismatch { .. } => RejectionKind::StreamNameMismatch,
            Self::TtlDisabled => RejectionKind::TtlDisabled,
            Self::TtlInvalid { .. } => RejectionKind::TtlInvalid,
            Self::DuplicateMessage { .. } => RejectionKind::DuplicateMessage,
            Self::DuplicateInFlight { .. } => RejectionKind::DuplicateInFlight,
            Self::CounterStateBroken { .. } => RejectionKind::CounterStateBroken,
            Self::PayloadTooLarge { .. } => RejectionKind::PayloadTooLarge,
            Self::MaxMessagesExceeded { .. } => RejectionKind::MaxMessagesExceeded,
            Self::MaxBytesExceeded { .. } => RejectionKind::MaxBytesExceeded,
            Self::SequenceConflictInProcess { .. } => RejectionKind::SequenceConflictInProcess,
            Self::WrongLastSequence { .. } => RejectionKind::WrongLastSequence,
            Self::Store(_) => RejectionKind::StorageUnavailable,
        }
    }

    /// Sequence of an already committed duplicate, if this is one.
    pub fn duplicate_sequence(&self) -> Option<u64> {
        match self {
            Self::DuplicateMessage { sequence, .. } => Some(*sequence),
            _ => None,
        }
    }

    /// True for a duplicate that was already applied (idempotent no-op).
    pub fn is_idempotent_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateMessage { .. })
    }

    /// True when the same candidate may succeed once inflight work settles.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateInFlight { .. }
                | Self::SequenceConflictInProcess { .. }
                | Self::Store(_)
        )
    }

    /// True when the rejection signals corruption operators must repair.
    pub fn requires_operator(&self) -> bool {
        matches!(self, Self::CounterStateBroken { .. })
    }
}
