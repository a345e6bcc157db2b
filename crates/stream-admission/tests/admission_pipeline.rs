//! # Admission Pipeline Integration Tests
//!
//! Drives `StreamAdmission` end to end against the in-memory store, with the
//! commit stage simulated by appending admitted messages and reconciling.
//!
//! ## Test Categories
//!
//! 1. **Header Inspection** - size limit first, TTL and stream checks
//! 2. **Dedup** - committed duplicates, staged duplicates, failed proposals
//! 3. **Counters** - running totals, sourced values, rollback
//! 4. **Quota** - discard-new limits counted with inflight proposals
//! 5. **Subject Sequence** - optimistic concurrency per subject

use std::sync::Arc;
use std::time::Duration;
use stream_admission::domain::headers::{
    EXPECTED_LAST_SUBJECT_SEQ, EXPECTED_LAST_SUBJECT_SEQ_SUBJECT, EXPECTED_STREAM, MSG_ID,
    MSG_INCR, MSG_TTL, STREAM_SOURCE,
};
use stream_admission::{
    AdmissionApi, AdmissionError, AdmissionLimits, Admitted, CandidateMessage, DiscardPolicy,
    InMemoryStreamStore, MessageTtl, ProposalOutcome, RejectionKind, RetentionPolicy,
    StorageType, StreamAdmission, StreamConfig,
};
use stream_telemetry::TelemetryConfig;

// =============================================================================
// TEST HELPERS
// =============================================================================

struct Harness {
    admission: StreamAdmission<InMemoryStreamStore>,
    store: Arc<InMemoryStreamStore>,
}

impl Harness {
    fn new(config: StreamConfig) -> Self {
        let _ = stream_telemetry::init_logging(&TelemetryConfig {
            log_level: "debug".to_string(),
            ..TelemetryConfig::default()
        });
        let store = Arc::new(InMemoryStreamStore::new(config.storage));
        let admission = StreamAdmission::new(config, AdmissionLimits::default(), store.clone());
        Self { admission, store }
    }

    fn admit(&self, msg: &mut CandidateMessage) -> Result<Admitted, AdmissionError> {
        self.admission.admit(msg)
    }

    /// Admits, appends to the store and reconciles as committed.
    fn publish(
        &self,
        mut msg: CandidateMessage,
    ) -> Result<(u64, CandidateMessage), AdmissionError> {
        let admitted = self.admission.admit(&mut msg)?;
        let sequence = self
            .store
            .append(&msg.subject, msg.headers.clone(), msg.payload.clone());
        self.admission
            .reconcile(admitted.ticket, ProposalOutcome::Committed { sequence });
        Ok((sequence, msg))
    }
}

fn counter_stream() -> StreamConfig {
    StreamConfig {
        allow_msg_counter: true,
        ..StreamConfig::named("COUNTERS")
    }
}

fn increment(subject: &str, by: &str) -> CandidateMessage {
    CandidateMessage::new(subject, 0).with_header(MSG_INCR, by)
}

fn payload(msg: &CandidateMessage) -> &str {
    std::str::from_utf8(&msg.payload).unwrap()
}

// =============================================================================
// HEADER INSPECTION
// =============================================================================

#[test]
fn test_oversized_header_rejected_before_other_checks() {
    let harness = Harness::new(StreamConfig::named("ORDERS"));
    let mut msg = CandidateMessage::new("orders", 0)
        .with_header(MSG_INCR, "not-a-number")
        .with_header(EXPECTED_STREAM, "ELSEWHERE")
        .with_header(MSG_ID, "dup")
        .with_header("X-Padding", "x".repeat(70_000));

    let err = harness.admit(&mut msg).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::HeaderTooLarge);
    assert_eq!(harness.admission.status().dedup_entries, 0);
}

/// A compact wire block of `extra` padding bytes plus exactly 65535 bytes.
fn compact_header_block(extra: usize) -> Vec<u8> {
    let mut block = String::from("NATS/1.0\r\n");
    for i in 0..3854 {
        block.push_str(&format!("X{i:05}:aaaaaaaa\r\n"));
    }
    block.push_str(&format!("Y:{}\r\n\r\n", "b".repeat(1 + extra)));
    block.into_bytes()
}

#[test]
fn test_header_limit_uses_received_block_length() {
    let harness = Harness::new(StreamConfig::named("ORDERS"));

    let block = compact_header_block(0);
    assert_eq!(block.len(), 65535);
    let msg = CandidateMessage::from_wire("orders", &block, Vec::new(), 0).unwrap();
    assert!(msg.headers.encoded_len() > block.len());
    harness.publish(msg).unwrap();

    let block = compact_header_block(1);
    let mut msg = CandidateMessage::from_wire("orders", &block, Vec::new(), 0).unwrap();
    assert_eq!(
        harness.admit(&mut msg).unwrap_err(),
        AdmissionError::HeaderTooLarge {
            len: 65536,
            max: 65535
        }
    );
}

#[test]
fn test_padded_block_cannot_shrink_under_limit() {
    let harness = Harness::new(StreamConfig::named("ORDERS"));
    let block = format!("NATS/1.0\r\nNats-Msg-Id:{}x\r\n\r\n", " ".repeat(70_000));
    let mut msg = CandidateMessage::from_wire("orders", block.as_bytes(), Vec::new(), 0).unwrap();
    assert!(msg.headers.encoded_len() < 100);

    let err = harness.admit(&mut msg).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::HeaderTooLarge);
    assert_eq!(harness.admission.status().dedup_entries, 0);
}

#[test]
fn test_ttl_rejected_when_disabled() {
    let harness = Harness::new(StreamConfig::named("ORDERS"));
    let mut msg = CandidateMessage::new("orders", 0).with_header(MSG_TTL, "5s");
    let err = harness.admit(&mut msg).unwrap_err();
    assert_eq!(err, AdmissionError::TtlDisabled);
}

#[test]
fn test_ttl_accepted_when_enabled() {
    let harness = Harness::new(StreamConfig {
        allow_msg_ttl: true,
        ..StreamConfig::named("ORDERS")
    });
    let mut msg = CandidateMessage::new("orders", 0).with_header(MSG_TTL, "1m");
    let admitted = harness.admit(&mut msg).unwrap();
    assert_eq!(admitted.ttl, MessageTtl::After(Duration::from_secs(60)));
    harness
        .admission
        .reconcile(admitted.ticket, ProposalOutcome::Failed);

    let mut short = CandidateMessage::new("orders", 0).with_header(MSG_TTL, "500ms");
    let err = harness.admit(&mut short).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::TtlInvalid);
}

#[test]
fn test_expected_stream_matches() {
    let harness = Harness::new(StreamConfig::named("ORDERS"));
    harness
        .publish(CandidateMessage::new("orders", 0).with_header(EXPECTED_STREAM, "ORDERS"))
        .unwrap();
}

// =============================================================================
// DEDUP
// =============================================================================

#[test]
fn test_committed_duplicate_leaves_counter_untouched() {
    let harness = Harness::new(counter_stream());
    let (sequence, first) = harness
        .publish(increment("hits", "5").with_header(MSG_ID, "req-1"))
        .unwrap();
    assert_eq!(payload(&first), r#"{"val":"5"}"#);

    let mut replay = increment("hits", "5").with_header(MSG_ID, "req-1");
    let err = harness.admit(&mut replay).unwrap_err();
    assert_eq!(err.duplicate_sequence(), Some(sequence));
    assert!(err.is_idempotent_duplicate());
    assert_eq!(harness.admission.status().counter_subjects, 0);

    let (_, next) = harness.publish(increment("hits", "1")).unwrap();
    assert_eq!(payload(&next), r#"{"val":"6"}"#);
}

#[test]
fn test_staged_duplicate_is_in_flight() {
    let harness = Harness::new(StreamConfig::named("ORDERS"));
    let mut first = CandidateMessage::new("orders", 0).with_header(MSG_ID, "req-1");
    let admitted = harness.admit(&mut first).unwrap();

    let mut second = CandidateMessage::new("orders", 0).with_header(MSG_ID, "req-1");
    let err = harness.admit(&mut second).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::DuplicateInFlight);
    assert!(err.is_retryable());

    harness
        .admission
        .reconcile(admitted.ticket, ProposalOutcome::Failed);
    harness.publish(second).unwrap();
}

// =============================================================================
// COUNTERS
// =============================================================================

#[test]
fn test_increments_accumulate_before_commit() {
    let harness = Harness::new(counter_stream());

    let mut a = increment("hits", "+5");
    let a_ticket = harness.admit(&mut a).unwrap().ticket;
    assert_eq!(payload(&a), r#"{"val":"5"}"#);

    let mut b = increment("hits", "3");
    let b_ticket = harness.admit(&mut b).unwrap().ticket;
    assert_eq!(payload(&b), r#"{"val":"8"}"#);

    for (msg, ticket) in [(a, a_ticket), (b, b_ticket)] {
        let sequence = harness.store.append(&msg.subject, msg.headers, msg.payload);
        harness
            .admission
            .reconcile(ticket, ProposalOutcome::Committed { sequence });
    }

    let (_, c) = harness.publish(increment("hits", "-10")).unwrap();
    assert_eq!(payload(&c), r#"{"val":"-2"}"#);
}

#[test]
fn test_counter_stream_requires_increment() {
    let harness = Harness::new(counter_stream());
    let mut msg = CandidateMessage::new("hits", 0).with_header(MSG_ID, "x");
    assert_eq!(
        harness.admit(&mut msg).unwrap_err(),
        AdmissionError::IncrementMissing
    );

    let mut bare = CandidateMessage::new("hits", 0);
    assert_eq!(
        harness.admit(&mut bare).unwrap_err(),
        AdmissionError::IncrementMissing
    );
}

#[test]
fn test_increment_on_plain_stream_rejected() {
    let harness = Harness::new(StreamConfig::named("ORDERS"));
    let mut msg = increment("hits", "1");
    assert_eq!(
        harness.admit(&mut msg).unwrap_err(),
        AdmissionError::IncrementDisabled
    );
}

#[test]
fn test_broken_counter_state_requires_operator() {
    let harness = Harness::new(counter_stream());
    harness
        .store
        .append("hits", Default::default(), b"garbage".to_vec());

    let mut msg = increment("hits", "1");
    let err = harness.admit(&mut msg).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::CounterStateBroken);
    assert!(err.requires_operator());
    assert!(!err.is_retryable());
}

#[test]
fn test_sourced_value_is_idempotent_per_origin() {
    let harness = Harness::new(counter_stream());
    let sourced = |seq: u64, value: &str| {
        CandidateMessage::new("agg", 0)
            .with_header(STREAM_SOURCE, format!("ORIGIN {seq} orders.count"))
            .with_header(MSG_INCR, value)
            .with_payload(format!(r#"{{"val":"{value}"}}"#).into_bytes())
            .sourced()
    };

    let (_, first) = harness.publish(sourced(1, "7")).unwrap();
    assert_eq!(first.headers.get(MSG_INCR), Some("7"));
    assert_eq!(payload(&first), r#"{"val":"7"}"#);

    let (_, replay) = harness.publish(sourced(1, "7")).unwrap();
    assert_eq!(replay.headers.get(MSG_INCR), Some("0"));
    assert_eq!(payload(&replay), r#"{"val":"7"}"#);

    let (_, grown) = harness.publish(sourced(2, "10")).unwrap();
    assert_eq!(grown.headers.get(MSG_INCR), Some("3"));
    assert_eq!(payload(&grown), r#"{"val":"10"}"#);
}

// =============================================================================
// QUOTA
// =============================================================================

#[test]
fn test_discard_new_limit_counts_committed_messages() {
    let harness = Harness::new(StreamConfig {
        retention: RetentionPolicy::Interest,
        discard: DiscardPolicy::New,
        max_msgs: 1,
        storage: StorageType::File,
        ..StreamConfig::named("WORK")
    });
    harness.store.append("jobs", Default::default(), b"1".to_vec());

    let mut msg = CandidateMessage::new("jobs", 0).with_payload(b"2".to_vec());
    let err = harness.admit(&mut msg).unwrap_err();
    assert_eq!(err, AdmissionError::MaxMessagesExceeded { limit: 1 });
    assert_eq!(harness.admission.status().inflight_messages, 0);
}

#[test]
fn test_byte_limit_counts_inflight_footprints() {
    let harness = Harness::new(StreamConfig {
        retention: RetentionPolicy::Interest,
        discard: DiscardPolicy::New,
        max_bytes: 100,
        storage: StorageType::Memory,
        ..StreamConfig::named("WORK")
    });

    // 4 + 60 + 16 = 80 bytes each.
    let mut first = CandidateMessage::new("jobs", 0).with_payload(vec![0; 60]);
    let admitted = harness.admit(&mut first).unwrap();
    assert_eq!(harness.admission.status().inflight_bytes, 80);

    let mut second = CandidateMessage::new("jobs", 0).with_payload(vec![0; 60]);
    let err = harness.admit(&mut second).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::MaxBytesExceeded);

    harness
        .admission
        .reconcile(admitted.ticket, ProposalOutcome::Failed);
    assert_eq!(harness.admission.status().inflight_bytes, 0);
}

#[test]
fn test_quota_not_enforced_under_limits_retention() {
    let harness = Harness::new(StreamConfig {
        discard: DiscardPolicy::New,
        max_msgs: 1,
        ..StreamConfig::named("LOGS")
    });
    harness.store.append("log", Default::default(), Vec::new());
    harness.publish(CandidateMessage::new("log", 0)).unwrap();
}

// =============================================================================
// SUBJECT SEQUENCE
// =============================================================================

#[test]
fn test_expected_zero_on_empty_subject() {
    let harness = Harness::new(StreamConfig::named("KV"));
    harness
        .publish(CandidateMessage::new("kv.a", 0).with_header(EXPECTED_LAST_SUBJECT_SEQ, "0"))
        .unwrap();
}

#[test]
fn test_expected_zero_on_existing_subject_reports_found() {
    let harness = Harness::new(StreamConfig::named("KV"));
    for _ in 0..6 {
        harness.store.append("kv.other", Default::default(), Vec::new());
    }
    harness.store.append("kv.a", Default::default(), Vec::new());

    let mut msg = CandidateMessage::new("kv.a", 0).with_header(EXPECTED_LAST_SUBJECT_SEQ, "0");
    let err = harness.admit(&mut msg).unwrap_err();
    assert_eq!(
        err,
        AdmissionError::WrongLastSequence {
            expected: 0,
            found: 7
        }
    );
}

#[test]
fn test_alternate_subject_is_checked() {
    let harness = Harness::new(StreamConfig::named("KV"));
    harness.store.append("kv.lock", Default::default(), Vec::new());

    let mut msg = CandidateMessage::new("kv.a", 0)
        .with_header(EXPECTED_LAST_SUBJECT_SEQ, "1")
        .with_header(EXPECTED_LAST_SUBJECT_SEQ_SUBJECT, "kv.lock");
    let admitted = harness.admit(&mut msg).unwrap();
    assert_eq!(harness.admission.status().subjects_in_process, 1);
    harness
        .admission
        .reconcile(admitted.ticket, ProposalOutcome::Failed);
}

#[test]
fn test_concurrent_assertion_conflicts_even_if_correct() {
    let harness = Harness::new(StreamConfig::named("KV"));
    let mut first = CandidateMessage::new("kv.a", 0).with_header(EXPECTED_LAST_SUBJECT_SEQ, "0");
    let first = harness.admit(&mut first).unwrap();

    let mut second =
        CandidateMessage::new("kv.a", 0).with_header(EXPECTED_LAST_SUBJECT_SEQ, "0");
    let err = harness.admit(&mut second).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::SequenceConflictInProcess);

    let sequence = harness.store.append("kv.a", Default::default(), Vec::new());
    harness
        .admission
        .reconcile(first.ticket, ProposalOutcome::Committed { sequence });

    let mut third = CandidateMessage::new("kv.a", 0).with_header(EXPECTED_LAST_SUBJECT_SEQ, "1");
    let third = harness.admit(&mut third).unwrap();
    harness
        .admission
        .reconcile(third.ticket, ProposalOutcome::Failed);
}

// =============================================================================
// BOOKKEEPING
// =============================================================================

#[test]
fn test_reconciled_tickets_leave_nothing_behind() {
    let quota = |name: &str, counters: bool| StreamConfig {
        allow_msg_counter: counters,
        retention: RetentionPolicy::Interest,
        discard: DiscardPolicy::New,
        max_msgs: 100,
        ..StreamConfig::named(name)
    };
    let kv = Harness::new(quota("KV", false));
    let counters = Harness::new(quota("COUNTERS", true));

    let mut tickets = Vec::new();
    for i in 0..10 {
        let mut msg = CandidateMessage::new(format!("kv.{i}"), 0)
            .with_header(MSG_ID, format!("id-{i}"))
            .with_header(EXPECTED_LAST_SUBJECT_SEQ, "0");
        tickets.push((&kv, kv.admit(&mut msg).unwrap().ticket));

        let mut msg = increment("hits", "1").with_header(MSG_ID, format!("id-{i}"));
        tickets.push((&counters, counters.admit(&mut msg).unwrap().ticket));
    }

    let status = kv.admission.status();
    assert_eq!(status.inflight_messages, 10);
    assert_eq!(status.subjects_in_process, 10);
    assert_eq!(status.dedup_staged, 10);
    let status = counters.admission.status();
    assert_eq!(status.counter_subjects, 1);
    assert_eq!(status.inflight_messages, 10);

    for (harness, ticket) in tickets {
        harness.admission.reconcile(ticket, ProposalOutcome::Failed);
    }

    for harness in [&kv, &counters] {
        let status = harness.admission.status();
        assert_eq!(status.inflight_messages, 0);
        assert_eq!(status.inflight_bytes, 0);
        assert_eq!(status.subjects_in_process, 0);
        assert_eq!(status.counter_subjects, 0);
        assert_eq!(status.dedup_entries, 0);
    }
}

#[test]
fn test_outcomes_are_exported_as_metrics() {
    let _ = stream_telemetry::register_metrics();
    let harness = Harness::new(StreamConfig::named("METERED"));
    harness.publish(CandidateMessage::new("m", 0)).unwrap();
    let mut bad = CandidateMessage::new("m", 0).with_header(EXPECTED_STREAM, "OTHER");
    let _ = harness.admit(&mut bad);

    let text = stream_telemetry::encode_metrics().unwrap();
    assert!(text.contains("sa_admission_admitted_total"));
    assert!(text.contains(r#"kind="stream_name_mismatch""#));
}
