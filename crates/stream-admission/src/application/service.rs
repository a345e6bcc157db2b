//! Stream Admission Service
//!
//! Main service implementing AdmissionApi for one stream.
//!
//! ```text
//! START → inspect → dedup → counter → quota → subject sequence → ADMITTED
//!            │        │        │        │            │
//!            └────────┴────────┴────────┴────────────┴──→ REJECTED
//! ```
//!
//! Each stage that stages state records it on the ticket. A rejection at any
//! later stage settles that partial ticket as failed, so nothing leaks.

use crate::config::{AdmissionLimits, StreamConfig};
use crate::domain::{
    inspect, stored_size, AdmissionError, AdmissionState, AdmissionStatus, AdmissionTicket,
    Admitted, CandidateMessage, MessageTtl, ProposalOutcome,
};
use crate::ports::{AdmissionApi, StreamStore, SystemTimeSource, TimeSource};
use parking_lot::Mutex;
use std::sync::Arc;
use stream_telemetry::{log_admission_event, metrics};
use tracing::debug;

/// Admission pipeline for one stream.
///
/// The mutex is the stream's admission lock: one admission call at a time,
/// storage reads included. Callers must not hold any lock the store takes.
pub struct StreamAdmission<S, T = SystemTimeSource> {
    config: StreamConfig,
    limits: AdmissionLimits,
    store: Arc<S>,
    time_source: T,
    state: Mutex<AdmissionState>,
}

impl<S: StreamStore> StreamAdmission<S> {
    /// Create a service using the system clock
    pub fn new(config: StreamConfig, limits: AdmissionLimits, store: Arc<S>) -> Self {
        Self::with_time_source(config, limits, store, SystemTimeSource)
    }
}

impl<S: StreamStore, T: TimeSource> StreamAdmission<S, T> {
    /// Create a service with a custom time source
    pub fn with_time_source(
        config: StreamConfig,
        limits: AdmissionLimits,
        store: Arc<S>,
        time_source: T,
    ) -> Self {
        Self {
            config,
            limits,
            store,
            time_source,
            state: Mutex::new(AdmissionState::new()),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn run_stages(
        &self,
        state: &mut AdmissionState,
        msg: &mut CandidateMessage,
        now: u64,
        ticket: &mut AdmissionTicket,
    ) -> Result<MessageTtl, AdmissionError> {
        // 1. Header checks
        let directives = inspect(msg, &self.config, &self.limits)?;

        // Counter streams are size-checked after the payload rewrite.
        if !self.config.allow_msg_counter {
            let size = msg.total_len();
            if size > self.limits.max_payload {
                return Err(AdmissionError::PayloadTooLarge {
                    size,
                    max: self.limits.max_payload,
                });
            }
        }

        // 2. Dedup
        if let Some(msg_id) = directives.msg_id {
            state.dedup.check_and_stage(&msg_id, now)?;
            debug!(stream = %self.config.name, msg_id = %msg_id, "Message id staged");
            ticket.msg_id = Some(msg_id);
        }

        // 3. Counter accounting
        if self.config.allow_msg_counter {
            let increment = directives
                .increment
                .ok_or(AdmissionError::IncrementMissing)?;
            let store = &self.store;
            let applied = state.counters.apply(
                msg,
                increment,
                self.limits.max_payload,
                |subject| store.load_last_msg(subject),
            )?;
            ticket.counter = Some(applied);
        }

        // 4. Quota
        if self.config.enforces_inflight_quota() {
            let size = stored_size(
                self.config.storage,
                msg.subject.len(),
                msg.header_len(),
                msg.payload.len(),
            );
            state.inflight.reserve(
                ticket.proposal_hint,
                size,
                self.store.fast_state(),
                self.config.max_msgs,
                self.config.max_bytes,
            )?;
            ticket.inflight_reserved = true;
            debug!(
                stream = %self.config.name,
                hint = ticket.proposal_hint,
                size,
                inflight = state.inflight.len(),
                "Inflight footprint reserved"
            );
        }

        // 5. Subject sequence
        if let Some(assertion) = directives.subject_sequence {
            let store = &self.store;
            state
                .sequences
                .check_and_claim(ticket.proposal_hint, &assertion, |subject| {
                    Ok(store.load_last_msg(subject)?.map_or(0, |m| m.sequence))
                })?;
            ticket.sequence_subject = Some(assertion.subject);
        }

        Ok(directives.ttl)
    }

    fn settle(state: &mut AdmissionState, ticket: AdmissionTicket, outcome: ProposalOutcome) {
        let AdmissionTicket {
            proposal_hint,
            msg_id,
            counter,
            sequence_subject,
            inflight_reserved,
        } = ticket;

        if let Some(msg_id) = msg_id {
            match outcome {
                ProposalOutcome::Committed { sequence } => {
                    state.dedup.confirm(&msg_id, sequence);
                }
                ProposalOutcome::Failed => {
                    state.dedup.remove(&msg_id);
                }
            }
        }

        if let Some(applied) = counter {
            match outcome {
                ProposalOutcome::Committed { .. } => state.counters.release(&applied.subject),
                ProposalOutcome::Failed => state.counters.undo(&applied),
            }
        }

        if sequence_subject.is_some() {
            state.sequences.release(proposal_hint);
        }

        if inflight_reserved {
            state.inflight.release(proposal_hint);
        }
    }

    fn observe(&self, state: &AdmissionState) {
        metrics::observe_state(
            &self.config.name,
            state.inflight.total_bytes(),
            state.counters.len(),
            state.sequences.len(),
        );
    }
}

impl<S: StreamStore, T: TimeSource> AdmissionApi for StreamAdmission<S, T> {
    fn admit(&self, msg: &mut CandidateMessage) -> Result<Admitted, AdmissionError> {
        let mut state = self.state.lock();

        let hint = state.next_hint();
        msg.proposal_hint = hint;

        let now = self.time_source.now_nanos();
        let purged = state
            .dedup
            .purge_expired(now, self.config.duplicate_window);
        if purged > 0 {
            debug!(stream = %self.config.name, purged, "Expired dedup entries purged");
        }

        let mut ticket = AdmissionTicket::new(hint);
        match self.run_stages(&mut state, msg, now, &mut ticket) {
            Ok(ttl) => {
                self.observe(&state);
                metrics::record_admission(&self.config.name);
                log_admission_event!(
                    info,
                    self.config.name,
                    msg.subject,
                    "Message admitted",
                    hint = hint,
                    size = msg.total_len()
                );
                Ok(Admitted {
                    sequence: 0,
                    ttl,
                    ticket,
                })
            }
            Err(err) => {
                Self::settle(&mut state, ticket, ProposalOutcome::Failed);
                self.observe(&state);
                metrics::record_rejection(&self.config.name, err.kind().as_str());
                if err.requires_operator() {
                    log_admission_event!(
                        error,
                        self.config.name,
                        msg.subject,
                        "Counter state broken, operator repair required",
                        error = %err
                    );
                } else {
                    log_admission_event!(
                        warn,
                        self.config.name,
                        msg.subject,
                        "Message rejected",
                        kind = err.kind().as_str(),
                        error = %err
                    );
                }
                Err(err)
            }
        }
    }

    fn reconcile(&self, ticket: AdmissionTicket, outcome: ProposalOutcome) {
        let mut state = self.state.lock();
        debug!(
            stream = %self.config.name,
            hint = ticket.proposal_hint,
            outcome = ?outcome,
            "Reconciling proposal"
        );
        Self::settle(&mut state, ticket, outcome);
        self.observe(&state);
    }

    fn status(&self) -> AdmissionStatus {
        self.state.lock().status(&self.config.name)
    }
}
