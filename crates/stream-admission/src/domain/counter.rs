//! # Counter Running-Total Manager
//!
//! Several increments to the same counter subject can be proposed before any
//! of them commits. Reading "last stored value" for each would lose updates,
//! so the ledger keeps an in-memory running total per subject that is valid
//! across every inflight proposal.
//!
//! ## Payload Format
//!
//! ```text
//! {"val":"<base-10 total>"}
//! ```
//!
//! ## Sourced Counters
//!
//! A message carrying a stream-source annotation holds the origin's absolute
//! value, not a delta. The ledger records the last value seen per
//! (origin stream, origin subject), rewrites the increment directive to the
//! difference, and publishes the per-origin map in the counter-sources header.
//! Replaying the same absolute value from the same origin yields a zero delta.
//!
//! ## Refcounting
//!
//! | Event | Effect |
//! |-------|--------|
//! | apply | refcount + 1, total += delta |
//! | commit (`release`) | refcount - 1, evict at 0 |
//! | rejection (`undo`) | refcount - 1, total -= delta, evict at 0 |
//!
//! An evicted subject reloads from the last committed message next time.

use super::entities::{CandidateMessage, StoredMessage};
use super::errors::{AdmissionError, StoreError};
use super::headers::{COUNTER_SOURCES, MSG_INCR, STREAM_SOURCE};
use super::inspector::parse_big_decimal;
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Origin stream → origin subject → last absolute value (decimal string).
pub type CounterSources = BTreeMap<String, BTreeMap<String, String>>;

/// Counter payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterValue {
    #[serde(rename = "val")]
    pub value: String,
}

/// Parsed stream-source annotation: `<stream> <seq> <subject> ...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSource {
    pub stream: String,
    pub subject: String,
}

impl StreamSource {
    /// Parses the annotation; the origin subject defaults to `subject`.
    pub fn parse(raw: &str, subject: &str) -> Self {
        let fields: Vec<&str> = raw.split(' ').collect();
        Self {
            stream: fields[0].to_string(),
            subject: fields
                .get(2)
                .filter(|s| !s.is_empty())
                .copied()
                .unwrap_or(subject)
                .to_string(),
        }
    }
}

/// In-memory state for one counter subject.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunningTotal {
    pub total: BigInt,
    pub sources: CounterSources,
    pub refcount: u64,
}

/// A sourced contribution recorded by one apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginContribution {
    pub stream: String,
    pub subject: String,
    pub previous: Option<String>,
    pub current: String,
}

/// What one apply did, so it can be released or undone exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedIncrement {
    pub subject: String,
    pub delta: BigInt,
    pub origin: Option<OriginContribution>,
}

/// Per-stream counter ledger.
#[derive(Debug, Default)]
pub struct CounterLedger {
    totals: HashMap<String, RunningTotal>,
}

impl CounterLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running total for a subject, if one is held in memory.
    pub fn get(&self, subject: &str) -> Option<&RunningTotal> {
        self.totals.get(subject)
    }

    /// Number of subjects with inflight increments.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Applies `increment` to the subject's running total and rewrites the
    /// message payload (and headers, for sourced values) accordingly.
    ///
    /// `load_last` is only consulted when no running total is held.
    ///
    /// # Errors
    /// - `CounterStateBroken` if the stored or sourced value cannot be parsed
    /// - `PayloadTooLarge` if the rewritten message exceeds `max_payload`;
    ///   the ledger is left as it was
    pub fn apply<F>(
        &mut self,
        msg: &mut CandidateMessage,
        increment: BigInt,
        max_payload: usize,
        load_last: F,
    ) -> Result<AppliedIncrement, AdmissionError>
    where
        F: FnOnce(&str) -> Result<Option<StoredMessage>, StoreError>,
    {
        let subject = msg.subject.clone();
        let (mut total, mut sources) = match self.totals.get(&subject) {
            Some(running) => (running.total.clone(), running.sources.clone()),
            None => load_committed(&subject, load_last)?,
        };

        let mut delta = increment;
        let mut origin = None;
        if let Some(raw) = msg.headers.get_non_empty(STREAM_SOURCE) {
            let source = StreamSource::parse(raw, &subject);
            let absolute = decode_value(&msg.payload)
                .ok_or_else(|| broken(&subject, "sourced payload is not a counter value"))?;
            let current = absolute.to_string();

            let previous = sources
                .entry(source.stream.clone())
                .or_default()
                .insert(source.subject.clone(), current.clone());
            let previous_value = previous
                .as_deref()
                .and_then(parse_big_decimal)
                .unwrap_or_default();

            delta = absolute - previous_value;
            if delta.is_zero() {
                debug!(
                    subject = %subject,
                    origin = %source.stream,
                    "Sourced value unchanged, zero delta"
                );
            }
            msg.set_header(MSG_INCR, delta.to_string());
            origin = Some(OriginContribution {
                stream: source.stream,
                subject: source.subject,
                previous,
                current,
            });
        }

        total += &delta;
        msg.payload = encode_value(&total).map_err(|e| broken(&subject, e.to_string()))?;
        if !sources.is_empty() {
            let encoded =
                serde_json::to_string(&sources).map_err(|e| broken(&subject, e.to_string()))?;
            msg.set_header(COUNTER_SOURCES, encoded);
        }

        let running = self.totals.entry(subject.clone()).or_default();
        running.total = total;
        running.sources = sources;
        running.refcount += 1;

        let applied = AppliedIncrement {
            subject,
            delta,
            origin,
        };

        let size = msg.total_len();
        if size > max_payload {
            self.undo(&applied);
            return Err(AdmissionError::PayloadTooLarge {
                size,
                max: max_payload,
            });
        }

        debug!(
            subject = %applied.subject,
            delta = %applied.delta,
            refcount = self.totals.get(&applied.subject).map(|r| r.refcount).unwrap_or(0),
            "Counter increment staged"
        );
        Ok(applied)
    }

    /// Drops one reference after the increment committed.
    pub fn release(&mut self, subject: &str) {
        let Some(running) = self.totals.get_mut(subject) else {
            return;
        };
        running.refcount = running.refcount.saturating_sub(1);
        if running.refcount == 0 {
            self.totals.remove(subject);
        }
    }

    /// Reverts an increment that will never commit.
    pub fn undo(&mut self, applied: &AppliedIncrement) {
        let Some(running) = self.totals.get_mut(&applied.subject) else {
            return;
        };
        running.refcount = running.refcount.saturating_sub(1);
        if running.refcount == 0 {
            self.totals.remove(&applied.subject);
            return;
        }

        running.total -= &applied.delta;
        if let Some(origin) = &applied.origin {
            restore_origin(&mut running.sources, origin);
        }
    }
}

/// Puts back the previous per-origin value unless a later apply replaced it.
fn restore_origin(sources: &mut CounterSources, origin: &OriginContribution) {
    let Some(per_origin) = sources.get_mut(&origin.stream) else {
        return;
    };
    if per_origin.get(&origin.subject) != Some(&origin.current) {
        return;
    }
    match &origin.previous {
        Some(previous) => {
            per_origin.insert(origin.subject.clone(), previous.clone());
        }
        None => {
            per_origin.remove(&origin.subject);
            if per_origin.is_empty() {
                sources.remove(&origin.stream);
            }
        }
    }
}

fn load_committed<F>(
    subject: &str,
    load_last: F,
) -> Result<(BigInt, CounterSources), AdmissionError>
where
    F: FnOnce(&str) -> Result<Option<StoredMessage>, StoreError>,
{
    let Some(stored) = load_last(subject)? else {
        return Ok((BigInt::default(), CounterSources::new()));
    };

    let total = decode_value(&stored.payload)
        .ok_or_else(|| broken(subject, "stored payload is not a counter value"))?;
    let sources = match stored.headers.get_non_empty(COUNTER_SOURCES) {
        Some(raw) => serde_json::from_str(raw).map_err(|e| broken(subject, e.to_string()))?,
        None => CounterSources::new(),
    };
    Ok((total, sources))
}

/// Parses a `{"val":"..."}` payload.
pub fn decode_value(payload: &[u8]) -> Option<BigInt> {
    let value: CounterValue = serde_json::from_slice(payload).ok()?;
    parse_big_decimal(&value.value)
}

/// Encodes a total as a `{"val":"..."}` payload.
pub fn encode_value(total: &BigInt) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&CounterValue {
        value: total.to_string(),
    })
}

fn broken(subject: &str, reason: impl Into<String>) -> AdmissionError {
    AdmissionError::CounterStateBroken {
        subject: subject.to_string(),
        reason: reason.into(),
    }
}
