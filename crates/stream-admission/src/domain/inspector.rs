//! # Header Inspector
//!
//! Pure, fail-fast validation of the directives a candidate carries.
//! Never mutates the message and never touches stream state; the dedup
//! lookup for an extracted message id is done by the caller right after.
//!
//! ## Check Order
//!
//! | Step | Check | Rejection |
//! |------|-------|-----------|
//! | 1 | header block fits 16-bit length | `HeaderTooLarge` |
//! | 2 | increment parses | `IncrementInvalid` |
//! | 3 | increment allowed (direct publish only) | `IncrementDisabled`, `IncrementPayloadNotEmpty`, `IncrementCombinationInvalid` |
//! | 4 | expected stream name | `StreamNameMismatch` |
//! | 5 | TTL (direct publish only) | `TtlDisabled`, `TtlInvalid` |

use super::entities::CandidateMessage;
use super::errors::AdmissionError;
use super::headers::{
    Headers, EXPECTED_LAST_MSG_ID, EXPECTED_LAST_SEQ, EXPECTED_LAST_SUBJECT_SEQ,
    EXPECTED_LAST_SUBJECT_SEQ_SUBJECT, EXPECTED_STREAM, MSG_ID, MSG_INCR, MSG_TTL, ROLLUP,
};
use crate::config::{AdmissionLimits, StreamConfig};
use num_bigint::BigInt;
use std::str::FromStr;
use std::time::Duration;

/// Parsed per-message expiry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageTtl {
    /// No TTL directive.
    #[default]
    None,
    /// Explicitly never expires.
    Never,
    /// Expires after the given whole number of seconds.
    After(Duration),
}

/// Optimistic concurrency assertion on a subject's last sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectSequenceAssertion {
    pub subject: String,
    pub expected: u64,
}

/// Directives extracted from a candidate that passed inspection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directives {
    pub increment: Option<BigInt>,
    pub msg_id: Option<String>,
    pub ttl: MessageTtl,
    pub subject_sequence: Option<SubjectSequenceAssertion>,
}

/// Runs the header checks for `msg` against the stream configuration.
pub fn inspect(
    msg: &CandidateMessage,
    config: &StreamConfig,
    limits: &AdmissionLimits,
) -> Result<Directives, AdmissionError> {
    let headers = &msg.headers;
    let mut directives = Directives::default();
    if headers.is_empty() {
        return Ok(directives);
    }

    let len = msg.header_len();
    if len > limits.max_header_len {
        return Err(AdmissionError::HeaderTooLarge {
            len,
            max: limits.max_header_len,
        });
    }

    // Sourced data is stored verbatim, so only direct increments are policed.
    directives.increment = message_increment(headers)?;
    if directives.increment.is_some() && !msg.sourced {
        if !config.allow_msg_counter {
            return Err(AdmissionError::IncrementDisabled);
        }
        if !msg.payload.is_empty() {
            return Err(AdmissionError::IncrementPayloadNotEmpty);
        }
        if let Some(directive) = conflicting_directive(headers) {
            return Err(AdmissionError::IncrementCombinationInvalid { directive });
        }
    }

    if let Some(expected) = headers.get_non_empty(EXPECTED_STREAM) {
        if expected != config.name {
            return Err(AdmissionError::StreamNameMismatch {
                expected: expected.to_string(),
                stream: config.name.clone(),
            });
        }
    }

    let ttl = message_ttl(headers);
    if !msg.sourced {
        match &ttl {
            Ok(MessageTtl::None) => {}
            _ if !config.allow_msg_ttl => return Err(AdmissionError::TtlDisabled),
            Err(err) => return Err(err.clone()),
            Ok(_) => {}
        }
    }
    directives.ttl = ttl.unwrap_or_default();

    directives.msg_id = headers.get_non_empty(MSG_ID).map(str::to_string);
    directives.subject_sequence =
        expected_last_subject_seq(headers).map(|expected| SubjectSequenceAssertion {
            subject: headers
                .get_non_empty(EXPECTED_LAST_SUBJECT_SEQ_SUBJECT)
                .unwrap_or(msg.subject.as_str())
                .to_string(),
            expected,
        });

    Ok(directives)
}

/// First conditional-publish directive that cannot accompany an increment.
fn conflicting_directive(headers: &Headers) -> Option<&'static str> {
    if headers.get_non_empty(ROLLUP).is_some() {
        return Some(ROLLUP);
    }
    if headers.get_non_empty(EXPECTED_LAST_MSG_ID).is_some() {
        return Some(EXPECTED_LAST_MSG_ID);
    }
    if headers
        .get_non_empty(EXPECTED_LAST_SUBJECT_SEQ_SUBJECT)
        .is_some()
    {
        return Some(EXPECTED_LAST_SUBJECT_SEQ_SUBJECT);
    }
    if expected_last_seq(headers).is_some() {
        return Some(EXPECTED_LAST_SEQ);
    }
    if expected_last_subject_seq(headers).is_some() {
        return Some(EXPECTED_LAST_SUBJECT_SEQ);
    }
    None
}

/// Parses the increment directive. An empty value counts as absent.
pub fn message_increment(headers: &Headers) -> Result<Option<BigInt>, AdmissionError> {
    let Some(value) = headers.get_non_empty(MSG_INCR) else {
        return Ok(None);
    };
    parse_big_decimal(value)
        .map(Some)
        .ok_or_else(|| AdmissionError::IncrementInvalid {
            value: value.to_string(),
        })
}

/// Parses a signed base-10 integer of any size.
pub fn parse_big_decimal(value: &str) -> Option<BigInt> {
    let digits = value
        .strip_prefix('+')
        .or_else(|| value.strip_prefix('-'))
        .unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = BigInt::from_str(digits).ok()?;
    Some(if value.starts_with('-') {
        -magnitude
    } else {
        magnitude
    })
}

/// Parses the TTL directive. Absent or empty means [`MessageTtl::None`].
pub fn message_ttl(headers: &Headers) -> Result<MessageTtl, AdmissionError> {
    let Some(value) = headers.get_non_empty(MSG_TTL) else {
        return Ok(MessageTtl::None);
    };
    parse_ttl(value).ok_or_else(|| AdmissionError::TtlInvalid {
        value: value.to_string(),
    })
}

/// Parses `never`, a duration such as `90s` or `1h30m`, or whole seconds.
/// Anything under one second is invalid.
pub fn parse_ttl(value: &str) -> Option<MessageTtl> {
    if value.eq_ignore_ascii_case("never") {
        return Some(MessageTtl::Never);
    }
    let duration = match parse_duration(value) {
        Some(duration) => duration,
        None => {
            let secs: i64 = value.parse().ok()?;
            Duration::from_secs(u64::try_from(secs).ok()?)
        }
    };
    if duration < Duration::from_secs(1) {
        return None;
    }
    Some(MessageTtl::After(Duration::from_secs(duration.as_secs())))
}

fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.strip_prefix('+').unwrap_or(input);
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut rest = s;
    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let (number, tail) = rest.split_at(num_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut value = whole.checked_mul(unit_nanos)?;
        if !frac.is_empty() {
            let scale = 10u128.checked_pow(u32::try_from(frac.len()).ok()?)?;
            let frac: u128 = frac.parse().ok()?;
            value = value.checked_add(frac.checked_mul(unit_nanos)? / scale)?;
        }
        total_nanos = total_nanos.checked_add(value)?;
        rest = tail;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).ok()?;
    Some(Duration::new(secs, (total_nanos % 1_000_000_000) as u32))
}

/// Asserted last stream sequence; an unparsable value counts as absent.
pub fn expected_last_seq(headers: &Headers) -> Option<u64> {
    headers.get(EXPECTED_LAST_SEQ)?.parse().ok()
}

/// Asserted last subject sequence; an unparsable value counts as absent.
pub fn expected_last_subject_seq(headers: &Headers) -> Option<u64> {
    headers.get(EXPECTED_LAST_SUBJECT_SEQ)?.parse().ok()
}
