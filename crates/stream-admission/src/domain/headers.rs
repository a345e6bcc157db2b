//! # Message Header Block
//!
//! Ordered, case-insensitively keyed metadata carried by a candidate message.
//!
//! ## Wire Format
//!
//! ```text
//! NATS/1.0\r\n
//! Nats-Msg-Id: order-17\r\n
//! Nats-Incr: +5\r\n
//! \r\n
//! ```
//!
//! An empty header set encodes to zero bytes, so a message without metadata
//! carries no header block at all.

use super::errors::HeaderError;

/// Version line opening every non-empty header block.
pub const HDR_LINE: &str = "NATS/1.0\r\n";

/// Counter increment (signed big integer delta).
pub const MSG_INCR: &str = "Nats-Incr";
/// Client supplied idempotency key.
pub const MSG_ID: &str = "Nats-Msg-Id";
/// Asserted target stream name.
pub const EXPECTED_STREAM: &str = "Nats-Expected-Stream";
/// Asserted id of the last message in the stream.
pub const EXPECTED_LAST_MSG_ID: &str = "Nats-Expected-Last-Msg-Id";
/// Asserted last stream sequence.
pub const EXPECTED_LAST_SEQ: &str = "Nats-Expected-Last-Sequence";
/// Asserted last sequence for the subject.
pub const EXPECTED_LAST_SUBJECT_SEQ: &str = "Nats-Expected-Last-Subject-Sequence";
/// Alternate subject for the per-subject sequence assertion.
pub const EXPECTED_LAST_SUBJECT_SEQ_SUBJECT: &str = "Nats-Expected-Last-Subject-Sequence-Subject";
/// Bulk delete directive.
pub const ROLLUP: &str = "Nats-Rollup";
/// Per-message expiry.
pub const MSG_TTL: &str = "Nats-TTL";
/// Cross-stream sourcing provenance.
pub const STREAM_SOURCE: &str = "Nats-Stream-Source";
/// Per-origin cumulative counter contributions.
pub const COUNTER_SOURCES: &str = "Nats-Counter-Sources";

/// Ordered header set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a wire header block.
    ///
    /// # Errors
    /// - `NotUtf8` if the block is not valid UTF-8
    /// - `MissingVersionLine` if the block does not open with `NATS/1.0`
    /// - `MalformedLine` for a line without a `:` separator
    pub fn decode(raw: &[u8]) -> Result<Self, HeaderError> {
        if raw.is_empty() {
            return Ok(Self::new());
        }

        let text = std::str::from_utf8(raw).map_err(|_| HeaderError::NotUtf8)?;
        let mut lines = text.split("\r\n");

        // Status codes may follow the version ("NATS/1.0 503").
        match lines.next() {
            Some(first) if first.starts_with("NATS/1.0") => {}
            _ => return Err(HeaderError::MissingVersionLine),
        }

        let mut entries = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(HeaderError::MalformedLine(line.to_string()));
            };
            entries.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self { entries })
    }

    /// Encodes the header set as a wire block.
    pub fn encode(&self) -> Vec<u8> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(HDR_LINE.as_bytes());
        for (name, value) in &self.entries {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    /// Length of the wire block in bytes, without encoding it.
    pub fn encoded_len(&self) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let body: usize = self
            .entries
            .iter()
            .map(|(name, value)| name.len() + 2 + value.len() + 2)
            .sum();
        HDR_LINE.len() + body + 2
    }

    /// Returns the first value for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first non-empty value for `name`.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// Checks if a header named `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces the first value for `name` in place, or appends it.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Removes every value for `name`, returning the first.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let first = self.get(name).map(str::to_string);
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        first
    }

    /// Builder form of [`Headers::set`].
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Number of header entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_headers_encode_to_nothing() {
        let headers = Headers::new();
        assert!(headers.encode().is_empty());
        assert_eq!(headers.encoded_len(), 0);
    }

    #[test]
    fn test_encoded_len_matches_encoding() {
        let headers = Headers::new()
            .with(MSG_ID, "abc")
            .with(MSG_INCR, "+5");
        assert_eq!(headers.encoded_len(), headers.encode().len());
        assert_eq!(
            headers.encode(),
            b"NATS/1.0\r\nNats-Msg-Id: abc\r\nNats-Incr: +5\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn test_decode_wire_block() {
        let raw = b"NATS/1.0\r\nNats-Msg-Id: abc\r\nNats-TTL:  5s \r\n\r\n";
        let headers = Headers::decode(raw).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(MSG_ID), Some("abc"));
        assert_eq!(headers.get(MSG_TTL), Some("5s"));
    }

    #[test]
    fn test_decode_rejects_missing_version() {
        let err = Headers::decode(b"Nats-Msg-Id: abc\r\n\r\n").unwrap_err();
        assert_eq!(err, HeaderError::MissingVersionLine);
    }

    #[test]
    fn test_decode_rejects_line_without_separator() {
        let err = Headers::decode(b"NATS/1.0\r\nbogus\r\n\r\n").unwrap_err();
        assert!(matches!(err, HeaderError::MalformedLine(line) if line == "bogus"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let headers = Headers::new().with("nats-incr", "1");
        assert_eq!(headers.get(MSG_INCR), Some("1"));
        assert!(headers.contains("NATS-INCR"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut headers = Headers::new()
            .with(MSG_INCR, "10")
            .with(MSG_ID, "x");
        headers.set(MSG_INCR, "3");
        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(entries, vec![(MSG_INCR, "3"), (MSG_ID, "x")]);
    }

    #[test]
    fn test_empty_value_is_not_non_empty() {
        let headers = Headers::new().with(MSG_ID, "");
        assert_eq!(headers.get(MSG_ID), Some(""));
        assert_eq!(headers.get_non_empty(MSG_ID), None);
    }

    #[test]
    fn test_remove() {
        let mut headers = Headers::new().with(ROLLUP, "sub");
        assert_eq!(headers.remove(ROLLUP), Some("sub".to_string()));
        assert!(headers.is_empty());
    }
}
