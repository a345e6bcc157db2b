//! In-memory stream store.
//!
//! Holds the last message per subject and the committed totals, which is all
//! admission reads. Used by tests and by embedders without a durable log.

use crate::config::StorageType;
use crate::domain::{stored_size, Headers, StoreError, StoredMessage, StreamState};
use crate::ports::StreamStore;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Inner {
    last_by_subject: HashMap<String, StoredMessage>,
    state: StreamState,
    last_seq: u64,
    unavailable: bool,
}

/// Thread-safe in-memory implementation of [`StreamStore`].
#[derive(Debug, Default)]
pub struct InMemoryStreamStore {
    storage: StorageType,
    inner: RwLock<Inner>,
}

impl InMemoryStreamStore {
    pub fn new(storage: StorageType) -> Self {
        Self {
            storage,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Appends a committed message, returning its sequence.
    pub fn append(&self, subject: &str, headers: Headers, payload: Vec<u8>) -> u64 {
        let size = stored_size(
            self.storage,
            subject.len(),
            headers.encoded_len(),
            payload.len(),
        );
        let mut inner = self.inner.write();
        inner.last_seq += 1;
        inner.state.msgs += 1;
        inner.state.bytes += size;

        let sequence = inner.last_seq;
        inner.last_by_subject.insert(
            subject.to_string(),
            StoredMessage {
                subject: subject.to_string(),
                sequence,
                headers,
                payload,
            },
        );
        sequence
    }

    /// Drops committed messages, as consumer acks do under interest retention.
    pub fn discard(&self, msgs: u64, bytes: u64) {
        let mut inner = self.inner.write();
        inner.state.msgs = inner.state.msgs.saturating_sub(msgs);
        inner.state.bytes = inner.state.bytes.saturating_sub(bytes);
    }

    /// Makes subsequent reads fail, for exercising store errors.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.write().unavailable = unavailable;
    }

    /// Last assigned sequence.
    pub fn last_sequence(&self) -> u64 {
        self.inner.read().last_seq
    }
}

impl StreamStore for InMemoryStreamStore {
    fn load_last_msg(&self, subject: &str) -> Result<Option<StoredMessage>, StoreError> {
        let inner = self.inner.read();
        if inner.unavailable {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(inner.last_by_subject.get(subject).cloned())
    }

    fn fast_state(&self) -> StreamState {
        self.inner.read().state
    }
}
