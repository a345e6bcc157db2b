//! # Domain Layer - Stream Admission
//!
//! Pure admission logic; no I/O. Storage reads are passed in as closures.
//!
//! ## Components
//!
//! - `headers`: Wire header block and directive names
//! - `inspector`: Fail-fast header directive checks
//! - `dedup`: Message-id dedup cache with staged entries
//! - `counter`: Running totals for counter subjects
//! - `quota`: Inflight footprint reservations
//! - `sequence`: Per-subject last-sequence assertions
//! - `state`: Per-stream bundle of the above
//! - `services`: Stored footprint estimation
//! - `errors`: Rejection kinds and error enums

pub mod counter;
pub mod dedup;
pub mod entities;
pub mod errors;
pub mod headers;
pub mod inspector;
pub mod quota;
pub mod sequence;
pub mod services;
pub mod state;
pub mod value_objects;

pub use counter::{AppliedIncrement, CounterLedger, CounterSources, CounterValue, RunningTotal};
pub use dedup::DedupCache;
pub use entities::*;
pub use errors::*;
pub use headers::Headers;
pub use inspector::{inspect, Directives, MessageTtl, SubjectSequenceAssertion};
pub use quota::InflightFootprints;
pub use sequence::SubjectSequenceTracker;
pub use services::*;
pub use state::AdmissionState;
pub use value_objects::*;
