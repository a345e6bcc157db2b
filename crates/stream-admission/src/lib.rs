//! # Stream Admission
//!
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Decides, on the node about to propose a message into a stream's replicated
//! log, whether the message is admissible. The decision is made once by the
//! proposer and replicated as fact, so every replica agrees on it.
//!
//! ## Admission Pipeline
//!
//! ```text
//! [CANDIDATE] ──inspect──→ dedup ──→ counter ──→ quota ──→ subject seq ──→ [ADMITTED]
//!                  │          │          │          │            │
//!                  └──────────┴──────────┴──────────┴────────────┴──→ [REJECTED]
//! ```
//!
//! | Stage | Applies when | Staged state |
//! |-------|--------------|--------------|
//! | Header inspection | headers present | none |
//! | Dedup | message id present | staged id at sequence 0 |
//! | Counter accounting | counter stream | running total refcount |
//! | Quota | interest retention, discard new, limit set | inflight footprint |
//! | Subject sequence | last-subject-sequence asserted | in-process subject |
//!
//! ## Reconciliation
//!
//! Admission hands back an [`AdmissionTicket`](domain::AdmissionTicket). The
//! commit stage reports the outcome exactly once:
//!
//! | Outcome | Dedup | Counter | Subject | Quota |
//! |---------|-------|---------|---------|-------|
//! | `Committed { sequence }` | record sequence | refcount - 1 | release | release |
//! | `Failed` | remove | refcount - 1, subtract | release | release |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/memory_store.rs - InMemoryStreamStore                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - AdmissionApi trait                         │
//! │  ports/outbound.rs - StreamStore, TimeSource traits             │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  application/service.rs - StreamAdmission orchestrator          │
//! │  domain/               - inspector, dedup, counter, quota, seq  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stream_admission::{AdmissionApi, StreamAdmission, InMemoryStreamStore};
//!
//! let store = Arc::new(InMemoryStreamStore::new(StorageType::File));
//! let admission = StreamAdmission::new(config, AdmissionLimits::from_env(), store);
//! let admitted = admission.admit(&mut msg)?;
//! admission.reconcile(admitted.ticket, ProposalOutcome::Committed { sequence });
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryStreamStore;
pub use application::StreamAdmission;
pub use config::{AdmissionLimits, DiscardPolicy, RetentionPolicy, StorageType, StreamConfig};
pub use domain::*;
pub use ports::*;
