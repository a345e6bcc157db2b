//! Application layer - admission service orchestrating the domain stages.

pub mod service;

pub use service::StreamAdmission;
