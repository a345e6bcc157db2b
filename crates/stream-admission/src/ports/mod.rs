//! Ports layer for stream admission.
//!
//! - Inbound (Driving) ports: API exposed to the publish path and commit stage
//! - Outbound (Driven) ports: storage and time

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
