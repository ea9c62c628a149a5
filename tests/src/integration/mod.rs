//! # Integration Flows
//!
//! Every node runs its own capability and plugin; the simulated DON in
//! [`crate::harness`] drives the rounds.

pub mod expiry;
pub mod transmitter_flow;
