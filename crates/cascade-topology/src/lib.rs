//! Channel topology orchestrators for Cascade machines.
//!
//! Machines never share memory; every wiring pattern here composes them
//! purely through bounded channel edges. Each orchestrator owns the full
//! edge table for its topology, drives the machines on scoped worker
//! threads, and tears the edges down when the topology's terminal
//! condition is reached.

/// Structured topology error reporting.
pub mod error;
pub use error::TopologyError;

/// Open chain of machines, head seeded, tail drained.
pub mod pipeline;
pub use pipeline::run_pipeline;

/// Pipeline closed into a feedback cycle.
pub mod ring;
pub use ring::run_feedback_ring;

/// Address-routed network with a monitor (NAT) sink.
pub mod network;
pub use network::{run_routed_network, run_until_monitor_packet, MONITOR_ADDRESS};

mod wiring;

#[cfg(test)]
use env_logger as _;
#[cfg(test)]
use rstest as _;
