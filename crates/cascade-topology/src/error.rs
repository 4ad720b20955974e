//! Structured error reporting for topology runs.

use cascade_core::Fault;
use thiserror::Error;

/// Errors surfaced by a topology orchestrator.
///
/// Machine faults propagate unchanged with their program counter and raw
/// instruction word; the remaining variants are liveness verdicts the
/// orchestrator reached on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A machine raised a fatal execution fault.
    #[error(transparent)]
    Machine(#[from] Fault),
    /// A topology needs at least one stage or node.
    #[error("topology requires at least one stage")]
    Empty,
    /// A stage was left suspended on a channel edge and had to be torn
    /// down before completing. Without the teardown it would have blocked
    /// forever, so this reports a detected deadlock.
    #[error("stage {stage} stalled on a channel edge before completing")]
    Stalled {
        /// Zero-based stage or node index.
        stage: usize,
    },
    /// The run completed but the designated result edge held no value.
    #[error("no signal available on the result edge")]
    NoSignal,
    /// The routed network went idle repeatedly while the monitor had
    /// never captured a packet; no injection can ever unblock it.
    #[error("network idle with no monitor packet after {passes} poll passes")]
    IdleWithoutTraffic {
        /// Consecutive fully-idle poll passes observed.
        passes: usize,
    },
    /// A worker thread panicked; the run result is unusable.
    #[error("worker thread for stage {stage} panicked")]
    WorkerPanicked {
        /// Zero-based stage or node index.
        stage: usize,
    },
}
