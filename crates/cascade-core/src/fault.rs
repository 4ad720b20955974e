//! Fatal fault taxonomy for machine execution.
//!
//! Every fault is unrecoverable for the machine that raised it and carries
//! enough payload for the orchestrator to report the failing program
//! counter and raw instruction word. Execution is deterministic, so there
//! is no retry path.

use thiserror::Error;

use crate::Word;

/// Fault classes used for aggregation and reporting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// The instruction word at the program counter could not be decoded.
    Decode,
    /// An operand resolved to an address outside the legal space.
    Memory,
    /// The input/output contract with the host was violated.
    Io,
}

/// Fatal execution faults raised by a running machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// The instruction word carries an opcode outside the defined set.
    #[error("unknown opcode in instruction word {word} at pc {pc}")]
    InvalidOpcode {
        /// Program counter of the faulting fetch.
        pc: usize,
        /// Raw instruction word as fetched.
        word: Word,
    },
    /// A parameter mode digit is outside {0, 1, 2}, or a write operand was
    /// encoded in immediate mode.
    #[error("invalid parameter mode for operand {operand} of instruction word {word} at pc {pc}")]
    InvalidParameterMode {
        /// Program counter of the faulting fetch.
        pc: usize,
        /// Raw instruction word as fetched.
        word: Word,
        /// Zero-based operand index within the instruction.
        operand: u8,
    },
    /// An operand or jump target resolved to a negative address.
    ///
    /// Never clamped: a negative address means the program image is
    /// corrupt and continuing would silently misread memory.
    #[error("negative address {address} resolved at pc {pc}")]
    NegativeAddress {
        /// Program counter of the faulting instruction.
        pc: usize,
        /// The resolved, out-of-range address value.
        address: Word,
    },
    /// A batch run requested input past the end of the supplied sequence.
    ///
    /// In the single-shot form there is no producer that could ever
    /// satisfy the receive, so the suspension is surfaced as a fault
    /// instead of blocking forever.
    #[error("input requested at pc {pc} but the static input sequence is exhausted")]
    InputExhausted {
        /// Program counter of the starved input instruction.
        pc: usize,
    },
}

impl Fault {
    /// Returns the program counter the fault was raised at.
    #[must_use]
    pub const fn pc(self) -> usize {
        match self {
            Self::InvalidOpcode { pc, .. }
            | Self::InvalidParameterMode { pc, .. }
            | Self::NegativeAddress { pc, .. }
            | Self::InputExhausted { pc } => pc,
        }
    }

    /// Returns the reporting class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::InvalidOpcode { .. } | Self::InvalidParameterMode { .. } => FaultClass::Decode,
            Self::NegativeAddress { .. } => FaultClass::Memory,
            Self::InputExhausted { .. } => FaultClass::Io,
        }
    }
}
