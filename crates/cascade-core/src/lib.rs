//! Core machine crate for Cascade.
//!
//! A Cascade machine is a small integer interpreter that owns one memory
//! image and exchanges values with the outside world only through a pair
//! of bounded channels. The topology crate composes many machines into
//! pipelines, feedback rings, and routed networks on top of this crate.

/// Program text parsing.
pub mod program;
pub use program::{ParseError, Program};

/// Extensible memory model with position/immediate/relative addressing.
pub mod memory;
pub use memory::{AccessError, Memory};

/// Pure instruction-word decoder.
pub mod decoder;
pub use decoder::{decode, DecodeError, Instruction, Mode, Opcode};

/// Fatal fault taxonomy for machine execution.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// Host-observable execution state machine.
pub mod state;
pub use state::RunState;

/// Fetch-decode-execute interpreter loop.
pub mod machine;
pub use machine::{run_program, Machine, RunOutcome, Step};

/// Bounded FIFO channel connecting exactly one producer to one consumer.
pub mod channel;
pub use channel::{channel, ChannelError, Receiver, Sender};

/// Machine word.
///
/// Program values reach roughly `10^15` and the multiply path produces
/// intermediate products near `10^30`, which overflows `i64`. The word is
/// therefore 128-bit throughout: memory cells, channel slots, and the
/// relative base all carry `Word`.
pub type Word = i128;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
