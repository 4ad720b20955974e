//! Host-observable execution state machine.

/// Execution states a machine moves through.
///
/// A machine yields control only at channel boundaries: the two awaiting
/// states are the only points where an orchestrator may observe it
/// suspended mid-program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// Suspended on an input instruction until a value arrives.
    AwaitingInput,
    /// Suspended on an output instruction until the edge accepts the value.
    AwaitingOutputReady,
    /// Executed opcode 99; no further progress is possible.
    Halted,
}

impl RunState {
    /// Returns `true` when the machine is suspended on a channel edge.
    #[must_use]
    pub const fn is_suspended(self) -> bool {
        matches!(self, Self::AwaitingInput | Self::AwaitingOutputReady)
    }
}
