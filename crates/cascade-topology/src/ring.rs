//! Pipeline closed into a feedback cycle.

use std::thread;
use std::time::Duration;

use cascade_core::{ChannelError, Fault, Machine, Program, Receiver, Sender, Step, Word};
use log::{debug, trace};

use crate::error::TopologyError;
use crate::wiring;

/// Bounded capacity of every ring edge.
const CHANNEL_CAPACITY: usize = 16;

/// Patience for the loop-back value after every worker has joined.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How long a stage may sit suspended on its input edge before the cycle
/// is declared wedged. Unlike an open chain, a cycle has no upstream
/// hangup to cascade from: when every stage waits on its neighbour, all
/// edge halves stay alive and nothing would ever wake up.
const STALL_PATIENCE: Duration = Duration::from_secs(1);

/// How one ring stage finished.
enum StageEnd {
    /// The program executed opcode 99.
    Halted,
    /// The stage observed a hangup while suspended; normal teardown.
    Cancelled,
    /// No input arrived within [`STALL_PATIENCE`]; the cycle is wedged.
    Stalled,
}

/// Runs `phases.len()` copies of `program` as a closed feedback cycle.
///
/// Stage `i` reads edge `i` and writes edge `(i + 1) % stages`, so the last
/// stage feeds the first. Each edge is seeded with its stage's phase and
/// edge 0 additionally carries the initial signal `0`. The cycle runs until
/// the last stage halts; the value it looped back onto edge 0 is the result.
///
/// Stages still blocked on input once their upstream halts observe the
/// hangup and cancel instead of waiting forever. A cycle in which no stage
/// can ever make progress again is detected by bounding every input wait.
///
/// # Errors
///
/// Propagates the first machine fault. A wedged cycle, or the terminal
/// stage being torn down before halting, is [`TopologyError::Stalled`]; an
/// empty phase list is [`TopologyError::Empty`]; a loop-back edge with no
/// queued value is [`TopologyError::NoSignal`].
pub fn run_feedback_ring(program: &Program, phases: &[Word]) -> Result<Word, TopologyError> {
    if phases.is_empty() {
        return Err(TopologyError::Empty);
    }
    let stages = phases.len();
    debug!("ring: {stages} stages, edge capacity {CHANNEL_CAPACITY}");

    let (mut senders, receivers) = wiring::split(wiring::edges(stages, CHANNEL_CAPACITY));

    // Seed each stage's phase, then the initial signal for stage 0. Both
    // halves of every edge are alive here, so the sends cannot fail.
    for (sender, phase) in senders.iter().zip(phases) {
        let _ = sender.send(*phase);
    }
    let _ = senders[0].send(0);

    // Stage `i` writes the input edge of stage `i + 1`; rotating the sender
    // column left by one lines each output half up with its stage.
    senders.rotate_left(1);

    let mut verdicts = Vec::with_capacity(stages);
    let mut loopback = None;
    thread::scope(|scope| {
        let workers: Vec<_> = receivers
            .into_iter()
            .zip(senders)
            .map(|(input, output)| {
                scope.spawn(move || {
                    let end = drive_stage(program, &input, &output);
                    // The input half rides back out so the orchestrator can
                    // drain stage 0's loop-back edge after the joins.
                    (end, input)
                })
            })
            .collect();
        for (stage, worker) in workers.into_iter().enumerate() {
            match worker.join() {
                Ok((end, input)) => {
                    if stage == 0 {
                        loopback = Some(input);
                    }
                    verdicts.push(Ok(end));
                }
                Err(_) => verdicts.push(Err(TopologyError::WorkerPanicked { stage })),
            }
        }
    });

    for (stage, verdict) in verdicts.into_iter().enumerate() {
        match verdict?? {
            StageEnd::Halted => trace!("ring: stage {stage} halted"),
            StageEnd::Stalled => return Err(TopologyError::Stalled { stage }),
            StageEnd::Cancelled if stage + 1 == stages => {
                return Err(TopologyError::Stalled { stage });
            }
            StageEnd::Cancelled => debug!("ring: stage {stage} cancelled at teardown"),
        }
    }

    let tail = loopback.ok_or(TopologyError::NoSignal)?;
    tail.receive_timeout(DRAIN_GRACE)
        .map_err(|_| TopologyError::NoSignal)
}

/// Drives one stage to completion, bounding every input wait.
///
/// The first stage to exceed [`STALL_PATIENCE`] returns [`StageEnd::Stalled`]
/// and drops its edge halves on the way out; the hangup then cascades
/// around the cycle and releases every other blocked stage as cancelled.
fn drive_stage(program: &Program, input: &Receiver, output: &Sender) -> Result<StageEnd, Fault> {
    let mut machine = Machine::new(program);
    loop {
        match machine.step()? {
            Step::Continue => {}
            Step::NeedsInput => match input.receive_timeout(STALL_PATIENCE) {
                Ok(value) => machine.resolve_input(value)?,
                Err(ChannelError::Disconnected) => return Ok(StageEnd::Cancelled),
                Err(ChannelError::Timeout) => return Ok(StageEnd::Stalled),
            },
            Step::Output(value) => {
                if output.send(value).is_err() {
                    return Ok(StageEnd::Cancelled);
                }
            }
            Step::Halted => return Ok(StageEnd::Halted),
        }
    }
}
