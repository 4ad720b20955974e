//! Open chain of machines wired head to tail.

use std::thread;

use cascade_core::{Machine, Program, RunOutcome, Word};
use log::{debug, trace};

use crate::error::TopologyError;
use crate::wiring;

/// Bounded capacity of every pipeline edge.
const CHANNEL_CAPACITY: usize = 16;

/// Runs `phases.len()` copies of `program` as an open chain.
///
/// Stage `i` reads edge `i` and writes edge `i + 1`. Before the workers
/// start, each stage's edge is seeded with its phase value and the head
/// edge additionally receives the initial signal `0`. Once every stage
/// halts, the last value on the tail edge is the pipeline's result.
///
/// # Errors
///
/// Propagates the first machine fault. A stage that was starved of input
/// instead of halting reports [`TopologyError::Stalled`]; an empty phase
/// list is [`TopologyError::Empty`]; a tail edge with no queued value is
/// [`TopologyError::NoSignal`].
pub fn run_pipeline(program: &Program, phases: &[Word]) -> Result<Word, TopologyError> {
    if phases.is_empty() {
        return Err(TopologyError::Empty);
    }
    let stages = phases.len();
    debug!("pipeline: {stages} stages, edge capacity {CHANNEL_CAPACITY}");

    let wiring::Chain {
        head,
        stage_io,
        tail,
    } = wiring::chain(stages, CHANNEL_CAPACITY);

    // Both halves of every edge are still alive and the queues are empty,
    // so the seeding sends cannot fail or block.
    let mut phase_values = phases.iter().copied();
    if let Some(phase) = phase_values.next() {
        let _ = head.send(phase);
    }
    let _ = head.send(0);
    for ((_, output), phase) in stage_io.iter().zip(phase_values) {
        let _ = output.send(phase);
    }

    // The head stage must see a hangup once its two seeds are consumed.
    drop(head);

    let mut verdicts = Vec::with_capacity(stages);
    thread::scope(|scope| {
        let workers: Vec<_> = stage_io
            .into_iter()
            .map(|(input, output)| {
                scope.spawn(move || {
                    let mut machine = Machine::new(program);
                    machine.run(&input, &output)
                })
            })
            .collect();
        for (stage, worker) in workers.into_iter().enumerate() {
            verdicts.push(
                worker
                    .join()
                    .map_err(|_| TopologyError::WorkerPanicked { stage }),
            );
        }
    });

    for (stage, verdict) in verdicts.into_iter().enumerate() {
        match verdict?? {
            RunOutcome::Halted => trace!("pipeline: stage {stage} halted"),
            RunOutcome::Cancelled => return Err(TopologyError::Stalled { stage }),
        }
    }

    let mut signal = None;
    while let Ok(Some(value)) = tail.try_receive() {
        signal = Some(value);
    }
    signal.ok_or(TopologyError::NoSignal)
}
