//! Address-routed packet network with a monitor sink.
//!
//! Every node runs the same program and learns its address from its first
//! input word. Nodes emit packets as `(destination, x, y)` word triples; a
//! central dispatcher polls their output edges without blocking, delivers
//! payload pairs to the addressed node, and feeds `-1` to nodes whose input
//! edge has run dry. Packets addressed to [`MONITOR_ADDRESS`] land in the
//! monitor, which retains only the most recent pair and injects it into
//! node 0 whenever the whole network goes quiet.

use std::thread;
use std::time::Duration;

use cascade_core::{Machine, Program, Receiver, Sender, Word};
use log::{debug, trace, warn};

use crate::error::TopologyError;
use crate::wiring;

/// Destination address claimed by the monitor sink.
pub const MONITOR_ADDRESS: Word = 255;

/// Bounded capacity of every node edge.
const CHANNEL_CAPACITY: usize = 64;

/// Patience for the trailing `x`/`y` words of a packet whose destination
/// word has already been observed. A node that emitted a destination and
/// then went quiet is wedged mid-triple.
const TRIPLE_GRACE: Duration = Duration::from_millis(500);

/// Pause between poll passes that found no traffic.
const IDLE_SETTLE: Duration = Duration::from_millis(1);

/// Fully idle passes tolerated while the monitor has never captured a
/// packet. Past this the network can never produce traffic again.
const MAX_SILENT_IDLE_PASSES: usize = 64;

/// A routed packet: destination address plus payload pair.
#[derive(Debug, Clone, Copy)]
struct Packet {
    destination: Word,
    x: Word,
    y: Word,
}

/// Dispatcher phases. The dispatcher cycles `Polling` -> `Routing` while
/// traffic flows, drops to `IdleCheck` after an empty pass, and reaches
/// `Done` when the exit rule fires.
#[derive(Debug)]
enum DispatcherState {
    Polling,
    Routing(Vec<Packet>),
    IdleCheck,
    Done(Word),
}

/// When a network run is considered finished.
#[derive(Debug, Clone, Copy)]
enum ExitRule {
    /// Stop at the first packet the monitor captures, yielding its `y`.
    FirstMonitorPacket,
    /// Stop when the monitor injects the same `y` twice in a row.
    MonitorFixpoint,
}

/// Dispatcher-side view of one node.
struct NodeHandle {
    input: Sender,
    output: Receiver,
    /// Set once the node's output edge hangs up; the dispatcher stops
    /// polling and topping up a detached node.
    detached: bool,
}

/// Runs `nodes` copies of `program` as a routed network until the monitor
/// injects the same `y` value into node 0 twice in a row, and returns that
/// value.
///
/// # Errors
///
/// Propagates the first machine fault. A network that goes fully idle
/// before the monitor ever captures a packet is
/// [`TopologyError::IdleWithoutTraffic`]; a node wedged mid-packet is
/// [`TopologyError::Stalled`]; zero nodes is [`TopologyError::Empty`].
pub fn run_routed_network(program: &Program, nodes: usize) -> Result<Word, TopologyError> {
    drive(program, nodes, ExitRule::MonitorFixpoint)
}

/// Runs the routed network only until the monitor captures its first
/// packet, and returns that packet's `y` value.
///
/// # Errors
///
/// Same conditions as [`run_routed_network`].
pub fn run_until_monitor_packet(program: &Program, nodes: usize) -> Result<Word, TopologyError> {
    drive(program, nodes, ExitRule::FirstMonitorPacket)
}

fn drive(program: &Program, nodes: usize, exit: ExitRule) -> Result<Word, TopologyError> {
    if nodes == 0 {
        return Err(TopologyError::Empty);
    }
    debug!("network: {nodes} nodes, exit rule {exit:?}");

    let (input_txs, input_rxs) = wiring::split(wiring::edges(nodes, CHANNEL_CAPACITY));
    let (output_txs, output_rxs) = wiring::split(wiring::edges(nodes, CHANNEL_CAPACITY));

    let mut handles: Vec<NodeHandle> = input_txs
        .into_iter()
        .zip(output_rxs)
        .map(|(input, output)| NodeHandle {
            input,
            output,
            detached: false,
        })
        .collect();

    // Every node learns its own address from its first input word. The
    // receiving halves are still local, so the sends cannot fail.
    for (address, handle) in handles.iter().enumerate() {
        let _ = handle.input.send(address as Word);
    }

    let mut verdict = Err(TopologyError::NoSignal);
    let mut worker_results = Vec::with_capacity(nodes);
    thread::scope(|scope| {
        let workers: Vec<_> = input_rxs
            .into_iter()
            .zip(output_txs)
            .map(|(input, output)| {
                scope.spawn(move || {
                    let mut machine = Machine::new(program);
                    machine.run(&input, &output)
                })
            })
            .collect();

        verdict = dispatch(&mut handles, exit);

        // Disconnect every edge the dispatcher owns; nodes blocked on a
        // channel observe the hangup and cancel at their next suspension
        // point.
        drop(handles);

        for (node, worker) in workers.into_iter().enumerate() {
            worker_results.push(
                worker
                    .join()
                    .map_err(|_| TopologyError::WorkerPanicked { stage: node }),
            );
        }
    });

    // A concrete machine fault explains whatever the dispatcher observed,
    // so it takes precedence over the dispatcher's own verdict.
    for (node, result) in worker_results.into_iter().enumerate() {
        match result? {
            Ok(outcome) => trace!("network: node {node} ended as {outcome:?}"),
            Err(fault) => return Err(fault.into()),
        }
    }
    verdict
}

fn dispatch(nodes: &mut [NodeHandle], exit: ExitRule) -> Result<Word, TopologyError> {
    let mut state = DispatcherState::Polling;
    let mut monitor: Option<(Word, Word)> = None;
    let mut last_injected_y: Option<Word> = None;
    let mut silent_passes = 0_usize;

    loop {
        state = match state {
            DispatcherState::Polling => {
                let batch = poll_pass(nodes)?;
                top_up(nodes);
                if batch.is_empty() {
                    DispatcherState::IdleCheck
                } else {
                    silent_passes = 0;
                    DispatcherState::Routing(batch)
                }
            }
            DispatcherState::Routing(batch) => {
                let mut next = DispatcherState::Polling;
                for packet in batch {
                    if packet.destination == MONITOR_ADDRESS {
                        trace!("network: monitor captured ({}, {})", packet.x, packet.y);
                        if matches!(exit, ExitRule::FirstMonitorPacket) {
                            next = DispatcherState::Done(packet.y);
                            break;
                        }
                        monitor = Some((packet.x, packet.y));
                    } else {
                        deliver(nodes, packet);
                    }
                }
                next
            }
            DispatcherState::IdleCheck => {
                let drained = nodes
                    .iter()
                    .all(|node| node.detached || node.input.is_empty());
                if !drained {
                    // Top-up words are still in flight; give the nodes a
                    // moment to consume them before polling again.
                    thread::sleep(IDLE_SETTLE);
                    DispatcherState::Polling
                } else if let Some((x, y)) = monitor {
                    debug!("network: idle, injecting ({x}, {y}) into node 0");
                    if nodes[0].input.send(x).is_err() || nodes[0].input.send(y).is_err() {
                        return Err(TopologyError::Stalled { stage: 0 });
                    }
                    if last_injected_y == Some(y) {
                        DispatcherState::Done(y)
                    } else {
                        last_injected_y = Some(y);
                        silent_passes = 0;
                        DispatcherState::Polling
                    }
                } else {
                    silent_passes += 1;
                    if silent_passes >= MAX_SILENT_IDLE_PASSES {
                        return Err(TopologyError::IdleWithoutTraffic {
                            passes: silent_passes,
                        });
                    }
                    thread::sleep(IDLE_SETTLE);
                    DispatcherState::Polling
                }
            }
            DispatcherState::Done(value) => return Ok(value),
        };
    }
}

/// Drains every live output edge without blocking and collects complete
/// packet triples.
fn poll_pass(nodes: &mut [NodeHandle]) -> Result<Vec<Packet>, TopologyError> {
    let mut batch = Vec::new();
    for (index, node) in nodes.iter_mut().enumerate() {
        if node.detached {
            continue;
        }
        loop {
            match node.output.try_receive() {
                Ok(Some(destination)) => {
                    let x = trailing_word(node, index)?;
                    let y = trailing_word(node, index)?;
                    trace!("network: node {index} sent ({destination}, {x}, {y})");
                    batch.push(Packet { destination, x, y });
                }
                Ok(None) => break,
                Err(_) => {
                    debug!("network: node {index} detached");
                    node.detached = true;
                    break;
                }
            }
        }
    }
    Ok(batch)
}

/// Waits briefly for a packet's next payload word once its destination has
/// been observed.
fn trailing_word(node: &NodeHandle, index: usize) -> Result<Word, TopologyError> {
    node.output
        .receive_timeout(TRIPLE_GRACE)
        .map_err(|_| TopologyError::Stalled { stage: index })
}

/// Hands a packet's payload pair to the addressed node, dropping packets
/// for addresses no live node claims.
fn deliver(nodes: &[NodeHandle], packet: Packet) {
    let Ok(address) = usize::try_from(packet.destination) else {
        warn!("network: dropping packet for address {}", packet.destination);
        return;
    };
    let Some(node) = nodes.get(address).filter(|node| !node.detached) else {
        warn!("network: dropping packet for address {address}");
        return;
    };
    if node.input.send(packet.x).is_err() || node.input.send(packet.y).is_err() {
        warn!("network: node {address} hung up mid-delivery");
    }
}

/// Feeds `-1` to every live node whose input edge has run dry, so a node
/// polling for traffic can observe "no packet" instead of blocking.
fn top_up(nodes: &[NodeHandle]) {
    for node in nodes {
        if node.detached || !node.input.is_empty() {
            continue;
        }
        let _ = node.input.send(-1);
    }
}
