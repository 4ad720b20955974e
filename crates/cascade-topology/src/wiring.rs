//! Orchestrator-owned edge tables.
//!
//! Every channel half is created here and handed to exactly one concurrent
//! unit; nothing is captured by two workers at once, and whatever the
//! workers do not take stays with the orchestrator for seeding and result
//! extraction.

use cascade_core::{channel, Receiver, Sender};

/// One directed channel edge, still holding both halves.
pub(crate) struct Edge {
    pub(crate) tx: Sender,
    pub(crate) rx: Receiver,
}

/// Creates `count` independent edges of the given capacity.
pub(crate) fn edges(count: usize, capacity: usize) -> Vec<Edge> {
    (0..count)
        .map(|_| {
            let (tx, rx) = channel(capacity);
            Edge { tx, rx }
        })
        .collect()
}

/// Splits an edge table into its sender and receiver columns.
pub(crate) fn split(edges: Vec<Edge>) -> (Vec<Sender>, Vec<Receiver>) {
    edges.into_iter().map(|edge| (edge.tx, edge.rx)).unzip()
}

/// Edge table for an open chain of `stages` machines.
///
/// Edge `i` feeds stage `i`; stage `i` writes edge `i + 1`. The chain keeps
/// the producer half of the first edge and the consumer half of the last,
/// so the orchestrator can seed the head and drain the tail.
pub(crate) struct Chain {
    pub(crate) head: Sender,
    pub(crate) stage_io: Vec<(Receiver, Sender)>,
    pub(crate) tail: Receiver,
}

/// Builds the `stages + 1` edges of an open chain.
pub(crate) fn chain(stages: usize, capacity: usize) -> Chain {
    let (head, mut carried) = channel(capacity);
    let mut stage_io = Vec::with_capacity(stages);
    for _ in 0..stages {
        let (tx, rx) = channel(capacity);
        stage_io.push((carried, tx));
        carried = rx;
    }
    Chain {
        head,
        stage_io,
        tail: carried,
    }
}

#[cfg(test)]
mod tests {
    use super::{chain, edges, split};

    #[test]
    fn chain_edges_connect_consecutive_stages() {
        let built = chain(3, 4);
        assert_eq!(built.stage_io.len(), 3);

        built.head.send(7).unwrap();
        let (first_input, _) = &built.stage_io[0];
        assert_eq!(first_input.receive().unwrap(), 7);

        let (_, last_output) = &built.stage_io[2];
        last_output.send(9).unwrap();
        assert_eq!(built.tail.receive().unwrap(), 9);
    }

    #[test]
    fn split_preserves_edge_pairing() {
        let (senders, receivers) = split(edges(2, 1));
        senders[1].send(42).unwrap();
        assert_eq!(receivers[1].receive().unwrap(), 42);
        assert!(receivers[0].is_empty());
    }
}
