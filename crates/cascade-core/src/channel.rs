//! Bounded FIFO channel connecting exactly one producer to one consumer.
//!
//! The channel is the machine's only suspension point and the system's
//! sole flow-control mechanism: a full queue blocks its producer until the
//! consumer drains a slot, so no value is ever dropped on a connected
//! edge. Dropping either half disconnects the edge and wakes the peer,
//! which is how orchestrators cancel machines left suspended after a
//! topology's terminal condition.
//!
//! Dispatchers additionally need non-blocking polling and send-side
//! emptiness observation, which is why this is a dedicated primitive
//! rather than a `std::sync::mpsc` wrapper.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::Word;

/// Errors surfaced by channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The peer half was dropped; the edge can never make progress again.
    #[error("channel edge disconnected")]
    Disconnected,
    /// A bounded wait elapsed before a value arrived.
    ///
    /// Only returned by [`Receiver::receive_timeout`]; orchestrators and
    /// tests use it as their deadlock detector.
    #[error("timed out waiting for a channel value")]
    Timeout,
}

#[derive(Debug)]
struct Slots {
    queue: VecDeque<Word>,
    capacity: usize,
    sender_alive: bool,
    receiver_alive: bool,
}

#[derive(Debug)]
struct Shared {
    slots: Mutex<Slots>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producing half of a bounded channel edge.
#[derive(Debug)]
pub struct Sender {
    shared: Arc<Shared>,
}

/// Consuming half of a bounded channel edge.
#[derive(Debug)]
pub struct Receiver {
    shared: Arc<Shared>,
}

/// Creates a bounded channel edge with room for `capacity` values.
///
/// # Panics
///
/// Panics when `capacity` is 0; a zero-slot edge could never deliver.
#[must_use]
pub fn channel(capacity: usize) -> (Sender, Receiver) {
    assert!(capacity > 0, "channel capacity must be at least 1");
    let shared = Arc::new(Shared {
        slots: Mutex::new(Slots {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            sender_alive: true,
            receiver_alive: true,
        }),
        not_empty: Condvar::new(),
        not_full: Condvar::new(),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

impl Sender {
    /// Enqueues `value`, blocking while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Disconnected`] when the receiver is gone,
    /// including while blocked waiting for a free slot.
    pub fn send(&self, value: Word) -> Result<(), ChannelError> {
        let mut slots = self.shared.lock();
        loop {
            if !slots.receiver_alive {
                return Err(ChannelError::Disconnected);
            }
            if slots.queue.len() < slots.capacity {
                slots.queue.push_back(value);
                self.shared.not_empty.notify_one();
                return Ok(());
            }
            slots = self
                .shared
                .not_full
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns the number of values currently queued on this edge.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Returns `true` when no values are queued on this edge.
    ///
    /// Dispatchers use the send-side view to decide when a node's input
    /// needs topping up and when the network as a whole is idle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().queue.is_empty()
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.shared.lock().sender_alive = false;
        self.shared.not_empty.notify_all();
    }
}

impl Receiver {
    /// Dequeues the next value, blocking while the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Disconnected`] once the queue is empty and
    /// the sender is gone. Values sent before the disconnect are still
    /// delivered first.
    pub fn receive(&self) -> Result<Word, ChannelError> {
        let mut slots = self.shared.lock();
        loop {
            if let Some(value) = slots.queue.pop_front() {
                self.shared.not_full.notify_one();
                return Ok(value);
            }
            if !slots.sender_alive {
                return Err(ChannelError::Disconnected);
            }
            slots = self
                .shared
                .not_empty
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Dequeues the next value without blocking.
    ///
    /// Returns `Ok(None)` when the queue is momentarily empty but the
    /// edge is still connected.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Disconnected`] once the queue is empty and
    /// the sender is gone.
    pub fn try_receive(&self) -> Result<Option<Word>, ChannelError> {
        let mut slots = self.shared.lock();
        if let Some(value) = slots.queue.pop_front() {
            self.shared.not_full.notify_one();
            return Ok(Some(value));
        }
        if slots.sender_alive {
            Ok(None)
        } else {
            Err(ChannelError::Disconnected)
        }
    }

    /// Dequeues the next value, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Timeout`] when the wait elapses and
    /// [`ChannelError::Disconnected`] when the sender is gone with the
    /// queue drained.
    pub fn receive_timeout(&self, timeout: Duration) -> Result<Word, ChannelError> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.shared.lock();
        loop {
            if let Some(value) = slots.queue.pop_front() {
                self.shared.not_full.notify_one();
                return Ok(value);
            }
            if !slots.sender_alive {
                return Err(ChannelError::Disconnected);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ChannelError::Timeout);
            }
            slots = self
                .shared
                .not_empty
                .wait_timeout(slots, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Returns the number of values currently queued on this edge.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Returns `true` when no values are queued on this edge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().queue.is_empty()
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.shared.lock().receiver_alive = false;
        self.shared.not_full.notify_all();
    }
}
