//! Bounded channel of ready identities feeding the worker pool.
//!
//! The authoritative back-pressure bound is the global counter in
//! `executor.rs`; this channel's capacity is a defensive backstop so that,
//! even if the counter were ever wrong, Intake itself cannot grow without
//! bound. `crossbeam-channel` is used here the same way
//! `replicante_coordinator` and `replicante_stream` use it elsewhere in
//! this codebase for bounded, multi-producer/multi-consumer handoff.

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use crate::registry::SharedQueue;

/// A queue that became ready, published onto Intake for a worker to pick up.
#[derive(Clone)]
pub struct ReadyQueue {
    pub identity: String,
    pub queue: SharedQueue,
}

#[derive(Clone)]
pub struct Intake {
    tx: Sender<ReadyQueue>,
    rx: Receiver<ReadyQueue>,
}

impl Intake {
    pub fn bounded(capacity: usize) -> Intake {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Intake { tx, rx }
    }

    /// Publish a ready queue. Used only by code that already passed the
    /// global-counter back-pressure check, so this is expected to never
    /// block in practice; it is still a bounded send, not a `try_send`,
    /// because the defensive backstop must never silently drop work.
    pub fn publish(&self, ready: ReadyQueue) {
        let _ = self.tx.send(ready);
    }

    pub fn receiver(&self) -> Receiver<ReadyQueue> {
        self.rx.clone()
    }
}
