//! Per-identity FIFO queue and its state machine.

use std::collections::VecDeque;

use crate::task::Envelope;

/// States a `TaskQueue` moves through.
///
/// Only these transitions are exercised by the rest of the crate:
/// `Idle -> Ready` on first enqueue, `Ready -> Running` on worker pickup,
/// `Running -> {Idle | Ready | WaitingAsync}` on completion, and
/// `WaitingAsync -> {Idle | Ready}` once the async future settles.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueueState {
    Idle,
    Ready,
    Running,
    WaitingAsync,
}

/// Ordered pending envelopes for one identity, plus its state.
///
/// A queue in `Running` or `WaitingAsync` must never be published to
/// Intake again: at most one worker holds a queue in either state at a
/// time, and republishing is the sole responsibility of the terminal
/// transition (`worker.rs`, `async_bridge.rs`).
pub struct TaskQueue {
    state: QueueState,
    pending: VecDeque<Envelope>,
}

impl TaskQueue {
    pub fn new() -> TaskQueue {
        TaskQueue {
            state: QueueState::Idle,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Append an envelope. Returns `true` if this transitioned the queue
    /// `Idle -> Ready`, meaning the caller must publish it to Intake.
    pub fn enqueue(&mut self, envelope: Envelope) -> bool {
        self.pending.push_back(envelope);
        if self.state == QueueState::Idle {
            self.state = QueueState::Ready;
            true
        } else {
            false
        }
    }

    /// Worker pickup: `Ready -> Running`, popping the head envelope.
    ///
    /// Panics if the queue was not `Ready`: the worker pool and Intake
    /// together guarantee a queue is only handed to a worker while ready.
    pub fn start_run(&mut self) -> Envelope {
        assert_eq!(self.state, QueueState::Ready, "queue must be Ready to start a run");
        self.state = QueueState::Running;
        self.pending
            .pop_front()
            .expect("a Ready queue must have a pending envelope")
    }

    /// Terminal transition for a task that completed synchronously.
    /// Returns `true` if the queue became `Ready` and must be republished.
    pub fn finish_run(&mut self) -> bool {
        assert_eq!(self.state, QueueState::Running, "finish_run requires Running");
        self.transition_from_active()
    }

    /// Transition to `WaitingAsync` because the task deferred completion.
    pub fn wait_for_async(&mut self) {
        assert_eq!(self.state, QueueState::Running, "wait_for_async requires Running");
        self.state = QueueState::WaitingAsync;
    }

    /// Terminal transition once a deferred async future has settled.
    /// Returns `true` if the queue became `Ready` and must be republished.
    pub fn finish_async(&mut self) -> bool {
        assert_eq!(
            self.state,
            QueueState::WaitingAsync,
            "finish_async requires WaitingAsync"
        );
        self.transition_from_active()
    }

    fn transition_from_active(&mut self) -> bool {
        if self.pending.is_empty() {
            self.state = QueueState::Idle;
            false
        } else {
            self.state = QueueState::Ready;
            true
        }
    }
}

impl Default for TaskQueue {
    fn default() -> TaskQueue {
        TaskQueue::new()
    }
}
