//! State shared between the submission hot path, worker threads and the
//! async completion bridge.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use slog::Logger;

use crate::intake::Intake;
use crate::intake::ReadyQueue;
use crate::registry::QueueRegistry;
use crate::registry::SharedQueue;

pub(crate) struct Shared {
    pub(crate) registry: Arc<QueueRegistry>,
    pub(crate) intake: Intake,
    pub(crate) counter: Arc<AtomicUsize>,
    pub(crate) logger: Logger,
}

impl Shared {
    /// Decrement the global in-flight counter. Called exactly once per
    /// accepted submission, from the terminal (sync or async) completion
    /// path.
    pub(crate) fn complete_submission(&self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
        crate::metrics::TASKS_COMPLETED_TOTAL.inc();
        crate::metrics::TASKS_IN_FLIGHT.dec();
    }

    /// Run the terminal queue transition after a synchronous completion and
    /// republish to Intake if the queue still has pending work.
    pub(crate) fn advance_after_sync(&self, identity: &str, queue: &SharedQueue) {
        let ready = {
            let mut locked = queue.lock().expect("task queue lock poisoned");
            locked.finish_run()
        };
        self.maybe_republish(identity, queue, ready);
    }

    /// Run the terminal queue transition after a deferred async future
    /// settled, and republish if the queue still has pending work.
    pub(crate) fn advance_after_async(&self, identity: &str, queue: &SharedQueue) {
        let ready = {
            let mut locked = queue.lock().expect("task queue lock poisoned");
            locked.finish_async()
        };
        self.maybe_republish(identity, queue, ready);
    }

    fn maybe_republish(&self, identity: &str, queue: &SharedQueue, ready: bool) {
        if ready {
            self.intake.publish(ReadyQueue {
                identity: identity.to_string(),
                queue: queue.clone(),
            });
        } else {
            self.registry.remove_if_unused(identity, queue);
        }
    }
}
