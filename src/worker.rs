//! Fixed worker thread pool.
//!
//! Mirrors `replicante_tasks::worker::set::WorkerSet`: a `Builder`-named
//! thread per worker, a shared `AtomicBool` run flag, and a poll loop that
//! logs and keeps going on transient receive errors rather than exiting.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::Builder;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use slog::error;
use slog::Logger;

use crate::error::catch;
use crate::intake::ReadyQueue;
use crate::registry::SharedQueue;
use crate::shared::Shared;
use crate::task::AnyPayload;
use crate::task::TaskBody;

const POLL_TIMEOUT: Duration = Duration::from_millis(200);

pub(crate) struct WorkerPool {
    logger: Logger,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads_count` worker threads pulling ready queues from Intake.
    pub(crate) fn start(shared: Arc<Shared>, threads_count: u16) -> crate::Result<WorkerPool> {
        let logger = shared.logger.clone();
        let running = Arc::new(AtomicBool::new(true));
        let receiver = shared.intake.receiver();
        let mut threads = Vec::new();

        for idx in 0..threads_count {
            let name = format!("task-exec-worker-{}", idx);
            let thread_running = Arc::clone(&running);
            let thread_shared = Arc::clone(&shared);
            let thread_receiver = receiver.clone();
            let thread = Builder::new().name(name).spawn(move || {
                while thread_running.load(Ordering::SeqCst) {
                    match thread_receiver.recv_timeout(POLL_TIMEOUT) {
                        Ok(ready) => run_once(&thread_shared, ready),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });
            threads.push(thread);
        }

        if threads.iter().any(|t| t.is_err()) {
            running.store(false, Ordering::SeqCst);
            for thread in threads.into_iter().flatten() {
                if let Err(error) = thread.join() {
                    error!(logger, "Worker thread panicked during pool startup cleanup"; "error" => ?error);
                }
            }
            return Err(crate::error::TaskExecutorError::PoolSpawnFailed.into());
        }

        let threads = threads.into_iter().map(|t| t.expect("checked above")).collect();
        Ok(WorkerPool {
            logger,
            running,
            threads,
        })
    }

    /// Signal all workers to exit after finishing their current task, and
    /// wait for them to do so. Queued-but-unstarted envelopes are dropped
    /// along with their queues; producers observe only that their
    /// callbacks never ran.
    pub(crate) fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        while let Some(handle) = self.threads.pop() {
            if let Err(error) = handle.join() {
                error!(self.logger, "Worker thread panicked"; "error" => ?error);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One worker cycle: pick up a ready queue's head envelope, run it, and
/// advance the queue's state.
fn run_once(shared: &Arc<Shared>, ready: ReadyQueue) {
    let ReadyQueue { identity, queue } = ready;
    let envelope = {
        let mut locked = queue.lock().expect("task queue lock poisoned");
        locked.start_run()
    };

    let isolation = envelope.task.isolation().clone();
    let _guard = isolation.install();

    match envelope.task.body().clone() {
        TaskBody::In(task) => {
            let input = match make_input(&envelope.input_factory) {
                Ok(input) => input,
                Err(_) => {
                    crate::metrics::TASK_BODY_ERRORS_TOTAL.inc();
                    error!(shared.logger, "Input factory panicked"; "identity" => %identity);
                    shared.complete_submission();
                    drop(_guard);
                    shared.advance_after_sync(&identity, &queue);
                    return;
                }
            };
            if catch(|| task.accept(input)).is_err() {
                crate::metrics::TASK_BODY_ERRORS_TOTAL.inc();
                error!(shared.logger, "In task body panicked"; "identity" => %identity);
            }
            shared.complete_submission();
            drop(_guard);
            shared.advance_after_sync(&identity, &queue);
        }
        TaskBody::Out(task) => {
            let mut output = match make_output(&envelope.output_factory) {
                Ok(output) => output,
                Err(_) => {
                    crate::metrics::TASK_BODY_ERRORS_TOTAL.inc();
                    error!(shared.logger, "Output factory panicked"; "identity" => %identity);
                    shared.complete_submission();
                    drop(_guard);
                    shared.advance_after_sync(&identity, &queue);
                    return;
                }
            };
            // `output` is borrowed, not consumed, so whatever the task wrote to it
            // before panicking is still there afterwards; the post hook always
            // gets the real last-observed state instead of a freshly built stand-in.
            if catch(|| task.apply(&mut output)).is_err() {
                crate::metrics::TASK_BODY_ERRORS_TOTAL.inc();
                error!(shared.logger, "Out task body panicked"; "identity" => %identity);
            }
            dispatch_completion(shared, identity, queue, envelope.context.post().cloned(), output);
        }
        TaskBody::InOut(task) => {
            let input = match make_input(&envelope.input_factory) {
                Ok(input) => input,
                Err(_) => {
                    crate::metrics::TASK_BODY_ERRORS_TOTAL.inc();
                    error!(shared.logger, "Input factory panicked"; "identity" => %identity);
                    shared.complete_submission();
                    drop(_guard);
                    shared.advance_after_sync(&identity, &queue);
                    return;
                }
            };
            let mut output = match make_output(&envelope.output_factory) {
                Ok(output) => output,
                Err(_) => {
                    crate::metrics::TASK_BODY_ERRORS_TOTAL.inc();
                    error!(shared.logger, "Output factory panicked"; "identity" => %identity);
                    shared.complete_submission();
                    drop(_guard);
                    shared.advance_after_sync(&identity, &queue);
                    return;
                }
            };
            // Same reasoning as the `Out` arm above: `output` is borrowed so a
            // mid-flight panic leaves it holding whatever the task already wrote.
            if catch(|| task.apply(input, &mut output)).is_err() {
                crate::metrics::TASK_BODY_ERRORS_TOTAL.inc();
                error!(shared.logger, "InOut task body panicked"; "identity" => %identity);
            }
            dispatch_completion(shared, identity, queue, envelope.context.post().cloned(), output);
        }
    }
}

/// Build the input payload for one execution, catching a panicking factory
/// rather than letting it take down the worker.
fn make_input(factory: &Option<crate::task::InputFactory>) -> crate::Result<AnyPayload> {
    match factory {
        Some(factory) => catch(|| factory()),
        None => Ok(Box::new(())),
    }
}

/// Build the output object for one execution, catching a panicking factory
/// rather than letting it take down the worker.
fn make_output(
    factory: &Option<crate::task::OutputFactory>,
) -> crate::Result<Box<dyn crate::task::TaskOutput>> {
    match factory {
        Some(factory) => catch(|| factory()),
        None => catch(|| Box::new(MissingOutput::default()) as Box<dyn crate::task::TaskOutput>),
    }
}

/// Stand-in output for an `Out`/`InOut` task submitted without an output
/// factory. It carries no state and is never observed by the task (a
/// missing factory is a producer programming error, not normal operation),
/// but it still lets the worker run the post hook and advance the queue
/// instead of panicking the thread.
#[derive(Debug, Default)]
struct MissingOutput {
    state: crate::task::AsyncState,
}

impl crate::task::TaskOutput for MissingOutput {
    fn async_state(&self) -> &crate::task::AsyncState {
        &self.state
    }
    fn async_state_mut(&mut self) -> &mut crate::task::AsyncState {
        &mut self.state
    }
}

/// Inspect the output for async completion and either hand it to the
/// async completion bridge or run the post hook and advance the queue
/// synchronously.
fn dispatch_completion(
    shared: &Arc<Shared>,
    identity: String,
    queue: SharedQueue,
    post: Option<Arc<dyn Fn(Box<dyn crate::task::TaskOutput>) + Send + Sync>>,
    mut output: Box<dyn crate::task::TaskOutput>,
) {
    if output.is_async() {
        if let Some(future) = output.take_async_future() {
            {
                let mut locked = queue.lock().expect("task queue lock poisoned");
                locked.wait_for_async();
            }
            let isolation = crate::isolation::current()
                .unwrap_or_else(|| crate::isolation::IsolationHandle::new("unknown"));
            crate::async_bridge::spawn(
                Arc::clone(shared),
                identity,
                queue,
                isolation,
                future,
                output,
                post,
            );
            return;
        }
        error!(
            shared.logger,
            "Output marked async but no future was attached; completing synchronously";
            "identity" => %identity
        );
    }

    if let Some(post) = post {
        if catch(|| post(output)).is_err() {
            crate::metrics::POST_HOOK_ERRORS_TOTAL.inc();
            error!(shared.logger, "Post hook panicked"; "identity" => %identity);
        }
    }
    shared.complete_submission();
    shared.advance_after_sync(&identity, &queue);
}
