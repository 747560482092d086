//! Task shapes, contexts and outputs.
//!
//! Tasks are heterogeneous across identities: one identity's queue may hold
//! `InOut` tasks operating on one pair of concrete types while another
//! identity's queue holds `In` tasks over an unrelated type. The engine
//! itself never needs to know those concrete types, so inputs and outputs
//! are carried as `Box<dyn Any + Send>` / `Box<dyn TaskOutput>` the same way
//! `spark_core::runtime::executor::TaskExecutor::spawn` erases its future's
//! output behind `Box<dyn Any + Send>` and recovers it with `downcast`.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::TaskExecutorError;
use crate::isolation::IsolationHandle;

/// A future resolving when an async task's real work is done.
///
/// `Ok(())` mirrors a successful completion; `Err` carries whatever the
/// future failed with. An error here is logged and swallowed, not
/// propagated: the post hook still runs with the output's last-observed
/// state.
pub type AsyncFuture = Pin<Box<dyn Future<Output = Result<(), TaskExecutorError>> + Send>>;

/// Async-completion bookkeeping every output carries.
///
/// Concrete output types embed this struct and implement `TaskOutput` by
/// delegating to it, rather than re-implementing the flags themselves.
#[derive(Default)]
pub struct AsyncState {
    is_async: bool,
    timed_out: bool,
    future: Option<AsyncFuture>,
}

impl fmt::Debug for AsyncState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AsyncState")
            .field("is_async", &self.is_async)
            .field("timed_out", &self.timed_out)
            .field("has_future", &self.future.is_some())
            .finish()
    }
}

/// Behavioural contract every task output implements.
pub trait TaskOutput: Send + fmt::Debug {
    fn async_state(&self) -> &AsyncState;
    fn async_state_mut(&mut self) -> &mut AsyncState;

    fn is_async(&self) -> bool {
        self.async_state().is_async
    }

    /// Declare "not yet finished": completion is deferred to a future
    /// attached with `set_async_future`.
    fn mark_as_async(&mut self) {
        self.async_state_mut().is_async = true;
    }

    fn reset_async_status(&mut self) {
        self.async_state_mut().is_async = false;
    }

    fn is_timed_out(&self) -> bool {
        self.async_state().timed_out
    }

    fn mark_as_timed_out(&mut self) {
        self.async_state_mut().timed_out = true;
    }

    fn set_async_future(&mut self, future: AsyncFuture) {
        self.async_state_mut().future = Some(future);
    }

    fn take_async_future(&mut self) -> Option<AsyncFuture> {
        self.async_state_mut().future.take()
    }
}

/// Type-erased input or output payload flowing through a task body.
pub type AnyPayload = Box<dyn Any + Send>;

/// Nullary producer of a fresh input object for one execution.
pub type InputFactory = Arc<dyn Fn() -> AnyPayload + Send + Sync>;

/// Nullary producer of a fresh output object for one execution.
pub type OutputFactory = Arc<dyn Fn() -> Box<dyn TaskOutput> + Send + Sync>;

/// A task taking an input and an output, mutating the output in place (or
/// replacing it outright by assigning through the reference).
///
/// The output is handed to the task by mutable reference, not by value, so
/// that whatever the task already wrote to it before a panic is still the
/// value the worker sees afterwards; see `worker.rs` for why that matters.
pub trait InOutTask: Send + Sync {
    fn apply(&self, input: AnyPayload, output: &mut Box<dyn TaskOutput>);
}

/// A task taking only an output, mutated in place.
pub trait OutTask: Send + Sync {
    fn apply(&self, output: &mut Box<dyn TaskOutput>);
}

/// A task taking only an input; no result flows back and no post hook runs.
pub trait InTask: Send + Sync {
    fn accept(&self, input: AnyPayload);
}

impl<F> InOutTask for F
where
    F: Fn(AnyPayload, &mut Box<dyn TaskOutput>) + Send + Sync,
{
    fn apply(&self, input: AnyPayload, output: &mut Box<dyn TaskOutput>) {
        self(input, output)
    }
}

impl<F> OutTask for F
where
    F: Fn(&mut Box<dyn TaskOutput>) + Send + Sync,
{
    fn apply(&self, output: &mut Box<dyn TaskOutput>) {
        self(output)
    }
}

impl<F> InTask for F
where
    F: Fn(AnyPayload) + Send + Sync,
{
    fn accept(&self, input: AnyPayload) {
        self(input)
    }
}

/// The three task shapes a submission can take.
#[derive(Clone)]
pub enum TaskBody {
    InOut(Arc<dyn InOutTask>),
    Out(Arc<dyn OutTask>),
    In(Arc<dyn InTask>),
}

/// A unit of work plus the isolation context it must run under.
#[derive(Clone)]
pub struct Task {
    body: TaskBody,
    isolation: IsolationHandle,
}

impl Task {
    pub fn new(body: TaskBody, isolation: IsolationHandle) -> Task {
        Task { body, isolation }
    }

    pub fn in_out<T: InOutTask + 'static>(task: T, isolation: IsolationHandle) -> Task {
        Task::new(TaskBody::InOut(Arc::new(task)), isolation)
    }

    pub fn out<T: OutTask + 'static>(task: T, isolation: IsolationHandle) -> Task {
        Task::new(TaskBody::Out(Arc::new(task)), isolation)
    }

    pub fn input_only<T: InTask + 'static>(task: T, isolation: IsolationHandle) -> Task {
        Task::new(TaskBody::In(Arc::new(task)), isolation)
    }

    pub fn body(&self) -> &TaskBody {
        &self.body
    }

    pub fn isolation(&self) -> &IsolationHandle {
        &self.isolation
    }
}

/// Per-submission metadata shared across consecutive executions for the
/// same identity within one submission.
pub struct Context {
    identity: String,
    owner: Arc<str>,
    post: Option<Arc<dyn Fn(Box<dyn TaskOutput>) + Send + Sync>>,
}

impl Context {
    /// A context for an `InOut`/`Out` task: `post` runs after completion.
    pub fn new<S, O, P>(identity: S, owner: O, post: P) -> Context
    where
        S: Into<String>,
        O: Into<Arc<str>>,
        P: Fn(Box<dyn TaskOutput>) + Send + Sync + 'static,
    {
        Context {
            identity: identity.into(),
            owner: owner.into(),
            post: Some(Arc::new(post)),
        }
    }

    /// A context for an `In` task: no post hook is ever called.
    pub fn without_post<S, O>(identity: S, owner: O) -> Context
    where
        S: Into<String>,
        O: Into<Arc<str>>,
    {
        Context {
            identity: identity.into(),
            owner: owner.into(),
            post: None,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn post(&self) -> Option<&Arc<dyn Fn(Box<dyn TaskOutput>) + Send + Sync>> {
        self.post.as_ref()
    }
}

/// One submission: context, optional factories, and the task itself.
///
/// Submitted atomically by `TaskExecutor::submit`.
pub struct Envelope {
    pub(crate) context: Context,
    pub(crate) input_factory: Option<InputFactory>,
    pub(crate) output_factory: Option<OutputFactory>,
    pub(crate) task: Task,
}

impl Envelope {
    pub fn new(
        context: Context,
        input_factory: Option<InputFactory>,
        output_factory: Option<OutputFactory>,
        task: Task,
    ) -> Envelope {
        Envelope {
            context,
            input_factory,
            output_factory,
            task,
        }
    }

    pub fn identity(&self) -> &str {
        self.context.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingOutput {
        state: AsyncState,
        value: u32,
    }

    impl TaskOutput for RecordingOutput {
        fn async_state(&self) -> &AsyncState {
            &self.state
        }
        fn async_state_mut(&mut self) -> &mut AsyncState {
            &mut self.state
        }
    }

    #[test]
    fn async_flags_default_false() {
        let output = RecordingOutput::default();
        assert!(!output.is_async());
        assert!(!output.is_timed_out());
    }

    #[test]
    fn mark_and_reset_async() {
        let mut output = RecordingOutput::default();
        output.mark_as_async();
        assert!(output.is_async());
        output.reset_async_status();
        assert!(!output.is_async());
    }

    #[test]
    fn in_task_never_exposes_post_hook() {
        let context = Context::without_post("id-1", "owner");
        assert!(context.post().is_none());
    }
}
