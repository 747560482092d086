//! Per-identity ordered task executor.
//!
//! Submissions for the same identity run one at a time, in submission
//! order; submissions for different identities run concurrently on a
//! fixed worker pool. A submission completes either synchronously, when
//! its task body returns, or asynchronously, when an output marked with
//! `TaskOutput::mark_as_async` later settles its attached future. Either
//! way the next queued submission for that identity is not dispatched
//! until the previous one reaches a terminal state.

mod async_bridge;
mod config;
mod error;
mod executor;
mod intake;
mod isolation;
mod metrics;
mod queue;
mod registry;
mod shared;
mod task;
mod worker;

pub use config::Config;
pub use error::Result;
pub use error::TaskExecutorError;
pub use executor::TaskExecutor;
pub use isolation::current as current_isolation;
pub use isolation::IsolationGuard;
pub use isolation::IsolationHandle;
pub use metrics::register_metrics;
pub use queue::QueueState;
pub use task::AnyPayload;
pub use task::AsyncFuture;
pub use task::AsyncState;
pub use task::Context;
pub use task::Envelope;
pub use task::InOutTask;
pub use task::InTask;
pub use task::InputFactory;
pub use task::OutTask;
pub use task::OutputFactory;
pub use task::Task;
pub use task::TaskBody;
pub use task::TaskOutput;
