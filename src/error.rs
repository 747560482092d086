use std::panic::AssertUnwindSafe;

use failure::Fail;

/// Errors surfaced by the executor's own setup and lifecycle code.
///
/// Task bodies, post hooks and async futures never produce this type to a
/// caller: their failures are caught, logged, and swallowed so that a
/// misbehaving task can never stall the engine (see `worker.rs`).
#[derive(Debug, Fail)]
pub enum TaskExecutorError {
    #[fail(display = "{}", _0)]
    Msg(String),

    #[fail(display = "could not spawn all worker threads")]
    PoolSpawnFailed,
}

/// Shortcut alias for `Result<T, failure::Error>`.
pub type Result<T> = ::std::result::Result<T, failure::Error>;

/// Run `body`, converting a panic into a `failure::Error` instead of
/// unwinding across the worker loop.
///
/// Used at every boundary that must stay inside the worker: the task body,
/// the post hook, and (on its own thread) the async future.
pub(crate) fn catch<F, T>(body: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    std::panic::catch_unwind(AssertUnwindSafe(body)).map_err(|payload| {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked with a non-string payload".to_string()
        };
        failure::err_msg(message)
    })
}
