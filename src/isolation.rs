//! Thread-local isolation handle.
//!
//! The source this engine is modelled on installs a plugin's class-loader
//! as the executing thread's contextual class-loader for the duration of a
//! call. Rust has no class-loaders, so the same contract is modelled as an
//! opaque, cloneable handle installed on a thread-local for the duration of
//! the task body and post hook, and restored on every exit path.

use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static CURRENT: RefCell<Option<IsolationHandle>> = RefCell::new(None);
}

/// Opaque per-plugin isolation context.
///
/// Equality is by identity of the underlying handle, not its label: two
/// handles built from the same label are still distinct isolation contexts.
#[derive(Clone, Debug)]
pub struct IsolationHandle(Arc<str>);

impl IsolationHandle {
    pub fn new<S: Into<String>>(label: S) -> IsolationHandle {
        IsolationHandle(Arc::from(label.into()))
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// Install this handle as the current thread's isolation context.
    ///
    /// The previous handle (if any) is restored when the returned guard is
    /// dropped, regardless of whether the guarded scope panics.
    pub fn install(&self) -> IsolationGuard {
        let previous = CURRENT.with(|cell| cell.borrow_mut().replace(self.clone()));
        IsolationGuard { previous }
    }
}

impl PartialEq for IsolationHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for IsolationHandle {}

/// Returns the isolation handle installed on the calling thread, if any.
///
/// Tests use this to assert that a task body observes the handle attached
/// to its own task.
pub fn current() -> Option<IsolationHandle> {
    CURRENT.with(|cell| cell.borrow().clone())
}

/// Restores the previously installed isolation handle (or clears it) on drop.
#[must_use]
pub struct IsolationGuard {
    previous: Option<IsolationHandle>,
}

impl Drop for IsolationGuard {
    fn drop(&mut self) {
        CURRENT.with(|cell| {
            *cell.borrow_mut() = self.previous.take();
        });
    }
}
