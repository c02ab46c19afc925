//! Pluggable thread-naming policies.
//!
//! A [`ThreadNamer`] decides what the current thread should be called while
//! a block of context-bearing work runs. The rename/restore pair is
//! implemented once, in the provided [`ThreadNamer::name_thread`], generic
//! over the block's result type: the prior name is captured up front and put
//! back on every exit path, including panics, via a drop guard.
//!
//! Policies only compute names. They run after the session has installed its
//! context, so a policy may read the propagated context — that is how
//! [`ContextThreadNamer`] labels worker threads with e.g. a request id.

use crate::context;

/// Naming policy applied around a scoped computation.
pub trait ThreadNamer {
    /// Compute the name for the current thread, or `None` to leave it
    /// unchanged.
    fn thread_name(&self) -> Option<String>;

    /// Run `block` with the current thread renamed per this policy,
    /// restoring the prior name when the block finishes or panics.
    fn name_thread<T>(&self, block: impl FnOnce() -> T) -> T
    where
        Self: Sized,
    {
        match self.thread_name() {
            Some(name) => {
                let _restore = NameRestore::rename_to(name);
                block()
            }
            None => block(),
        }
    }
}

/// Restores the thread's prior diagnostic name on drop.
struct NameRestore {
    prior: String,
}

impl NameRestore {
    fn rename_to(name: String) -> Self {
        let prior = context::thread_name();
        tracing::debug!(from = %prior, to = %name, "renaming thread");
        context::set_thread_name(name);
        Self { prior }
    }
}

impl Drop for NameRestore {
    fn drop(&mut self) {
        context::set_thread_name(std::mem::take(&mut self.prior));
    }
}

/// The no-op namer: never renames, simply executes the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityThreadNamer;

impl ThreadNamer for IdentityThreadNamer {
    fn thread_name(&self) -> Option<String> {
        None
    }
}

/// Names the thread `"<current>-<value>"` from a context key.
///
/// Reads the key from the current thread's context, which inside a session
/// is the propagated snapshot. When the key is absent the thread keeps its
/// name.
#[derive(Debug, Clone)]
pub struct ContextThreadNamer {
    key: String,
}

impl ContextThreadNamer {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl ThreadNamer for ContextThreadNamer {
    fn thread_name(&self) -> Option<String> {
        context::get(&self.key).map(|value| format!("{}-{}", context::thread_name(), value))
    }
}
