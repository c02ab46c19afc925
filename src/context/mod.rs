//! Process-wide, per-thread context store.
//!
//! Every thread owns a private slice of the store: a map of string keys to
//! string values, a diagnostic thread name, and the flag marking an active
//! propagation scope. Values set on one thread are invisible on every other
//! thread unless a [`Continuity`](crate::session::Continuity) session or a
//! wrapped executor explicitly copies them over.
//!
//! The store itself is a dumb primitive. Sequencing of installs and removals
//! relative to the scope flag is owned by the scope handle in this module and
//! driven by the session.

mod scope;

pub(crate) use scope::Scope;

use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static SLICE: RefCell<ThreadSlice> = RefCell::new(ThreadSlice::new());
}

/// The calling thread's private slice of the store.
struct ThreadSlice {
    values: HashMap<String, String>,
    /// Diagnostic thread name, lazily seeded from the OS thread name.
    name: Option<String>,
    /// Whether a propagation scope is currently installed on this thread.
    scope_active: bool,
}

impl ThreadSlice {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            name: None,
            scope_active: false,
        }
    }
}

/// Read a context value on the calling thread.
pub fn get(key: &str) -> Option<String> {
    SLICE.with(|slice| slice.borrow().values.get(key).cloned())
}

/// Set a context value on the calling thread, overwriting any prior value
/// for the key.
pub fn put(key: impl Into<String>, value: impl Into<String>) {
    SLICE.with(|slice| {
        slice.borrow_mut().values.insert(key.into(), value.into());
    });
}

/// Remove a context value on the calling thread. Removing an absent key is
/// a no-op.
pub fn remove(key: &str) {
    SLICE.with(|slice| {
        slice.borrow_mut().values.remove(key);
    });
}

/// The calling thread's diagnostic name.
///
/// Defaults to the OS thread name, or `"unnamed"` for anonymous threads.
/// Rust cannot rename a live OS thread, so thread namers operate on this
/// slot instead; it exists purely for logging and diagnostics.
pub fn thread_name() -> String {
    SLICE.with(|slice| {
        slice
            .borrow()
            .name
            .clone()
            .or_else(|| std::thread::current().name().map(str::to_string))
            .unwrap_or_else(|| "unnamed".to_string())
    })
}

/// Set the calling thread's diagnostic name.
pub fn set_thread_name(name: impl Into<String>) {
    SLICE.with(|slice| {
        slice.borrow_mut().name = Some(name.into());
    });
}

/// Whether a propagation scope is active on the calling thread.
pub(crate) fn scope_active() -> bool {
    SLICE.with(|slice| slice.borrow().scope_active)
}

/// Set the scope flag, returning its prior state.
pub(crate) fn set_scope_active(active: bool) -> bool {
    SLICE.with(|slice| {
        let mut slice = slice.borrow_mut();
        std::mem::replace(&mut slice.scope_active, active)
    })
}
