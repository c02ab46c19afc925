//! The propagation session: install a snapshot, run a block, clean up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::{self, Scope};
use crate::namer::{IdentityThreadNamer, ThreadNamer};

/// An immutable set of context entries, captured once and never mutated.
///
/// Keys are unique and insertion order is irrelevant. Absence of a key means
/// absence of a value — there are no null entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSnapshot {
    values: HashMap<String, String>,
}

impl ContextSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style entry insertion.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Capture the named keys from the calling thread's context.
    ///
    /// Keys absent on the calling thread are absent from the snapshot. The
    /// key set is explicit because the store has no "list all keys"
    /// operation; callers name what they want carried across.
    pub fn capture<I>(keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut values = HashMap::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = context::get(key) {
                values.insert(key.to_string(), value);
            }
        }
        tracing::trace!(keys = values.len(), "captured context snapshot");
        Self { values }
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ContextSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for ContextSnapshot {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

/// A reentrancy-guarded propagation session.
///
/// Holds a fixed [`ContextSnapshot`] and a [`ThreadNamer`]. Its single
/// operation, [`run_under_context`](Self::run_under_context), installs the
/// snapshot into the calling thread's context, renames the thread per the
/// namer, runs the block, and removes everything it installed — but only if
/// this call is the outermost one on the current thread.
///
/// This is the leaf API: fill the context somewhere with a session, and let
/// wrapped executors carry it from there.
#[derive(Debug, Clone)]
pub struct Continuity<N: ThreadNamer = IdentityThreadNamer> {
    values: ContextSnapshot,
    namer: N,
}

impl Continuity {
    /// Session over `values` with the identity namer.
    pub fn new(values: ContextSnapshot) -> Self {
        Self {
            values,
            namer: IdentityThreadNamer,
        }
    }
}

impl Default for Continuity {
    fn default() -> Self {
        Self::new(ContextSnapshot::new())
    }
}

impl<N: ThreadNamer> Continuity<N> {
    /// Session over `values` with an explicit naming policy.
    pub fn with_namer(values: ContextSnapshot, namer: N) -> Self {
        Self { values, namer }
    }

    /// Run `block` with this session's context installed on the current
    /// thread.
    ///
    /// Only the outermost invocation on a given thread installs context and
    /// renames the thread. A nested invocation — a block that itself calls
    /// `run_under_context`, or re-execution of an already-propagated task —
    /// is pure pass-through: the block runs directly and observes the outer
    /// session's values, and the outer scope owns all cleanup. Installing
    /// twice would corrupt the restore bookkeeping and rename the thread
    /// twice.
    ///
    /// Installation is last-write-wins: a key already holding an unrelated
    /// value on this thread (e.g. from another wrapper sharing the pool with
    /// an overlapping key set) is overwritten for the block's duration and
    /// restored afterwards.
    ///
    /// Panics from the block propagate to the caller after cleanup runs;
    /// cleanup problems on the unwind path are logged rather than raised so
    /// they never mask the original panic.
    pub fn run_under_context<T>(&self, block: impl FnOnce() -> T) -> T {
        if context::scope_active() {
            tracing::trace!("scope already active on this thread, passing through");
            return block();
        }

        let scope = Scope::install(&self.values);
        // A panic in the namer or block unwinds through `scope`, whose Drop
        // performs the same release and logs any inconsistency.
        let out = self.namer.name_thread(block);
        if let Err(err) = scope.release() {
            tracing::error!(error = %err, "context cleanup inconsistency after block");
        }
        out
    }
}
