//! Scope handle for installed context.
//!
//! [`Scope::install`] marks the thread's propagation scope as active, writes
//! a snapshot into the store, and remembers the prior occupant of every key
//! it touches. Release restores each key to its prior state (re-put the old
//! value, or remove the key if it was absent) and clears the flag.
//!
//! Release is guaranteed: the session releases explicitly on the normal
//! return path, and `Drop` covers unwinding, so a panicking block can never
//! leak installed keys into a reused pool thread.

use crate::context;
use crate::error::CleanupError;
use crate::session::ContextSnapshot;

/// One key installed by a scope, with what the slot held before.
struct InstalledKey {
    key: String,
    value: String,
    prior: Option<String>,
}

/// An active installation of a context snapshot on the current thread.
pub(crate) struct Scope {
    installed: Vec<InstalledKey>,
    released: bool,
}

impl Scope {
    /// Install `snapshot` on the current thread and mark the scope active.
    ///
    /// Installation is last-write-wins: a key already holding an unrelated
    /// value is overwritten for the duration of the scope and restored at
    /// release. The caller must check [`context::scope_active`] first; a
    /// nested install would corrupt the outer scope's restore bookkeeping.
    pub(crate) fn install(snapshot: &ContextSnapshot) -> Self {
        let was_active = context::set_scope_active(true);
        debug_assert!(!was_active, "scope installed while another is active");

        let mut installed = Vec::with_capacity(snapshot.len());
        for (key, value) in snapshot.iter() {
            let prior = context::get(key);
            context::put(key, value);
            installed.push(InstalledKey {
                key: key.to_string(),
                value: value.to_string(),
                prior,
            });
        }
        tracing::debug!(keys = installed.len(), "installed context scope");

        Self {
            installed,
            released: false,
        }
    }

    /// Release the scope, restoring every installed key to its prior state.
    ///
    /// Reports the first inconsistency found (a key whose installed value
    /// was externally mutated, or a scope flag that was externally cleared)
    /// but always completes the restore regardless.
    pub(crate) fn release(mut self) -> Result<(), CleanupError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), CleanupError> {
        self.released = true;

        let mut inconsistency = None;
        for entry in self.installed.drain(..) {
            if context::get(&entry.key).as_deref() != Some(entry.value.as_str())
                && inconsistency.is_none()
            {
                inconsistency = Some(CleanupError::ClobberedKey {
                    key: entry.key.clone(),
                });
            }
            match entry.prior {
                Some(prior) => context::put(entry.key, prior),
                None => context::remove(&entry.key),
            }
        }

        let was_active = context::set_scope_active(false);
        if !was_active && inconsistency.is_none() {
            inconsistency = Some(CleanupError::ScopeFlagMissing);
        }
        tracing::trace!("released context scope");

        match inconsistency {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Unwind path. The panic must stay observable, so inconsistencies
        // are only logged here.
        if let Err(err) = self.release_inner() {
            tracing::error!(error = %err, "context scope cleanup inconsistency during unwind");
        }
    }
}
