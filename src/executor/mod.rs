//! Context-propagating executor wrappers.
//!
//! A [`ContinuityExecutor`] wraps any task-submission abstraction so that
//! every task submitted through it runs under a snapshot of the *submitting*
//! thread's context. The snapshot is captured at submission time, never at
//! execution time: by the time a worker picks the task up, the submitting
//! thread may have moved on or torn its context down entirely.
//!
//! Three submission shapes are covered:
//!
//! - fire-and-forget via the [`Executor`] trait,
//! - future-returning via [`ContinuityExecutor::submit`] and [`TaskHandle`],
//! - pool-of-workers via [`ThreadPool`] (itself an [`Executor`]).

mod pool;
#[cfg(feature = "tokio")]
mod tokio;

pub use pool::ThreadPool;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;

use crate::error::{Error, TaskError};
use crate::namer::{IdentityThreadNamer, ThreadNamer};
use crate::session::{ContextSnapshot, Continuity};

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fire-and-forget task submission.
///
/// The propagation layer adds no threads of its own; implementations decide
/// where and when the task body runs.
pub trait Executor {
    fn execute(&self, task: Task);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, task: Task) {
        (**self).execute(task);
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, task: Task) {
        (**self).execute(task);
    }
}

/// Wraps an executor so submitted tasks carry the submitting thread's
/// context.
///
/// The key set is explicit: the wrapper captures exactly the named keys at
/// each submission (the store has no "list all keys" operation, and implicit
/// discovery would silently widen what leaks across threads). Each
/// submission derives a fresh snapshot and a fresh session; nothing is
/// shared between tasks.
///
/// ```
/// use continuity::{ContextSnapshot, Continuity, ContinuityExecutor, ThreadPool, context};
///
/// let pool = ThreadPool::new(2).expect("spawn workers");
/// let wrapped = ContinuityExecutor::wrap(pool).with_keys(["tenant"]);
///
/// let session = Continuity::new(ContextSnapshot::new().with_value("tenant", "acme"));
/// let handle = session.run_under_context(|| {
///     // Captured here, on the submitting thread.
///     wrapped.submit(|| context::get("tenant"))
/// });
/// assert_eq!(handle.join().expect("task result").as_deref(), Some("acme"));
/// ```
#[derive(Debug, Clone)]
pub struct ContinuityExecutor<E, N = IdentityThreadNamer> {
    inner: E,
    keys: Vec<String>,
    namer: N,
}

impl<E: Executor> ContinuityExecutor<E> {
    /// Wrap `inner` with an empty key set and the identity namer.
    pub fn wrap(inner: E) -> Self {
        Self {
            inner,
            keys: Vec::new(),
            namer: IdentityThreadNamer,
        }
    }
}

impl<E: Executor, N> ContinuityExecutor<E, N> {
    /// Set the context keys captured at each submission.
    pub fn with_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the naming policy applied on the executing thread.
    pub fn with_namer<M: ThreadNamer>(self, namer: M) -> ContinuityExecutor<E, M> {
        ContinuityExecutor {
            inner: self.inner,
            keys: self.keys,
            namer,
        }
    }
}

impl<E, N> ContinuityExecutor<E, N>
where
    E: Executor,
    N: ThreadNamer + Clone + Send + 'static,
{
    /// Build the per-submission session from the submitting thread's
    /// context.
    fn session_for_submission(&self) -> Continuity<N> {
        Continuity::with_namer(ContextSnapshot::capture(&self.keys), self.namer.clone())
    }

    /// Submit a task and get a handle to its result.
    ///
    /// The body runs under the captured context on whichever thread the
    /// inner executor chooses. Panics are contained at the task boundary and
    /// surface from [`TaskHandle::join`] as [`TaskError::Panicked`]; context
    /// cleanup has already run by then.
    pub fn submit<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.execute(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            // The receiver may be gone; the task's effects stand either way.
            let _ = tx.send(outcome);
        }));
        TaskHandle { rx }
    }
}

impl<E, N> Executor for ContinuityExecutor<E, N>
where
    E: Executor,
    N: ThreadNamer + Clone + Send + 'static,
{
    fn execute(&self, task: Task) {
        let session = self.session_for_submission();
        self.inner
            .execute(Box::new(move || session.run_under_context(task)));
    }
}

/// Handle to the result of a task submitted via
/// [`ContinuityExecutor::submit`].
pub struct TaskHandle<T> {
    rx: mpsc::Receiver<std::thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes and return its result.
    ///
    /// Returns [`TaskError::Panicked`] if the body panicked, and
    /// [`TaskError::Canceled`] if the executor dropped the task before it
    /// ran.
    pub fn join(self) -> Result<T, Error> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(TaskError::Panicked {
                message: panic_message(payload.as_ref()),
            }
            .into()),
            Err(mpsc::RecvError) => Err(TaskError::Canceled.into()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::context;
    use crate::error::{Error, TaskError};
    use crate::executor::{ContinuityExecutor, Executor, Task, ThreadPool};

    /// Runs tasks inline on the submitting thread.
    struct InlineExecutor;

    impl Executor for InlineExecutor {
        fn execute(&self, task: Task) {
            task();
        }
    }

    /// Drops every task without running it.
    struct DiscardExecutor;

    impl Executor for DiscardExecutor {
        fn execute(&self, task: Task) {
            drop(task);
        }
    }

    #[test]
    fn submit_returns_the_task_result() {
        let wrapped = ContinuityExecutor::wrap(InlineExecutor);
        let handle = wrapped.submit(|| 2 + 2);
        assert_eq!(handle.join().expect("task result"), 4);
    }

    #[test]
    fn captured_keys_are_visible_in_the_task() {
        context::put("tenant", "acme");
        let wrapped = ContinuityExecutor::wrap(InlineExecutor).with_keys(["tenant"]);

        let handle = wrapped.submit(|| context::get("tenant"));
        assert_eq!(handle.join().expect("task result").as_deref(), Some("acme"));

        context::remove("tenant");
    }

    #[test]
    fn keys_absent_at_submission_stay_absent() {
        let wrapped = ContinuityExecutor::wrap(InlineExecutor).with_keys(["tenant"]);
        let handle = wrapped.submit(|| context::get("tenant"));
        assert_eq!(handle.join().expect("task result"), None);
    }

    #[test]
    fn panicking_task_surfaces_and_cleans_up() {
        context::put("tenant", "acme");
        let wrapped = ContinuityExecutor::wrap(InlineExecutor).with_keys(["tenant"]);

        let handle = wrapped.submit(|| -> () { panic!("task exploded") });
        match handle.join() {
            Err(Error::Task(TaskError::Panicked { message })) => {
                assert_eq!(message, "task exploded");
            }
            other => panic!("expected panic error, got {other:?}"),
        }

        // Inline execution: cleanup already ran on this thread, restoring
        // the submitting thread's own value.
        assert_eq!(context::get("tenant").as_deref(), Some("acme"));
        context::remove("tenant");
    }

    #[test]
    fn dropped_task_reports_canceled() {
        let wrapped = ContinuityExecutor::wrap(DiscardExecutor);
        let handle = wrapped.submit(|| 1);
        assert!(matches!(
            handle.join(),
            Err(Error::Task(TaskError::Canceled))
        ));
    }

    #[test]
    fn pool_tasks_run_off_the_submitting_thread() {
        let pool = ThreadPool::new(1).expect("spawn workers");
        let wrapped = ContinuityExecutor::wrap(pool);

        let submitter = std::thread::current().id();
        let handle = wrapped.submit(move || std::thread::current().id() != submitter);
        assert!(handle.join().expect("task result"));
    }

    #[test]
    fn results_map_back_to_their_tasks() {
        let pool = ThreadPool::new(4).expect("spawn workers");
        let wrapped = ContinuityExecutor::wrap(pool);

        let handles: Vec<_> = (0..16u32).map(|i| wrapped.submit(move || i * i)).collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let i = i as u32;
            assert_eq!(handle.join().expect("task result"), i * i);
        }
    }
}
