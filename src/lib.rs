//! Contextual value propagation across thread boundaries.
//!
//! A caller establishes a set of key-value pairs (the "context") and,
//! optionally, a thread-naming policy; from there any code — including code
//! handed off to a worker thread through a wrapped executor — can read the
//! context without explicit parameter threading.
//!
//! Fill the context at the leaves with a [`Continuity`] session:
//!
//! ```
//! use continuity::{ContextSnapshot, Continuity, context};
//!
//! let session = Continuity::new(ContextSnapshot::new().with_value("request_id", "r1"));
//!
//! let seen = session.run_under_context(|| context::get("request_id"));
//! assert_eq!(seen.as_deref(), Some("r1"));
//!
//! // Everything the session installed is gone again.
//! assert_eq!(context::get("request_id"), None);
//! ```
//!
//! To carry context onto worker threads, wrap the executor; the wrapper
//! snapshots the named keys on the submitting thread at each submission and
//! re-establishes them around the task body wherever it runs:
//!
//! ```
//! use continuity::{ContextSnapshot, Continuity, ContinuityExecutor, ThreadPool, context};
//!
//! let pool = ThreadPool::new(2).expect("spawn workers");
//! let wrapped = ContinuityExecutor::wrap(pool).with_keys(["tenant"]);
//!
//! let session = Continuity::new(ContextSnapshot::new().with_value("tenant", "acme"));
//! let handle = session.run_under_context(|| wrapped.submit(|| context::get("tenant")));
//!
//! assert_eq!(handle.join().expect("task result").as_deref(), Some("acme"));
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod namer;
pub mod session;

pub use error::{CleanupError, Error, TaskError};
pub use executor::{ContinuityExecutor, Executor, Task, TaskHandle, ThreadPool};
pub use namer::{ContextThreadNamer, IdentityThreadNamer, ThreadNamer};
pub use session::{ContextSnapshot, Continuity};
