//! Bridge onto the tokio blocking pool.
//!
//! The context store is thread-scoped, so propagated tasks must not be
//! polled across `.await` points; `spawn_blocking` keeps each task pinned to
//! one thread for its whole run, which is exactly the contract the scope
//! handle needs.

use tokio::runtime::Handle;

use crate::executor::{Executor, Task};

impl Executor for Handle {
    fn execute(&self, task: Task) {
        self.spawn_blocking(task);
    }
}
