//! Fixed-size worker pool over a shared task channel.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::executor::{Executor, Task};

/// A pool of worker threads accepting fire-and-forget tasks.
///
/// Workers pull boxed tasks from a shared channel. Dropping the pool closes
/// the channel; workers finish whatever is queued, then exit, and the drop
/// joins them. A panicking task is contained and logged without killing its
/// worker — failure reporting belongs to the submission layer, not the pool.
pub struct ThreadPool {
    tx: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn a pool with `workers` threads (at least one).
    pub fn new(workers: usize) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Task>();
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|i| {
                let rx = Arc::clone(&rx);
                std::thread::Builder::new()
                    .name(format!("continuity-worker-{i}"))
                    .spawn(move || worker_loop(&rx))
            })
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            tx: Some(tx),
            workers,
        })
    }
}

fn worker_loop(rx: &Mutex<Receiver<Task>>) {
    loop {
        let task = match rx.lock() {
            Ok(guard) => guard.recv(),
            // Receiver poisoned by a panic while holding the lock; recv
            // itself runs outside task code, so treat as shutdown.
            Err(_) => break,
        };
        match task {
            Ok(task) => {
                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
                    tracing::error!("worker task panicked");
                }
            }
            Err(_) => break,
        }
    }
}

impl Executor for ThreadPool {
    fn execute(&self, task: Task) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(task).is_err() {
            tracing::warn!("thread pool channel closed, task dropped");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Close the channel so workers drain and exit, then wait for them.
        drop(self.tx.take());
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
