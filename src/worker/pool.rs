//! Fixed-size worker pool with a FIFO task queue.
//!
//! Submission is a queue push under a short lock, never blocking the caller.
//! Dispatch is FIFO but completion order is whatever the workers make of it.
//! Dropping the pool is cooperative: each worker finishes the task it is
//! running, unstarted tasks are discarded, and the threads are joined.
//! Tasks must not touch peer connections or anything GPU-adjacent; they hand
//! results back through queues owned by the calling side.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::trace;
use parking_lot::{Condvar, Mutex};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Task>,
    stop: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    available: Condvar,
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// `threads == 0` auto-sizes to `max(1, cores - 1)`, leaving a core for
    /// the transport or main thread.
    pub fn new(threads: usize) -> Self {
        let count = if threads == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            threads
        };

        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                stop: false,
            }),
            available: Condvar::new(),
        });

        let workers = (0..count)
            .map(|index| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("worker-{index}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        trace!("worker pool started with {count} threads");
        Self { shared, workers }
    }

    /// Queue a task; cheap and non-blocking.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.shared.state.lock();
            state.queue.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
    }

    /// Advisory count of tasks not yet picked up
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.stop = true;
            // Whatever has not started yet is abandoned.
            state.queue.clear();
        }
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let task = {
            let mut state = shared.state.lock();
            while state.queue.is_empty() && !state.stop {
                shared.available.wait(&mut state);
            }
            if state.stop {
                return;
            }
            state
                .queue
                .pop_front()
                .expect("woke with a non-empty queue")
        };
        task();
    }
}
