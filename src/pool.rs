//! Bounded worker pool.
//!
//! A fixed number of OS threads over a mutex-protected queue with a
//! condition variable; `submit` hands back a handle that blocks for the
//! unit's return value. Dropping the pool raises the shutdown flag, wakes
//! every worker, and joins them; workers drain the queue before exiting,
//! and only ever pop while holding the lock.

use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::thread;

use anyhow::{anyhow, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Job>,
    shutdown: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    work_ready: Condvar,
}

/// Handle to one submitted unit of work.
pub struct TaskHandle<T> {
    result: mpsc::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Block until the unit's return value is available.
    pub fn join(self) -> Result<T> {
        self.result
            .recv()
            .map_err(|_| anyhow!("worker terminated before delivering a result"))
    }
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn a pool of exactly `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                shutdown: false,
            }),
            work_ready: Condvar::new(),
        });
        let workers = (0..size.max(1))
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("judge-worker-{}", index))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { shared, workers }
    }

    /// Queue a unit of work; the handle yields its return value.
    pub fn submit<F, T>(&self, job: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let boxed: Job = Box::new(move || {
            // The send fails only when the caller dropped the handle.
            let _ = sender.send(job());
        });
        {
            let mut state = self.shared.state.lock().expect("pool state poisoned");
            state.queue.push_back(boxed);
        }
        self.shared.work_ready.notify_one();
        TaskHandle { result: receiver }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("pool state poisoned");
            state.shutdown = true;
        }
        self.shared.work_ready.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let job = {
            let mut state = shared.state.lock().expect("pool state poisoned");
            loop {
                if let Some(job) = state.queue.pop_front() {
                    break job;
                }
                if state.shutdown {
                    return;
                }
                state = shared.work_ready.wait(state).expect("pool state poisoned");
            }
        };
        job();
    }
}
