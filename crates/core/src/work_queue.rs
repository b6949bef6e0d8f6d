//! Bounded-concurrency work queue (§4.3).
//!
//! `P` worker threads pull tasks off a shared queue; `pause`/`start` gate
//! whether workers pick up new tasks (in-flight tasks always finish);
//! `on_idle` blocks until `pending == 0 && running == 0`; `stats` exposes
//! monotonically-updated counters (§5: "single-writer per counter").

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

type Task = Box<dyn FnOnce() -> Result<(), String> + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    not_empty: Condvar,
    idle: Condvar,
    paused: AtomicBool,
    shutdown: AtomicBool,
    pending: AtomicU64,
    running: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Bounded-parallelism task scheduler. Each `add` enqueues work; up to
/// `parallelism` worker threads execute tasks concurrently.
pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkQueue {
    pub fn new(parallelism: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            idle: Condvar::new(),
            paused: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            pending: AtomicU64::new(0),
            running: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        let workers = (0..parallelism.max(1))
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || worker_loop(shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueue a task. Runs when a worker is free and the queue is not paused.
    pub fn add(&self, task: impl FnOnce() -> Result<(), String> + Send + 'static) {
        let mut q = self.shared.queue.lock().expect("work queue mutex poisoned");
        q.push_back(Box::new(task));
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        self.shared.not_empty.notify_one();
    }

    /// Enqueue a batch, preserving submission order for completion bookkeeping.
    pub fn add_all(&self, tasks: Vec<Box<dyn FnOnce() -> Result<(), String> + Send + 'static>>) {
        let mut q = self.shared.queue.lock().expect("work queue mutex poisoned");
        let n = tasks.len();
        q.extend(tasks);
        self.shared.pending.fetch_add(n as u64, Ordering::SeqCst);
        self.shared.not_empty.notify_all();
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    pub fn start(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.not_empty.notify_all();
    }

    /// Drop pending tasks; tasks already running finish normally.
    pub fn clear(&self) {
        let mut q = self.shared.queue.lock().expect("work queue mutex poisoned");
        let dropped = q.len() as u64;
        q.clear();
        self.shared.pending.fetch_sub(dropped, Ordering::SeqCst);
    }

    /// Block until both `pending` and `running` are zero.
    pub fn on_idle(&self) {
        let q = self.shared.queue.lock().expect("work queue mutex poisoned");
        let _guard = self
            .shared
            .idle
            .wait_while(q, |_| {
                self.shared.pending.load(Ordering::SeqCst) > 0
                    || self.shared.running.load(Ordering::SeqCst) > 0
            })
            .expect("work queue mutex poisoned");
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.shared.pending.load(Ordering::SeqCst),
            running: self.shared.running.load(Ordering::SeqCst),
            completed: self.shared.completed.load(Ordering::SeqCst),
            failed: self.shared.failed.load(Ordering::SeqCst),
        }
    }

    /// Stop all workers and join their threads. Running tasks finish first.
    pub fn shutdown(mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.not_empty.notify_all();
        for w in self.workers.drain(..) {
            let _ = w.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut q = shared.queue.lock().expect("work queue mutex poisoned");
            loop {
                if shared.shutdown.load(Ordering::SeqCst) && q.is_empty() {
                    return;
                }
                if !shared.paused.load(Ordering::SeqCst) {
                    if let Some(task) = q.pop_front() {
                        break task;
                    }
                }
                q = shared.not_empty.wait(q).expect("work queue mutex poisoned");
            }
        };

        shared.pending.fetch_sub(1, Ordering::SeqCst);
        shared.running.fetch_add(1, Ordering::SeqCst);

        let result = task();

        shared.running.fetch_sub(1, Ordering::SeqCst);
        if result.is_ok() {
            shared.completed.fetch_add(1, Ordering::SeqCst);
        } else {
            shared.failed.fetch_add(1, Ordering::SeqCst);
        }

        if shared.pending.load(Ordering::SeqCst) == 0 && shared.running.load(Ordering::SeqCst) == 0 {
            shared.idle.notify_all();
        }
    }
}
