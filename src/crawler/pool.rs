//! Resizable pool of workers running the same crawl task
//!
//! Each worker repeatedly asks the task whether to continue and runs one
//! step. The worker that takes the live count to zero runs the task's close
//! sequence, then signals completion to everyone waiting on the pool.

use crate::ConfigError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Outcome of one crawl step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work may follow
    Continue,
    /// The task has no more work for this worker
    Exhausted,
}

/// Work shared by every worker of a pool
pub trait CrawlTask: Send + Sync + 'static {
    /// Checked before every step
    fn should_continue(&self) -> bool;

    /// Runs one iteration of the crawl loop
    fn step(&self) -> impl Future<Output = Step> + Send;

    /// Runs once, on the last worker to exit
    fn close(&self);
}

#[derive(Debug, Default)]
struct Counts {
    live: usize,
    retire: usize,
}

#[derive(Debug)]
struct PoolShared {
    counts: Mutex<Counts>,
    stop: AtomicBool,
    started: AtomicBool,
    done: watch::Sender<bool>,
}

impl PoolShared {
    fn lock_counts(&self) -> std::sync::MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consumes a retire token if doing so leaves at least one worker alive
    fn try_retire(&self) -> bool {
        let mut counts = self.lock_counts();
        if counts.retire > 0 && counts.live > 1 {
            counts.retire -= 1;
            counts.live -= 1;
            true
        } else {
            false
        }
    }
}

/// Decrements the live count when a worker exits, even by panic
struct LiveGuard<T: CrawlTask> {
    task: Arc<T>,
    shared: Arc<PoolShared>,
    retired: bool,
}

impl<T: CrawlTask> Drop for LiveGuard<T> {
    fn drop(&mut self) {
        if self.retired {
            return;
        }
        let last = {
            let mut counts = self.shared.lock_counts();
            counts.live = counts.live.saturating_sub(1);
            counts.live == 0
        };
        if last {
            self.task.close();
            self.shared.done.send_replace(true);
        }
    }
}

/// Group of tokio tasks executing one [`CrawlTask`]
///
/// Workers must be started from within a tokio runtime.
pub struct WorkerPool<T: CrawlTask> {
    task: Arc<T>,
    shared: Arc<PoolShared>,
}

impl<T: CrawlTask> WorkerPool<T> {
    pub fn new(task: Arc<T>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            task,
            shared: Arc::new(PoolShared {
                counts: Mutex::new(Counts::default()),
                stop: AtomicBool::new(false),
                started: AtomicBool::new(false),
                done,
            }),
        }
    }

    /// Spawns `workers` workers
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Workers were spawned
    /// * `Ok(false)` - The pool was already started once
    /// * `Err(ConfigError)` - `workers` is zero
    pub fn start(&self, workers: usize) -> Result<bool, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::Validation(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        self.shared.lock_counts().live = workers;
        for _ in 0..workers {
            self.spawn_worker();
        }
        Ok(true)
    }

    /// Changes the number of workers while running
    ///
    /// Growing spawns new workers right away. Shrinking is cooperative: the
    /// next workers to finish a step retire. Returns `Ok(false)` if the pool
    /// is not running.
    pub fn resize(&self, workers: usize) -> Result<bool, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::Validation(
                "worker count must be at least 1".to_string(),
            ));
        }
        if !self.is_running() || self.shared.stop.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let spawn = {
            let mut counts = self.shared.lock_counts();
            if counts.live == 0 {
                return Ok(false);
            }
            let effective = counts.live - counts.retire.min(counts.live);
            if workers >= effective {
                let wanted = workers - effective;
                let cancelled = counts.retire.min(wanted);
                counts.retire -= cancelled;
                let spawn = wanted - cancelled;
                counts.live += spawn;
                spawn
            } else {
                counts.retire += effective - workers;
                0
            }
        };

        for _ in 0..spawn {
            self.spawn_worker();
        }
        tracing::debug!("Worker pool resized to {}", workers);
        Ok(true)
    }

    /// Requests a cooperative stop and waits for the close sequence
    ///
    /// Workers finish their current step before exiting. Returns immediately
    /// if the pool was never started.
    pub async fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.wait().await;
    }

    /// Waits until the last worker has exited and the task was closed
    pub async fn wait(&self) {
        if !self.shared.started.load(Ordering::SeqCst) {
            return;
        }
        let mut done = self.shared.done.subscribe();
        // The sender lives in `self.shared`, so the channel cannot close here
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Whether a stop was requested
    pub fn stop_requested(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }

    /// Number of live workers
    pub fn size(&self) -> usize {
        self.shared.lock_counts().live
    }

    pub fn is_running(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst) && !*self.shared.done.borrow()
    }

    pub fn is_finished(&self) -> bool {
        *self.shared.done.borrow()
    }

    fn spawn_worker(&self) {
        let task = Arc::clone(&self.task);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(run_worker(task, shared));
    }
}

async fn run_worker<T: CrawlTask>(task: Arc<T>, shared: Arc<PoolShared>) {
    let mut guard = LiveGuard {
        task: Arc::clone(&task),
        shared: Arc::clone(&shared),
        retired: false,
    };

    loop {
        if shared.stop.load(Ordering::SeqCst) || !task.should_continue() {
            break;
        }
        if shared.try_retire() {
            guard.retired = true;
            break;
        }
        if task.step().await == Step::Exhausted {
            break;
        }
    }
}
