use std::io;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::utils::exit::exit_pair;
use crate::utils::exit::ExitWatch;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Dedicated single-worker executor owned by one channel
///
/// Jobs run one at a time in submission order on a named thread.
pub(crate) struct TaskExecutor {
    name: &'static str,
    sender: Option<mpsc::UnboundedSender<Job>>,
    shared: Arc<ExecutorShared>,
    finished: ExitWatch,
    worker: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct ExecutorShared {
    /// Set by a forced shutdown: queued jobs are discarded instead of run
    cancelled: AtomicBool,
}

impl TaskExecutor {
    pub(crate) fn spawn(name: &'static str) -> io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let shared = Arc::new(ExecutorShared::default());
        let worker_shared = shared.clone();
        let (notice, finished) = exit_pair();

        let worker = thread::Builder::new().name(name.to_string()).spawn(move || {
            let _notice = notice;
            while let Some(job) = receiver.blocking_recv() {
                if worker_shared.cancelled.load(Ordering::Acquire) {
                    trace!("[{}] discarding queued job after forced shutdown", name);
                    continue;
                }
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("[{}] job panicked", name);
                }
            }
            trace!("[{}] worker exits", name);
        })?;

        Ok(Self {
            name,
            sender: Some(sender),
            shared,
            finished,
            worker: Some(worker),
        })
    }

    /// Queues `job`. Hands the job back if the worker is gone.
    pub(crate) fn execute(
        &self,
        job: Job,
    ) -> std::result::Result<(), Job> {
        match &self.sender {
            Some(sender) => sender.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    /// Stops accepting jobs and waits up to `grace` for the worker to drain.
    ///
    /// When the grace period elapses, jobs still queued are discarded and the
    /// worker thread is detached; the job currently running (if any) is left to
    /// finish on its own. Returns whether the worker terminated in time.
    pub(crate) fn shutdown(
        mut self,
        grace: Duration,
    ) -> bool {
        // closing the queue lets the worker exit once it is drained
        self.sender.take();

        let terminated = self.finished.wait_until(Instant::now() + grace);

        if terminated {
            if let Some(handle) = self.worker.take() {
                if handle.join().is_err() {
                    error!("[{}] worker panicked", self.name);
                }
            }
        } else {
            self.shared.cancelled.store(true, Ordering::Release);
            warn!(
                "[{}] shutdown timed out after {:?}, forcing: queued jobs are discarded",
                self.name, grace
            );
            self.worker.take();
        }
        terminated
    }
}
