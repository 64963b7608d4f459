use std::io;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::bounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::constants::DISPATCH_THREAD_PREFIX;
use crate::utils::exit::exit_pair;
use crate::utils::exit::ExitNotice;
use crate::utils::exit::ExitWatch;

pub(crate) type DispatchTask = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool running listener notifications off the detection loop
///
/// Tasks are handed over a zero-capacity channel, so a task is only accepted
/// by a worker that is idle at that moment. `core_size` workers are started
/// up front and never time out. A task that finds no idle worker starts a new
/// one, so the pool grows without bound under load; those extra workers exit
/// after `keep_alive` without work.
pub(crate) struct DispatchPool {
    intake: Mutex<Option<Intake>>,
    tasks: Receiver<DispatchTask>,
    exited: ExitWatch,
    live: Arc<AtomicUsize>,
    spawned: AtomicUsize,
    keep_alive: Duration,
}

/// Sending halves dropped by `close`
struct Intake {
    tasks: Sender<DispatchTask>,
    notice: ExitNotice,
}

/// How long an idle worker waits for its next task
#[derive(Clone, Copy)]
enum Lifetime {
    Core,
    Surplus(Duration),
}

struct Worker {
    tasks: Receiver<DispatchTask>,
    lifetime: Lifetime,
    live: Arc<AtomicUsize>,
    _notice: ExitNotice,
}

impl DispatchPool {
    pub(crate) fn start(
        core_size: usize,
        keep_alive: Duration,
    ) -> io::Result<Self> {
        let (sender, tasks) = bounded(0);
        let (notice, exited) = exit_pair();
        let pool = Self {
            intake: Mutex::new(Some(Intake { tasks: sender, notice })),
            tasks,
            exited,
            live: Arc::new(AtomicUsize::new(0)),
            spawned: AtomicUsize::new(0),
            keep_alive,
        };

        let started = {
            let intake = pool.intake.lock();
            match intake.as_ref() {
                Some(open) => (0..core_size).try_for_each(|_| {
                    pool.spawn_worker(open, Lifetime::Core, None).map_err(|(e, _)| e)
                }),
                None => Ok(()),
            }
        };
        if let Err(e) = started {
            pool.close();
            return Err(e);
        }
        debug!("dispatch pool started with {} core workers", core_size);
        Ok(pool)
    }

    /// Hands `task` to an idle worker, or to a freshly started one.
    ///
    /// Returns `false` once the pool is closed.
    pub(crate) fn submit(
        &self,
        task: DispatchTask,
    ) -> bool {
        let intake = self.intake.lock();
        let Some(open) = intake.as_ref() else {
            return false;
        };

        let task = match open.tasks.try_send(task) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(task)) => task,
        };

        let task = match self.spawn_worker(open, Lifetime::Surplus(self.keep_alive), Some(task)) {
            Ok(()) => return true,
            Err((e, task)) => {
                error!("failed to start dispatch worker: {:?}", e);
                match task {
                    Some(task) => task,
                    None => return true,
                }
            }
        };

        // wait for one of the running workers to free up
        let sender = open.tasks.clone();
        drop(intake);
        sender.send(task).is_ok()
    }

    /// Stops accepting tasks; running workers finish their current task and exit
    pub(crate) fn close(&self) {
        if self.intake.lock().take().is_some() {
            trace!("dispatch pool closed");
        }
    }

    /// Waits up to `grace` for every worker to exit.
    ///
    /// On timeout the remaining workers are left to finish their current task
    /// on their own.
    pub(crate) fn await_termination(
        &self,
        grace: Duration,
    ) -> bool {
        if self.exited.wait_until(Instant::now() + grace) {
            return true;
        }
        warn!(
            "dispatch pool shutdown timed out after {:?}: {} worker(s) detached",
            grace,
            self.live.load(Ordering::Acquire)
        );
        false
    }

    #[cfg(test)]
    pub(crate) fn live_workers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn spawn_worker(
        &self,
        intake: &Intake,
        lifetime: Lifetime,
        first: Option<DispatchTask>,
    ) -> std::result::Result<(), SpawnFailure> {
        let name = format!(
            "{}{}",
            DISPATCH_THREAD_PREFIX,
            self.spawned.fetch_add(1, Ordering::Relaxed)
        );
        let worker = Worker {
            tasks: self.tasks.clone(),
            lifetime,
            live: self.live.clone(),
            _notice: intake.notice.clone(),
        };

        self.live.fetch_add(1, Ordering::AcqRel);
        // the task is shared with the closure so it can be handed back if the
        // thread never starts
        let slot = Arc::new(Mutex::new(first));
        let handed = slot.clone();
        match thread::Builder::new()
            .name(name)
            .spawn(move || worker.run(handed.lock().take()))
        {
            Ok(_) => Ok(()),
            // the dropped closure releases the worker and its count
            Err(e) => Err((e, slot.lock().take())),
        }
    }
}

type SpawnFailure = (io::Error, Option<DispatchTask>);

impl Worker {
    fn run(
        self,
        first: Option<DispatchTask>,
    ) {
        if let Some(task) = first {
            run_task(task);
        }

        loop {
            let next = match self.lifetime {
                Lifetime::Core => self.tasks.recv().map_err(|_| RecvTimeoutError::Disconnected),
                Lifetime::Surplus(keep_alive) => self.tasks.recv_timeout(keep_alive),
            };
            match next {
                Ok(task) => run_task(task),
                Err(RecvTimeoutError::Timeout) => {
                    trace!("idle dispatch worker exits");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

fn run_task(task: DispatchTask) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        error!("signal listener panicked; notification dropped");
    }
}
