use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::thread::Thread;
use std::time::Instant;

use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::DispatchPool;
use super::SignalListener;
use super::SignalRegistry;
use super::WatcherState;
use crate::constants::WATCHER_THREAD;
use crate::transport::SignalBaseline;
use crate::utils::exit::exit_pair;
use crate::utils::exit::ExitNotice;
use crate::utils::exit::ExitWatch;
use crate::utils::time::remaining_until;
use crate::Result;
use crate::SignalId;
use crate::Transport;
use crate::WatcherError;
use crate::WatcherSettings;

enum Mutation {
    Add(SignalId, Arc<dyn SignalListener>),
    Remove(SignalId, Arc<dyn SignalListener>),
}

impl Mutation {
    fn apply(
        self,
        registry: &mut SignalRegistry,
    ) -> bool {
        match self {
            Mutation::Add(signal, listener) => {
                registry.add(signal, listener);
                true
            }
            Mutation::Remove(signal, listener) => registry.remove(signal, &listener),
        }
    }
}

/// Outcome of an applied mutation
struct Applied {
    changed: bool,
    /// Monitored signals after the mutation
    signals: Vec<SignalId>,
}

/// Applies `mutation` to a copy of the registry and arms the transport for the
/// resulting signal set; the copy replaces the registry only once the watch
/// is armed. A registry left empty is published without arming.
fn apply_mutation<T: Transport>(
    transport: &T,
    registry: &RwLock<SignalRegistry>,
    mutation: Mutation,
) -> Result<Applied> {
    let mut next = registry.read().clone();
    let changed = mutation.apply(&mut next);
    let signals = next.signals();

    if changed {
        if !signals.is_empty() {
            transport.prepare_signal_watch(&signals)?;
        }
        *registry.write() = next;
    }
    Ok(Applied { changed, signals })
}

/// Registry mutation handed to the loop thread
struct Command {
    mutation: Mutation,
    ack: oneshot::Sender<Result<bool>>,
    requester: Thread,
}

/// Background detection loop and dispatch pool for one transport
///
/// While stopped, listener registration mutates the registry on the calling
/// thread. While running, the mutation is applied by the loop thread between
/// two detection cycles; the caller cancels the transport wait until the loop
/// picks the command up and acknowledges it.
pub struct SignalWatcher<T: Transport> {
    transport: Arc<T>,
    settings: WatcherSettings,
    registry: Arc<RwLock<SignalRegistry>>,
    state: Arc<Mutex<WatcherState>>,
    runtime: Mutex<Option<WatcherRuntime>>,
}

/// Threads and channels that exist only while the loop runs
struct WatcherRuntime {
    commands: mpsc::UnboundedSender<Command>,
    terminated: Arc<AtomicBool>,
    exited: ExitWatch,
    worker: Option<JoinHandle<()>>,
    pool: Arc<DispatchPool>,
}

/// How a teardown treats the dispatch pool
#[derive(Clone, Copy, PartialEq, Eq)]
enum PoolTeardown {
    /// Wait for pending notifications within the grace period
    Await,
    /// Let workers finish pending notifications on their own
    Detach,
}

impl<T: Transport> SignalWatcher<T> {
    pub fn new(
        transport: Arc<T>,
        settings: WatcherSettings,
    ) -> Self {
        Self {
            transport,
            settings,
            registry: Arc::new(RwLock::new(SignalRegistry::default())),
            state: Arc::new(Mutex::new(WatcherState::Stopped)),
            runtime: Mutex::new(None),
        }
    }

    /// Starts the detection loop.
    ///
    /// No-op when already running or when no listener is registered.
    pub fn start(&self) -> Result<()> {
        let mut runtime = self.runtime.lock();
        self.reap_terminated(&mut runtime);
        if runtime.is_some() {
            trace!("signal watcher already running");
            return Ok(());
        }

        let signals = self.registry.read().signals();
        if signals.is_empty() {
            debug!("no signal listeners registered; watcher stays stopped");
            return Ok(());
        }

        self.transport.prepare_signal_watch(&signals)?;

        let pool = Arc::new(
            DispatchPool::start(
                signals.len() + self.settings.dispatch_headroom,
                self.settings.dispatch_keep_alive(),
            )
            .map_err(WatcherError::LoopSpawn)?,
        );
        let (commands, receiver) = mpsc::unbounded_channel();
        let terminated = Arc::new(AtomicBool::new(false));
        let (notice, exited) = exit_pair();

        let detection = DetectionLoop {
            transport: self.transport.clone(),
            registry: self.registry.clone(),
            state: self.state.clone(),
            pool: pool.clone(),
            terminated: terminated.clone(),
            _notice: notice,
        };

        *self.state.lock() = WatcherState::Running;
        let spawned = thread::Builder::new()
            .name(WATCHER_THREAD.to_string())
            .spawn(move || detection.run(receiver));
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                *self.state.lock() = WatcherState::Stopped;
                pool.close();
                return Err(WatcherError::LoopSpawn(e).into());
            }
        };

        *runtime = Some(WatcherRuntime {
            commands,
            terminated,
            exited,
            worker: Some(worker),
            pool,
        });
        info!("signal watcher started on {} signal(s)", signals.len());
        Ok(())
    }

    /// Stops the detection loop and the dispatch pool. No-op when stopped.
    pub fn stop(&self) {
        let mut runtime = self.runtime.lock();
        let Some(running) = runtime.take() else {
            return;
        };
        self.teardown(running, PoolTeardown::Await);
        info!("signal watcher stopped");
    }

    /// Registers `listener` for changes of `signal`
    pub fn add_listener(
        &self,
        signal: SignalId,
        listener: Arc<dyn SignalListener>,
    ) -> Result<()> {
        self.mutate(Mutation::Add(signal, listener)).map(|_| ())
    }

    /// Removes the first registration of `listener` on `signal`.
    ///
    /// Returns whether a registration was removed. Removing the last listener
    /// stops the watcher.
    pub fn remove_listener(
        &self,
        signal: SignalId,
        listener: &Arc<dyn SignalListener>,
    ) -> Result<bool> {
        self.mutate(Mutation::Remove(signal, listener.clone()))
    }

    pub fn state(&self) -> WatcherState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() != WatcherState::Stopped
    }

    pub fn listener_count(
        &self,
        signal: SignalId,
    ) -> usize {
        self.registry.read().listener_count(signal)
    }

    /// Signal ids that currently have at least one listener
    pub fn monitored_signals(&self) -> Vec<SignalId> {
        self.registry.read().signals()
    }

    fn mutate(
        &self,
        mutation: Mutation,
    ) -> Result<bool> {
        let mut runtime = self.runtime.lock();
        self.reap_terminated(&mut runtime);

        let Some(running) = runtime.as_ref() else {
            return self.mutate_stopped(mutation);
        };

        let (ack, mut acked) = oneshot::channel();
        let command = Command {
            mutation,
            ack,
            requester: thread::current(),
        };

        let outcome = if running.commands.send(command).is_err() {
            Err(WatcherError::QuiesceInterrupted)
        } else {
            self.await_quiesce(&mut acked)
        };

        match outcome {
            Ok(Err(e)) => {
                warn!("registry mutation rejected; watcher keeps its previous signals: {:?}", e);
                Err(e)
            }
            Ok(Ok(changed)) => {
                // the loop terminates on its own once the registry is empty
                if self.registry.read().is_empty() {
                    if let Some(finished) = runtime.take() {
                        self.teardown(finished, PoolTeardown::Detach);
                        info!("last signal listener removed; watcher stopped");
                    }
                }
                Ok(changed)
            }
            Err(e) => {
                error!("signal watcher loop went away during registry mutation");
                if let Some(dead) = runtime.take() {
                    dead.terminated.store(true, Ordering::Release);
                    self.teardown(dead, PoolTeardown::Detach);
                }
                Err(e.into())
            }
        }
    }

    fn mutate_stopped(
        &self,
        mutation: Mutation,
    ) -> Result<bool> {
        let applied = apply_mutation(self.transport.as_ref(), &self.registry, mutation)?;
        Ok(applied.changed)
    }

    /// Keeps cancelling the transport wait until the loop acknowledges.
    ///
    /// The outer error means the loop went away; the inner result is the
    /// loop's answer.
    fn await_quiesce(
        &self,
        acked: &mut oneshot::Receiver<Result<bool>>,
    ) -> std::result::Result<Result<bool>, WatcherError> {
        let retry = self.settings.quiesce_retry();
        loop {
            match acked.try_recv() {
                Ok(answer) => return Ok(answer),
                Err(oneshot::error::TryRecvError::Closed) => return Err(WatcherError::QuiesceInterrupted),
                Err(oneshot::error::TryRecvError::Empty) => {
                    self.transport.cancel_wait();
                    thread::park_timeout(retry);
                }
            }
        }
    }

    fn reap_terminated(
        &self,
        runtime: &mut Option<WatcherRuntime>,
    ) {
        let terminated = runtime
            .as_ref()
            .is_some_and(|running| running.terminated.load(Ordering::Acquire));
        if terminated {
            if let Some(finished) = runtime.take() {
                self.teardown(finished, PoolTeardown::Detach);
            }
        }
    }

    fn teardown(
        &self,
        mut runtime: WatcherRuntime,
        pool_teardown: PoolTeardown,
    ) {
        let grace = self.settings.shutdown_grace();
        let retry = self.settings.quiesce_retry();
        runtime.terminated.store(true, Ordering::Release);

        let deadline = Instant::now() + grace;
        let loop_exited = loop {
            self.transport.cancel_wait();
            if runtime.exited.wait_until(Instant::now() + retry.min(remaining_until(deadline))) {
                break true;
            }
            if Instant::now() >= deadline {
                break false;
            }
        };

        if loop_exited {
            if let Some(worker) = runtime.worker.take() {
                if worker.join().is_err() {
                    error!("signal watcher loop panicked");
                }
            }
        } else {
            warn!(
                "ShutdownTimeout: signal watcher loop did not exit within {:?}; detaching",
                grace
            );
            runtime.worker.take();
        }

        runtime.pool.close();
        if pool_teardown == PoolTeardown::Await && !runtime.pool.await_termination(grace) {
            warn!("ShutdownTimeout: dispatch pool did not drain within {:?}", grace);
        }

        *self.state.lock() = WatcherState::Stopped;
    }
}

impl<T: Transport> Drop for SignalWatcher<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the loop thread
struct DetectionLoop<T: Transport> {
    transport: Arc<T>,
    registry: Arc<RwLock<SignalRegistry>>,
    state: Arc<Mutex<WatcherState>>,
    pool: Arc<DispatchPool>,
    terminated: Arc<AtomicBool>,
    _notice: ExitNotice,
}

impl<T: Transport> DetectionLoop<T> {
    fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut baseline = SignalBaseline::default();
        debug!("signal watcher loop starts");

        while !self.is_terminated() {
            loop {
                match commands.try_recv() {
                    Ok(command) => self.apply(command, &mut baseline),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        self.terminated.store(true, Ordering::Release);
                        break;
                    }
                }
            }
            if self.is_terminated() {
                break;
            }

            match self.transport.blocking_wait_for_change() {
                Ok(snapshot) => {
                    if self.is_terminated() {
                        break;
                    }
                    let changes = baseline.delta(&snapshot);
                    self.dispatch(changes);
                }
                Err(e) => {
                    warn!("waiting for signal change failed: {:?}", e);
                    thread::yield_now();
                }
            }
        }

        // commands that arrived after termination are dropped unacknowledged
        commands.close();
        while commands.try_recv().is_ok() {}
        debug!("signal watcher loop exits");
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn apply(
        &self,
        command: Command,
        baseline: &mut SignalBaseline,
    ) {
        let Command {
            mutation,
            ack,
            requester,
        } = command;

        *self.state.lock() = WatcherState::Suspended;
        let answer = match apply_mutation(self.transport.as_ref(), &self.registry, mutation) {
            Ok(applied) if applied.signals.is_empty() => {
                self.terminated.store(true, Ordering::Release);
                *self.state.lock() = WatcherState::Stopped;
                Ok(applied.changed)
            }
            Ok(applied) => {
                if applied.changed {
                    // the transport re-reads every level when it is armed
                    baseline.clear();
                    trace!("registry mutation applied; monitoring {:?}", applied.signals);
                }
                *self.state.lock() = WatcherState::Running;
                Ok(applied.changed)
            }
            Err(e) => {
                self.rearm_previous(baseline);
                *self.state.lock() = WatcherState::Running;
                Err(e)
            }
        };

        let _ = ack.send(answer);
        requester.unpark();
    }

    /// Restores the watch of the unchanged registry after a failed re-arm
    fn rearm_previous(
        &self,
        baseline: &mut SignalBaseline,
    ) {
        let signals = self.registry.read().signals();
        baseline.clear();
        if let Err(e) = self.transport.prepare_signal_watch(&signals) {
            error!("restoring signal watch on {:?} failed: {:?}", signals, e);
        }
    }

    fn dispatch(
        &self,
        changes: Vec<(SignalId, bool)>,
    ) {
        for (signal, value) in changes {
            let listeners = self.registry.read().listeners(signal);
            trace!("signal {} -> {} ({} listener(s))", signal, value, listeners.len());
            for listener in listeners {
                let task = Box::new(move || listener.signal_changed(signal, value));
                if !self.pool.submit(task) {
                    debug!("dispatch pool closed; dropping change of signal {}", signal);
                    return;
                }
            }
        }
    }
}
