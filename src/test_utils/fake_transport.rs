use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use parking_lot::Condvar;
use parking_lot::Mutex;

use crate::Result;
use crate::SignalId;
use crate::SignalSnapshot;
use crate::Transport;
use crate::TransportError;

/// In-memory transport with scripted partial transfers and signal events
///
/// - reads drain `inbound`, at most `read_limit` bytes per call
/// - writes are recorded per call, at most `write_limit` bytes accepted per call
/// - reads can be held at a gate to simulate a device that blocks
/// - signal changes are queued with [`FakeTransport::push_change`]; a
///   cancellation request is remembered until the next wait consumes it
#[derive(Default)]
pub struct FakeTransport {
    inbound: Mutex<VecDeque<u8>>,
    read_limit: Mutex<Option<usize>>,
    write_limit: Mutex<Option<usize>>,
    writes: Mutex<Vec<Vec<u8>>>,
    fail_reads: Mutex<bool>,

    gate: Mutex<bool>,
    gate_cond: Condvar,
    reads_started: AtomicUsize,
    read_calls: AtomicUsize,

    levels: Mutex<HashMap<SignalId, bool>>,
    set_calls: Mutex<Vec<(SignalId, bool)>>,
    watched: Mutex<Vec<SignalId>>,
    prepare_calls: AtomicUsize,
    fail_prepare: Mutex<bool>,

    events: Mutex<EventQueue>,
    events_cond: Condvar,
    cancel_calls: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Default)]
struct EventQueue {
    pending: VecDeque<SignalSnapshot>,
    cancel_requested: bool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(
        &self,
        bytes: &[u8],
    ) {
        self.inbound.lock().extend(bytes.iter().copied());
    }

    pub fn set_read_limit(
        &self,
        limit: Option<usize>,
    ) {
        *self.read_limit.lock() = limit;
    }

    pub fn set_write_limit(
        &self,
        limit: Option<usize>,
    ) {
        *self.write_limit.lock() = limit;
    }

    pub fn fail_reads(
        &self,
        fail: bool,
    ) {
        *self.fail_reads.lock() = fail;
    }

    /// Makes every subsequent `prepare_signal_watch` fail without touching
    /// the watched set
    pub fn fail_prepare(
        &self,
        fail: bool,
    ) {
        *self.fail_prepare.lock() = fail;
    }

    /// Holds every subsequent read until [`FakeTransport::open_gate`]
    pub fn close_gate(&self) {
        *self.gate.lock() = true;
    }

    pub fn open_gate(&self) {
        *self.gate.lock() = false;
        self.gate_cond.notify_all();
    }

    pub fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    pub fn written(&self) -> Vec<u8> {
        self.writes.lock().concat()
    }

    pub fn set_calls(&self) -> Vec<(SignalId, bool)> {
        self.set_calls.lock().clone()
    }

    pub fn set_level(
        &self,
        signal: SignalId,
        value: bool,
    ) {
        self.levels.lock().insert(signal, value);
    }

    pub fn watched(&self) -> Vec<SignalId> {
        self.watched.lock().clone()
    }

    pub fn prepare_calls(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Queues one detection cycle reporting these levels
    pub fn push_change(
        &self,
        entries: Vec<(SignalId, bool)>,
    ) {
        {
            let mut levels = self.levels.lock();
            for &(id, value) in &entries {
                levels.insert(id, value);
            }
        }
        self.events.lock().pending.push_back(SignalSnapshot::new(entries));
        self.events_cond.notify_all();
    }

    pub fn pending_changes(&self) -> usize {
        self.events.lock().pending.len()
    }
}

impl Transport for FakeTransport {
    fn sync_read(
        &self,
        dst: &mut [u8],
    ) -> Result<usize> {
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        {
            let mut gate = self.gate.lock();
            while *gate {
                self.gate_cond.wait(&mut gate);
            }
        }
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_reads.lock() {
            return Err(TransportError::Device("read failed".into()).into());
        }

        let limit = self.read_limit.lock().unwrap_or(usize::MAX);
        let mut inbound = self.inbound.lock();
        let n = dst.len().min(limit).min(inbound.len());
        for (slot, byte) in dst.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn sync_write(
        &self,
        src: &[u8],
    ) -> Result<usize> {
        let limit = self.write_limit.lock().unwrap_or(usize::MAX);
        let n = src.len().min(limit);
        self.writes.lock().push(src[..n].to_vec());
        Ok(n)
    }

    fn prepare_signal_watch(
        &self,
        signals: &[SignalId],
    ) -> Result<()> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_prepare.lock() {
            return Err(TransportError::Device("watch setup failed".into()).into());
        }
        *self.watched.lock() = signals.to_vec();
        Ok(())
    }

    fn blocking_wait_for_change(&self) -> Result<SignalSnapshot> {
        let mut events = self.events.lock();
        loop {
            if events.cancel_requested {
                events.cancel_requested = false;
                return Ok(SignalSnapshot::empty());
            }
            if let Some(snapshot) = events.pending.pop_front() {
                return Ok(snapshot);
            }
            self.events_cond.wait(&mut events);
        }
    }

    fn cancel_wait(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().cancel_requested = true;
        self.events_cond.notify_all();
    }

    fn query_signal(
        &self,
        signal: SignalId,
    ) -> Result<bool> {
        Ok(self.levels.lock().get(&signal).copied().unwrap_or(false))
    }

    fn set_signal(
        &self,
        signal: SignalId,
        value: bool,
    ) -> Result<()> {
        self.set_calls.lock().push((signal, value));
        self.levels.lock().insert(signal, value);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
