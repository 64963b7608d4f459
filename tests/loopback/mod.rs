//! Loopback plug: bytes written come back on the read side, RTS drives CTS and
//! DTR drives both DSR and DCD.

use std::collections::HashMap;
use std::collections::VecDeque;

use parking_lot::Condvar;
use parking_lot::Mutex;
use sigline::Result;
use sigline::SerialSignal;
use sigline::SignalId;
use sigline::SignalSnapshot;
use sigline::Transport;

#[derive(Default)]
pub struct LoopbackTransport {
    buffer: Mutex<VecDeque<u8>>,
    lines: Mutex<Lines>,
    changed: Condvar,
}

#[derive(Default)]
struct Lines {
    levels: HashMap<SignalId, bool>,
    watched: Vec<SignalId>,
    /// Levels read when the watch was armed, updated by every report
    reported: HashMap<SignalId, bool>,
    cancelled: bool,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn wired_to(signal: SerialSignal) -> &'static [SerialSignal] {
        match signal {
            SerialSignal::Rts => &[SerialSignal::Cts],
            SerialSignal::Dtr => &[SerialSignal::Dsr, SerialSignal::Dcd],
            _ => &[],
        }
    }
}

impl Transport for LoopbackTransport {
    fn sync_read(
        &self,
        dst: &mut [u8],
    ) -> Result<usize> {
        // a real port hands out what has arrived, a few bytes at a time
        let mut buffer = self.buffer.lock();
        let n = dst.len().min(buffer.len()).min(3);
        for (slot, byte) in dst.iter_mut().zip(buffer.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn sync_write(
        &self,
        src: &[u8],
    ) -> Result<usize> {
        let n = src.len().min(4);
        self.buffer.lock().extend(&src[..n]);
        Ok(n)
    }

    fn prepare_signal_watch(
        &self,
        signals: &[SignalId],
    ) -> Result<()> {
        let mut lines = self.lines.lock();
        let armed: HashMap<SignalId, bool> = signals
            .iter()
            .map(|id| (*id, lines.levels.get(id).copied().unwrap_or(false)))
            .collect();
        lines.watched = signals.to_vec();
        lines.reported = armed;
        Ok(())
    }

    fn blocking_wait_for_change(&self) -> Result<SignalSnapshot> {
        let mut lines = self.lines.lock();
        loop {
            if lines.cancelled {
                lines.cancelled = false;
                return Ok(SignalSnapshot::empty());
            }

            let changed: Vec<(SignalId, bool)> = lines
                .watched
                .iter()
                .map(|id| (*id, lines.levels.get(id).copied().unwrap_or(false)))
                .filter(|(id, level)| lines.reported.get(id).copied().unwrap_or(false) != *level)
                .collect();
            if !changed.is_empty() {
                for &(id, level) in &changed {
                    lines.reported.insert(id, level);
                }
                return Ok(SignalSnapshot::new(changed));
            }

            self.changed.wait(&mut lines);
        }
    }

    fn cancel_wait(&self) {
        self.lines.lock().cancelled = true;
        self.changed.notify_all();
    }

    fn query_signal(
        &self,
        signal: SignalId,
    ) -> Result<bool> {
        Ok(self.lines.lock().levels.get(&signal).copied().unwrap_or(false))
    }

    fn set_signal(
        &self,
        signal: SignalId,
        value: bool,
    ) -> Result<()> {
        let mut lines = self.lines.lock();
        lines.levels.insert(signal, value);
        if let Some(line) = SerialSignal::from_id(signal) {
            for wired in Self::wired_to(line) {
                lines.levels.insert(wired.id(), value);
            }
        }
        self.changed.notify_all();
        Ok(())
    }
}
