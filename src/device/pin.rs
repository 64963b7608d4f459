use std::sync::Arc;
use std::time::Duration;

use super::serial_device::DeviceShared;
use super::SerialSignal;
use crate::utils::time::pause;
use crate::Result;
use crate::SignalListener;
use crate::Transport;

/// Control line driven by the remote end
pub struct InputPin<T: Transport> {
    signal: SerialSignal,
    device: Arc<DeviceShared<T>>,
}

impl<T: Transport> InputPin<T> {
    pub(crate) fn new(
        signal: SerialSignal,
        device: Arc<DeviceShared<T>>,
    ) -> Self {
        Self { signal, device }
    }

    pub fn signal(&self) -> SerialSignal {
        self.signal
    }

    /// Current level of the line
    pub fn value(&self) -> Result<bool> {
        self.device.ensure_open()?;
        self.device.transport.query_signal(self.signal.id())
    }

    /// Notifies `listener` on every level change once pin listeners are active
    pub fn add_listener(
        &self,
        listener: Arc<dyn SignalListener>,
    ) -> Result<()> {
        self.device.ensure_open()?;
        self.device.watcher.add_listener(self.signal.id(), listener)
    }

    pub fn remove_listener(
        &self,
        listener: &Arc<dyn SignalListener>,
    ) -> Result<bool> {
        self.device.ensure_open()?;
        self.device.watcher.remove_listener(self.signal.id(), listener)
    }
}

/// Control line driven by this end
pub struct OutputPin<T: Transport> {
    signal: SerialSignal,
    device: Arc<DeviceShared<T>>,
}

impl<T: Transport> OutputPin<T> {
    pub(crate) fn new(
        signal: SerialSignal,
        device: Arc<DeviceShared<T>>,
    ) -> Self {
        Self { signal, device }
    }

    pub fn signal(&self) -> SerialSignal {
        self.signal
    }

    pub fn value(&self) -> Result<bool> {
        self.device.ensure_open()?;
        self.device.transport.query_signal(self.signal.id())
    }

    pub fn set_value(
        &self,
        value: bool,
    ) -> Result<()> {
        self.device.ensure_open()?;
        self.device.transport.set_signal(self.signal.id(), value)
    }

    /// Drives `start`, holds it for `hold`, drives the inverse and holds that
    /// for `release`
    pub fn pulse(
        &self,
        start: bool,
        hold: Duration,
        release: Duration,
    ) -> Result<()> {
        self.set_value(start)?;
        pause(hold);
        self.set_value(!start)?;
        pause(release);
        Ok(())
    }
}
