use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::InputPin;
use super::OutputPin;
use super::SerialSignal;
use crate::ChannelConfig;
use crate::DeviceError;
use crate::Direction;
use crate::InputChannel;
use crate::IoSettings;
use crate::OutputChannel;
use crate::OutputConfig;
use crate::Result;
use crate::SignalWatcher;
use crate::Transport;
use crate::TransportInput;
use crate::TransportOutput;
use crate::WatcherState;

pub type DeviceInput<T> = InputChannel<TransportInput<T>>;
pub type DeviceOutput<T> = OutputChannel<TransportOutput<T>>;

/// State shared between a device and the pins handed out by it
pub(crate) struct DeviceShared<T: Transport> {
    pub(crate) name: String,
    pub(crate) transport: Arc<T>,
    pub(crate) watcher: SignalWatcher<T>,
    closed: AtomicBool,
}

impl<T: Transport> DeviceShared<T> {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeviceError::DeviceClosed {
                name: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }
}

/// One serial device: byte channels, control-line pins and their watcher,
/// all over a single transport
pub struct SerialDevice<T: Transport> {
    shared: Arc<DeviceShared<T>>,
    settings: IoSettings,
    input: Mutex<Option<Arc<DeviceInput<T>>>>,
    output: Mutex<Option<Arc<DeviceOutput<T>>>>,
}

impl<T: Transport> SerialDevice<T> {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<T>,
        settings: IoSettings,
    ) -> Self {
        let watcher = SignalWatcher::new(transport.clone(), settings.watcher.clone());
        Self {
            shared: Arc::new(DeviceShared {
                name: name.into(),
                transport,
                watcher,
                closed: AtomicBool::new(false),
            }),
            settings,
            input: Mutex::new(None),
            output: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_open(&self) -> bool {
        !self.shared.closed.load(Ordering::Acquire)
    }

    /// Reading side, created with the configured defaults on first access
    pub fn input(&self) -> Result<Arc<DeviceInput<T>>> {
        let mut input = self.input.lock();
        // checked under the slot lock: `close` marks the device closed before
        // it empties the slot
        self.shared.ensure_open()?;
        if let Some(channel) = input.as_ref() {
            return Ok(channel.clone());
        }

        let channel = Arc::new(InputChannel::new(
            TransportInput::new(self.shared.transport.clone()),
            ChannelConfig::from(&self.settings.channel),
            self.settings.channel.close_grace(),
        ));
        debug!("[{}] input channel created", self.shared.name);
        *input = Some(channel.clone());
        Ok(channel)
    }

    /// Writing side, created with the configured defaults on first access
    pub fn output(&self) -> Result<Arc<DeviceOutput<T>>> {
        let mut output = self.output.lock();
        // checked under the slot lock: `close` marks the device closed before
        // it empties the slot
        self.shared.ensure_open()?;
        if let Some(channel) = output.as_ref() {
            return Ok(channel.clone());
        }

        let channel = Arc::new(OutputChannel::new(
            TransportOutput::new(self.shared.transport.clone()),
            OutputConfig::from(&self.settings.channel),
            self.settings.channel.close_grace(),
        ));
        debug!("[{}] output channel created", self.shared.name);
        *output = Some(channel.clone());
        Ok(channel)
    }

    pub fn input_pin(
        &self,
        signal: SerialSignal,
    ) -> Result<InputPin<T>> {
        self.shared.ensure_open()?;
        if !signal.is_input() {
            return Err(DeviceError::InvalidSignal {
                signal: signal.to_string(),
                direction: Direction::Input,
            }
            .into());
        }
        Ok(InputPin::new(signal, self.shared.clone()))
    }

    pub fn output_pin(
        &self,
        signal: SerialSignal,
    ) -> Result<OutputPin<T>> {
        self.shared.ensure_open()?;
        if !signal.is_output() {
            return Err(DeviceError::InvalidSignal {
                signal: signal.to_string(),
                direction: Direction::Output,
            }
            .into());
        }
        Ok(OutputPin::new(signal, self.shared.clone()))
    }

    /// Every input line of the device, in line order
    pub fn input_pins(&self) -> Result<Vec<InputPin<T>>> {
        SerialSignal::ALL
            .into_iter()
            .filter(|signal| signal.is_input())
            .map(|signal| self.input_pin(signal))
            .collect()
    }

    /// Every output line of the device, in line order
    pub fn output_pins(&self) -> Result<Vec<OutputPin<T>>> {
        SerialSignal::ALL
            .into_iter()
            .filter(|signal| signal.is_output())
            .map(|signal| self.output_pin(signal))
            .collect()
    }

    /// Whether `name` denotes one of the device's lines
    pub fn has_pin(
        &self,
        name: &str,
    ) -> bool {
        name.parse::<SerialSignal>().is_ok()
    }

    /// Starts delivering changes to the listeners registered on input pins
    pub fn activate_pin_listeners(&self) -> Result<()> {
        self.shared.ensure_open()?;
        self.shared.watcher.start()
    }

    pub fn stop_pin_listeners(&self) {
        self.shared.watcher.stop();
    }

    pub fn pin_listener_state(&self) -> WatcherState {
        self.shared.watcher.state()
    }

    /// Stops pin listeners, closes both channels and then the transport.
    ///
    /// Every step is attempted; the first failure is returned. Later calls do
    /// nothing.
    pub fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.shared.watcher.stop();

        let mut first_error = None;
        let input = self.input.lock().take();
        if let Some(input) = input {
            if let Err(e) = input.close() {
                warn!("[{}] closing input channel failed: {:?}", self.shared.name, e);
                first_error.get_or_insert(e);
            }
        }
        let output = self.output.lock().take();
        if let Some(output) = output {
            if let Err(e) = output.close() {
                warn!("[{}] closing output channel failed: {:?}", self.shared.name, e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.shared.transport.close() {
            warn!("[{}] closing transport failed: {:?}", self.shared.name, e);
            first_error.get_or_insert(e);
        }

        info!("[{}] device closed", self.shared.name);
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
