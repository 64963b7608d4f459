use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SerialDevice;
use crate::DeviceError;
use crate::IoSettings;
use crate::Result;
use crate::Transport;

/// Opens the transport for a device name
pub type TransportFactory<T> = Box<dyn Fn(&str) -> Result<Arc<T>> + Send + Sync + 'static>;

/// Cache of open devices keyed by name
///
/// Owned by the caller. Nothing is closed implicitly: call
/// [`DeviceRegistry::shutdown`] before dropping it.
pub struct DeviceRegistry<T: Transport> {
    devices: DashMap<String, Arc<SerialDevice<T>>>,
    factory: TransportFactory<T>,
    settings: IoSettings,
}

impl<T: Transport> DeviceRegistry<T> {
    pub fn new(
        factory: TransportFactory<T>,
        settings: IoSettings,
    ) -> Self {
        Self {
            devices: DashMap::new(),
            factory,
            settings,
        }
    }

    /// Returns the cached device for `name`, opening it through the factory if
    /// it is not cached or was closed since.
    ///
    /// The factory runs without any cache lock held. When two callers open the
    /// same name at once, the first device cached wins and the other is closed.
    pub fn open(
        &self,
        name: &str,
    ) -> Result<Arc<SerialDevice<T>>> {
        if name.trim().is_empty() {
            return Err(DeviceError::InvalidDeviceName(name.to_string()).into());
        }

        if let Some(cached) = self.get(name) {
            if cached.is_open() {
                return Ok(cached);
            }
            debug!("[{}] cached device was closed; reopening", name);
        }

        let device = self.create(name)?;
        let (kept, surplus) = match self.devices.entry(name.to_string()) {
            Entry::Occupied(cached) if cached.get().is_open() => (cached.get().clone(), Some(device)),
            Entry::Occupied(mut cached) => {
                cached.insert(device.clone());
                (device, None)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(device.clone());
                (device, None)
            }
        };

        if let Some(surplus) = surplus {
            debug!("[{}] opened concurrently; closing the duplicate", name);
            if let Err(e) = surplus.close() {
                warn!("[{}] failed to close duplicate device: {:?}", name, e);
            }
        }
        Ok(kept)
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<Arc<SerialDevice<T>>> {
        self.devices.get(name).map(|device| device.value().clone())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Closes every open device and empties the cache.
    ///
    /// All devices are attempted; failures are reported together.
    pub fn shutdown(&self) -> Result<()> {
        let names: Vec<String> = self.devices.iter().map(|entry| entry.key().clone()).collect();
        let mut failures = Vec::new();

        for name in names {
            let Some((_, device)) = self.devices.remove(&name) else {
                continue;
            };
            if !device.is_open() {
                continue;
            }
            if let Err(e) = device.close() {
                warn!("[{}] failed to close device: {:?}", name, e);
                failures.push(format!("{}: {}", name, e));
            }
        }

        if !failures.is_empty() {
            return Err(DeviceError::Shutdown { failures }.into());
        }
        info!("device registry shut down");
        Ok(())
    }

    fn create(
        &self,
        name: &str,
    ) -> Result<Arc<SerialDevice<T>>> {
        let transport = (self.factory)(name)?;
        info!("[{}] device opened", name);
        Ok(Arc::new(SerialDevice::new(name, transport, self.settings.clone())))
    }
}
