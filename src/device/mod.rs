//! Serial devices.
//!
//! A [`SerialDevice`] composes one transport with lazily created byte
//! channels, pins for the RS-232 control lines and a signal watcher feeding
//! the input pins' listeners. [`DeviceRegistry`] caches open devices by name.

mod device_registry;
mod pin;
mod serial_device;
mod signal;

pub use device_registry::*;
pub use pin::*;
pub use serial_device::*;
pub use signal::*;
