use std::sync::Arc;

use super::Transport;
use crate::RawInput;
use crate::RawOutput;
use crate::Result;

/// Read side of a shared transport, as a channel capability
pub struct TransportInput<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> TransportInput<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport> RawInput for TransportInput<T> {
    fn raw_read(
        &self,
        dst: &mut [u8],
    ) -> Result<usize> {
        self.transport.sync_read(dst)
    }
}

/// Write side of a shared transport, as a channel capability
pub struct TransportOutput<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> TransportOutput<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport> RawOutput for TransportOutput<T> {
    fn raw_write(
        &self,
        src: &[u8],
    ) -> Result<usize> {
        self.transport.sync_write(src)
    }
}
