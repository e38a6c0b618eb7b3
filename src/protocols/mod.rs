pub mod elm;
pub mod kwp;

use crate::error::Result;

/// Byte-stream channel to a diagnostic adapter.
///
/// `read_available` must not block waiting for data that never comes: an idle
/// channel returns an empty buffer once its read timeout expires.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Releases the channel. Calling it more than once is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Human-readable identifier, e.g. the serial device path.
    fn name(&self) -> String {
        "adapter".to_string()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        (**self).read_available()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
