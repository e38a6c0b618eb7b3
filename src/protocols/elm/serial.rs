use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use log::debug;
use serialport::SerialPort;

use crate::error::{Error, Result};
use crate::protocols::Transport;

/// Serial connection to an adapter via `serialport`.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    path: String,
}

impl SerialTransport {
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        debug!("Opening {} at {} baud", path, baud_rate);
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()?;

        Ok(Self {
            port: Some(port),
            path: path.to_string(),
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| Error::Transport(format!("{} is closed", self.path)))
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let port = self.port()?;
        let waiting = port.bytes_to_read()? as usize;
        let mut buf = vec![0u8; waiting.max(1)];

        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(Error::Transport(format!("{}: {}", self.path, e))),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.path.clone()
    }
}
