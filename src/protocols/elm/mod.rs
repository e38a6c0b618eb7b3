//! ELM327 AT-command link.
//!
//! Commands are written as text terminated by `\r`. Responses are collected by
//! the drain loop: wait `settle_delay`, then read whatever is available until a
//! read comes back empty. There is no deadline. A silent adapter produces an
//! empty [`RawResponse`], and deciding what "no data" means is left to the
//! protocol layer.

use std::thread::sleep;

use bytes::BytesMut;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::protocols::Transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod serial;
mod types;

pub use self::serial::SerialTransport;
pub use self::types::{LinkTiming, RawResponse};

const LINE_TERMINATOR: char = '\r';
const DRAIN_BUFFER_SIZE: usize = 256;

/// Reset, echo/linefeeds/spaces off, headers on, ISO 9141-2.
pub const INIT_COMMANDS: [&str; 6] = ["ATZ", "ATE0", "ATL0", "ATS0", "ATH1", "ATSP 3"];

/// OBD Mode 03: read stored trouble codes.
pub const READ_DTC_COMMAND: &str = "03";

pub struct AdapterLink<T: Transport> {
    transport: T,
    timing: LinkTiming,
    closed: bool,
}

impl<T: Transport> AdapterLink<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timing(transport, LinkTiming::default())
    }

    pub fn with_timing(transport: T, timing: LinkTiming) -> Self {
        Self {
            transport,
            timing,
            closed: false,
        }
    }

    pub fn name(&self) -> String {
        self.transport.name()
    }

    /// Runs the fixed initialization sequence and returns the reply to the
    /// last command. Individual command failures are not detected here.
    pub fn initialize(&mut self) -> Result<RawResponse> {
        let mut last = RawResponse::default();
        for command in INIT_COMMANDS {
            self.write_command(command)?;
            sleep(self.timing.init_command_delay);
            last = self.drain()?;
        }
        debug!("Adapter initialized: {:?}", last.as_str());
        Ok(last)
    }

    pub fn send_obd(&mut self, command_hex: &str) -> Result<RawResponse> {
        self.transact(command_hex)
    }

    /// Sets the three-byte header used for KWP2000 framing, e.g. `81 10 F1`.
    pub fn set_header(&mut self, header: &str) -> Result<RawResponse> {
        self.transact(&format!("AT SH {}", header))
    }

    pub fn send_raw(&mut self, payload_hex: &str) -> Result<RawResponse> {
        self.transact(payload_hex)
    }

    /// Releases the transport. Safe to call repeatedly; never fails.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.transport.close() {
            warn!("Failed to close {}: {}", self.transport.name(), e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn transact(&mut self, command: &str) -> Result<RawResponse> {
        self.write_command(command)?;
        self.drain()
    }

    fn write_command(&mut self, command: &str) -> Result<()> {
        if self.closed {
            return Err(Error::Transport(format!("{} is closed", self.transport.name())));
        }

        let mut line = command.to_string();
        if !line.ends_with(LINE_TERMINATOR) {
            line.push(LINE_TERMINATOR);
        }
        debug!(">> {}", command.trim_end());
        self.transport.write(line.as_bytes())
    }

    fn drain(&mut self) -> Result<RawResponse> {
        sleep(self.timing.settle_delay);

        let mut buffer = BytesMut::with_capacity(DRAIN_BUFFER_SIZE);
        loop {
            let chunk = self.transport.read_available()?;
            if chunk.is_empty() {
                break;
            }
            buffer.extend_from_slice(&chunk);
            sleep(self.timing.poll_interval);
        }

        let response = RawResponse::from_bytes(&buffer);
        debug!("<< {:?}", response.as_str());
        Ok(response)
    }
}

impl<T: Transport> Drop for AdapterLink<T> {
    fn drop(&mut self) {
        self.close();
    }
}
