use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::{LiveBackend, MemoryBackend, SimulatedBackend};
use crate::error::{Error, Result};
use crate::firmware::{
    dump_region, flash_region, Region, TransferResult, DEFAULT_CHUNK_SIZE, FLASH,
};
use crate::protocols::elm::{AdapterLink, LinkTiming, SerialTransport};
use crate::protocols::kwp::{DEFAULT_HEADER, DEFAULT_SESSION_LEVEL, MAX_READ_SIZE};

#[derive(Debug, Clone)]
pub struct EcuConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub timing: LinkTiming,
    pub header: String,
    pub session_level: u8,
    pub developer_mode: bool,
    pub chunk_size: usize,
    pub store: PathBuf,
    pub region: Region,
}

impl Default for EcuConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 38400,
            read_timeout: Duration::from_secs(1),
            timing: LinkTiming::default(),
            header: DEFAULT_HEADER.to_string(),
            session_level: DEFAULT_SESSION_LEVEL,
            developer_mode: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            store: PathBuf::from("logs/sim_ecu.bin"),
            region: FLASH,
        }
    }
}

impl EcuConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_timing(mut self, timing: LinkTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_session_level(mut self, level: u8) -> Self {
        self.session_level = level;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_store(mut self, store: impl Into<PathBuf>) -> Self {
        self.store = store.into();
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Unlocks the live write path. Writes still fail with NotImplemented,
    /// but the permission check passes.
    pub fn developer_mode(mut self) -> Self {
        self.developer_mode = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::Configuration("baud rate must be non-zero".into()));
        }

        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk size must be non-zero".into()));
        }

        if self.region.size == 0 {
            return Err(Error::Configuration(format!(
                "region {} has zero size",
                self.region.name
            )));
        }

        let header_ok = {
            let bytes: Vec<&str> = self.header.split_whitespace().collect();
            bytes.len() == 3
                && bytes
                    .iter()
                    .all(|b| b.len() == 2 && b.bytes().all(|c| c.is_ascii_hexdigit()))
        };
        if !header_ok {
            return Err(Error::Configuration(format!(
                "header must be three hex bytes, got {:?}",
                self.header
            )));
        }

        Ok(())
    }

    pub fn open_simulated(&self) -> Result<SimulatedBackend> {
        self.validate()?;
        SimulatedBackend::with_region(&self.store, self.region)
    }

    /// Opens the serial port and probes the ECU. Only a failure to open the
    /// port is an error; an ECU that does not answer is reported later.
    pub fn open_live(&self) -> Result<LiveBackend<SerialTransport>> {
        self.validate()?;
        if self.port.is_empty() {
            return Err(Error::Configuration("serial port must be specified".into()));
        }
        if self.chunk_size > MAX_READ_SIZE {
            return Err(Error::Configuration(format!(
                "chunk size {} exceeds the live read limit of {} bytes",
                self.chunk_size, MAX_READ_SIZE
            )));
        }

        let transport = SerialTransport::open(&self.port, self.baud_rate, self.read_timeout)?;
        let link = AdapterLink::with_timing(transport, self.timing);
        Ok(LiveBackend::with_options(
            link,
            self.developer_mode,
            &self.header,
            self.session_level,
        ))
    }

    /// Dumps the configured region in `chunk_size` pieces.
    pub fn dump<B>(&self, backend: &mut B, destination: impl AsRef<Path>) -> Result<TransferResult>
    where
        B: MemoryBackend + ?Sized,
    {
        dump_region(backend, &self.region, destination, self.chunk_size)
    }

    /// Flashes `source` over the configured region in `chunk_size` pieces.
    pub fn flash<B>(&self, backend: &mut B, source: impl AsRef<Path>) -> Result<TransferResult>
    where
        B: MemoryBackend + ?Sized,
    {
        flash_region(backend, &self.region, source, self.chunk_size)
    }
}
