//! Uniform access to a region of ECU memory.
//!
//! Transfers only ever talk to [`MemoryBackend`]; whether the bytes come from a
//! file on disk or from a car is the backend's business.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::firmware::Region;

mod live;
mod sim;

pub use self::live::LiveBackend;
pub use self::sim::{SimulatedBackend, SIM_SIGNATURE};

pub trait MemoryBackend {
    fn read_block(&mut self, address: u32, size: usize) -> Result<Vec<u8>>;

    fn write_block(&mut self, address: u32, data: &[u8]) -> Result<()>;

    fn info(&mut self) -> Result<BackendInfo>;
}

impl<B: MemoryBackend + ?Sized> MemoryBackend for Box<B> {
    fn read_block(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        (**self).read_block(address, size)
    }

    fn write_block(&mut self, address: u32, data: &[u8]) -> Result<()> {
        (**self).write_block(address, data)
    }

    fn info(&mut self) -> Result<BackendInfo> {
        (**self).info()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendInfo {
    Simulated {
        regions: Vec<Region>,
        size: usize,
        crc32: u32,
        store: PathBuf,
    },
    Live {
        protocol: &'static str,
        warning: &'static str,
        adapter: String,
    },
}

impl fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendInfo::Simulated {
                regions,
                size,
                crc32,
                store,
            } => {
                writeln!(f, "Simulated ECU ({})", store.display())?;
                for region in regions {
                    writeln!(
                        f,
                        "  {:<8} {:#06x} +{} bytes",
                        region.name, region.start, region.size
                    )?;
                }
                write!(f, "  Size: {} bytes, CRC-32: {:#010X}", size, crc32)
            }
            BackendInfo::Live {
                protocol,
                warning,
                adapter,
            } => write!(f, "Live ECU via {} on {} ({})", protocol, adapter, warning),
        }
    }
}
