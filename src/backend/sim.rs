use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{BackendInfo, MemoryBackend};
use crate::error::{Error, Result};
use crate::firmware::{Region, FLASH, REGIONS};

/// Stamped at offset 0 of a freshly created store.
pub const SIM_SIGNATURE: &[u8; 8] = b"SIM-J72\0";
const ERASED: u8 = 0xFF;

/// ECU simulator backed by a flat binary file.
///
/// Every write reads the whole file, patches it and writes it back, so two
/// backends sharing one store file can overwrite each other's changes.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    store: PathBuf,
    region: Region,
}

impl SimulatedBackend {
    pub fn open(store: impl Into<PathBuf>) -> Result<Self> {
        Self::with_region(store, FLASH)
    }

    /// Opens `store`, creating an erased image of `region.size` bytes if it
    /// does not exist yet.
    pub fn with_region(store: impl Into<PathBuf>, region: Region) -> Result<Self> {
        if region.size == 0 {
            return Err(Error::Configuration(format!(
                "region {} has zero size",
                region.name
            )));
        }

        let store = store.into();
        if !store.exists() {
            if let Some(dir) = store.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let mut image = vec![ERASED; region.size];
            let stamp = SIM_SIGNATURE.len().min(region.size);
            image[..stamp].copy_from_slice(&SIM_SIGNATURE[..stamp]);
            fs::write(&store, &image)?;
            info!("Created simulated store {} ({} bytes)", store.display(), region.size);
        }

        Ok(Self { store, region })
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn crc32(&self) -> Result<u32> {
        Ok(crc32fast::hash(&self.load()?))
    }

    fn load(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.store)?)
    }

    /// Byte range of `length` bytes at `address` within a store of
    /// `store_len` bytes.
    fn span(&self, address: u32, length: usize, store_len: usize) -> Result<Range<usize>> {
        let out_of_range = || Error::OutOfRange {
            address,
            length,
            limit: store_len,
        };
        let start = address.checked_sub(self.region.start).ok_or_else(out_of_range)? as usize;
        match start.checked_add(length) {
            Some(end) if end <= store_len => Ok(start..end),
            _ => Err(out_of_range()),
        }
    }
}

impl MemoryBackend for SimulatedBackend {
    fn read_block(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        let data = self.load()?;
        let span = self.span(address, size, data.len())?;
        Ok(data[span].to_vec())
    }

    fn write_block(&mut self, address: u32, chunk: &[u8]) -> Result<()> {
        let mut data = self.load()?;
        let span = self.span(address, chunk.len(), data.len())?;
        data[span].copy_from_slice(chunk);
        fs::write(&self.store, &data)?;
        debug!("Wrote {} bytes at {:#06x}", chunk.len(), address);
        Ok(())
    }

    fn info(&mut self) -> Result<BackendInfo> {
        let data = self.load()?;
        Ok(BackendInfo::Simulated {
            regions: if self.region == FLASH {
                REGIONS.to_vec()
            } else {
                vec![self.region]
            },
            size: data.len(),
            crc32: crc32fast::hash(&data),
            store: self.store.clone(),
        })
    }
}
