use std::path::PathBuf;

use serde::Serialize;

use crate::backend::BackendInfo;
use crate::error::{Error, Result};

/// A named, fixed-size window of ECU memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub name: &'static str,
    pub start: u32,
    pub size: usize,
}

/// Program flash of the reference (Januar 7.2 class) ECU.
pub const FLASH: Region = Region {
    name: "FLASH",
    start: 0x0000,
    size: 64 * 1024,
};

pub const REGIONS: [Region; 1] = [FLASH];

impl Region {
    pub const fn new(name: &'static str, start: u32, size: usize) -> Self {
        Self { name, start, size }
    }

    pub fn contains(&self, address: u32, length: usize) -> bool {
        self.offset_of(address, length).is_ok()
    }

    /// Maps an absolute address to an offset inside the region, checking that
    /// `length` bytes from there stay inside it.
    pub fn offset_of(&self, address: u32, length: usize) -> Result<usize> {
        let out_of_range = || Error::OutOfRange {
            address,
            length,
            limit: self.size,
        };

        let offset = address.checked_sub(self.start).ok_or_else(out_of_range)? as usize;
        match offset.checked_add(length) {
            Some(end) if end <= self.size => Ok(offset),
            _ => Err(out_of_range()),
        }
    }

    /// Absolute address of `offset` bytes into the region.
    pub fn address_at(&self, offset: usize) -> Result<u32> {
        u32::try_from(offset)
            .ok()
            .and_then(|offset| self.start.checked_add(offset))
            .ok_or(Error::OutOfRange {
                address: self.start,
                length: offset,
                limit: self.size,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Dump,
    Flash,
}

/// Summary of a completed dump or flash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub direction: Direction,
    pub bytes_moved: usize,
    /// Dump destination or flash source.
    pub path: PathBuf,
    pub backend_info: BackendInfo,
}
