//! Demonstration tuning parameters stored inside a firmware image.
//!
//! The offsets are placeholders for the simulator image; a real calibration
//! needs its own map.

use serde::Serialize;

use crate::error::{Error, Result};

pub const RPM_LIMIT_OFFSET: usize = 0x0100;
pub const MIX_TABLE_OFFSET: usize = 0x0200;
pub const MIX_TABLE_LEN: usize = 8;
pub const POPS_FLAG_OFFSET: usize = 0x0300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TuneParams {
    pub rpm_limit: u16,
    pub mixture: [u8; MIX_TABLE_LEN],
    pub pops: u8,
}

impl TuneParams {
    /// Defaults for an image that holds no sensible values.
    pub fn blank() -> Self {
        Self {
            rpm_limit: 6000,
            mixture: [128; MIX_TABLE_LEN],
            pops: 0,
        }
    }

    /// Mixture table from any number of points, zero-padded or truncated.
    pub fn with_mixture(mut self, points: &[u8]) -> Self {
        self.mixture = [0; MIX_TABLE_LEN];
        let n = points.len().min(MIX_TABLE_LEN);
        self.mixture[..n].copy_from_slice(&points[..n]);
        self
    }

    pub fn read(image: &[u8]) -> Result<Self> {
        check_len(image.len())?;

        let rpm_limit =
            u16::from_le_bytes([image[RPM_LIMIT_OFFSET], image[RPM_LIMIT_OFFSET + 1]]);
        let mut mixture = [0; MIX_TABLE_LEN];
        mixture.copy_from_slice(&image[MIX_TABLE_OFFSET..MIX_TABLE_OFFSET + MIX_TABLE_LEN]);

        Ok(Self {
            rpm_limit,
            mixture,
            pops: image[POPS_FLAG_OFFSET],
        })
    }

    pub fn write(&self, image: &mut [u8]) -> Result<()> {
        check_len(image.len())?;

        image[RPM_LIMIT_OFFSET..RPM_LIMIT_OFFSET + 2].copy_from_slice(&self.rpm_limit.to_le_bytes());
        image[MIX_TABLE_OFFSET..MIX_TABLE_OFFSET + MIX_TABLE_LEN].copy_from_slice(&self.mixture);
        image[POPS_FLAG_OFFSET] = self.pops;
        Ok(())
    }
}

fn check_len(len: usize) -> Result<()> {
    if len <= POPS_FLAG_OFFSET {
        return Err(Error::OutOfRange {
            address: POPS_FLAG_OFFSET as u32,
            length: 1,
            limit: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut image = vec![0xFF; 0x400];
        let params = TuneParams::blank().with_mixture(&[10, 20, 30]);
        params.write(&mut image).unwrap();

        assert_eq!(&image[0x100..0x102], &[0x70, 0x17]);
        let back = TuneParams::read(&image).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.mixture, [10, 20, 30, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn erased_image_reads_all_ones() {
        let params = TuneParams::read(&[0xFF; 0x400]).unwrap();
        assert_eq!(params.rpm_limit, 0xFFFF);
        assert_eq!(params.pops, 0xFF);
    }

    #[test]
    fn truncates_long_mixture() {
        let params = TuneParams::blank().with_mixture(&[1; 12]);
        assert_eq!(params.mixture, [1; MIX_TABLE_LEN]);
    }

    #[test]
    fn short_image_rejected() {
        assert!(TuneParams::read(&[0; 0x300]).is_err());
        assert!(TuneParams::blank().write(&mut [0; 16]).is_err());
    }
}
