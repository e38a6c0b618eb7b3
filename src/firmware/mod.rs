use std::path::Path;

use log::{debug, error, info};

use crate::backend::MemoryBackend;
use crate::error::{Error, Result};

mod image;
pub mod tune;
mod types;

pub use image::{load_image, write_atomic};
pub use types::*;

pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Reads the whole [`FLASH`] region into `destination`.
pub fn dump<B>(
    backend: &mut B,
    destination: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<TransferResult>
where
    B: MemoryBackend + ?Sized,
{
    dump_region(backend, &FLASH, destination, chunk_size)
}

/// Writes the image at `source` over the whole [`FLASH`] region.
pub fn flash<B>(
    backend: &mut B,
    source: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<TransferResult>
where
    B: MemoryBackend + ?Sized,
{
    flash_region(backend, &FLASH, source, chunk_size)
}

/// Reads `region` start to end in `chunk_size` pieces. The destination is only
/// written once every chunk has been read.
pub fn dump_region<B>(
    backend: &mut B,
    region: &Region,
    destination: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<TransferResult>
where
    B: MemoryBackend + ?Sized,
{
    let destination = destination.as_ref();
    if chunk_size == 0 {
        return Err(Error::InvalidBlockSize(chunk_size));
    }

    info!(
        "Dumping {} ({} bytes) to {}",
        region.name,
        region.size,
        destination.display()
    );

    let mut image = Vec::with_capacity(region.size);
    while image.len() < region.size {
        let size = chunk_size.min(region.size - image.len());
        let address = region.address_at(image.len())?;

        let block = backend.read_block(address, size).map_err(|e| {
            error!("Dump aborted at {:#06x}: {}", address, e);
            e
        })?;
        if block.len() != size {
            error!("Dump aborted at {:#06x}: short block", address);
            return Err(Error::SizeMismatch {
                expected: size,
                actual: block.len(),
            });
        }

        image.extend_from_slice(&block);
        debug!("Read {:#06x}: {}/{} bytes", address, image.len(), region.size);
    }

    let backend_info = backend.info()?;
    write_atomic(destination, &image)?;
    info!("Dump complete: {} bytes", image.len());

    Ok(TransferResult {
        direction: Direction::Dump,
        bytes_moved: image.len(),
        path: destination.to_path_buf(),
        backend_info,
    })
}

/// Loads the image at `source` and writes it over `region`.
pub fn flash_region<B>(
    backend: &mut B,
    region: &Region,
    source: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<TransferResult>
where
    B: MemoryBackend + ?Sized,
{
    let source = source.as_ref();
    let image = load_image(source, region)?;
    let bytes_moved = flash_image(backend, region, &image, chunk_size)?;

    Ok(TransferResult {
        direction: Direction::Flash,
        bytes_moved,
        path: source.to_path_buf(),
        backend_info: backend.info()?,
    })
}

/// Writes `image` chunk by chunk in increasing address order.
///
/// The image must cover the region exactly; this is checked before the first
/// write. A failing chunk aborts the flash and leaves earlier chunks written.
pub fn flash_image<B>(
    backend: &mut B,
    region: &Region,
    image: &[u8],
    chunk_size: usize,
) -> Result<usize>
where
    B: MemoryBackend + ?Sized,
{
    if image.len() != region.size {
        return Err(Error::SizeMismatch {
            expected: region.size,
            actual: image.len(),
        });
    }
    if chunk_size == 0 {
        return Err(Error::InvalidBlockSize(chunk_size));
    }

    info!("Flashing {} bytes to {}", image.len(), region.name);

    let total_chunks = image.len().div_ceil(chunk_size);
    let mut written = 0;
    for (i, chunk) in image.chunks(chunk_size).enumerate() {
        let address = region.address_at(written)?;
        backend.write_block(address, chunk).map_err(|e| {
            error!(
                "Flash aborted at {:#06x} after {} bytes: {}",
                address, written, e
            );
            e
        })?;
        written += chunk.len();
        debug!("Progress: {}%", ((i + 1) * 100) / total_chunks);
    }

    info!("Flash complete: {} bytes", written);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendInfo;
    use pretty_assertions::assert_eq;

    /// In-memory backend that records every call.
    struct RecordingBackend {
        memory: Vec<u8>,
        reads: Vec<(u32, usize)>,
        writes: Vec<(u32, usize)>,
        fail_at: Option<u32>,
        short_reads: bool,
        info_fails: bool,
    }

    impl RecordingBackend {
        fn new(size: usize) -> Self {
            Self {
                memory: (0..size).map(|i| i as u8).collect(),
                reads: Vec::new(),
                writes: Vec::new(),
                fail_at: None,
                short_reads: false,
                info_fails: false,
            }
        }
    }

    impl MemoryBackend for RecordingBackend {
        fn read_block(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
            self.reads.push((address, size));
            if self.fail_at == Some(address) {
                return Err(Error::Transport("unplugged".to_string()));
            }
            let start = address as usize;
            let size = if self.short_reads { size - 1 } else { size };
            Ok(self.memory[start..start + size].to_vec())
        }

        fn write_block(&mut self, address: u32, data: &[u8]) -> Result<()> {
            self.writes.push((address, data.len()));
            if self.fail_at == Some(address) {
                return Err(Error::Transport("unplugged".to_string()));
            }
            let start = address as usize;
            self.memory[start..start + data.len()].copy_from_slice(data);
            Ok(())
        }

        fn info(&mut self) -> Result<BackendInfo> {
            if self.info_fails {
                return Err(Error::Transport("unplugged".to_string()));
            }
            Ok(BackendInfo::Live {
                protocol: "test",
                warning: "",
                adapter: "recording".to_string(),
            })
        }
    }

    const SMALL: Region = Region::new("SMALL", 0, 1000);

    #[test]
    fn dump_clips_last_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dump.bin");
        let mut backend = RecordingBackend::new(SMALL.size);

        let result = dump_region(&mut backend, &SMALL, &out, 256).unwrap();
        assert_eq!(result.bytes_moved, 1000);
        assert_eq!(result.direction, Direction::Dump);
        assert_eq!(
            backend.reads,
            vec![(0, 256), (256, 256), (512, 256), (768, 232)]
        );
        assert_eq!(std::fs::read(&out).unwrap(), backend.memory);
    }

    #[test]
    fn dump_without_backend_info_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dump.bin");
        let mut backend = RecordingBackend::new(SMALL.size);
        backend.info_fails = true;

        assert!(matches!(
            dump_region(&mut backend, &SMALL, &out, 256),
            Err(Error::Transport(_))
        ));
        assert_eq!(backend.reads.len(), 4);
        assert!(!out.exists());
    }

    #[test]
    fn failed_dump_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dump.bin");
        let mut backend = RecordingBackend::new(SMALL.size);
        backend.fail_at = Some(512);

        assert!(dump_region(&mut backend, &SMALL, &out, 256).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn short_block_aborts_dump() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dump.bin");
        let mut backend = RecordingBackend::new(SMALL.size);
        backend.short_reads = true;

        assert!(matches!(
            dump_region(&mut backend, &SMALL, &out, 100),
            Err(Error::SizeMismatch { expected: 100, actual: 99 })
        ));
        assert!(!out.exists());
    }

    #[test]
    fn zero_chunk_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = RecordingBackend::new(SMALL.size);

        assert!(dump_region(&mut backend, &SMALL, dir.path().join("x"), 0).is_err());
        assert!(flash_image(&mut backend, &SMALL, &[0; 1000], 0).is_err());
        assert!(backend.reads.is_empty() && backend.writes.is_empty());
    }

    #[test]
    fn flash_writes_in_address_order() {
        let mut backend = RecordingBackend::new(SMALL.size);
        let image = vec![0xA5; SMALL.size];

        assert_eq!(flash_image(&mut backend, &SMALL, &image, 400).unwrap(), 1000);
        assert_eq!(backend.writes, vec![(0, 400), (400, 400), (800, 200)]);
        assert_eq!(backend.memory, image);
    }

    #[test]
    fn flash_size_mismatch_touches_nothing() {
        let mut backend = RecordingBackend::new(SMALL.size);
        let before = backend.memory.clone();

        for len in [0, 999, 1001] {
            assert!(matches!(
                flash_image(&mut backend, &SMALL, &vec![0; len], 256),
                Err(Error::SizeMismatch { expected: 1000, .. })
            ));
        }
        assert!(backend.writes.is_empty());
        assert_eq!(backend.memory, before);
    }

    #[test]
    fn flash_failure_leaves_partial_write() {
        let mut backend = RecordingBackend::new(SMALL.size);
        backend.fail_at = Some(512);

        assert!(flash_image(&mut backend, &SMALL, &[0u8; 1000], 256).is_err());
        assert_eq!(backend.writes, vec![(0, 256), (256, 256), (512, 256)]);
        assert!(backend.memory[..512].iter().all(|&b| b == 0));
        assert_eq!(backend.memory[513], 1);
    }
}
