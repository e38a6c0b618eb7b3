use std::fs;
use std::io::Write;
use std::path::Path;

use ihex::Record;
use log::debug;
use tempfile::NamedTempFile;

use super::Region;
use crate::error::Result;

const GAP_FILL: u8 = 0xFF;

/// Reads a firmware image for `region`.
///
/// `.hex`/`.ihex` files are decoded as Intel HEX onto an erased buffer of
/// exactly `region.size` bytes. Anything else is taken as a raw binary and
/// returned as-is; its length is checked by the flash itself.
pub fn load_image(path: &Path, region: &Region) -> Result<Vec<u8>> {
    let is_hex = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hex") || ext.eq_ignore_ascii_case("ihex"));

    if is_hex {
        debug!("Loading Intel HEX image {}", path.display());
        decode_intel_hex(&fs::read_to_string(path)?, region)
    } else {
        Ok(fs::read(path)?)
    }
}

fn decode_intel_hex(text: &str, region: &Region) -> Result<Vec<u8>> {
    let mut image = vec![GAP_FILL; region.size];
    let mut base: u32 = 0;

    for record in ihex::Reader::new(text) {
        match record? {
            Record::Data { offset, value } => {
                let address = base.wrapping_add(offset as u32);
                let start = region.offset_of(address, value.len())?;
                image[start..start + value.len()].copy_from_slice(&value);
            }
            Record::ExtendedLinearAddress(upper) => base = (upper as u32) << 16,
            Record::ExtendedSegmentAddress(segment) => base = (segment as u32) << 4,
            Record::EndOfFile => break,
            _ => {}
        }
    }

    Ok(image)
}

/// Writes `data` to a temporary file beside `path` and renames it into place,
/// creating parent directories as needed.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
