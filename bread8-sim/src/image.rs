//! Loading of the ROM and microcode images from disk.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{SimulationError, SimulationResult};
use crate::memory::ROM_SIZE;
use crate::sequencer::Microcode;

pub const DEFAULT_ROM: &str = "ROM.bin";
pub const DEFAULT_CTRL_LSB: &str = "CTRL_LSB.bin";
pub const DEFAULT_CTRL_MSB: &str = "CTRL_MSB.bin";

fn read_image<P>(path: P) -> SimulationResult<Vec<u8>>
    where
        P: AsRef<Path>
{
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|cause| SimulationError::ImageNotFound {
            path: path.to_path_buf(),
            cause
        })?;

    debug!("loaded `{}` ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Reads the program ROM. Images shorter than 8 KiB are fine; longer ones are clipped by
/// [`crate::memory::Memory::with_rom`].
pub fn load_rom<P>(path: P) -> SimulationResult<Vec<u8>>
    where
        P: AsRef<Path>
{
    let rom = read_image(path)?;
    if rom.len() < ROM_SIZE {
        debug!("ROM image leaves {} bytes blank", ROM_SIZE - rom.len());
    }
    Ok(rom)
}

/// Reads and decodes the two microcode byte planes.
pub fn load_microcode<P, Q>(lsb: P, msb: Q) -> SimulationResult<Microcode>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>
{
    let lsb = read_image(lsb)?;
    let msb = read_image(msb)?;
    Microcode::from_planes(&lsb, &msb)
}
