//! Block device abstraction.
//!
//! MicroFS sits on top of a sector-based device with 512-byte sectors and
//! 16-bit sector numbers. Sector 0 holds the volume header and directory,
//! sectors 1.. hold file data.

use crate::error::Result;

/// Bytes per sector. Every device transfer moves exactly one sector.
pub const SECTOR_SIZE: usize = 512;

/// A minimal, blocking, sector-based device.
///
/// Implementations report any failure as [`Error::Disk`](crate::Error::Disk)
/// and must not tear a sector: a completed `write_sector` is durable.
///
/// In `no_std`, you typically implement this trait for:
/// - an SD card driver
/// - a memory-mapped flash region
/// - an in-memory disk image (for tests)
pub trait BlockDevice {
    /// Bring the device up. Called by `mount` and `format`.
    fn init(&mut self) -> Result<()>;

    /// Read sector `index` into `buf`.
    fn read_sector(&self, index: u16, buf: &mut [u8; SECTOR_SIZE]) -> Result<()>;

    /// Write `buf` to sector `index`.
    fn write_sector(&mut self, index: u16, buf: &[u8; SECTOR_SIZE]) -> Result<()>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn read_sector(&self, index: u16, buf: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        (**self).read_sector(index, buf)
    }

    fn write_sector(&mut self, index: u16, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        (**self).write_sector(index, buf)
    }
}

#[cfg(test)]
use crate::error::Error;

/// In-memory block device for tests, with fault injection.
///
/// Stores a full disk image inside a `Vec<u8>` (sector-aligned) and records
/// the index of every sector written.
#[cfg(test)]
pub struct MemDevice {
    data: std::vec::Vec<u8>,
    pub writes: std::vec::Vec<u16>,
    pub fail_init: bool,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[cfg(test)]
impl MemDevice {
    pub fn new(sectors: usize) -> Self {
        Self::from_image(std::vec![0u8; sectors * SECTOR_SIZE])
    }

    pub fn from_image(data: std::vec::Vec<u8>) -> Self {
        assert!(data.len() % SECTOR_SIZE == 0);
        Self {
            data,
            writes: std::vec::Vec::new(),
            fail_init: false,
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn sector(&self, index: u16) -> &[u8] {
        let off = index as usize * SECTOR_SIZE;
        &self.data[off..off + SECTOR_SIZE]
    }

    pub fn sector_mut(&mut self, index: u16) -> &mut [u8] {
        let off = index as usize * SECTOR_SIZE;
        &mut self.data[off..off + SECTOR_SIZE]
    }

    pub fn into_inner(self) -> std::vec::Vec<u8> {
        self.data
    }
}

#[cfg(test)]
impl BlockDevice for MemDevice {
    fn init(&mut self) -> Result<()> {
        if self.fail_init {
            return Err(Error::Disk);
        }
        Ok(())
    }

    fn read_sector(&self, index: u16, buf: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        let off = index as usize * SECTOR_SIZE;
        if self.fail_reads || off + SECTOR_SIZE > self.data.len() {
            return Err(Error::Disk);
        }
        buf.copy_from_slice(&self.data[off..off + SECTOR_SIZE]);
        Ok(())
    }

    fn write_sector(&mut self, index: u16, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        let off = index as usize * SECTOR_SIZE;
        if self.fail_writes || off + SECTOR_SIZE > self.data.len() {
            return Err(Error::Disk);
        }
        self.data[off..off + SECTOR_SIZE].copy_from_slice(buf);
        self.writes.push(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_sector_is_a_disk_error() {
        let mut dev = MemDevice::new(2);
        let mut buf = [0u8; SECTOR_SIZE];
        assert_eq!(dev.read_sector(2, &mut buf), Err(Error::Disk));
        assert_eq!(dev.write_sector(2, &buf), Err(Error::Disk));
        assert!(dev.writes.is_empty());
    }

    #[test]
    fn write_then_read_sector() {
        let mut dev = MemDevice::new(4);
        let buf = [0xA5u8; SECTOR_SIZE];
        dev.write_sector(3, &buf).unwrap();

        let mut out = [0u8; SECTOR_SIZE];
        dev.read_sector(3, &mut out).unwrap();
        assert_eq!(out, buf);
        assert_eq!(dev.writes, std::vec![3]);
    }
}
