//! Directory entry records and bounded file names.

use core::str;

use crate::device::SECTOR_SIZE;

/// Directory slots in sector 0.
pub const MAX_FILES: usize = 16;

/// On-disk size of one directory entry.
pub const ENTRY_SIZE: usize = 32;

/// Name field width, including the terminating NUL.
pub const NAME_LEN: usize = 12;

/// Significant characters of a name.
pub const MAX_NAME: usize = NAME_LEN - 1;

/// A decoded, active directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// NUL-padded name as stored on disk.
    pub raw_name: [u8; NAME_LEN],
    pub start_sector: u16,
    /// Fixed logical length, decided at creation.
    pub size: u16,
    pub sector_count: u16,
}

fn le_u16(x: &[u8]) -> u16 {
    u16::from_le_bytes([x[0], x[1]])
}

/// Number of sectors backing a file of `size` bytes (at least one).
pub fn sectors_for(size: u16) -> u16 {
    let n = (size as usize).div_ceil(SECTOR_SIZE) as u16;
    n.max(1)
}

/// The significant part of a name: up to the first NUL, at most
/// [`MAX_NAME`] bytes.
pub fn bounded(name: &[u8]) -> &[u8] {
    let len = name
        .iter()
        .take(MAX_NAME)
        .position(|&b| b == 0)
        .unwrap_or(name.len().min(MAX_NAME));
    &name[..len]
}

/// Case-sensitive comparison of two bounded names.
pub fn name_eq(a: &[u8], b: &[u8]) -> bool {
    bounded(a) == bounded(b)
}

/// Copy the significant part of `src` into `dst`, NUL-padding the rest.
pub fn copy_name(dst: &mut [u8; NAME_LEN], src: &[u8]) {
    let src = bounded(src);
    dst.fill(0);
    dst[..src.len()].copy_from_slice(src);
}

impl DirEntry {
    /// Build an entry for `name`, truncating it to [`MAX_NAME`] bytes.
    pub fn new(name: &[u8], start_sector: u16, size: u16) -> Self {
        let mut raw_name = [0u8; NAME_LEN];
        copy_name(&mut raw_name, name);
        Self {
            raw_name,
            start_sector,
            size,
            sector_count: sectors_for(size),
        }
    }

    /// Parse a 32-byte record. Returns `None` for a free slot.
    pub fn parse(rec: &[u8; ENTRY_SIZE]) -> Option<Self> {
        if rec[0] == 0 {
            return None;
        }
        let mut raw_name = [0u8; NAME_LEN];
        raw_name.copy_from_slice(&rec[0..NAME_LEN]);

        Some(Self {
            raw_name,
            start_sector: le_u16(&rec[12..14]),
            size: le_u16(&rec[14..16]),
            sector_count: le_u16(&rec[16..18]),
        })
    }

    /// Encode into a 32-byte record; bytes 18..32 are zero.
    pub fn build(&self) -> [u8; ENTRY_SIZE] {
        let mut rec = [0u8; ENTRY_SIZE];
        // The name field always ends in NUL, whatever `raw_name` holds.
        let name = self.name();
        rec[..name.len()].copy_from_slice(name);
        rec[12..14].copy_from_slice(&self.start_sector.to_le_bytes());
        rec[14..16].copy_from_slice(&self.size.to_le_bytes());
        rec[16..18].copy_from_slice(&self.sector_count.to_le_bytes());
        rec
    }

    /// Significant name bytes.
    pub fn name(&self) -> &[u8] {
        bounded(&self.raw_name)
    }

    /// One past the last sector owned by this entry.
    pub fn end_sector(&self) -> u32 {
        self.start_sector as u32 + self.sector_count as u32
    }
}

/// What `list` reports for an active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    raw_name: [u8; NAME_LEN],
    pub size: u16,
    pub index: u8,
}

impl FileInfo {
    pub(crate) fn from_entry(index: usize, entry: &DirEntry) -> Self {
        let mut raw_name = [0u8; NAME_LEN];
        copy_name(&mut raw_name, &entry.raw_name);
        Self {
            raw_name,
            size: entry.size,
            index: index as u8,
        }
    }

    /// Name bytes, without the terminator.
    pub fn name_bytes(&self) -> &[u8] {
        bounded(&self.raw_name)
    }

    /// Name as text. A name cut in the middle of a UTF-8 sequence loses the
    /// partial character.
    pub fn name(&self) -> &str {
        let bytes = self.name_bytes();
        match str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}
