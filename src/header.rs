//! Volume header (first 16 bytes of sector 0).

use crate::device::SECTOR_SIZE;
use crate::error::{Error, Result};

/// Signature at offset 0 of a formatted volume ("FM").
pub const MAGIC: [u8; 2] = *b"FM";

/// Bytes reserved for the header before the first directory entry.
pub const HEADER_SIZE: usize = 16;

/// First sector handed out by a freshly formatted volume.
pub const FIRST_DATA_SECTOR: u16 = 1;

const MAGIC_OFF: usize = 0;
const NEXT_FREE_OFF: usize = 6;

/// Parsed header fields. Offsets 2..6 and 8..16 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeHeader {
    /// Bump-allocation cursor: the first sector no file owns yet.
    pub next_free_sector: u16,
}

fn le_u16(x: &[u8]) -> u16 {
    u16::from_le_bytes([x[0], x[1]])
}

impl VolumeHeader {
    /// Header of an empty volume.
    pub const fn empty() -> Self {
        Self {
            next_free_sector: FIRST_DATA_SECTOR,
        }
    }

    /// Parse and validate the header of a raw sector 0.
    ///
    /// Besides the signature, a cursor of 0 is also rejected as
    /// `NoFilesystem`. That is stricter than a signature-only check: such a
    /// volume would hand sector 0 out as file data.
    pub fn parse(sector: &[u8; SECTOR_SIZE]) -> Result<Self> {
        if sector[MAGIC_OFF..MAGIC_OFF + 2] != MAGIC {
            return Err(Error::NoFilesystem);
        }
        let next_free_sector = le_u16(&sector[NEXT_FREE_OFF..NEXT_FREE_OFF + 2]);
        // Sector 0 can never be allocated.
        if next_free_sector < FIRST_DATA_SECTOR {
            return Err(Error::NoFilesystem);
        }
        Ok(Self { next_free_sector })
    }

    /// Read the cursor without validating the signature.
    pub(crate) fn read_next_free(sector: &[u8; SECTOR_SIZE]) -> u16 {
        le_u16(&sector[NEXT_FREE_OFF..NEXT_FREE_OFF + 2])
    }

    pub(crate) fn write_next_free(sector: &mut [u8; SECTOR_SIZE], next: u16) {
        sector[NEXT_FREE_OFF..NEXT_FREE_OFF + 2].copy_from_slice(&next.to_le_bytes());
    }

    /// Encode into the first [`HEADER_SIZE`] bytes of `sector`, zeroing the
    /// reserved bytes.
    pub fn write(&self, sector: &mut [u8; SECTOR_SIZE]) {
        sector[..HEADER_SIZE].fill(0);
        sector[MAGIC_OFF..MAGIC_OFF + 2].copy_from_slice(&MAGIC);
        Self::write_next_free(sector, self.next_free_sector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_header_layout_is_byte_exact() {
        let mut sector = [0xFFu8; SECTOR_SIZE];
        VolumeHeader::empty().write(&mut sector);

        assert_eq!(&sector[..8], &[0x46, 0x4D, 0, 0, 0, 0, 1, 0]);
        assert!(sector[8..HEADER_SIZE].iter().all(|&b| b == 0));
        // Directory area untouched.
        assert_eq!(sector[HEADER_SIZE], 0xFF);
    }

    #[test]
    fn parse_rejects_missing_signature() {
        let sector = [0u8; SECTOR_SIZE];
        assert_eq!(VolumeHeader::parse(&sector), Err(Error::NoFilesystem));

        let mut swapped = [0u8; SECTOR_SIZE];
        swapped[0] = 0x4D;
        swapped[1] = 0x46;
        swapped[6] = 1;
        assert_eq!(VolumeHeader::parse(&swapped), Err(Error::NoFilesystem));
    }

    #[test]
    fn parse_reads_little_endian_cursor() {
        let mut sector = [0u8; SECTOR_SIZE];
        VolumeHeader {
            next_free_sector: 0x0102,
        }
        .write(&mut sector);
        assert_eq!(sector[6], 0x02);
        assert_eq!(sector[7], 0x01);
        assert_eq!(VolumeHeader::parse(&sector).unwrap().next_free_sector, 0x0102);
    }

    #[test]
    fn parse_rejects_cursor_pointing_at_directory() {
        let mut sector = [0u8; SECTOR_SIZE];
        VolumeHeader { next_free_sector: 0 }.write(&mut sector);
        assert_eq!(VolumeHeader::parse(&sector), Err(Error::NoFilesystem));
    }
}
