//! The in-memory mirror of sector 0 and the bump allocator it carries.
//!
//! The mirror is the only copy of the directory the engine consults. It is
//! loaded once by `mount`, rebuilt by `format`, and written back in full after
//! every mutation. A failed write-back leaves the mirror ahead of the device.

use log::trace;

use crate::device::{BlockDevice, SECTOR_SIZE};
use crate::dir::{name_eq, sectors_for, DirEntry, ENTRY_SIZE, MAX_FILES};
use crate::error::{Error, Result};
use crate::header::{VolumeHeader, HEADER_SIZE};

/// Sector holding the header and the directory table.
pub const DIRECTORY_SECTOR: u16 = 0;

/// Bytes of a record that hold the name, start sector and size.
const ENTRY_CORE: usize = 16;

fn entry_offset(index: usize) -> usize {
    HEADER_SIZE + index * ENTRY_SIZE
}

/// Byte range of slot `index` inside sector 0.
///
/// 16 + 16 * 32 overruns the sector by 16 bytes, so the last slot only keeps
/// its first [`ENTRY_CORE`] bytes; its `sector_count` is never stored.
fn entry_range(index: usize) -> core::ops::Range<usize> {
    let off = entry_offset(index);
    off..(off + ENTRY_SIZE).min(SECTOR_SIZE)
}

/// Raw sector 0 with typed accessors over the documented layout.
pub struct Directory {
    sector: [u8; SECTOR_SIZE],
}

impl Directory {
    pub const fn new() -> Self {
        Self {
            sector: [0; SECTOR_SIZE],
        }
    }

    /// Read sector 0 from `dev` and validate the header.
    pub fn load<D: BlockDevice>(&mut self, dev: &D) -> Result<VolumeHeader> {
        dev.read_sector(DIRECTORY_SECTOR, &mut self.sector)?;
        VolumeHeader::parse(&self.sector)
    }

    /// Write the whole mirror to sector 0.
    pub fn store<D: BlockDevice>(&self, dev: &mut D) -> Result<()> {
        dev.write_sector(DIRECTORY_SECTOR, &self.sector)?;
        trace!("directory persisted");
        Ok(())
    }

    /// Reset the mirror to an empty, formatted volume (memory only).
    pub fn reset(&mut self) {
        self.sector.fill(0);
        VolumeHeader::empty().write(&mut self.sector);
    }

    pub fn next_free_sector(&self) -> u16 {
        VolumeHeader::read_next_free(&self.sector)
    }

    /// Entry at `index`, or `None` if the slot is free or out of range.
    pub fn entry(&self, index: usize) -> Option<DirEntry> {
        if index >= MAX_FILES {
            return None;
        }
        let range = entry_range(index);
        let stored = range.len();
        let mut rec = [0u8; ENTRY_SIZE];
        rec[..stored].copy_from_slice(&self.sector[range]);
        let mut entry = DirEntry::parse(&rec)?;
        if stored == ENTRY_CORE {
            entry.sector_count = sectors_for(entry.size);
        }
        Some(entry)
    }

    pub fn put_entry(&mut self, index: usize, entry: &DirEntry) {
        let range = entry_range(index);
        let stored = range.len();
        self.sector[range].copy_from_slice(&entry.build()[..stored]);
    }

    /// Mark the slot free. Only the first name byte changes; the sector range
    /// stays allocated.
    pub fn tombstone(&mut self, index: usize) {
        self.sector[entry_offset(index)] = 0;
    }

    /// Slot of the active entry called `name`.
    pub fn find(&self, name: &[u8]) -> Option<usize> {
        (0..MAX_FILES).find(|&i| {
            self.entry(i)
                .is_some_and(|e| name_eq(&e.raw_name, name))
        })
    }

    /// Pick the slot for a new file called `name`.
    ///
    /// The whole table is scanned before deciding, so a duplicate name is
    /// reported as `AlreadyExists` even when the table is full.
    pub fn free_slot_for(&self, name: &[u8]) -> Result<usize> {
        let mut slot = None;
        for i in 0..MAX_FILES {
            match self.entry(i) {
                None => {
                    if slot.is_none() {
                        slot = Some(i);
                    }
                }
                Some(e) if name_eq(&e.raw_name, name) => return Err(Error::AlreadyExists),
                Some(_) => {}
            }
        }
        slot.ok_or(Error::Full)
    }

    /// Carve `count` sectors off the cursor and return the first one.
    ///
    /// The cursor only moves forward. Nothing is changed on error.
    pub fn allocate(&mut self, count: u16) -> Result<u16> {
        let start = self.next_free_sector();
        let next = start.checked_add(count).ok_or(Error::NoSpace)?;
        VolumeHeader::write_next_free(&mut self.sector, next);
        Ok(start)
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;
    use crate::header::FIRST_DATA_SECTOR;

    fn formatted() -> Directory {
        let mut dir = Directory::new();
        dir.reset();
        dir
    }

    #[test]
    fn reset_yields_empty_table_and_cursor_one() {
        let dir = formatted();
        assert_eq!(dir.next_free_sector(), FIRST_DATA_SECTOR);
        assert!((0..MAX_FILES).all(|i| dir.entry(i).is_none()));
        assert!(dir.entry(MAX_FILES).is_none());
    }

    #[test]
    fn entries_are_packed_after_header() {
        let mut dir = formatted();
        dir.put_entry(0, &DirEntry::new(b"FIRST", 1, 1));
        assert_eq!(&dir.sector[16..21], b"FIRST");
        dir.put_entry(14, &DirEntry::new(b"PENULT", 2, 600));
        assert_eq!(&dir.sector[16 + 14 * 32..16 + 14 * 32 + 6], b"PENULT");
        assert_eq!(&dir.sector[16 + 14 * 32 + 16..16 + 14 * 32 + 18], &[2, 0]);
    }

    #[test]
    fn last_slot_is_clipped_to_sector_end() {
        let mut dir = formatted();
        let entry = DirEntry::new(b"LAST.BIN", 9, 1500);
        dir.put_entry(15, &entry);

        assert_eq!(entry_range(15), 496..SECTOR_SIZE);
        assert_eq!(&dir.sector[496..504], b"LAST.BIN");
        assert_eq!(&dir.sector[508..510], &9u16.to_le_bytes());
        assert_eq!(&dir.sector[510..512], &1500u16.to_le_bytes());
        // Sector count is derived from the size.
        assert_eq!(dir.entry(15), Some(entry));
        assert_eq!(dir.entry(15).unwrap().sector_count, 3);
        assert_eq!(dir.find(b"LAST.BIN"), Some(15));

        dir.tombstone(15);
        assert_eq!(dir.entry(15), None);
    }

    #[test]
    fn allocate_bumps_cursor() {
        let mut dir = formatted();
        assert_eq!(dir.allocate(1), Ok(1));
        assert_eq!(dir.allocate(2), Ok(2));
        assert_eq!(dir.allocate(3), Ok(4));
        assert_eq!(dir.next_free_sector(), 7);
    }

    #[test]
    fn allocate_refuses_to_wrap() {
        let mut dir = formatted();
        VolumeHeader::write_next_free(&mut dir.sector, u16::MAX - 1);
        assert_eq!(dir.allocate(2), Err(Error::NoSpace));
        assert_eq!(dir.next_free_sector(), u16::MAX - 1);
        assert_eq!(dir.allocate(1), Ok(u16::MAX - 1));
    }

    #[test]
    fn duplicate_wins_over_full() {
        let mut dir = formatted();
        for i in 0..MAX_FILES {
            let name = [b'A' + i as u8];
            dir.put_entry(i, &DirEntry::new(&name, 1, 1));
        }
        assert_eq!(dir.free_slot_for(b"P"), Err(Error::AlreadyExists));
        assert_eq!(dir.free_slot_for(b"Z"), Err(Error::Full));
    }

    #[test]
    fn first_free_slot_is_reused_after_tombstone() {
        let mut dir = formatted();
        dir.put_entry(0, &DirEntry::new(b"A", 1, 1));
        dir.put_entry(1, &DirEntry::new(b"B", 2, 1));
        dir.tombstone(0);
        assert_eq!(dir.find(b"A"), None);
        assert_eq!(dir.find(b"B"), Some(1));
        assert_eq!(dir.free_slot_for(b"C"), Ok(0));
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut dev = MemDevice::new(4);
        let mut dir = formatted();
        dir.put_entry(2, &DirEntry::new(b"KEEP.ME", 1, 100));
        dir.allocate(1).unwrap();
        dir.store(&mut dev).unwrap();

        let mut back = Directory::new();
        let header = back.load(&dev).unwrap();
        assert_eq!(header.next_free_sector, 2);
        assert_eq!(back.find(b"KEEP.ME"), Some(2));
    }

    #[test]
    fn load_of_blank_disk_is_no_filesystem() {
        let dev = MemDevice::new(1);
        let mut dir = Directory::new();
        assert_eq!(dir.load(&dev), Err(Error::NoFilesystem));
    }
}
