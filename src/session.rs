//! State of the single open file and the one-sector write-back cache.

use log::trace;

use crate::device::{BlockDevice, SECTOR_SIZE};
use crate::dir::DirEntry;
use crate::error::{Error, Result};

/// Buffer offset meaning "nothing loaded yet".
const EMPTY: usize = SECTOR_SIZE;

/// Direction of a byte transfer through the sector cache.
pub enum Transfer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl Transfer<'_> {
    fn len(&self) -> usize {
        match self {
            Transfer::Read(dst) => dst.len(),
            Transfer::Write(src) => src.len(),
        }
    }
}

/// The open file. Fields copied from the directory stay fixed until the next
/// open.
#[derive(Debug)]
pub struct Session {
    index: usize,
    start: u16,
    size: u16,
    pos: u16,
    /// Sector currently in the cache (meaningful once `offset != EMPTY`).
    sector: u16,
    offset: usize,
    dirty: bool,
    /// Device error hit after a partial transfer, owed to the next call.
    pending: Option<Error>,
}

impl Session {
    pub fn open(index: usize, entry: &DirEntry) -> Self {
        Self {
            index,
            start: entry.start_sector,
            size: entry.size,
            pos: 0,
            sector: entry.start_sector,
            offset: EMPTY,
            dirty: false,
            pending: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn position(&self) -> u16 {
        self.pos
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the cache back if it holds unsaved bytes.
    ///
    /// On failure the cache stays dirty so the bytes can still be flushed.
    pub fn flush<D: BlockDevice>(&mut self, dev: &mut D, cache: &[u8; SECTOR_SIZE]) -> Result<()> {
        if self.dirty {
            dev.write_sector(self.sector, cache)?;
            trace!("write-back sector {}", self.sector);
            self.dirty = false;
        }
        Ok(())
    }

    /// Make sure `cache` holds the sector under the cursor.
    fn load<D: BlockDevice>(&mut self, dev: &mut D, cache: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        // Entries come from disk; a corrupt start sector must not wrap.
        let needed = self
            .start
            .checked_add(self.pos / SECTOR_SIZE as u16)
            .ok_or(Error::Disk)?;
        if self.offset < SECTOR_SIZE && self.sector == needed {
            return Ok(());
        }
        self.flush(dev, cache)?;
        self.sector = needed;
        if let Err(e) = dev.read_sector(needed, cache) {
            self.offset = EMPTY;
            return Err(e);
        }
        trace!("load sector {}", needed);
        self.offset = self.pos as usize % SECTOR_SIZE;
        Ok(())
    }

    /// Move bytes between the caller and the file, starting at the cursor.
    ///
    /// Each step is clipped by the sector boundary, the caller's length and
    /// the file size. Returns the bytes moved; `0` means end of file. A device
    /// error after some bytes moved is held back and returned by the next
    /// call, so the count is never lost.
    pub fn transfer<D: BlockDevice>(
        &mut self,
        dev: &mut D,
        cache: &mut [u8; SECTOR_SIZE],
        mut xfer: Transfer<'_>,
    ) -> Result<usize> {
        if let Some(e) = self.pending.take() {
            return Err(e);
        }
        let len = xfer.len();
        let mut total = 0;

        while total < len && self.pos < self.size {
            if let Err(e) = self.load(dev, cache) {
                if total == 0 {
                    return Err(e);
                }
                self.pending = Some(e);
                return Ok(total);
            }

            let chunk = (SECTOR_SIZE - self.offset)
                .min(len - total)
                .min((self.size - self.pos) as usize);
            let at = self.offset..self.offset + chunk;
            match &mut xfer {
                Transfer::Read(dst) => dst[total..total + chunk].copy_from_slice(&cache[at]),
                Transfer::Write(src) => {
                    cache[at].copy_from_slice(&src[total..total + chunk]);
                    self.dirty = true;
                }
            }

            self.offset += chunk;
            self.pos += chunk as u16;
            total += chunk;
        }
        Ok(total)
    }
}
