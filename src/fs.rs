//! MicroFS high-level filesystem API.

use log::{debug, warn};

use crate::device::{BlockDevice, SECTOR_SIZE};
use crate::dir::{bounded, sectors_for, DirEntry, FileInfo, MAX_FILES};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::session::{Session, Transfer};

/// MicroFS filesystem handle.
///
/// Owns the device, the directory mirror, the single sector cache and the
/// open-file session. At most one file is open at a time; opening, creating
/// or deleting a file closes (and flushes) the current one first.
pub struct MicroFs<D: BlockDevice> {
    dev: D,
    dir: Directory,
    cache: [u8; SECTOR_SIZE],
    session: Option<Session>,
    mounted: bool,
}

impl<D: BlockDevice> MicroFs<D> {
    /// Wrap a device. Nothing is read until [`mount`](Self::mount) or
    /// [`format`](Self::format).
    pub const fn new(dev: D) -> Self {
        Self {
            dev,
            dir: Directory::new(),
            cache: [0; SECTOR_SIZE],
            session: None,
            mounted: false,
        }
    }

    /// Initialize the device and load the directory from sector 0.
    pub fn mount(&mut self) -> Result<()> {
        self.discard_session();
        self.mounted = false;
        self.dev.init()?;
        let header = self.dir.load(&self.dev)?;
        self.mounted = true;
        debug!("mounted, next free sector {}", header.next_free_sector);
        Ok(())
    }

    /// Write an empty directory to sector 0. Data sectors are left as they are.
    pub fn format(&mut self) -> Result<()> {
        self.discard_session();
        self.mounted = false;
        self.dev.init()?;
        self.dir.reset();
        self.dir.store(&mut self.dev)?;
        self.mounted = true;
        debug!("formatted");
        Ok(())
    }

    /// Create a file of fixed `size` bytes and open it.
    ///
    /// The file gets the next `max(1, ceil(size / 512))` sectors, which are
    /// zero-filled on the device.
    pub fn create(&mut self, name: &str, size: u16) -> Result<()> {
        self.close_for_switch();
        self.ensure_mounted()?;
        let name = name.as_bytes();
        if bounded(name).is_empty() {
            return Err(Error::InvalidName);
        }

        let slot = self.dir.free_slot_for(name)?;
        let start = self.dir.allocate(sectors_for(size))?;
        let entry = DirEntry::new(name, start, size);
        self.dir.put_entry(slot, &entry);
        self.dir.store(&mut self.dev)?;
        debug!(
            "created slot {} sectors {}..{} ({} bytes)",
            slot,
            start,
            entry.end_sector(),
            size
        );

        self.cache.fill(0);
        for sector in start..start + entry.sector_count {
            self.dev.write_sector(sector, &self.cache)?;
        }

        self.session = Some(Session::open(slot, &entry));
        Ok(())
    }

    /// Open an existing file with the cursor at 0.
    pub fn open(&mut self, name: &str) -> Result<()> {
        self.close_for_switch();
        self.ensure_mounted()?;
        let slot = self.dir.find(name.as_bytes()).ok_or(Error::NotFound)?;
        let entry = self.dir.entry(slot).ok_or(Error::NotFound)?;
        self.session = Some(Session::open(slot, &entry));
        Ok(())
    }

    /// Read up to `buf.len()` bytes from the cursor. `Ok(0)` at end of file
    /// or when no file is open.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.session.as_mut() {
            Some(s) => s.transfer(&mut self.dev, &mut self.cache, Transfer::Read(buf)),
            None => Ok(0),
        }
    }

    /// Write up to `buf.len()` bytes at the cursor, never past the file size.
    /// Returns the bytes accepted.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self.session.as_mut() {
            Some(s) => s.transfer(&mut self.dev, &mut self.cache, Transfer::Write(buf)),
            None => Ok(0),
        }
    }

    /// Flush and close the open file.
    ///
    /// The file is closed even when the final write-back fails; the error is
    /// returned so the caller may act on it.
    pub fn close(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut s) => s.flush(&mut self.dev, &self.cache),
            None => Ok(()),
        }
    }

    /// Remove a file. Its sectors are not reused.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.close_for_switch();
        self.ensure_mounted()?;
        let slot = self.dir.find(name.as_bytes()).ok_or(Error::NotFound)?;
        self.dir.tombstone(slot);
        self.dir.store(&mut self.dev)?;
        debug!("deleted slot {}", slot);
        Ok(())
    }

    /// Name and size of the file in slot `index`.
    pub fn list(&self, index: usize) -> Result<FileInfo> {
        self.ensure_mounted()?;
        self.dir
            .entry(index)
            .map(|e| FileInfo::from_entry(index, &e))
            .ok_or(Error::NotFound)
    }

    /// All files, in slot order.
    pub fn files(&self) -> impl Iterator<Item = FileInfo> + '_ {
        (0..MAX_FILES).filter_map(move |i| self.list(i).ok())
    }

    /// Full directory record of slot `index`.
    pub fn entry(&self, index: usize) -> Result<DirEntry> {
        self.ensure_mounted()?;
        self.dir.entry(index).ok_or(Error::NotFound)
    }

    /// Allocator cursor: the first sector no file owns. `None` until a
    /// mount or format succeeds.
    pub fn next_free_sector(&self) -> Option<u16> {
        self.mounted.then(|| self.dir.next_free_sector())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Size of the open file.
    pub fn size(&self) -> Option<u16> {
        self.session.as_ref().map(Session::size)
    }

    /// Cursor of the open file.
    pub fn position(&self) -> Option<u16> {
        self.session.as_ref().map(Session::position)
    }

    /// Directory slot of the open file.
    pub fn open_index(&self) -> Option<usize> {
        self.session.as_ref().map(Session::index)
    }

    pub fn device(&self) -> &D {
        &self.dev
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.dev
    }

    /// Consume the filesystem and return the underlying device. An open file
    /// is not flushed; call [`close`](Self::close) first.
    pub fn into_device(self) -> D {
        self.dev
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(Error::NoFilesystem)
        }
    }

    /// Close before rebinding; the outer call proceeds even if the flush fails.
    fn close_for_switch(&mut self) {
        if let Err(e) = self.close() {
            warn!("flush on implicit close failed: {}", e);
        }
    }

    /// Drop the session without touching the device.
    fn discard_session(&mut self) {
        if let Some(s) = self.session.take() {
            if s.is_dirty() {
                warn!("discarding unflushed data of slot {}", s.index());
            }
        }
    }
}
