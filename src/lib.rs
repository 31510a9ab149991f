//! MicroFS: a flat-file store for 512-byte-sector media.
//!
//! Sector 0 holds a 16-byte header and a 16-entry directory. Files get a
//! fixed size and a contiguous sector range when created; ranges are handed
//! out by a bump allocator and never reused. One file is open at a time and
//! all of its I/O goes through a single write-back sector buffer.
#![cfg_attr(not(test), no_std)]

pub mod device;
pub mod dir;
pub mod directory;
pub mod error;
pub mod fs;
pub mod header;
pub mod session;
pub mod shared;

pub use crate::device::{BlockDevice, SECTOR_SIZE};
pub use crate::dir::{DirEntry, FileInfo, ENTRY_SIZE, MAX_FILES, MAX_NAME, NAME_LEN};
pub use crate::error::{Error, Result};
pub use crate::fs::MicroFs;
pub use crate::header::{HEADER_SIZE, MAGIC};
pub use crate::shared::SharedFs;
