//! Errors for the MicroFS library.

use core::fmt;

/// Result alias used by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Block device init, read or write failed.
    Disk,
    /// Sector 0 does not carry the MicroFS signature (or nothing is mounted).
    NoFilesystem,
    /// No active entry with that name / index.
    NotFound,
    /// Every directory slot is in use.
    Full,
    /// An active entry already has this name.
    AlreadyExists,
    /// The name is empty once truncated.
    InvalidName,
    /// The allocator cursor would run past the last addressable sector.
    NoSpace,
}

impl Error {
    /// One-byte status code, `0` being reserved for success.
    pub fn code(self) -> u8 {
        match self {
            Error::Disk => 1,
            Error::NoFilesystem => 2,
            Error::NotFound => 3,
            Error::Full => 4,
            Error::AlreadyExists => 5,
            Error::InvalidName => 6,
            Error::NoSpace => 7,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Disk => "disk error",
            Error::NoFilesystem => "no filesystem",
            Error::NotFound => "file not found",
            Error::Full => "directory full",
            Error::AlreadyExists => "file already exists",
            Error::InvalidName => "invalid file name",
            Error::NoSpace => "no free sectors",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_classic_status_bytes() {
        assert_eq!(Error::Disk.code(), 1);
        assert_eq!(Error::NoFilesystem.code(), 2);
        assert_eq!(Error::NotFound.code(), 3);
        assert_eq!(Error::Full.code(), 4);
        assert_eq!(Error::AlreadyExists.code(), 5);
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(std::format!("{}", Error::Full), "directory full");
    }
}
