//! A single engine shared behind a spin lock.
//!
//! The engine keeps one directory mirror and one open file for the whole
//! program. `SharedFs` lets it live in a `static` on targets without an OS:
//!
//! ```ignore
//! static FS: SharedFs<SdCard> = SharedFs::new(SdCard::new());
//!
//! FS.lock().mount()?;
//! ```

use spin::{Mutex, MutexGuard};

use crate::device::BlockDevice;
use crate::fs::MicroFs;

pub struct SharedFs<D: BlockDevice> {
    inner: Mutex<MicroFs<D>>,
}

impl<D: BlockDevice> SharedFs<D> {
    pub const fn new(dev: D) -> Self {
        Self {
            inner: Mutex::new(MicroFs::new(dev)),
        }
    }

    /// Exclusive access to the engine until the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, MicroFs<D>> {
        self.inner.lock()
    }

    /// Run `f` with the engine locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut MicroFs<D>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    #[test]
    fn state_persists_across_locks() {
        let shared = SharedFs::new(MemDevice::new(8));
        shared.with(|fs| fs.format()).unwrap();
        shared.lock().create("LOG", 4).unwrap();
        assert_eq!(shared.lock().write(b"boot"), Ok(4));

        let mut fs = shared.lock();
        fs.open("LOG").unwrap();
        let mut out = [0u8; 4];
        assert_eq!(fs.read(&mut out), Ok(4));
        assert_eq!(&out, b"boot");
    }
}
