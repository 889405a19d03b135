//! Block devices backing a volume.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::ptr;

/// The size of a device in bytes.
pub const DEVICE_SIZE: u64 = 1 << 20;

/// A fixed-size random-access byte array holding one volume.
///
/// Implementations only guarantee the single-call byte copy; there is no
/// atomicity or ordering across calls.
pub trait BlockDevice {
    /// Copies `out.len()` bytes starting at `addr` into `out`.
    fn read(&self, addr: u64, out: &mut [u8]);

    /// Copies `data` into the device starting at `addr`.
    fn write(&mut self, addr: u64, data: &[u8]);
}

/// A device memory-mapping a backing image file.
///
/// Opening a path with no file behind it creates the image, zero-filled to
/// [`DEVICE_SIZE`].
pub struct FileDevice {
    map: *mut u8,
    /// Keeps the descriptor alive for the lifetime of the mapping.
    _file: File,
}

impl FileDevice {
    /// Opens or creates the backing image at `path` and maps it.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        if file.metadata()?.len() < DEVICE_SIZE {
            file.set_len(DEVICE_SIZE)?;
        }
        let map = unsafe {
            libc::mmap(
                ptr::null_mut(),
                DEVICE_SIZE as usize,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            map: map as *mut u8,
            _file: file,
        })
    }
}

impl BlockDevice for FileDevice {
    fn read(&self, addr: u64, out: &mut [u8]) {
        assert!(addr + out.len() as u64 <= DEVICE_SIZE);
        unsafe {
            ptr::copy_nonoverlapping(self.map.add(addr as usize), out.as_mut_ptr(), out.len());
        }
    }

    fn write(&mut self, addr: u64, data: &[u8]) {
        assert!(addr + data.len() as u64 <= DEVICE_SIZE);
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), self.map.add(addr as usize), data.len());
        }
    }
}

impl Drop for FileDevice {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.map as *mut _, DEVICE_SIZE as usize);
        }
    }
}

/// An in-memory device, for tests and throwaway volumes.
pub struct MemDevice {
    data: Vec<u8>,
}

impl MemDevice {
    /// Returns a zero-filled device.
    pub fn new() -> Self {
        Self {
            data: vec![0; DEVICE_SIZE as usize],
        }
    }
}

impl Default for MemDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for MemDevice {
    fn read(&self, addr: u64, out: &mut [u8]) {
        let addr = addr as usize;
        out.copy_from_slice(&self.data[addr..addr + out.len()]);
    }

    fn write(&mut self, addr: u64, data: &[u8]) {
        let addr = addr as usize;
        self.data[addr..addr + data.len()].copy_from_slice(data);
    }
}
