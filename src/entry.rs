//! Filesystem table entries and their on-disk encoding.
//!
//! An entry is packed as `[kind:1][pathLen:8][path][size:8][address:8]`,
//! little-endian, with no padding.

use crate::error::Error;
use crate::error::Result;

/// Longest allowed entry path, in bytes.
pub const MAX_PATH_LENGTH: usize = 256;

/// Address of an entry whose extent has not been allocated yet.
pub const NO_ADDRESS: u64 = u64::MAX;

/// Fixed part of the encoding: kind, path length, size, address.
const FIXED_LEN: usize = 1 + 8 + 8 + 8;

/// What an entry stands for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    File = 1,
    Directory = 2,
}

/// A single record of the filesystem table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    /// Absolute path, unique across the volume.
    pub path: String,
    pub kind: EntryKind,
    /// Logical content length in bytes.
    pub size: u64,
    /// Byte offset of the content extent on the device.
    pub address: u64,
}

impl Entry {
    /// Returns a fresh, empty, not-yet-allocated entry.
    pub fn new(path: String, kind: EntryKind) -> Self {
        Self {
            path,
            kind,
            size: 0,
            address: NO_ADDRESS,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Number of bytes the entry occupies in the serialized table.
    pub fn serialized_size(&self) -> u64 {
        (FIXED_LEN + self.path.len()) as u64
    }

    /// Appends the packed encoding of the entry to `buf`.
    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.push(self.kind as u8);
        buf.extend_from_slice(&(self.path.len() as u64).to_le_bytes());
        buf.extend_from_slice(self.path.as_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&self.address.to_le_bytes());
    }

    /// Unpacks one entry from the head of `buf`.
    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < 1 + 8 {
            return Err(Error::CorruptEntry);
        }
        let kind = match buf[0] {
            1 => EntryKind::File,
            2 => EntryKind::Directory,
            _ => return Err(Error::CorruptEntry),
        };
        let path_len = read_u64(buf, 1) as usize;
        if path_len > MAX_PATH_LENGTH {
            return Err(Error::CorruptEntry);
        }
        if buf.len() < FIXED_LEN + path_len {
            return Err(Error::CorruptEntry);
        }
        let path = std::str::from_utf8(&buf[9..9 + path_len])
            .map_err(|_| Error::CorruptEntry)?
            .to_owned();
        let size = read_u64(buf, 9 + path_len);
        let address = read_u64(buf, 9 + path_len + 8);
        Ok(Self {
            path,
            kind,
            size,
            address,
        })
    }
}

/// Reads a little-endian u64 at `off`. The caller has checked the bounds.
fn read_u64(buf: &[u8], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(bytes)
}
