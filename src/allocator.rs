//! Free-space management for the data region.

use crate::device::BlockDevice;
use crate::entry::Entry;
use crate::error::Error;
use crate::error::Result;
use std::collections::BTreeMap;

/// Default allocation granularity in bytes, following the pointer width.
#[cfg(target_pointer_width = "64")]
pub const DEFAULT_BLOCK_SIZE: u16 = 32;
#[cfg(not(target_pointer_width = "64"))]
pub const DEFAULT_BLOCK_SIZE: u16 = 16;

/// Smallest block size a volume may carry.
pub const MIN_BLOCK_SIZE: u16 = 16;

/// Rounds `size` up to a whole number of blocks. Zero still occupies one
/// block.
pub fn align_up(size: u64, block_size: u16) -> u64 {
    let block_size = block_size as u64;
    (size.max(1) + block_size - 1) / block_size * block_size
}

/// First-fit allocator over the volume's data region.
///
/// Free space is a map from start address to length covering exactly the
/// bytes no entry owns; every extent handed out is block-aligned.
pub struct AddressAllocator {
    first_address: u64,
    last_address: u64,
    block_size: u16,
    free_spaces: BTreeMap<u64, u64>,
}

impl AddressAllocator {
    /// Returns an allocator over `[first_address, last_address)` with the
    /// whole range free.
    pub fn new(first_address: u64, last_address: u64, block_size: u16) -> Self {
        let mut free_spaces = BTreeMap::new();
        free_spaces.insert(first_address, last_address - first_address);
        Self {
            first_address,
            last_address,
            block_size,
            free_spaces,
        }
    }

    /// Rebuilds the free-space map from the live entries.
    ///
    /// Sweeps the data region in address order; every gap between
    /// consecutive aligned extents becomes one free block.
    pub fn initialize<'a, I>(&mut self, entries: I, block_size: u16)
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        self.block_size = block_size;
        self.free_spaces.clear();
        let mut extents: Vec<(u64, u64)> = entries
            .into_iter()
            .map(|e| (e.address, align_up(e.size, block_size)))
            .collect();
        extents.sort_unstable();
        let mut cursor = self.first_address;
        for (address, len) in extents {
            if address > cursor {
                self.free_spaces.insert(cursor, address - cursor);
            }
            cursor = address + len;
        }
        if cursor < self.last_address {
            self.free_spaces.insert(cursor, self.last_address - cursor);
        }
    }

    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    /// The current free-space map, start address to length.
    pub fn free_spaces(&self) -> &BTreeMap<u64, u64> {
        &self.free_spaces
    }

    fn align(&self, size: u64) -> u64 {
        align_up(size, self.block_size)
    }

    /// Allocates an aligned extent holding at least `size` bytes, first fit.
    pub fn allocate(&mut self, size: u64) -> Result<u64> {
        let size = self.align(size);
        let block = self
            .free_spaces
            .iter()
            .find(|(_, &len)| len >= size)
            .map(|(&address, &len)| (address, len));
        let Some((address, len)) = block else {
            return Err(Error::OutOfSpace);
        };
        self.free_spaces.remove(&address);
        if len > size {
            self.free_spaces.insert(address + size, len - size);
        }
        Ok(address)
    }

    /// Returns the entry's extent to the free map.
    pub fn deallocate(&mut self, entry: &Entry) {
        self.insert_free(entry.address, self.align(entry.size));
    }

    /// Resizes the entry's extent to hold `new_size` bytes.
    ///
    /// When the block count does not grow the entry stays put and the map is
    /// untouched; a wasted tail stays inside the entry until the next defrag
    /// reclaims it. Growth extends into an abutting free block when one is
    /// there and relocates otherwise. After a relocation the content of the
    /// old extent has not been copied; the caller rewrites the payload.
    pub fn reallocate(&mut self, entry: &mut Entry, new_size: u64) -> Result<()> {
        let old = self.align(entry.size);
        let new = self.align(new_size);
        if new <= old {
            entry.size = new_size;
            return Ok(());
        }
        // Grow in place when the bytes right after the extent are free
        if let Some(&len) = self.free_spaces.get(&(entry.address + old)) {
            if len >= new - old {
                self.free_spaces.remove(&(entry.address + old));
                if len > new - old {
                    self.free_spaces
                        .insert(entry.address + new, len - (new - old));
                }
                entry.size = new_size;
                return Ok(());
            }
        }
        // Relocate. Freeing the old extent first lets the new allocation
        // reuse it when merging with a neighbor makes it large enough.
        self.deallocate(entry);
        match self.allocate(new_size) {
            Ok(address) => {
                entry.address = address;
                entry.size = new_size;
                Ok(())
            }
            Err(e) => {
                // Take the old extent back so the entry stays valid
                self.carve(entry.address, old);
                Err(e)
            }
        }
    }

    /// Compacts every live extent to the low end of the data region.
    ///
    /// Entries move in ascending source order, so every destination sits at
    /// or below its source and a per-entry scratch buffer is enough.
    pub fn defrag(&mut self, entries: &mut BTreeMap<String, Entry>, dev: &mut dyn BlockDevice) {
        let mut order: Vec<(u64, String)> = entries
            .values()
            .map(|e| (e.address, e.path.clone()))
            .collect();
        order.sort_unstable();
        let mut buffer = Vec::new();
        let mut cursor = self.first_address;
        for (address, path) in order {
            let Some(entry) = entries.get_mut(&path) else {
                continue;
            };
            let len = align_up(entry.size, self.block_size);
            if address != cursor {
                buffer.resize(len as usize, 0);
                dev.read(address, &mut buffer);
                dev.write(cursor, &buffer);
                entry.address = cursor;
            }
            cursor += len;
        }
        self.free_spaces.clear();
        if cursor < self.last_address {
            self.free_spaces.insert(cursor, self.last_address - cursor);
        }
    }

    /// Inserts a free block and merges it with exactly-abutting neighbors.
    fn insert_free(&mut self, mut address: u64, mut len: u64) {
        if let Some(&next_len) = self.free_spaces.get(&(address + len)) {
            self.free_spaces.remove(&(address + len));
            len += next_len;
        }
        if let Some((&prev_address, &prev_len)) = self.free_spaces.range(..address).next_back() {
            if prev_address + prev_len == address {
                self.free_spaces.remove(&prev_address);
                address = prev_address;
                len += prev_len;
            }
        }
        self.free_spaces.insert(address, len);
    }

    /// Removes `[address, address + len)` from the free block containing it.
    fn carve(&mut self, address: u64, len: u64) {
        let Some((&start, &block_len)) = self.free_spaces.range(..=address).next_back() else {
            return;
        };
        let end = address + len;
        if start + block_len < end {
            return;
        }
        self.free_spaces.remove(&start);
        if start < address {
            self.free_spaces.insert(start, address - start);
        }
        if start + block_len > end {
            self.free_spaces.insert(end, start + block_len - end);
        }
    }
}
