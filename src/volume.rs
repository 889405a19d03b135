//! On-disk volume header and entry-table persistence.
//!
//! The first [`FAT_SIZE`] bytes of the device hold the header followed by
//! the packed entry table; the data region covers the rest.

use crate::allocator::align_up;
use crate::allocator::AddressAllocator;
use crate::allocator::MIN_BLOCK_SIZE;
use crate::device::BlockDevice;
use crate::device::DEVICE_SIZE;
use crate::entry::Entry;
use crate::entry::EntryKind;
use crate::error::Error;
use crate::error::Result;
use std::collections::BTreeMap;

/// Signature opening every valid volume.
pub const MAGIC: [u8; 4] = *b"MYFS";
/// Current on-disk format version.
pub const VERSION: u8 = 0x03;
/// Bytes reserved at the start of the device for the header and the entry
/// table.
pub const FAT_SIZE: u64 = 4096;

/// Packed header length: magic, version, block size, and one u64 the format
/// reserves inside the header but never reads back.
const HEADER_LEN: usize = 4 + 1 + 2 + 8;
/// Offset of the live table length.
const FAT_LEN_OFFSET: usize = HEADER_LEN;
/// Offset of the first serialized entry.
const TABLE_OFFSET: usize = HEADER_LEN + 8;

/// In-memory image of the FAT region: the block size and every entry, keyed
/// by path.
pub struct Volume {
    pub block_size: u16,
    pub entries: BTreeMap<String, Entry>,
}

impl Volume {
    /// Returns an empty volume with the given block size.
    pub fn new(block_size: u16) -> Self {
        Self {
            block_size,
            entries: BTreeMap::new(),
        }
    }

    /// Total serialized size of the entry table.
    pub fn fat_size(&self) -> u64 {
        self.entries.values().map(Entry::serialized_size).sum()
    }

    /// Bytes the serialized entry table may grow to.
    pub fn fat_capacity(&self) -> u64 {
        FAT_SIZE - self.block_size as u64
    }

    /// Writes the header and the serialized entry table.
    pub fn save(&self, dev: &mut dyn BlockDevice) -> Result<()> {
        let fat_size = self.fat_size();
        if fat_size > self.fat_capacity() {
            return Err(Error::FatFull);
        }
        let mut buf = Vec::with_capacity(TABLE_OFFSET + fat_size as usize);
        buf.extend_from_slice(&MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&self.block_size.to_le_bytes());
        buf.extend_from_slice(&[0; 8]);
        buf.extend_from_slice(&fat_size.to_le_bytes());
        for entry in self.entries.values() {
            entry.serialize(&mut buf);
        }
        dev.write(0, &buf);
        Ok(())
    }

    /// Reads the header and the entry table back.
    ///
    /// Everything the allocator sweep relies on is validated here; a failure
    /// means the volume has to be formatted.
    pub fn load(dev: &dyn BlockDevice) -> Result<Self> {
        let mut preamble = [0u8; TABLE_OFFSET];
        dev.read(0, &mut preamble);
        if preamble[0..4] != MAGIC {
            return Err(Error::CorruptHeader);
        }
        if preamble[4] != VERSION {
            return Err(Error::CorruptHeader);
        }
        let block_size = u16::from_le_bytes([preamble[5], preamble[6]]);
        if !block_size.is_power_of_two()
            || block_size < MIN_BLOCK_SIZE
            || block_size as u64 >= FAT_SIZE
        {
            return Err(Error::CorruptHeader);
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&preamble[FAT_LEN_OFFSET..TABLE_OFFSET]);
        let fat_size = u64::from_le_bytes(len_bytes);
        if fat_size > FAT_SIZE - block_size as u64 {
            return Err(Error::CorruptHeader);
        }

        let mut table = vec![0u8; fat_size as usize];
        dev.read(TABLE_OFFSET as u64, &mut table);
        let mut entries = BTreeMap::new();
        let mut offset = 0;
        while offset < table.len() {
            let entry = Entry::deserialize(&table[offset..])?;
            offset += entry.serialized_size() as usize;
            entries.insert(entry.path.clone(), entry);
        }

        let volume = Self {
            block_size,
            entries,
        };
        volume.check_extents()?;
        Ok(volume)
    }

    /// Resets the device to a fresh volume holding only the root directory.
    pub fn format(dev: &mut dyn BlockDevice, block_size: u16) -> Result<Self> {
        let zero = vec![0u8; DEVICE_SIZE as usize];
        dev.write(0, &zero);
        let mut volume = Self::new(block_size);
        let mut allocator = AddressAllocator::new(FAT_SIZE, DEVICE_SIZE, block_size);
        let mut root = Entry::new("/".to_owned(), EntryKind::Directory);
        root.address = allocator.allocate(root.size)?;
        volume.entries.insert(root.path.clone(), root);
        volume.save(dev)?;
        Ok(volume)
    }

    /// Rejects tables whose extents could not have come from a consistent
    /// allocator: root missing, extents out of range or overlapping.
    fn check_extents(&self) -> Result<()> {
        match self.entries.get("/") {
            Some(root) if root.is_directory() => {}
            _ => return Err(Error::CorruptEntry),
        }
        if self.entries.keys().any(|p| !p.starts_with('/')) {
            return Err(Error::CorruptEntry);
        }
        let mut extents: Vec<(u64, u64)> = self
            .entries
            .values()
            .map(|e| (e.address, align_up(e.size, self.block_size)))
            .collect();
        extents.sort_unstable();
        let mut cursor = FAT_SIZE;
        for (address, len) in extents {
            if address < cursor {
                return Err(Error::CorruptEntry);
            }
            match address.checked_add(len) {
                Some(end) if end <= DEVICE_SIZE => cursor = end,
                _ => return Err(Error::CorruptEntry),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;
    use crate::entry::EntryKind;

    fn sample() -> Volume {
        let mut volume = Volume::new(32);
        volume.entries.insert(
            "/".to_owned(),
            Entry {
                path: "/".to_owned(),
                kind: EntryKind::Directory,
                size: 2,
                address: 4096,
            },
        );
        volume.entries.insert(
            "/a".to_owned(),
            Entry {
                path: "/a".to_owned(),
                kind: EntryKind::File,
                size: 100,
                address: 4128,
            },
        );
        volume
    }

    #[test]
    fn save_load_roundtrip() {
        let mut dev = MemDevice::new();
        let volume = sample();
        volume.save(&mut dev).unwrap();
        let loaded = Volume::load(&dev).unwrap();
        assert_eq!(loaded.block_size, 32);
        assert_eq!(loaded.entries, volume.entries);
        assert_eq!(loaded.fat_size(), volume.fat_size());
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut dev = MemDevice::new();
        sample().save(&mut dev).unwrap();
        dev.write(0, &[0; 4]);
        assert!(matches!(Volume::load(&dev), Err(Error::CorruptHeader)));

        let mut dev = MemDevice::new();
        sample().save(&mut dev).unwrap();
        dev.write(4, &[0x02]);
        assert!(matches!(Volume::load(&dev), Err(Error::CorruptHeader)));
    }

    #[test]
    fn rejects_bad_block_size() {
        for bad in [0u16, 8, 33, 4096] {
            let mut dev = MemDevice::new();
            sample().save(&mut dev).unwrap();
            dev.write(5, &bad.to_le_bytes());
            assert!(matches!(Volume::load(&dev), Err(Error::CorruptHeader)));
        }
    }

    #[test]
    fn rejects_overlapping_extents() {
        let mut dev = MemDevice::new();
        let mut volume = sample();
        volume.entries.get_mut("/a").unwrap().address = 4096;
        volume.save(&mut dev).unwrap();
        assert!(matches!(Volume::load(&dev), Err(Error::CorruptEntry)));
    }

    #[test]
    fn rejects_missing_root() {
        let mut dev = MemDevice::new();
        let mut volume = sample();
        volume.entries.remove("/");
        volume.save(&mut dev).unwrap();
        assert!(matches!(Volume::load(&dev), Err(Error::CorruptEntry)));
    }

    #[test]
    fn save_fails_when_the_table_outgrows_the_fat() {
        let mut dev = MemDevice::new();
        let mut volume = Volume::new(32);
        let mut address = 4096;
        for i in 0..40 {
            let path = format!("/{:0>96}", i);
            volume.entries.insert(
                path.clone(),
                Entry {
                    path,
                    kind: EntryKind::File,
                    size: 0,
                    address,
                },
            );
            address += 32;
        }
        assert!(matches!(volume.save(&mut dev), Err(Error::FatFull)));
    }

    #[test]
    fn format_leaves_a_loadable_root_volume() {
        let mut dev = MemDevice::new();
        sample().save(&mut dev).unwrap();
        let volume = Volume::format(&mut dev, 32).unwrap();
        assert_eq!(volume.entries.len(), 1);
        let loaded = Volume::load(&dev).unwrap();
        let root = &loaded.entries["/"];
        assert!(root.is_directory());
        assert_eq!(root.size, 0);
        assert_eq!(root.address, FAT_SIZE);
    }
}
