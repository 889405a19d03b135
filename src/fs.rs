//! Directory-tree semantics over the volume's entry table.

use crate::allocator::AddressAllocator;
use crate::allocator::DEFAULT_BLOCK_SIZE;
use crate::device::BlockDevice;
use crate::device::DEVICE_SIZE;
use crate::entry::Entry;
use crate::entry::EntryKind;
use crate::entry::MAX_PATH_LENGTH;
use crate::error::Error;
use crate::error::Result;
use crate::path::is_descendant;
use crate::path::join;
use crate::path::split_path;
use crate::volume::Volume;
use crate::volume::FAT_SIZE;

/// Most children a directory can hold.
pub const MAX_DIRECTORY_SIZE: usize = 6;

/// A mounted single-volume filesystem.
///
/// One instance exclusively owns the entry table and the allocator. The
/// device is borrowed so callers can hand in an in-memory one.
///
/// A directory's content is the LF-separated list of its children's
/// basenames; files hold raw bytes. Every mutating operation persists the
/// entry table before returning.
pub struct FileSystem<'d> {
    dev: &'d mut dyn BlockDevice,
    volume: Volume,
    allocator: AddressAllocator,
}

impl<'d> FileSystem<'d> {
    /// Mounts the volume on `dev`, formatting it afresh when the on-disk
    /// state cannot be loaded.
    pub fn new(dev: &'d mut dyn BlockDevice) -> Result<Self> {
        let (volume, loaded) = match Volume::load(dev) {
            Ok(volume) => (volume, true),
            Err(_) => (Volume::format(dev, DEFAULT_BLOCK_SIZE)?, false),
        };
        let mut allocator = AddressAllocator::new(FAT_SIZE, DEVICE_SIZE, volume.block_size);
        allocator.initialize(volume.entries.values(), volume.block_size);
        let mut fs = Self {
            dev,
            volume,
            allocator,
        };
        if loaded {
            fs.defrag()?;
        }
        Ok(fs)
    }

    /// Looks an entry up by exact path.
    pub fn get_entry(&self, path: &str) -> Option<&Entry> {
        self.volume.entries.get(path)
    }

    /// Tells whether an entry exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.volume.entries.contains_key(path)
    }

    /// All entries, in path order.
    pub fn list_tree(&self) -> Vec<Entry> {
        self.volume.entries.values().cloned().collect()
    }

    /// Resolves the children of the directory at `path`, in list order.
    pub fn list_dir(&self, path: &str) -> Result<Vec<Entry>> {
        let entry = self.get_entry(path).ok_or(Error::NotFound)?;
        let mut result = Vec::new();
        for child in self.read_children(entry)? {
            if let Some(e) = self.get_entry(&join(&child, path)) {
                result.push(e.clone());
            }
        }
        Ok(result)
    }

    pub fn block_size(&self) -> u16 {
        self.volume.block_size
    }

    /// The space allocator, for introspection.
    pub fn allocator(&self) -> &AddressAllocator {
        &self.allocator
    }

    /// Creates an empty file at `path`.
    pub fn create_file(&mut self, path: &str) -> Result<()> {
        self.create_entry(path, EntryKind::File)
    }

    /// Creates an empty directory at `path`.
    pub fn create_directory(&mut self, path: &str) -> Result<()> {
        self.create_entry(path, EntryKind::Directory)
    }

    /// Reads the full content of the entry at `path`.
    pub fn get_content(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self.get_entry(path).ok_or(Error::NotFound)?;
        Ok(self.read_entry(entry))
    }

    /// Replaces the content of the file at `path`, reallocating its extent
    /// as needed.
    pub fn set_content(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let entry = self.get_entry(path).ok_or(Error::NotFound)?;
        if entry.is_directory() {
            return Err(Error::NotAFile);
        }
        self.write_entry(path, content)
    }

    /// Removes the entry at `path`; directories are emptied recursively.
    /// The root itself survives with an empty child list.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let entry = self.get_entry(path).cloned().ok_or(Error::NotFound)?;
        if entry.is_directory() {
            for child in self.read_children(&entry)? {
                self.remove(&join(&child, path))?;
            }
            if path == "/" {
                return Ok(());
            }
        }
        self.remove_table_entry(path)?;
        let (dir_path, name) = split_path(path);
        self.unlink_child(dir_path, name)
    }

    /// Moves the entry at `src` to `dst`.
    ///
    /// A directory moves with its whole subtree; only paths and the two
    /// parents' child lists change, the data region is untouched.
    pub fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        let entry = self.get_entry(src).cloned().ok_or(Error::NotFound)?;
        if self.exists(dst) {
            return Err(Error::AlreadyExists);
        }
        if src == "/" || dst == "/" {
            return Err(Error::ForbiddenRootOp);
        }
        if is_descendant(dst, src) {
            return Err(Error::RecursiveMove);
        }
        if dst.is_empty() || !dst.starts_with('/') {
            return Err(Error::InvalidPath);
        }
        let (src_dir, src_name) = split_path(src);
        let (dst_dir, dst_name) = split_path(dst);

        // every path that moves along with the entry
        let mut moved = vec![src.to_owned()];
        if entry.is_directory() {
            moved.extend(
                self.volume
                    .entries
                    .keys()
                    .filter(|p| is_descendant(p, src))
                    .cloned(),
            );
        }
        for path in &moved {
            if path.len() - src.len() + dst.len() > MAX_PATH_LENGTH {
                return Err(Error::MaxPathLength);
            }
        }
        let fat_delta = (dst.len() as i64 - src.len() as i64) * moved.len() as i64;
        if self.volume.fat_size() as i64 + fat_delta > self.volume.fat_capacity() as i64 {
            return Err(Error::FatFull);
        }
        // Validate the destination link up front so nothing below fails
        // halfway. Renaming inside a full directory stays legal because the
        // source slot empties before the link happens.
        Self::check_child_name(dst_name)?;
        let dst_dir_entry = self.get_entry(dst_dir).ok_or(Error::NotFound)?;
        let dst_children = self.read_children(dst_dir_entry)?;
        if dst_children.iter().any(|c| c == dst_name) {
            return Err(Error::AlreadyExists);
        }
        let occupied = if src_dir == dst_dir {
            dst_children.len() - 1
        } else {
            dst_children.len()
        };
        if occupied >= MAX_DIRECTORY_SIZE {
            return Err(Error::DirectoryFull);
        }

        self.unlink_child(src_dir, src_name)?;
        for path in moved {
            if let Some(mut e) = self.volume.entries.remove(&path) {
                let new_path = format!("{dst}{}", &path[src.len()..]);
                e.path = new_path.clone();
                self.volume.entries.insert(new_path, e);
            }
        }
        self.link_child(dst_dir, dst_name)
    }

    /// Copies `src` to a brand-new `dst`, recursively for directories.
    pub fn copy(&mut self, src: &str, dst: &str) -> Result<()> {
        let entry = self.get_entry(src).cloned().ok_or(Error::NotFound)?;
        if self.exists(dst) {
            return Err(Error::AlreadyExists);
        }
        if src == "/" || is_descendant(dst, src) {
            return Err(Error::RecursiveCopy);
        }
        if entry.is_directory() {
            self.create_directory(dst)?;
            for child in self.read_children(&entry)? {
                self.copy(&join(&child, src), &join(&child, dst))?;
            }
        } else {
            self.create_file(dst)?;
            let content = self.read_entry(&entry);
            self.set_content(dst, &content)?;
        }
        Ok(())
    }

    /// Compacts the data region; every live extent moves to the low end.
    pub fn defrag(&mut self) -> Result<()> {
        self.allocator
            .defrag(&mut self.volume.entries, &mut *self.dev);
        self.volume.save(&mut *self.dev)
    }

    fn create_entry(&mut self, path: &str, kind: EntryKind) -> Result<()> {
        if path.is_empty() || !path.starts_with('/') {
            return Err(Error::InvalidPath);
        }
        if path.len() > MAX_PATH_LENGTH {
            return Err(Error::MaxPathLength);
        }
        if self.exists(path) {
            return Err(Error::AlreadyExists);
        }
        let entry = Entry::new(path.to_owned(), kind);
        if self.volume.fat_size() + entry.serialized_size() > self.volume.fat_capacity() {
            return Err(Error::FatFull);
        }
        let (dir_path, name) = split_path(path);
        self.link_child(dir_path, name)?;
        self.add_table_entry(entry)
    }

    /// Inserts an entry into the table, allocating its first extent.
    fn add_table_entry(&mut self, mut entry: Entry) -> Result<()> {
        if self.volume.fat_size() + entry.serialized_size() > self.volume.fat_capacity() {
            return Err(Error::FatFull);
        }
        entry.address = self.allocator.allocate(entry.size)?;
        self.volume.entries.insert(entry.path.clone(), entry);
        self.volume.save(&mut *self.dev)
    }

    /// Drops an entry from the table and frees its extent.
    fn remove_table_entry(&mut self, path: &str) -> Result<()> {
        let Some(entry) = self.volume.entries.remove(path) else {
            return Err(Error::NotFound);
        };
        self.allocator.deallocate(&entry);
        self.volume.save(&mut *self.dev)
    }

    fn read_entry(&self, entry: &Entry) -> Vec<u8> {
        let mut content = vec![0u8; entry.size as usize];
        if !content.is_empty() {
            self.dev.read(entry.address, &mut content);
        }
        content
    }

    /// Content write-back shared by files and directory listings.
    fn write_entry(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let mut entry = self
            .volume
            .entries
            .get(path)
            .cloned()
            .ok_or(Error::NotFound)?;
        self.allocator.reallocate(&mut entry, content.len() as u64)?;
        if !content.is_empty() {
            self.dev.write(entry.address, content);
        }
        self.volume.entries.insert(path.to_owned(), entry);
        self.volume.save(&mut *self.dev)
    }

    /// Parses a directory's LF-separated child list.
    fn read_children(&self, entry: &Entry) -> Result<Vec<String>> {
        if !entry.is_directory() {
            return Err(Error::NotADirectory);
        }
        let content = self.read_entry(entry);
        let content = String::from_utf8_lossy(&content);
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Writes a directory's child list back.
    fn write_children(&mut self, path: &str, children: &[String]) -> Result<()> {
        if children.len() > MAX_DIRECTORY_SIZE {
            return Err(Error::DirectoryFull);
        }
        let content = children.join("\n");
        self.write_entry(path, content.as_bytes())
    }

    /// Adds `name` to the child list of the directory at `dir_path`.
    fn link_child(&mut self, dir_path: &str, name: &str) -> Result<()> {
        Self::check_child_name(name)?;
        let dir = self.get_entry(dir_path).ok_or(Error::NotFound)?;
        let mut children = self.read_children(dir)?;
        if children.iter().any(|c| c == name) {
            return Err(Error::AlreadyExists);
        }
        if children.len() >= MAX_DIRECTORY_SIZE {
            return Err(Error::DirectoryFull);
        }
        children.push(name.to_owned());
        self.write_children(dir_path, &children)
    }

    /// Drops `name` from the child list of the directory at `dir_path`.
    fn unlink_child(&mut self, dir_path: &str, name: &str) -> Result<()> {
        let dir = self.get_entry(dir_path).ok_or(Error::NotFound)?;
        let mut children = self.read_children(dir)?;
        let pos = children
            .iter()
            .position(|c| c == name)
            .ok_or(Error::NotFound)?;
        children.remove(pos);
        self.write_children(dir_path, &children)
    }

    fn check_child_name(name: &str) -> Result<()> {
        if name.is_empty()
            || name == "/"
            || name == "."
            || name == ".."
            || name.trim().is_empty()
            || name.contains('\n')
        {
            return Err(Error::InvalidPath);
        }
        Ok(())
    }
}

impl Drop for FileSystem<'_> {
    fn drop(&mut self) {
        // nothing left to do about a failure here
        let _ = self.volume.save(&mut *self.dev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::align_up;
    use crate::device::MemDevice;

    /// Checks that the live extents and the free blocks tile the data
    /// region exactly.
    fn assert_partition(fs: &FileSystem) {
        let mut ranges: Vec<(u64, u64)> = fs
            .list_tree()
            .iter()
            .map(|e| (e.address, align_up(e.size, fs.block_size())))
            .collect();
        ranges.extend(fs.allocator().free_spaces().iter().map(|(&a, &l)| (a, l)));
        ranges.sort_unstable();
        let mut cursor = FAT_SIZE;
        for (address, len) in ranges {
            assert_eq!(address, cursor);
            cursor = address + len;
        }
        assert_eq!(cursor, DEVICE_SIZE);
    }

    fn basenames(entries: &[Entry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| split_path(&e.path).1.to_owned())
            .collect()
    }

    #[test]
    fn fresh_volume_has_only_the_root() {
        let mut dev = MemDevice::new();
        let fs = FileSystem::new(&mut dev).unwrap();
        let tree = fs.list_tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "/");
        assert!(tree[0].is_directory());
        assert_partition(&fs);
    }

    #[test]
    fn basic_crud() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_file("/hello").unwrap();
        fs.set_content("/hello", b"world").unwrap();
        assert_eq!(fs.get_content("/hello").unwrap(), b"world");
        fs.remove("/hello").unwrap();
        assert!(fs.get_entry("/hello").is_none());
        assert_eq!(fs.list_tree().len(), 1);
        assert_partition(&fs);
    }

    #[test]
    fn listing_in_order() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/d").unwrap();
        fs.create_file("/d/a").unwrap();
        fs.create_file("/d/b").unwrap();
        let listed = fs.list_dir("/d").unwrap();
        assert_eq!(basenames(&listed), ["a", "b"]);
        // a directory's raw content is its child list
        assert_eq!(fs.get_content("/d").unwrap(), b"a\nb");
        assert!(fs.list_dir("/d/a").is_err());
        assert_eq!(fs.list_dir("/missing"), Err(Error::NotFound));
    }

    #[test]
    fn directory_cap() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/d").unwrap();
        for i in 1..=MAX_DIRECTORY_SIZE {
            fs.create_file(&format!("/d/f{i}")).unwrap();
        }
        assert_eq!(fs.create_file("/d/f7"), Err(Error::DirectoryFull));
        assert_eq!(fs.list_dir("/d").unwrap().len(), MAX_DIRECTORY_SIZE);
    }

    #[test]
    fn rejects_bad_names_and_paths() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        assert_eq!(fs.create_file(""), Err(Error::InvalidPath));
        assert_eq!(fs.create_file("relative"), Err(Error::InvalidPath));
        assert_eq!(fs.create_file("/a/"), Err(Error::InvalidPath));
        assert_eq!(fs.create_file("/.."), Err(Error::InvalidPath));
        assert_eq!(fs.create_file("/ "), Err(Error::InvalidPath));
        let long = format!("/{}", "x".repeat(MAX_PATH_LENGTH));
        assert_eq!(fs.create_file(&long), Err(Error::MaxPathLength));
        assert_eq!(fs.create_file("/d/a"), Err(Error::NotFound));
        fs.create_file("/f").unwrap();
        assert_eq!(fs.create_file("/f/x"), Err(Error::NotADirectory));
        assert_eq!(fs.create_file("/f"), Err(Error::AlreadyExists));
    }

    #[test]
    fn set_content_on_a_directory_is_refused() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/d").unwrap();
        assert_eq!(fs.set_content("/d", b"x"), Err(Error::NotAFile));
        assert_eq!(fs.set_content("/", b"x"), Err(Error::NotAFile));
    }

    #[test]
    fn recursive_copy_and_remove() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/x").unwrap();
        fs.create_file("/x/a").unwrap();
        fs.create_directory("/x/y").unwrap();
        fs.create_file("/x/y/b").unwrap();
        fs.set_content("/x/a", b"A").unwrap();
        fs.set_content("/x/y/b", b"B").unwrap();

        fs.copy("/x", "/z").unwrap();
        assert_eq!(fs.get_content("/z/a").unwrap(), b"A");
        assert_eq!(fs.get_content("/z/y/b").unwrap(), b"B");

        // the copy is independent of the source
        fs.set_content("/x/a", b"changed").unwrap();
        assert_eq!(fs.get_content("/z/a").unwrap(), b"A");

        fs.remove("/x").unwrap();
        assert!(!fs.exists("/x"));
        assert!(!fs.exists("/x/a"));
        assert!(!fs.exists("/x/y"));
        assert_eq!(fs.get_content("/z/a").unwrap(), b"A");
        assert_eq!(fs.get_content("/z/y/b").unwrap(), b"B");
        assert_partition(&fs);
    }

    #[test]
    fn copy_guards() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/x").unwrap();
        assert_eq!(fs.copy("/", "/x/r"), Err(Error::RecursiveCopy));
        assert_eq!(fs.copy("/x", "/x/y"), Err(Error::RecursiveCopy));
        assert_eq!(fs.copy("/missing", "/y"), Err(Error::NotFound));
        assert_eq!(fs.copy("/x", "/"), Err(Error::AlreadyExists));
    }

    #[test]
    fn growth_reallocation() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_file("/big").unwrap();
        let payload: Vec<u8> = (0..40u8).collect();
        fs.set_content("/big", &payload).unwrap();
        assert_eq!(fs.get_content("/big").unwrap(), payload);

        let payload: Vec<u8> = (0..200u8).collect();
        fs.set_content("/big", &payload).unwrap();
        assert_eq!(fs.get_content("/big").unwrap(), payload);
        assert_partition(&fs);
    }

    #[test]
    fn growth_relocates_past_a_neighbor() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_file("/a").unwrap();
        fs.create_file("/b").unwrap();
        fs.set_content("/a", b"first").unwrap();
        fs.set_content("/b", b"blocker").unwrap();
        let payload = vec![0xab; 300];
        fs.set_content("/a", &payload).unwrap();
        // /a could not grow over /b and moved, rewriting its payload
        assert_eq!(fs.get_content("/a").unwrap(), payload);
        assert_eq!(fs.get_content("/b").unwrap(), b"blocker");
        assert!(fs.get_entry("/a").unwrap().address > fs.get_entry("/b").unwrap().address);
        assert_partition(&fs);
    }

    #[test]
    fn fragmentation_then_defrag() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        let mut paths = Vec::new();
        for d in 0..2 {
            let dir = format!("/d{d}");
            fs.create_directory(&dir).unwrap();
            for i in 0..5 {
                let path = format!("{dir}/f{i}");
                fs.create_file(&path).unwrap();
                fs.set_content(&path, path.repeat(20).as_bytes()).unwrap();
                paths.push(path);
            }
        }
        for path in paths.iter().step_by(2) {
            fs.remove(path).unwrap();
        }
        fs.defrag().unwrap();
        assert_eq!(fs.allocator().free_spaces().len(), 1);
        let (&free_start, &free_len) = fs.allocator().free_spaces().iter().next().unwrap();
        assert_eq!(free_start + free_len, DEVICE_SIZE);
        for path in paths.iter().skip(1).step_by(2) {
            assert_eq!(fs.get_content(path).unwrap(), path.repeat(20).as_bytes());
        }
        assert_partition(&fs);
    }

    #[test]
    fn persistence_roundtrip() {
        let mut dev = MemDevice::new();
        {
            let mut fs = FileSystem::new(&mut dev).unwrap();
            fs.create_file("/hello").unwrap();
            fs.set_content("/hello", b"world").unwrap();
            fs.create_directory("/d").unwrap();
            fs.create_file("/d/a").unwrap();
            fs.set_content("/d/a", b"aaa").unwrap();
        }
        let fs = FileSystem::new(&mut dev).unwrap();
        assert_eq!(fs.get_content("/hello").unwrap(), b"world");
        assert_eq!(fs.get_content("/d/a").unwrap(), b"aaa");
        assert_eq!(basenames(&fs.list_dir("/d").unwrap()), ["a"]);
        assert_eq!(fs.list_tree().len(), 4);
        assert_partition(&fs);
    }

    #[test]
    fn corruption_triggers_a_format() {
        let mut dev = MemDevice::new();
        {
            let mut fs = FileSystem::new(&mut dev).unwrap();
            fs.create_file("/hello").unwrap();
            fs.set_content("/hello", b"world").unwrap();
        }
        dev.write(0, &[0; 4]);
        let fs = FileSystem::new(&mut dev).unwrap();
        let tree = fs.list_tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "/");
        assert!(tree[0].is_directory());
        assert_partition(&fs);
    }

    #[test]
    fn move_and_move_back() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_file("/a").unwrap();
        fs.set_content("/a", b"payload").unwrap();
        fs.rename("/a", "/b").unwrap();
        assert!(!fs.exists("/a"));
        assert_eq!(fs.get_content("/b").unwrap(), b"payload");
        fs.rename("/b", "/a").unwrap();
        assert_eq!(fs.get_content("/a").unwrap(), b"payload");
        assert_eq!(basenames(&fs.list_dir("/").unwrap()), ["a"]);
        assert_partition(&fs);
    }

    #[test]
    fn directory_move_takes_the_subtree() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/x").unwrap();
        fs.create_file("/x/a").unwrap();
        fs.create_directory("/x/y").unwrap();
        fs.create_file("/x/y/b").unwrap();
        fs.set_content("/x/a", b"A").unwrap();
        fs.set_content("/x/y/b", b"B").unwrap();
        fs.create_directory("/dst").unwrap();

        fs.rename("/x", "/dst/x").unwrap();
        assert!(!fs.exists("/x"));
        assert!(!fs.exists("/x/a"));
        assert_eq!(fs.get_content("/dst/x/a").unwrap(), b"A");
        assert_eq!(fs.get_content("/dst/x/y/b").unwrap(), b"B");
        assert_eq!(basenames(&fs.list_dir("/dst/x").unwrap()), ["a", "y"]);

        fs.rename("/dst/x", "/x").unwrap();
        assert_eq!(fs.get_content("/x/y/b").unwrap(), b"B");
        assert_partition(&fs);
    }

    #[test]
    fn move_guards() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/x").unwrap();
        fs.create_file("/f").unwrap();
        assert_eq!(fs.rename("/", "/y"), Err(Error::ForbiddenRootOp));
        assert_eq!(fs.rename("/x", "/"), Err(Error::AlreadyExists));
        assert_eq!(fs.rename("/x", "/x/y"), Err(Error::RecursiveMove));
        assert_eq!(fs.rename("/missing", "/y"), Err(Error::NotFound));
        assert_eq!(fs.rename("/x", "/f"), Err(Error::AlreadyExists));
        let long = format!("/{}", "y".repeat(MAX_PATH_LENGTH));
        assert_eq!(fs.rename("/f", &long), Err(Error::MaxPathLength));
    }

    #[test]
    fn rename_inside_a_full_directory() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_directory("/d").unwrap();
        for i in 1..=MAX_DIRECTORY_SIZE {
            fs.create_file(&format!("/d/f{i}")).unwrap();
        }
        fs.rename("/d/f1", "/d/renamed").unwrap();
        let names = basenames(&fs.list_dir("/d").unwrap());
        assert!(names.contains(&"renamed".to_owned()));
        assert!(!names.contains(&"f1".to_owned()));
    }

    #[test]
    fn remove_root_empties_but_keeps_it() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_file("/a").unwrap();
        fs.create_directory("/d").unwrap();
        fs.create_file("/d/b").unwrap();
        fs.remove("/").unwrap();
        let tree = fs.list_tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "/");
        assert!(fs.list_dir("/").unwrap().is_empty());
        assert_partition(&fs);
    }

    #[test]
    fn create_then_remove_restores_the_set() {
        let mut dev = MemDevice::new();
        let mut fs = FileSystem::new(&mut dev).unwrap();
        fs.create_file("/keep").unwrap();
        let before: Vec<String> = fs.list_tree().iter().map(|e| e.path.clone()).collect();
        fs.create_file("/tmp").unwrap();
        fs.set_content("/tmp", &[7; 500]).unwrap();
        fs.remove("/tmp").unwrap();
        let after: Vec<String> = fs.list_tree().iter().map(|e| e.path.clone()).collect();
        assert_eq!(before, after);
        assert_partition(&fs);
    }
}
