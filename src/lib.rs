//! A self-contained, single-volume user-space filesystem layered over a
//! fixed-size block device image.
//!
//! The first 4 KiB of the device hold a header and a flat, path-keyed entry
//! table; the rest is a block-granular data region managed by a first-fit
//! allocator. [`fs::FileSystem`] ties the pieces together and exposes the
//! directory-tree operations.

pub mod allocator;
pub mod device;
pub mod entry;
pub mod error;
pub mod fs;
pub mod path;
pub mod prompt;
pub mod volume;

pub use crate::device::BlockDevice;
pub use crate::device::FileDevice;
pub use crate::device::MemDevice;
pub use crate::entry::Entry;
pub use crate::entry::EntryKind;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::fs::FileSystem;
