//! The error taxonomy shared by every filesystem operation.

use std::error;
use std::fmt;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a filesystem operation can report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The entry does not exist.
    NotFound,
    /// An entry with the same path already exists.
    AlreadyExists,
    /// The path is empty or malformed.
    InvalidPath,
    /// The operation requires a directory.
    NotADirectory,
    /// The operation requires a regular file.
    NotAFile,
    /// The directory already holds the maximum number of children.
    DirectoryFull,
    /// The serialized entry table does not fit in the FAT region.
    FatFull,
    /// The data region has no extent large enough.
    OutOfSpace,
    /// The destination of a move lies inside the moved directory.
    RecursiveMove,
    /// The destination of a copy lies inside the copied directory.
    RecursiveCopy,
    /// The root directory cannot be moved or replaced.
    ForbiddenRootOp,
    /// The path exceeds the maximum length.
    MaxPathLength,
    /// The volume header failed validation.
    CorruptHeader,
    /// The entry table failed validation.
    CorruptEntry,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotFound => "file does not exist",
            Self::AlreadyExists => "file already exists",
            Self::InvalidPath => "invalid path",
            Self::NotADirectory => "not a directory",
            Self::NotAFile => "not a file",
            Self::DirectoryFull => "maximum directory capacity reached",
            Self::FatFull => "entry table is full",
            Self::OutOfSpace => "insufficient space to allocate",
            Self::RecursiveMove => "cannot move a directory into itself",
            Self::RecursiveCopy => "cannot copy a directory into itself",
            Self::ForbiddenRootOp => "root cannot be changed",
            Self::MaxPathLength => "maximum path length reached",
            Self::CorruptHeader => "invalid volume header",
            Self::CorruptEntry => "corrupt entry table",
        };
        write!(fmt, "{msg}")
    }
}

impl error::Error for Error {}
