//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`flate2::DecompressError`]
    #[error(transparent)]
    Decompress(#[from] flate2::DecompressError),

    /// Transparent wrapper for [`flate2::CompressError`]
    #[error(transparent)]
    Compress(#[from] flate2::CompressError),

    /// file is not a data package
    #[error("file is not a data package (identifier {identifier:?})")]
    #[diagnostic(help("data package indexes start with `NetDragonDatPkg`"))]
    InvalidFormat {
        /// identifier found at the start of the file
        identifier: String,
    },

    /// data package version is not supported
    #[error("unsupported data package version {0}")]
    UnsupportedVersion(i64),

    /// the payload file next to the index does not exist
    #[error("the index has no payload companion at {}", .0.display())]
    MissingCompanion(PathBuf),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// an entry record failed its consistency check
    #[error(transparent)]
    CorruptEntry(#[from] CorruptEntryError),

    /// path can not be stored in, or extracted from, a data package
    #[error("invalid entry path {path:?}: {reason}")]
    InvalidPath {
        /// offending path
        path: String,
        /// why it was refused
        reason: &'static str,
    },

    /// entry does not fit the 32 bit size fields of the format
    #[error("entry {0} exceeds the 4 GiB limit of the format")]
    EntryTooLarge(String),

    /// no data package has been opened
    #[error("no data package is open")]
    NotOpen,

    /// the operation was cancelled through its progress checkpoint
    #[error("operation cancelled")]
    Cancelled,
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Which redundant size field of an entry record disagreed with its primary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptField {
    /// the repeated compressed size
    CompressedSize,
    /// the repeated uncompressed size
    UncompressedSize,
    /// the path is absolute
    AbsolutePath,
}

impl std::fmt::Display for CorruptField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptField::CompressedSize => write!(f, "compressed size mismatch"),
            CorruptField::UncompressedSize => write!(f, "uncompressed size mismatch"),
            CorruptField::AbsolutePath => write!(f, "absolute path"),
        }
    }
}

/// A record that was skipped while loading an index
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("record {index} ({path}) is corrupt: {field}")]
pub struct CorruptEntryError {
    /// position of the record in the entry table
    pub index: u32,
    /// path as stored in the record
    pub path: String,
    /// which check failed
    pub field: CorruptField,
}

/// An entry that a batch operation had to leave out
#[derive(Debug)]
pub struct EntryFailure {
    /// Entry name, or the source path when no name could be derived
    pub name: String,
    /// Why the entry failed
    pub error: Error,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
