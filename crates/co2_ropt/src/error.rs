//! Error types that can be emitted from this library
//!

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

    /// File is not a role part table
    #[error("invalid role part table (identifier {identifier:#010X})")]
    #[diagnostic(help("role part tables start with `ROPT`"))]
    InvalidFile {
        /// identifier found at the start of the file
        identifier: u32,
    },

    /// A string does not fit its fixed width field
    #[error("{len} bytes do not fit a field holding at most {max}")]
    FieldTooLong {
        /// length of the rejected string
        len: usize,
        /// longest string the field can hold
        max: usize,
    },

    /// More records than the header can count
    #[error("too many records for the header")]
    TooManyRecords,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
