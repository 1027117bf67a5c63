//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum Error {
    /// Buffer is not made of whole blocks
    #[error("buffer length {len} is not a multiple of the {block_size} byte block size")]
    InvalidLength {
        /// length of the rejected buffer
        len: usize,
        /// block size of the cipher
        block_size: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
