//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum Error {
    /// A write does not fit the rest of the buffer
    #[error("writing {needed} bytes at {position} overflows a {len} byte message")]
    #[diagnostic(help("size the message for its whole payload, or grow it with `append`"))]
    Overflow {
        /// cursor position when writing
        position: usize,
        /// bytes the write needed
        needed: usize,
        /// length of the message
        len: usize,
    },

    /// A seek would move the cursor before the start of the buffer
    #[error("seeking to {0} moves before the start of the message")]
    InvalidSeek(i64),

    /// A length prefixed string is longer than its one byte prefix can count
    #[error("string of {0} bytes is too long for a one byte length prefix")]
    StringTooLong(usize),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
