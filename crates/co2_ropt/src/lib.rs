//! # ROPT Format Documentation
//!
//! This crate provides utilities to read and write the **role part table** (`RolePart.ropt`)
//! used by the game *Conquer Online*. The table maps every body part of a role to the ini files
//! describing its mesh and its motions, and lists the dummies parts are attached to.
//!
//! ## File Structure
//!
//! A ROPT file consists of a header, followed by the part records and then the dummy records.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Identifier             | 4 bytes: 0x54504F52 ("ROPT")                               |
//! | 0x0004         | Part Count             | 4 bytes: Number of part records                            |
//! | 0x0008         | Dummy Count            | 4 bytes: Number of dummy records                           |
//!
//! ### Part Records
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name                   | 32 bytes: NUL padded part name                          |
//! | 0x0020         | Mesh Ini               | 256 bytes: NUL padded path                              |
//! | 0x0120         | Motion Ini             | 256 bytes: NUL padded path                              |
//!
//! ### Dummy Records
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | ID                     | 4 bytes: Unique id of the dummy                         |
//! | 0x0004         | Name                   | 32 bytes: NUL padded dummy name                         |
//!
//! ## Additional Information
//!
//! - **File Extension**: `.ropt`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod error;
#[cfg(feature = "serde")]
mod serde;
pub mod table;
pub mod types;

pub use table::RolePartTable;
pub use types::{Dummy, FixedString, RolePart};
