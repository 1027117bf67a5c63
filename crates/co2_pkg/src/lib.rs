//! This library handles reading from and creating the **NetDragon data packages** used by *Conquer Online*.
//!
//! # Data Package Format Documentation
//!
//! A data package is a pair of companion files sharing one base name: an index (`.tpi`) listing
//! every entry, and a payload (`.tpd`) holding one independently framed zlib stream per entry.
//! The client ships several of them, `c3.tpi`/`c3.tpd` and `data.tpi`/`data.tpd` among others.
//!
//! ## Index File
//!
//! The index starts with a fixed header followed by one variable length record per entry.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Identifier             | 16 bytes: `NetDragonDatPkg` padded with NUL                |
//! | 0x0010         | Version                | 8 bytes: Fixed value 1000                                  |
//! | 0x0018         | Flag 1                 | 4 bytes: Fixed value 0x01                                  |
//! | 0x001C         | Flag 2                 | 4 bytes: Fixed value 0x03                                  |
//! | 0x0020         | Flag 3                 | 4 bytes: Fixed value 0x30                                  |
//! | 0x0024         | Entry Count            | 4 bytes: Number of records following the header            |
//! | 0x0028         | Last Entry Offset      | 4 bytes: Offset of the final record, 0 when empty          |
//! | 0x002C         | Reserved               | 4 bytes: Always zero                                       |
//!
//! ### Entry Records
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Path Length            | 1 byte: Length `n` of the path                          |
//! | 0x0001         | Path                   | `n` bytes: Relative path, lowercase with `/` separators |
//! | 1 + n          | Flag                   | 2 bytes: Always 0x01                                    |
//! | 3 + n          | Uncompressed Size      | 4 bytes: Size of the entry once inflated                |
//! | 7 + n          | Compressed Size        | 4 bytes: Size of the zlib stream                        |
//! | 11 + n         | Compressed Size        | 4 bytes: Repeat, must match                             |
//! | 15 + n         | Uncompressed Size      | 4 bytes: Repeat, must match                             |
//! | 19 + n         | Offset                 | 4 bytes: Absolute offset of the stream in the payload   |
//!
//! A record whose repeated sizes disagree is reported as corrupt and left out of the index,
//! the records after it still load. Paths are matched case insensitively and with either
//! separator, so `Dir/File.txt` and `DIR\file.TXT` name the same entry. When two records share
//! a path the first one wins.
//!
//! ## Payload File
//!
//! The payload starts with a copy of the first 32 bytes of the index header. The rest is the
//! concatenation of the zlib streams, each found only through the offset of its record.
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.tpi` and `.tpd`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression**: zlib, the official client packs at level 3
//!

pub mod compression;
pub mod error;
pub mod extract;
pub mod path;
pub mod progress;
pub mod read;
pub mod types;
pub mod write;

pub use compression::CompressionLevel;
pub use extract::ExtractReport;
pub use progress::{Progress, Stage, TracingProgress};
pub use read::{TpiArchive, TpiEntry};
pub use write::{pack, PackOptions, PackReport, TpiWriter};
