//! Base types for structure of TPI and TPD files.

use std::borrow::Cow;

use binrw::{binrw, BinRead, BinWrite};

use crate::error::{CorruptField, Error, Result};

/// Identifier at the start of every index and payload file
pub const IDENTIFIER: &str = "NetDragonDatPkg";

/// The only package version in circulation
pub const VERSION: i64 = 1000;

/// Fixed header constants, their meaning is unknown
pub const FLAG_1: i32 = 0x01;
pub const FLAG_2: i32 = 0x03;
pub const FLAG_3: i32 = 0x30;

/// Flag written on every entry record
pub const ENTRY_FLAG: u16 = 0x01;

/// Size of [`TpiHeader`] on disk
pub const TPI_HEADER_SIZE: u64 = 48;

/// Size of [`TpdHeader`] on disk, and so the offset of the first payload stream
pub const TPD_HEADER_SIZE: u64 = 32;

/// Longest path an entry record can hold
pub const MAX_PATH_LEN: usize = u8::MAX as usize;

const IDENTIFIER_SIZE: usize = 16;

fn identifier_bytes() -> [u8; IDENTIFIER_SIZE] {
    let mut bytes = [0u8; IDENTIFIER_SIZE];
    bytes[..IDENTIFIER.len()].copy_from_slice(IDENTIFIER.as_bytes());
    bytes
}

fn identifier_str(bytes: &[u8; IDENTIFIER_SIZE]) -> Cow<'_, str> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
}

/// TPI file header
///
/// Starts with the NUL padded identifier `NetDragonDatPkg` and the version (1000).
/// All data is stored in little endian format.
///
/// A zeroed header (`TpiHeader::default()`) is what a closed archive reports.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct TpiHeader {
    /// NUL padded ASCII identifier
    pub identifier: [u8; IDENTIFIER_SIZE],

    /// Format version
    pub version: i64,

    /// Always [`FLAG_1`]
    pub flag1: i32,

    /// Always [`FLAG_2`]
    pub flag2: i32,

    /// Always [`FLAG_3`]
    pub flag3: i32,

    /// The number of entry records following the header
    pub entries: u32,

    /// The offset from the beginning of the file of the last entry record
    pub last_entry_offset: u32,

    /// Always zero
    pub reserved: i32,
}

impl TpiHeader {
    /// Creates a header with the fixed constants filled in
    pub fn new(entries: u32, last_entry_offset: u32) -> Self {
        Self {
            identifier: identifier_bytes(),
            version: VERSION,
            flag1: FLAG_1,
            flag2: FLAG_2,
            flag3: FLAG_3,
            entries,
            last_entry_offset,
            reserved: 0,
        }
    }

    /// The identifier up to its first NUL byte
    pub fn identifier(&self) -> Cow<'_, str> {
        identifier_str(&self.identifier)
    }

    /// Checks the identifier and then the version
    pub fn validate(&self) -> Result<()> {
        if self.identifier() != IDENTIFIER {
            return Err(Error::InvalidFormat {
                identifier: self.identifier().into_owned(),
            });
        }
        if self.version != VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// TPD file header
///
/// The payload file starts with a copy of the first 32 bytes of the index header.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct TpdHeader {
    /// NUL padded ASCII identifier
    pub identifier: [u8; IDENTIFIER_SIZE],

    /// Format version
    pub version: i64,

    /// Always [`FLAG_1`]
    pub flag1: i32,

    /// Always [`FLAG_2`]
    pub flag2: i32,
}

impl TpdHeader {
    /// The identifier up to its first NUL byte
    pub fn identifier(&self) -> Cow<'_, str> {
        identifier_str(&self.identifier)
    }
}

impl From<&TpiHeader> for TpdHeader {
    fn from(header: &TpiHeader) -> Self {
        Self {
            identifier: header.identifier,
            version: header.version,
            flag1: header.flag1,
            flag2: header.flag2,
        }
    }
}

/// TPI entry record
///
/// Variable length: a one byte path length, the path, then fixed width fields.
/// Both sizes are stored twice, the repeats only serve as a consistency check.
#[binrw]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct TpiRecord {
    #[br(temp)]
    #[bw(try_calc = u8::try_from(path.len()))]
    path_len: u8,

    /// Raw path bytes, normally lowercase with `/` separators
    #[br(count = path_len)]
    pub path: Vec<u8>,

    /// Always [`ENTRY_FLAG`] in packages we know of
    pub flag: u16,

    /// The size of the entry once inflated
    pub uncompressed_size: u32,

    /// The size of the zlib stream in the payload file
    pub compressed_size: u32,

    /// Must equal `compressed_size`
    pub compressed_size_check: u32,

    /// Must equal `uncompressed_size`
    pub uncompressed_size_check: u32,

    /// Absolute offset of the zlib stream in the payload file
    pub offset: u32,
}

impl TpiRecord {
    /// Creates a record with both size repeats filled in
    pub fn new(path: impl Into<Vec<u8>>, uncompressed_size: u32, compressed_size: u32, offset: u32) -> Self {
        Self {
            path: path.into(),
            flag: ENTRY_FLAG,
            uncompressed_size,
            compressed_size,
            compressed_size_check: compressed_size,
            uncompressed_size_check: uncompressed_size,
            offset,
        }
    }

    /// Size of this record on disk
    pub fn encoded_len(&self) -> usize {
        1 + self.path.len() + 2 + 4 * 5
    }

    /// The path decoded as UTF-8, replacing invalid sequences
    pub fn path_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path)
    }

    /// Returns the first redundant field that disagrees with its primary
    pub fn corruption(&self) -> Option<CorruptField> {
        if self.compressed_size_check != self.compressed_size {
            Some(CorruptField::CompressedSize)
        } else if self.uncompressed_size_check != self.uncompressed_size {
            Some(CorruptField::UncompressedSize)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::{CorruptField, Error, Result};
    use crate::types::{TpdHeader, TpiHeader, TpiRecord};

    #[rustfmt::skip]
    const HEADER: [u8; 48] = [
        0x4E, 0x65, 0x74, 0x44, 0x72, 0x61, 0x67, 0x6F,
        0x6E, 0x44, 0x61, 0x74, 0x50, 0x6B, 0x67, 0x00,
        0xE8, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00,
        0x03, 0x00, 0x00, 0x00,
        0x30, 0x00, 0x00, 0x00,
        0x02, 0x00, 0x00, 0x00,
        0x46, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ];

    #[rustfmt::skip]
    const RECORD: [u8; 28] = [
        0x05,
        0x61, 0x2E, 0x74, 0x78, 0x74,
        0x01, 0x00,
        0x05, 0x00, 0x00, 0x00,
        0x0D, 0x00, 0x00, 0x00,
        0x0D, 0x00, 0x00, 0x00,
        0x05, 0x00, 0x00, 0x00,
        0x20, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn read_header() -> Result<()> {
        let header = TpiHeader::read(&mut Cursor::new(HEADER))?;

        assert_eq!(header, TpiHeader::new(2, 0x46));
        assert_eq!(header.identifier(), "NetDragonDatPkg");
        header.validate()?;

        Ok(())
    }

    #[test]
    fn write_header() -> Result<()> {
        let mut actual = Vec::new();
        TpiHeader::new(2, 0x46).write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, HEADER.to_vec());

        Ok(())
    }

    #[test]
    fn payload_header_is_index_prefix() -> Result<()> {
        let mut actual = Vec::new();
        TpdHeader::from(&TpiHeader::new(2, 0x46)).write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, HEADER[..32].to_vec());

        Ok(())
    }

    #[test]
    fn validate_rejects_bad_identifier() {
        let mut bytes = HEADER;
        bytes[0] = b'X';
        let header = TpiHeader::read(&mut Cursor::new(bytes)).unwrap();

        assert!(matches!(
            header.validate(),
            Err(Error::InvalidFormat { identifier }) if identifier == "XetDragonDatPkg"
        ));
    }

    #[test]
    fn validate_rejects_bad_version() {
        let mut bytes = HEADER;
        bytes[16] = 0xE9;
        let header = TpiHeader::read(&mut Cursor::new(bytes)).unwrap();

        assert!(matches!(
            header.validate(),
            Err(Error::UnsupportedVersion(1001))
        ));
    }

    #[test]
    fn zeroed_header_is_invalid() {
        assert!(matches!(
            TpiHeader::default().validate(),
            Err(Error::InvalidFormat { .. })
        ));
    }

    #[test]
    fn read_record() -> Result<()> {
        let record = TpiRecord::read(&mut Cursor::new(RECORD))?;

        assert_eq!(record, TpiRecord::new("a.txt", 5, 13, 32));
        assert_eq!(record.encoded_len(), RECORD.len());
        assert_eq!(record.corruption(), None);

        Ok(())
    }

    #[test]
    fn write_record() -> Result<()> {
        let mut actual = Vec::new();
        TpiRecord::new("a.txt", 5, 13, 32).write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, RECORD.to_vec());

        Ok(())
    }

    #[test]
    fn write_record_with_long_path_fails() {
        let record = TpiRecord::new(vec![b'a'; 256], 0, 0, 0);

        let mut actual = Vec::new();
        assert!(record.write(&mut Cursor::new(&mut actual)).is_err());
    }

    #[test]
    fn record_reports_mismatched_repeats() {
        let mut record = TpiRecord::new("a.txt", 5, 13, 32);
        record.compressed_size_check = 14;
        assert_eq!(record.corruption(), Some(CorruptField::CompressedSize));

        let mut record = TpiRecord::new("a.txt", 5, 13, 32);
        record.uncompressed_size_check = 4;
        assert_eq!(record.corruption(), Some(CorruptField::UncompressedSize));
    }
}
