//! The message buffer
//!

use byteorder::{ByteOrder, LittleEndian};
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{Error, Result};

/// Origin of a [`Msg::seek`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MsgSeek {
    /// From the start of the buffer
    Set,
    /// From the cursor
    Current,
    /// Backwards from the end of the buffer, `len - offset`
    End,
}

/// The 4 byte header every packet starts with
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MsgHeader {
    /// Length of the whole packet
    pub length: u16,
    /// Packet type
    pub kind: u16,
}

impl MsgHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 4;
}

/// A zero filled, fixed length byte buffer with a cursor
///
/// Writes go to the cursor and advance it. A write that does not fit the rest of the buffer
/// fails with [`Error::Overflow`] and leaves the buffer untouched.
///
/// ```
/// use co2_msg::{Msg, MsgSeek};
///
/// let mut msg = Msg::new(12);
/// msg.write_u16(12)?;
/// msg.write_u16(1001)?;
/// msg.write_str("hero", true)?;
///
/// msg.seek(2, MsgSeek::Set)?;
/// assert_eq!(msg.header()?.kind, 1001);
/// assert_eq!(&msg.as_bytes()[4..9], b"\x04hero");
/// # Ok::<(), co2_msg::error::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Msg {
    buffer: Vec<u8>,
    position: usize,
}

macro_rules! write_int {
    ($(#[$doc:meta] $name:ident: $ty:ty => $write:ident;)*) => {
        $(
            #[$doc]
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                LittleEndian::$write(&mut bytes, value);
                self.write_bytes(&bytes)
            }
        )*
    };
}

impl Msg {
    /// Creates a zero filled message of `len` bytes
    pub fn new(len: usize) -> Self {
        Self {
            buffer: vec![0u8; len],
            position: 0,
        }
    }

    /// Creates a message holding a copy of `bytes`
    ///
    /// The cursor is left at the end, as if `bytes` had just been written.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            buffer: bytes.to_vec(),
            position: bytes.len(),
        }
    }

    /// Length of the buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer has no bytes at all
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor and returns its new position
    ///
    /// The cursor may be moved past the end, but never before the start.
    pub fn seek(&mut self, offset: i64, whence: MsgSeek) -> Result<usize> {
        let base = match whence {
            MsgSeek::Set => 0,
            MsgSeek::Current => self.position as i64,
            MsgSeek::End => self.buffer.len() as i64,
        };
        let target = match whence {
            MsgSeek::End => base.checked_sub(offset),
            _ => base.checked_add(offset),
        }
        .unwrap_or(i64::MIN);

        self.position = usize::try_from(target).map_err(|_| Error::InvalidSeek(target))?;
        Ok(self.position)
    }

    /// Writes an `i8`
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a `u8`
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    write_int! {
        /// Writes a little-endian `i16`
        write_i16: i16 => write_i16;
        /// Writes a little-endian `u16`
        write_u16: u16 => write_u16;
        /// Writes a little-endian `i32`
        write_i32: i32 => write_i32;
        /// Writes a little-endian `u32`
        write_u32: u32 => write_u32;
        /// Writes a little-endian `i64`
        write_i64: i64 => write_i64;
        /// Writes a little-endian `u64`
        write_u64: u64 => write_u64;
    }

    /// Writes `bytes` at the cursor
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let end = self
            .position
            .checked_add(bytes.len())
            .filter(|&end| end <= self.buffer.len())
            .ok_or(Error::Overflow {
                position: self.position,
                needed: bytes.len(),
                len: self.buffer.len(),
            })?;

        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    /// Writes `value` as UTF-8, optionally after a one byte length
    pub fn write_str(&mut self, value: &str, with_length: bool) -> Result<()> {
        if !with_length {
            return self.write_bytes(value.as_bytes());
        }

        let len = u8::try_from(value.len()).map_err(|_| Error::StringTooLong(value.len()))?;
        self.write_bytes(&[[len].as_slice(), value.as_bytes()].concat())
    }

    /// Writes every string of `values` with [`Msg::write_str`]
    ///
    /// Stops at the first string that does not fit.
    pub fn write_strs<S: AsRef<str>>(&mut self, values: &[S], with_length: bool) -> Result<()> {
        values
            .iter()
            .try_for_each(|value| self.write_str(value.as_ref(), with_length))
    }

    /// Grows the buffer by `data`, leaving the cursor where it is
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Reads the packet header at the start of the buffer
    pub fn header(&self) -> Result<MsgHeader> {
        if self.buffer.len() < MsgHeader::SIZE {
            return Err(Error::Overflow {
                position: 0,
                needed: MsgHeader::SIZE,
                len: self.buffer.len(),
            });
        }
        Ok(MsgHeader {
            length: LittleEndian::read_u16(&self.buffer[0..2]),
            kind: LittleEndian::read_u16(&self.buffer[2..4]),
        })
    }

    /// Writes `header` at the start of the buffer, leaving the cursor where it is
    pub fn set_header(&mut self, header: MsgHeader) -> Result<()> {
        let mut bytes = [0u8; MsgHeader::SIZE];
        LittleEndian::write_u16(&mut bytes[..2], header.length);
        LittleEndian::write_u16(&mut bytes[2..], header.kind);

        let position = std::mem::replace(&mut self.position, 0);
        let written = self.write_bytes(&bytes);
        self.position = position;
        written
    }

    /// The whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// A copy of the whole buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    /// A copy of the first `len` bytes
    pub fn to_bytes_truncated(&self, len: usize) -> Result<Vec<u8>> {
        self.buffer
            .get(..len)
            .map(<[u8]>::to_vec)
            .ok_or(Error::Overflow {
                position: 0,
                needed: len,
                len: self.buffer.len(),
            })
    }

    /// Consumes the message, returning its buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl From<Vec<u8>> for Msg {
    fn from(buffer: Vec<u8>) -> Self {
        let position = buffer.len();
        Self { buffer, position }
    }
}

impl Read for Msg {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let rest = self.buffer.get(self.position..).unwrap_or_default();
        let read = rest.len().min(buf.len());
        buf[..read].copy_from_slice(&rest[..read]);
        self.position += read;
        Ok(read)
    }
}

impl Write for Msg {
    /// Writes all of `buf` or nothing
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for Msg {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let moved = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset)
                .map_err(|_| Error::InvalidSeek(i64::MAX))
                .and_then(|offset| Msg::seek(self, offset, MsgSeek::Set)),
            SeekFrom::Current(offset) => Msg::seek(self, offset, MsgSeek::Current),
            SeekFrom::End(offset) => offset
                .checked_neg()
                .ok_or(Error::InvalidSeek(offset))
                .and_then(|offset| Msg::seek(self, offset, MsgSeek::End)),
        };
        moved
            .map(|position| position as u64)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Seek, SeekFrom};

    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::msg::{Msg, MsgHeader, MsgSeek};

    #[test]
    fn typed_writes_are_little_endian() -> Result<()> {
        let mut msg = Msg::new(30);
        msg.write_i8(-1)?;
        msg.write_u8(0x12)?;
        msg.write_i16(-2)?;
        msg.write_u16(0x3456)?;
        msg.write_i32(-3)?;
        msg.write_u32(0x789A_BCDE)?;
        msg.write_i64(-4)?;
        msg.write_u64(0x0102_0304_0506_0708)?;

        #[rustfmt::skip]
        let expected = vec![
            0xFF,
            0x12,
            0xFE, 0xFF,
            0x56, 0x34,
            0xFD, 0xFF, 0xFF, 0xFF,
            0xDE, 0xBC, 0x9A, 0x78,
            0xFC, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01,
        ];
        assert_eq!(msg.position(), 30);
        assert_eq!(msg.to_bytes(), expected);

        Ok(())
    }

    #[test]
    fn seek_modes() -> Result<()> {
        let mut msg = Msg::new(16);

        assert_eq!(msg.seek(4, MsgSeek::Set)?, 4);
        assert_eq!(msg.seek(3, MsgSeek::Current)?, 7);
        assert_eq!(msg.seek(-2, MsgSeek::Current)?, 5);
        assert_eq!(msg.seek(6, MsgSeek::End)?, 10);
        assert_eq!(msg.seek(20, MsgSeek::Set)?, 20);

        assert_eq!(msg.seek(-1, MsgSeek::Set), Err(Error::InvalidSeek(-1)));
        assert_eq!(msg.seek(17, MsgSeek::End), Err(Error::InvalidSeek(-1)));
        assert_eq!(msg.position(), 20);

        Ok(())
    }

    #[test]
    fn overflow_leaves_buffer_untouched() -> Result<()> {
        let mut msg = Msg::new(6);
        msg.write_u32(0xAABB_CCDD)?;

        assert_eq!(
            msg.write_u32(1),
            Err(Error::Overflow {
                position: 4,
                needed: 4,
                len: 6
            })
        );
        assert_eq!(msg.position(), 4);
        assert_eq!(msg.to_bytes(), vec![0xDD, 0xCC, 0xBB, 0xAA, 0, 0]);

        msg.seek(10, MsgSeek::Set)?;
        assert!(matches!(msg.write_u8(1), Err(Error::Overflow { .. })));
        msg.write_bytes(&[])?;
        msg.write_str("", false)?;
        assert_eq!(msg.position(), 10);
        assert_eq!(msg.len(), 6);

        Ok(())
    }

    #[test]
    fn strings_with_and_without_length() -> Result<()> {
        let mut msg = Msg::new(14);
        msg.write_str("abc", false)?;
        msg.write_strs(&["de", "f"], true)?;
        msg.write_strs(&[String::from("gh")], false)?;

        assert_eq!(msg.position(), 3 + 3 + 2 + 2);
        assert_eq!(&msg.as_bytes()[..10], b"abc\x02de\x01fgh");

        assert_eq!(msg.write_str("toolong", true), Err(Error::Overflow { position: 10, needed: 8, len: 14 }));
        assert_eq!(
            msg.write_str(&"x".repeat(256), true),
            Err(Error::StringTooLong(256))
        );

        Ok(())
    }

    #[test]
    fn header_and_truncation() -> Result<()> {
        let mut msg = Msg::new(8);
        msg.seek(4, MsgSeek::Set)?;
        msg.set_header(MsgHeader {
            length: 8,
            kind: 1052,
        })?;
        assert_eq!(msg.position(), 4);
        assert_eq!(msg.header()?, MsgHeader { length: 8, kind: 1052 });
        assert_eq!(msg.to_bytes_truncated(4)?, vec![0x08, 0x00, 0x1C, 0x04]);
        assert!(msg.to_bytes_truncated(9).is_err());

        assert!(Msg::new(3).header().is_err());

        Ok(())
    }

    #[test]
    fn append_grows_the_buffer() -> Result<()> {
        let mut msg = Msg::from_bytes(&[1, 2]);
        assert_eq!(msg.position(), 2);

        msg.append(&[3, 4]);
        assert_eq!(msg.len(), 4);
        msg.write_u16(0x0605)?;
        assert_eq!(msg.into_bytes(), vec![1, 2, 5, 6]);

        Ok(())
    }

    #[test]
    fn io_traits_drive_byteorder() -> std::io::Result<()> {
        let mut msg = Msg::new(6);
        // the inherent typed writes shadow the byteorder ones
        WriteBytesExt::write_u16::<LittleEndian>(&mut msg, 0x1234)?;
        WriteBytesExt::write_u32::<LittleEndian>(&mut msg, 0xDEAD_BEEF)?;
        assert!(msg.write_u8(0).is_err());

        msg.rewind()?;
        assert_eq!(msg.read_u16::<LittleEndian>()?, 0x1234);
        assert_eq!(msg.read_u32::<LittleEndian>()?, 0xDEAD_BEEF);

        let mut rest = Vec::new();
        assert_eq!(msg.read_to_end(&mut rest)?, 0);

        assert_eq!(Seek::seek(&mut msg, SeekFrom::End(-2))?, 4);
        assert!(Seek::seek(&mut msg, SeekFrom::Current(-5)).is_err());

        Ok(())
    }
}
