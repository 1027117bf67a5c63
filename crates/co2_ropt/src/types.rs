//! Records of a role part table
//!

use binrw::{BinRead, BinResult, BinWrite, Endian};
use derive_more::derive::Display;
use std::{
    borrow::Cow,
    fmt,
    io::{Read, Seek, Write},
};

use crate::error::{Error, Result};

/// `ROPT` read as a little-endian integer
pub const IDENTIFIER: u32 = 0x54504F52;

/// Width of a name field
pub const NAME_SIZE: usize = 0x20;

/// Width of a path field
pub const PATH_SIZE: usize = 0x100;

/// A NUL padded string stored in exactly `N` bytes
///
/// Strings are kept as raw bytes, the client writes them in its local code page.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedString<const N: usize>([u8; N]);

impl<const N: usize> FixedString<N> {
    /// Longest string that still leaves room for the terminating NUL
    pub const MAX_LEN: usize = N - 1;

    /// Copies `bytes` into a zero filled field
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > Self::MAX_LEN {
            return Err(Error::FieldTooLong {
                len: bytes.len(),
                max: Self::MAX_LEN,
            });
        }
        let mut raw = [0u8; N];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// The bytes before the first NUL
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    /// The string decoded as UTF-8, replacing invalid sequences
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Returns true if the string is empty
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl<const N: usize> Default for FixedString<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> TryFrom<&str> for FixedString<N> {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::from_bytes(value.as_bytes())
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl<const N: usize> BinRead for FixedString<N> {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<Self> {
        <[u8; N]>::read_options(reader, endian, args).map(Self)
    }
}

impl<const N: usize> BinWrite for FixedString<N> {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.0.write_options(writer, endian, args)
    }
}

/// ROPT file header
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct RoptHeader {
    /// Always [`IDENTIFIER`]
    pub identifier: u32,

    /// Number of part records
    pub part_count: i32,

    /// Number of dummy records
    pub dummy_count: i32,
}

/// A body part with the ini files describing its mesh and motions
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, Display)]
#[brw(little)]
#[display("{name} ({mesh_ini}, {motion_ini})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RolePart {
    /// Part name, the key of the table
    pub name: FixedString<NAME_SIZE>,
    /// Mesh ini path
    pub mesh_ini: FixedString<PATH_SIZE>,
    /// Motion ini path
    pub motion_ini: FixedString<PATH_SIZE>,
}

impl RolePart {
    /// Creates a part, failing if a string does not fit its field
    pub fn new(name: &str, mesh_ini: &str, motion_ini: &str) -> Result<Self> {
        Ok(Self {
            name: name.try_into()?,
            mesh_ini: mesh_ini.try_into()?,
            motion_ini: motion_ini.try_into()?,
        })
    }
}

/// A named attachment point
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, Display)]
#[brw(little)]
#[display("{id}: {name}")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dummy {
    /// Unique id, the key of the table
    pub id: i32,
    /// Dummy name
    pub name: FixedString<NAME_SIZE>,
}

impl Dummy {
    /// Creates a dummy, failing if the name does not fit its field
    pub fn new(id: i32, name: &str) -> Result<Self> {
        Ok(Self {
            id,
            name: name.try_into()?,
        })
    }
}
