//! Reading and writing role part tables
//!

use binrw::{BinRead, BinWrite};
use indexmap::{map::Entry, IndexMap};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Seek, Write},
    path::Path,
};
use tracing::{debug, instrument, warn};

use crate::{
    error::{Error, Result},
    types::{Dummy, RolePart, RoptHeader, IDENTIFIER},
};

/// Role part table
///
/// Parts are keyed by name and dummies by id. The first record for a key wins, later ones are
/// dropped. Records keep the order they were read or inserted in.
///
/// ```no_run
/// fn list_parts(path: &str) -> co2_ropt::error::Result<()> {
///     let ropt = co2_ropt::RolePartTable::open(path)?;
///
///     for part in ropt.parts() {
///         println!("{}", part);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RolePartTable {
    parts: IndexMap<Box<[u8]>, RolePart>,
    dummies: IndexMap<i32, Dummy>,
}

impl RolePartTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a table from the file at `path`
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(&mut BufReader::new(File::open(path)?))
    }

    /// Reads a table
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header = RoptHeader::read(reader)?;
        if header.identifier != IDENTIFIER {
            return Err(Error::InvalidFile {
                identifier: header.identifier,
            });
        }

        let mut table = Self::new();
        for _ in 0..record_count(header.part_count) {
            let part = RolePart::read(reader)?;
            if !table.insert_part(part) {
                debug!(name = %part.name, "dropping duplicate part");
            }
        }
        for _ in 0..record_count(header.dummy_count) {
            let dummy = Dummy::read(reader)?;
            if !table.insert_dummy(dummy) {
                debug!(id = dummy.id, "dropping duplicate dummy");
            }
        }

        Ok(table)
    }

    /// Writes the table to the file at `path`, replacing it
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the header, every part and then every dummy
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        let header = RoptHeader {
            identifier: IDENTIFIER,
            part_count: i32::try_from(self.parts.len()).map_err(|_| Error::TooManyRecords)?,
            dummy_count: i32::try_from(self.dummies.len()).map_err(|_| Error::TooManyRecords)?,
        };
        header.write(writer)?;

        for part in self.parts.values() {
            part.write(writer)?;
        }
        for dummy in self.dummies.values() {
            dummy.write(writer)?;
        }

        Ok(())
    }

    /// Removes every record
    pub fn clear(&mut self) {
        self.parts.clear();
        self.dummies.clear();
    }

    /// Adds `part` unless a part with the same name exists
    ///
    /// Returns whether it was added.
    pub fn insert_part(&mut self, part: RolePart) -> bool {
        match self.parts.entry(part.name.as_bytes().into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(part);
                true
            }
        }
    }

    /// Adds `dummy` unless a dummy with the same id exists
    ///
    /// Returns whether it was added.
    pub fn insert_dummy(&mut self, dummy: Dummy) -> bool {
        match self.dummies.entry(dummy.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(dummy);
                true
            }
        }
    }

    /// The part called `name`
    pub fn part(&self, name: impl AsRef<[u8]>) -> Option<&RolePart> {
        self.parts.get(name.as_ref())
    }

    /// The dummy with `id`
    pub fn dummy(&self, id: i32) -> Option<&Dummy> {
        self.dummies.get(&id)
    }

    /// All parts in table order
    pub fn parts(&self) -> impl Iterator<Item = &RolePart> {
        self.parts.values()
    }

    /// All dummies in table order
    pub fn dummies(&self) -> impl Iterator<Item = &Dummy> {
        self.dummies.values()
    }

    /// Number of parts
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Number of dummies
    pub fn dummy_count(&self) -> usize {
        self.dummies.len()
    }

    /// Whether the table holds no records
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.dummies.is_empty()
    }
}

fn record_count(count: i32) -> u32 {
    u32::try_from(count).unwrap_or_else(|_| {
        warn!(count, "negative record count, reading none");
        0
    })
}
