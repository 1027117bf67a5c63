//! Types for reading data packages
//!

use binrw::BinRead;
use indexmap::{map::Entry, IndexMap};
use parking_lot::RwLock;
use std::{
    fs::{self, File},
    io::{BufReader, Cursor, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

use crate::{
    compression::{InflateOutcome, StreamCodec},
    error::{CorruptEntryError, CorruptField, Error, FileNotFoundError, Result},
    path::{self, normalize},
    types::{TpdHeader, TpiHeader, TpiRecord, IDENTIFIER},
};

/// Upper bound on the index capacity reserved before reading the entry table
const MAX_PREALLOCATED: u32 = 4096;

/// Metadata of one entry of a data package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TpiEntry {
    /// Normalized name, the key of the index
    pub name: Box<str>,
    /// Raw name as stored in the record
    pub name_raw: Box<[u8]>,
    /// Record flag
    pub flag: u16,
    /// Size of the entry when extracted
    pub uncompressed_size: u32,
    /// Size of the zlib stream in the payload file
    pub compressed_size: u32,
    /// Absolute offset of the zlib stream in the payload file
    pub offset: u32,
    /// Position of the record in the index file
    pub record_offset: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) header: TpiHeader,
    pub(crate) entries: IndexMap<Box<str>, TpiEntry>,
    pub(crate) corrupt: Vec<CorruptEntryError>,
    pub(crate) index_path: Option<PathBuf>,
    pub(crate) payload_path: Option<PathBuf>,
}

impl Shared {
    pub(crate) fn lookup(&self, name: &str) -> Option<&TpiEntry> {
        let key = normalize(name)?;
        self.entries.get(key.as_str())
    }

    pub(crate) fn payload_path(&self) -> Result<&Path> {
        self.payload_path.as_deref().ok_or(Error::NotOpen)
    }
}

/// Data package reader
///
/// Holds the index of a `.tpi` file. Entry data is inflated on demand from the companion
/// `.tpd` file, which is opened for the duration of each read only.
///
/// ```no_run
/// fn list_package_contents(path: &str) -> co2_pkg::error::Result<()> {
///     let tpi = co2_pkg::TpiArchive::open_path(path)?;
///
///     for name in tpi.file_names() {
///         let data = tpi.get_entry_data(&name)?.unwrap_or_default();
///         println!("{}: {} bytes", name, data.len());
///     }
///
///     Ok(())
/// }
/// ```
///
/// Opening and closing take the internal lock exclusively, lookups and reads share it, so a
/// single archive may be used from several threads.
#[derive(Debug, Default)]
pub struct TpiArchive {
    pub(crate) shared: RwLock<Shared>,
}

impl TpiArchive {
    /// Creates a closed archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an archive and opens the package at `path`
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let archive = Self::new();
        archive.open(path)?;
        Ok(archive)
    }

    /// Opens the package at `path`, replacing anything previously opened
    ///
    /// On failure the archive is left closed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut shared = self.shared.write();
        *shared = Shared::default();
        *shared = Self::get_metadata(path.as_ref())?;
        debug!(
            entries = shared.entries.len(),
            corrupt = shared.corrupt.len(),
            "opened data package"
        );
        Ok(())
    }

    /// Clears the index and zeroes the header
    ///
    /// Closing an archive that is not open does nothing.
    pub fn close(&self) {
        *self.shared.write() = Shared::default();
    }

    /// Whether a package is currently open
    pub fn is_open(&self) -> bool {
        self.shared.read().index_path.is_some()
    }

    /// Header of the open package, zeroed when closed
    pub fn header(&self) -> TpiHeader {
        self.shared.read().header
    }

    /// Path of the open index file
    pub fn index_path(&self) -> Option<PathBuf> {
        self.shared.read().index_path.clone()
    }

    /// Path of the open payload file
    pub fn payload_path(&self) -> Option<PathBuf> {
        self.shared.read().payload_path.clone()
    }

    /// Number of entries in the index
    pub fn len(&self) -> usize {
        self.shared.read().entries.len()
    }

    /// Whether the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all entries, in index order
    pub fn file_names(&self) -> Vec<String> {
        self.shared
            .read()
            .entries
            .keys()
            .map(|name| name.to_string())
            .collect()
    }

    /// Metadata of all entries, in index order
    pub fn entries(&self) -> Vec<TpiEntry> {
        self.shared.read().entries.values().cloned().collect()
    }

    /// Records that were skipped while opening
    pub fn corrupt_entries(&self) -> Vec<CorruptEntryError> {
        self.shared.read().corrupt.clone()
    }

    /// Total size of the entries once extracted
    pub fn decompressed_size(&self) -> u64 {
        self.shared
            .read()
            .entries
            .values()
            .map(|entry| entry.uncompressed_size as u64)
            .sum()
    }

    /// Whether an entry is linked by `name`
    ///
    /// Separators and case are normalized. Absolute names never match.
    pub fn contains_entry(&self, name: &str) -> bool {
        self.shared.read().lookup(name).is_some()
    }

    /// Metadata of the entry linked by `name`
    pub fn entry(&self, name: &str) -> Option<TpiEntry> {
        self.shared.read().lookup(name).cloned()
    }

    /// Inflates the entry linked by `name` into memory
    ///
    /// Returns `Ok(None)` if there is no such entry. The buffer is always exactly the declared
    /// uncompressed size; a stream that ends early leaves the tail zeroed.
    #[instrument(skip(self), err)]
    pub fn get_entry_data(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let shared = self.shared.read();
        let Some(entry) = shared.lookup(name) else {
            return Ok(None);
        };

        let mut data = vec![0u8; entry.uncompressed_size as usize];
        let mut payload = open_payload_at(shared.payload_path()?, entry.offset)?;
        let outcome = StreamCodec::new().inflate(
            &mut payload,
            &mut Cursor::new(data.as_mut_slice()),
            &mut (),
        )?;
        check_outcome(entry, &outcome);

        Ok(Some(data))
    }

    /// Inflates the entry linked by `name` into `destination`
    ///
    /// Returns the number of bytes written, or `Ok(None)` if there is no such entry.
    #[instrument(skip(self, destination), err)]
    pub fn read_entry_to<W: Write>(&self, name: &str, destination: &mut W) -> Result<Option<u64>> {
        let shared = self.shared.read();
        let Some(entry) = shared.lookup(name) else {
            return Ok(None);
        };

        let mut payload = open_payload_at(shared.payload_path()?, entry.offset)?;
        let outcome = StreamCodec::new().inflate(&mut payload, destination, &mut ())?;
        check_outcome(entry, &outcome);

        Ok(Some(outcome.produced))
    }

    /// Inflates the entry linked by `name` into the file at `destination`
    ///
    /// Missing parent directories are created.
    #[instrument(skip(self, destination), fields(destination = %destination.as_ref().display()), err)]
    pub fn extract_entry(&self, name: &str, destination: impl AsRef<Path>) -> Result<u64> {
        if !self.contains_entry(name) {
            return Err(FileNotFoundError::Name(name.to_owned()).into());
        }

        let destination = destination.as_ref();
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(destination)?;

        self.read_entry_to(name, &mut out)?
            .ok_or_else(|| FileNotFoundError::Name(name.to_owned()).into())
    }

    fn get_metadata(index_path: &Path) -> Result<Shared> {
        let mut reader = BufReader::new(File::open(index_path)?);
        let header = TpiHeader::read(&mut reader)?;
        header.validate()?;

        let payload_path = path::companion_path(index_path);
        if !payload_path.is_file() {
            return Err(Error::MissingCompanion(payload_path));
        }
        Self::validate_payload(&payload_path)?;

        let (entries, corrupt) = Self::get_records(&mut reader, &header)?;

        Ok(Shared {
            header,
            entries,
            corrupt,
            index_path: Some(index_path.to_path_buf()),
            payload_path: Some(payload_path),
        })
    }

    fn validate_payload(payload_path: &Path) -> Result<()> {
        let header = TpdHeader::read(&mut BufReader::new(File::open(payload_path)?))?;
        if header.identifier() != IDENTIFIER {
            return Err(Error::InvalidFormat {
                identifier: header.identifier().into_owned(),
            });
        }
        Ok(())
    }

    pub(crate) fn get_records<R: Read + Seek>(
        reader: &mut R,
        header: &TpiHeader,
    ) -> Result<(IndexMap<Box<str>, TpiEntry>, Vec<CorruptEntryError>)> {
        // the count is untrusted, a short table fails on its first missing record
        let mut entries = IndexMap::with_capacity(header.entries.min(MAX_PREALLOCATED) as usize);
        let mut corrupt = Vec::new();

        for index in 0..header.entries {
            let record_offset = reader.stream_position()?;
            let record = TpiRecord::read(reader)?;

            let key = match (record.corruption(), normalize(&record.path_lossy())) {
                (Some(field), _) => Err(field),
                (None, None) => Err(CorruptField::AbsolutePath),
                (None, Some(key)) => Ok(key),
            };
            let key = match key {
                Ok(key) => key,
                Err(field) => {
                    let error = CorruptEntryError {
                        index,
                        path: record.path_lossy().into_owned(),
                        field,
                    };
                    warn!(%error, "skipping record");
                    corrupt.push(error);
                    continue;
                }
            };

            match entries.entry(key.into_boxed_str()) {
                Entry::Occupied(existing) => {
                    debug!(name = %existing.key(), index, "dropping duplicate record");
                }
                Entry::Vacant(slot) => {
                    let name = slot.key().clone();
                    slot.insert(TpiEntry {
                        name,
                        name_raw: record.path.into_boxed_slice(),
                        flag: record.flag,
                        uncompressed_size: record.uncompressed_size,
                        compressed_size: record.compressed_size,
                        offset: record.offset,
                        record_offset,
                    });
                }
            }
        }

        Ok((entries, corrupt))
    }
}

pub(crate) fn open_payload_at(payload_path: &Path, offset: u32) -> Result<File> {
    let mut payload = File::open(payload_path)?;
    payload.seek(SeekFrom::Start(offset as u64))?;
    Ok(payload)
}

pub(crate) fn check_outcome(entry: &TpiEntry, outcome: &InflateOutcome) {
    if !outcome.complete {
        warn!(
            name = %entry.name,
            produced = outcome.produced,
            expected = entry.uncompressed_size,
            "payload ended before the end of the stream"
        );
    } else if outcome.produced != entry.uncompressed_size as u64 {
        warn!(
            name = %entry.name,
            produced = outcome.produced,
            expected = entry.uncompressed_size,
            "entry size differs from its record"
        );
    }
}
