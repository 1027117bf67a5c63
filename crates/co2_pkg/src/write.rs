//! Types for writing data packages
//!

use binrw::BinWrite;
use bon::Builder;
use std::{
    collections::HashSet,
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::{
    compression::{checkpoint, CompressionLevel, StreamCodec},
    error::{EntryFailure, Error, Result},
    path::{companion_path, index_path_for, normalize, partial_path},
    progress::{Progress, Stage},
    types::{TpdHeader, TpiHeader, TpiRecord, MAX_PATH_LEN, TPD_HEADER_SIZE, TPI_HEADER_SIZE},
};

/// Options for how a directory is packed
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct PackOptions {
    /// The zlib level every entry is compressed with
    #[builder(default)]
    pub level: CompressionLevel,

    /// Name entries relative to the parent of the source directory
    ///
    /// Every entry then starts with the name of the source directory itself, which is how
    /// the old packing tool laid out `c3.tpi` and friends.
    #[builder(default)]
    pub include_root: bool,
}

/// Outcome of [`pack`]
#[derive(Debug, Default)]
pub struct PackReport {
    /// Names of the entries stored in the package, in package order
    pub packed: Vec<String>,
    /// Files that were left out
    pub failures: Vec<EntryFailure>,
}

impl PackReport {
    /// Whether every file of the source directory was packed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Both streams of a finished package
#[derive(Debug)]
pub struct Finished<I, D> {
    /// The index stream, positioned after the last record
    pub index: I,
    /// The payload stream
    pub payload: D,
    /// The header as written at the start of the index
    pub header: TpiHeader,
    /// Length of the payload. Anything the stream holds past it is left over from a rejected
    /// entry and should be cut off.
    pub payload_len: u64,
}

/// Data package generator
///
/// ```
/// # fn doit() -> co2_pkg::error::Result<()>
/// # {
/// use std::io::Cursor;
/// use co2_pkg::{CompressionLevel, TpiWriter};
///
/// // We use buffers here, though you'd normally use a pair of `File`s
/// let mut writer = TpiWriter::start(
///     Cursor::new(Vec::new()),
///     Cursor::new(Vec::new()),
///     CompressionLevel::Best,
/// )?;
///
/// writer.add_file("ini/hello.txt", &mut &b"Hello, World!"[..], &mut ())?;
///
/// let finished = writer.finish(&mut ())?;
/// assert_eq!(finished.header.entries, 1);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct TpiWriter<I: Write + Seek, D: Write + Seek> {
    index: I,
    payload: D,
    level: CompressionLevel,
    codec: StreamCodec,
    records: Vec<TpiRecord>,
    names: HashSet<String>,
    cursor: u64,
}

impl<I: Write + Seek, D: Write + Seek> TpiWriter<I, D> {
    /// Writes a placeholder index header and the payload header
    ///
    /// The index header is rewritten with its final values by [`TpiWriter::finish`].
    pub fn start(mut index: I, mut payload: D, level: CompressionLevel) -> Result<Self> {
        let placeholder = TpiHeader::new(0, 0);
        placeholder.write(&mut index)?;
        TpdHeader::from(&placeholder).write(&mut payload)?;

        Ok(TpiWriter {
            index,
            payload,
            level,
            codec: StreamCodec::new(),
            records: Vec::new(),
            names: HashSet::new(),
            cursor: TPD_HEADER_SIZE,
        })
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no entry has been added
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compresses everything left in `source` into a new entry called `name`
    ///
    /// The name is normalized before it is stored. On failure nothing of the entry remains,
    /// the next entry is written where this one would have started.
    #[instrument(skip(self, source, progress), err)]
    pub fn add_file<R: Read>(
        &mut self,
        name: &str,
        source: &mut R,
        progress: &mut dyn Progress,
    ) -> Result<TpiRecord> {
        let key = self.check_name(name)?;
        let offset = u32::try_from(self.cursor).map_err(|_| Error::EntryTooLarge(key.clone()))?;

        self.payload.seek(SeekFrom::Start(self.cursor))?;
        let outcome = match self.codec.deflate(source, &mut self.payload, self.level, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.payload.seek(SeekFrom::Start(self.cursor))?;
                return Err(e);
            }
        };

        let sizes = (
            u32::try_from(outcome.consumed),
            u32::try_from(outcome.produced),
        );
        let (Ok(uncompressed), Ok(compressed)) = sizes else {
            self.payload.seek(SeekFrom::Start(self.cursor))?;
            return Err(Error::EntryTooLarge(key));
        };

        let record = TpiRecord::new(key.as_bytes(), uncompressed, compressed, offset);
        self.cursor += outcome.produced;
        self.names.insert(key);
        self.records.push(record.clone());

        Ok(record)
    }

    fn check_name(&self, name: &str) -> Result<String> {
        let invalid = |reason| Error::InvalidPath {
            path: name.to_owned(),
            reason,
        };

        let key = normalize(name).ok_or_else(|| invalid("absolute paths can not be stored"))?;
        if key.is_empty() {
            return Err(invalid("empty path"));
        }
        if key.len() > MAX_PATH_LEN {
            return Err(invalid("longer than 255 bytes"));
        }
        if self.names.contains(&key) {
            return Err(invalid("another entry has the same name"));
        }
        Ok(key)
    }

    /// Writes the entry table and the final index header
    #[instrument(skip_all, err)]
    pub fn finish(mut self, progress: &mut dyn Progress) -> Result<Finished<I, D>> {
        progress.stage(Stage::WritingEntries, self.records.len());
        self.index.seek(SeekFrom::Start(TPI_HEADER_SIZE))?;

        let mut last_entry_offset = 0;
        for record in &self.records {
            last_entry_offset = self.index.stream_position()?;
            record.write(&mut self.index)?;
        }
        let end = self.index.stream_position()?;

        progress.stage(Stage::FinalizingHeader, 1);
        let header = TpiHeader::new(
            self.records.len() as u32,
            u32::try_from(last_entry_offset).map_err(|_| Error::EntryTooLarge("entry table".into()))?,
        );
        self.index.seek(SeekFrom::Start(0))?;
        header.write(&mut self.index)?;
        self.index.seek(SeekFrom::Start(end))?;

        self.index.flush()?;
        self.payload.flush()?;

        Ok(Finished {
            index: self.index,
            payload: self.payload,
            header,
            payload_len: self.cursor,
        })
    }
}

/// Packs every regular file below `source` into the package `destination`
///
/// `destination` names the index; `.tpi` is appended when missing and the payload is
/// written next to it. Files are stored sorted by their normalized name. Both files are
/// written under a `.partial` name first and only renamed into place once complete, so a
/// failed or cancelled pack leaves no package behind.
///
/// Files that can not be packed are listed in the report, everything else is still packed.
#[instrument(
    skip(options, progress),
    fields(source = %source.as_ref().display(), destination = %destination.as_ref().display()),
    err
)]
pub fn pack(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: PackOptions,
    mut progress: impl Progress,
) -> Result<PackReport> {
    let source = source.as_ref();
    if !source.is_dir() {
        return Err(Error::InvalidPath {
            path: source.display().to_string(),
            reason: "source is not a directory",
        });
    }

    let index_path = index_path_for(destination.as_ref());
    let payload_path = companion_path(&index_path);
    if let Some(parent) = index_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    progress.stage(Stage::Scanning, 0);
    let root = if options.include_root {
        source.parent().unwrap_or(source)
    } else {
        source
    };
    let mut report = PackReport::default();
    let files = scan(source, root, &mut report.failures);

    let index_partial = partial_path(&index_path);
    let payload_partial = partial_path(&payload_path);

    let written = write_partials(
        &files,
        &index_partial,
        &payload_partial,
        options.level,
        &mut report,
        &mut progress,
    )
    .and_then(|()| {
        fs::rename(&payload_partial, &payload_path)?;
        fs::rename(&index_partial, &index_path)?;
        Ok(())
    });

    if let Err(e) = written {
        for partial in [&index_partial, &payload_partial] {
            if let Err(error) = fs::remove_file(partial) {
                warn!(path = %partial.display(), %error, "unable to remove partial file");
            }
        }
        return Err(e);
    }

    progress.stage(Stage::Done, report.packed.len());
    info!(
        packed = report.packed.len(),
        failed = report.failures.len(),
        "package written"
    );

    Ok(report)
}

/// Regular files below `source` with their entry names, sorted by normalized name
///
/// Names that only differ in case keep a fixed order, so the same one is always dropped as a
/// duplicate.
fn scan(source: &Path, root: &Path, failures: &mut Vec<EntryFailure>) -> Vec<(String, PathBuf)> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let name = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| source.display().to_string());
                warn!(%name, error = %e, "unable to scan");
                failures.push(EntryFailure {
                    name,
                    error: std::io::Error::from(e).into(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join("/"));

        match name {
            Some(name) => files.push((name, entry.into_path())),
            None => {
                let name = relative.display().to_string();
                warn!(%name, "skipping file with a name that is not UTF-8");
                failures.push(EntryFailure {
                    error: Error::InvalidPath {
                        path: name.clone(),
                        reason: "not valid UTF-8",
                    },
                    name,
                });
            }
        }
    }

    files.sort_by_cached_key(|(name, _)| (name.to_lowercase(), name.clone()));
    files
}

fn write_partials(
    files: &[(String, PathBuf)],
    index_partial: &Path,
    payload_partial: &Path,
    level: CompressionLevel,
    report: &mut PackReport,
    progress: &mut dyn Progress,
) -> Result<()> {
    let mut writer = TpiWriter::start(
        BufWriter::new(File::create(index_partial)?),
        BufWriter::new(File::create(payload_partial)?),
        level,
    )?;

    progress.stage(Stage::Compressing, files.len());
    for (position, (name, path)) in files.iter().enumerate() {
        checkpoint(progress.entry(position, name))?;

        let added = File::open(path)
            .map_err(Error::from)
            .and_then(|file| writer.add_file(name, &mut BufReader::new(file), progress));

        match added {
            Ok(_) => report.packed.push(name.clone()),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(error) => {
                warn!(%name, %error, "leaving file out of the package");
                report.failures.push(EntryFailure {
                    name: name.clone(),
                    error,
                });
            }
        }
    }

    let finished = writer.finish(progress)?;

    finished.index.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    let payload = finished.payload.into_inner().map_err(|e| e.into_error())?;
    payload.set_len(finished.payload_len)?;
    payload.sync_all()?;

    Ok(())
}
