//! Extracting a whole data package to disk

use std::{
    fs::{self, File},
    io::{Seek, SeekFrom},
    path::Path,
};

use tracing::{info, instrument, warn};

use crate::{
    compression::{checkpoint, StreamCodec},
    error::{EntryFailure, Error, Result},
    path::resolve_below,
    progress::{Progress, Stage},
    read::{check_outcome, TpiArchive, TpiEntry},
};

/// Outcome of [`TpiArchive::extract_all`]
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Names of the entries written to disk
    pub extracted: Vec<String>,
    /// Entries that could not be written
    pub failures: Vec<EntryFailure>,
}

impl ExtractReport {
    /// Whether every entry was extracted
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl TpiArchive {
    /// Extracts every entry below `destination`, recreating the directory tree
    ///
    /// Entries are visited in index order. A failing entry is recorded in the report and the
    /// remaining entries are still extracted. Entries whose name would leave `destination`
    /// are refused.
    ///
    /// The entries are taken when the call starts. Reopening the archive from a progress
    /// callback does not change what this call extracts.
    #[instrument(skip_all, fields(destination = %destination.as_ref().display()), err)]
    pub fn extract_all(
        &self,
        destination: impl AsRef<Path>,
        mut progress: impl Progress,
    ) -> Result<ExtractReport> {
        let destination = destination.as_ref();
        // progress callbacks run without the lock held, so they may use the archive
        let (mut payload, entries) = {
            let shared = self.shared.read();
            let payload = File::open(shared.payload_path()?)?;
            (payload, shared.entries.values().cloned().collect::<Vec<_>>())
        };
        let mut codec = StreamCodec::new();
        let mut report = ExtractReport::default();

        progress.stage(Stage::Extracting, entries.len());
        for (index, entry) in entries.iter().enumerate() {
            checkpoint(progress.entry(index, &entry.name))?;

            match extract_one(&mut codec, &mut payload, destination, entry, &mut progress) {
                Ok(()) => report.extracted.push(entry.name.to_string()),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(error) => {
                    warn!(name = %entry.name, %error, "unable to extract entry");
                    report.failures.push(EntryFailure {
                        name: entry.name.to_string(),
                        error,
                    });
                }
            }
        }
        progress.stage(Stage::Done, report.extracted.len());

        info!(
            extracted = report.extracted.len(),
            failed = report.failures.len(),
            "extraction finished"
        );
        Ok(report)
    }
}

fn extract_one(
    codec: &mut StreamCodec,
    payload: &mut File,
    destination: &Path,
    entry: &TpiEntry,
    progress: &mut dyn Progress,
) -> Result<()> {
    let target = resolve_below(destination, &entry.name).ok_or_else(|| Error::InvalidPath {
        path: entry.name.to_string(),
        reason: "escapes the destination directory",
    })?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(&target)?;

    payload.seek(SeekFrom::Start(entry.offset as u64))?;
    let outcome = codec.inflate(payload, &mut out, progress)?;
    check_outcome(entry, &outcome);

    Ok(())
}
