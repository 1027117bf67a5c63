//! Streaming zlib sessions over fixed size staging buffers.
//!
//! Every entry in the payload file is an independent zlib stream. [`StreamCodec`] owns one
//! pair of staging buffers and runs a fresh inflate or deflate session per entry, so no
//! entry needs to fit in memory at once.

use std::io::{self, ErrorKind, Read, Write};
use std::ops::ControlFlow;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use tracing::{instrument, trace};

use crate::error::{Error, Result};
use crate::progress::Progress;

/// Size of each staging buffer
pub const CHUNK_SIZE: usize = 0x10000;

/// Compression level used when building packages
///
/// The official client packs at [`CompressionLevel::Client`], the old toolchain at
/// [`CompressionLevel::Best`]. Both produce packages the client can read.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// zlib level 3
    Client,

    /// zlib level 9
    #[default]
    Best,

    /// Any zlib level from 0 to 9
    Custom(u32),
}

impl From<CompressionLevel> for Compression {
    fn from(value: CompressionLevel) -> Self {
        match value {
            CompressionLevel::Client => Compression::new(3),
            CompressionLevel::Best => Compression::best(),
            CompressionLevel::Custom(level) => Compression::new(level.min(9)),
        }
    }
}

/// Result of an inflate session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InflateOutcome {
    /// Compressed bytes consumed by the session
    pub consumed: u64,
    /// Bytes written to the destination
    pub produced: u64,
    /// Whether the end of stream marker was reached
    ///
    /// When the source runs dry first, inflating stops early and this is false.
    pub complete: bool,
}

/// Result of a deflate session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeflateOutcome {
    /// Bytes read from the source
    pub consumed: u64,
    /// Compressed bytes written to the destination
    pub produced: u64,
}

/// A pair of staging buffers shared by consecutive codec sessions
pub struct StreamCodec {
    input: Box<[u8]>,
    output: Box<[u8]>,
}

impl Default for StreamCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCodec {
    /// Allocates both staging buffers
    pub fn new() -> Self {
        Self {
            input: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            output: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
        }
    }

    /// Inflates one zlib stream from the current position of `source` into `destination`
    ///
    /// Stops at the end of stream marker, bytes after it may have been read from `source`
    /// but are ignored. Stops early, without error, when `source` returns no more bytes.
    #[instrument(skip_all, err)]
    pub fn inflate<R: Read, W: Write>(
        &mut self,
        source: &mut R,
        destination: &mut W,
        progress: &mut dyn Progress,
    ) -> Result<InflateOutcome> {
        let mut session = Decompress::new(true);

        loop {
            let read = read_chunk(source, &mut self.input)?;
            if read == 0 {
                trace!(total_out = session.total_out(), "source exhausted before end of stream");
                return Ok(InflateOutcome {
                    consumed: session.total_in(),
                    produced: session.total_out(),
                    complete: false,
                });
            }

            let mut position = 0;
            loop {
                let (before_in, before_out) = (session.total_in(), session.total_out());
                let status = session.decompress(
                    &self.input[position..read],
                    &mut self.output,
                    FlushDecompress::None,
                )?;
                let consumed = (session.total_in() - before_in) as usize;
                let produced = (session.total_out() - before_out) as usize;
                position += consumed;

                destination.write_all(&self.output[..produced])?;

                if status == Status::StreamEnd {
                    return Ok(InflateOutcome {
                        consumed: session.total_in(),
                        produced: session.total_out(),
                        complete: true,
                    });
                }

                // A full output buffer may hide more pending bytes
                if produced < self.output.len() && (position >= read || consumed == 0) {
                    break;
                }
            }

            checkpoint(progress.chunk(read))?;
        }
    }

    /// Deflates everything left in `source` into `destination` as one zlib stream
    #[instrument(skip(self, source, destination, progress), err)]
    pub fn deflate<R: Read, W: Write>(
        &mut self,
        source: &mut R,
        destination: &mut W,
        level: CompressionLevel,
        progress: &mut dyn Progress,
    ) -> Result<DeflateOutcome> {
        let mut session = Compress::new(level.into(), true);

        loop {
            let read = read_chunk(source, &mut self.input)?;
            let flush = if read == 0 {
                FlushCompress::Finish
            } else {
                FlushCompress::None
            };

            let mut position = 0;
            loop {
                let (before_in, before_out) = (session.total_in(), session.total_out());
                let status = session.compress(&self.input[position..read], &mut self.output, flush)?;
                position += (session.total_in() - before_in) as usize;
                let produced = (session.total_out() - before_out) as usize;

                destination.write_all(&self.output[..produced])?;

                if status == Status::StreamEnd {
                    return Ok(DeflateOutcome {
                        consumed: session.total_in(),
                        produced: session.total_out(),
                    });
                }

                if flush == FlushCompress::None && produced < self.output.len() && position >= read {
                    break;
                }
            }

            checkpoint(progress.chunk(read))?;
        }
    }
}

fn read_chunk<R: Read>(source: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(buffer) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

pub(crate) fn checkpoint(flow: ControlFlow<()>) -> Result<()> {
    match flow {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(Error::Cancelled),
    }
}
