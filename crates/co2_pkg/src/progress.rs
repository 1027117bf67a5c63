//! Progress reporting and cancellation for long running operations
//!
//! [`crate::write::pack`] and [`crate::read::TpiArchive::extract_all`] report through a
//! [`Progress`] implementation. Returning [`ControlFlow::Break`] from a checkpoint
//! cancels the operation with [`crate::error::Error::Cancelled`].

use std::ops::ControlFlow;

use tracing::{debug, info};

/// Phase of a pack or extract operation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Enumerating the source directory
    Scanning,
    /// Compressing source files into the payload
    Compressing,
    /// Writing the entry table
    WritingEntries,
    /// Rewriting the index header with its final values
    FinalizingHeader,
    /// Inflating entries to disk
    Extracting,
    /// The operation completed
    Done,
}

/// Receives progress and decides whether to keep going
pub trait Progress {
    /// A new stage started, `total` is the number of entries it will visit
    fn stage(&mut self, _stage: Stage, _total: usize) {}

    /// Entry `index` of the current stage is about to be processed
    fn entry(&mut self, _index: usize, _name: &str) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// A chunk of `bytes` went through the codec
    fn chunk(&mut self, _bytes: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Ignores all progress
impl Progress for () {}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn stage(&mut self, stage: Stage, total: usize) {
        (**self).stage(stage, total)
    }

    fn entry(&mut self, index: usize, name: &str) -> ControlFlow<()> {
        (**self).entry(index, name)
    }

    fn chunk(&mut self, bytes: usize) -> ControlFlow<()> {
        (**self).chunk(bytes)
    }
}

/// Logs progress through [`tracing`]
#[derive(Debug, Default)]
pub struct TracingProgress {
    stage: Option<Stage>,
    total: usize,
}

impl Progress for TracingProgress {
    fn stage(&mut self, stage: Stage, total: usize) {
        info!(?stage, total, "stage started");
        self.stage = Some(stage);
        self.total = total;
    }

    fn entry(&mut self, index: usize, name: &str) -> ControlFlow<()> {
        let percent = if self.total == 0 { 100 } else { index * 100 / self.total };
        debug!(stage = ?self.stage, percent, "{}", name);
        ControlFlow::Continue(())
    }
}
