use super::{SampleGrid, undefined_at};
use crate::error::StreamError;
use crate::event::{AnyEvent, ValueKind};
use crate::source::{Direction, EventSource, Metadata};
use crate::stream::{EventStream, ensure_open};

/// Samples a grid with one "last event at or before t" query per sample.
///
/// Holds no cursor, so the cost per sample is independent of how many events lie between
/// samples.
pub struct PointQuerySampler<'a, Src: ?Sized> {
    source: &'a Src,
    metadata: Metadata,
    grid: SampleGrid,
    updates_only: bool,
    index: u64,
    open: bool,
}

impl<'a, Src: EventSource + ?Sized> PointQuerySampler<'a, Src> {
    /// Creates a sampler over `metadata`'s channel in `source`.
    pub fn new(source: &'a Src, metadata: Metadata, grid: SampleGrid, updates_only: bool) -> Self {
        Self {
            source,
            metadata,
            grid,
            updates_only,
            index: 0,
            open: true,
        }
    }

    /// Continues sampling from sample `index`.
    pub(crate) fn resume_at(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    /// Samples emitted so far.
    pub fn samples_taken(&self) -> u64 {
        self.index
    }
}

impl<Src: EventSource + ?Sized> EventStream for PointQuerySampler<'_, Src> {
    type Value = ValueKind;

    fn read(&mut self) -> Result<Option<AnyEvent>, StreamError> {
        ensure_open(self)?;
        if self.index >= self.grid.count() {
            return Ok(None);
        }
        let sample = self.grid.timestamp(self.index);
        let found = self.source.find_nearest(
            &self.metadata,
            sample,
            Direction::Before,
            true,
            self.updates_only,
        )?;
        self.index += 1;
        Ok(Some(match found {
            Some(event) => event.clone_at(sample),
            None => undefined_at(&self.metadata, sample),
        }))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.open = false;
        Ok(())
    }
}
