//! Fixed-interval resampling of an event series.
//!
//! A [`SampleGrid`] defines `count` sample instants spaced `interval_ms` apart. Each sample is
//! the last event at or before the sample instant, copied to that instant. A sample before any
//! known data carries [`EventCode::Undefined`](crate::EventCode::Undefined).
//!
//! Three strategies produce identical samples:
//!
//! - [`GridSampler`] streams the interval once and walks it with the straddle algorithm.
//! - [`PointQuerySampler`] issues one nearest-before query per sample.
//! - [`HybridSampler`] streams while the data is sparse and switches to point queries once the
//!   observed events per sample exceed a threshold.

mod hybrid;
mod point;
mod straddle;

pub use hybrid::HybridSampler;
pub use point::PointQuerySampler;
pub use straddle::GridSampler;

use crate::error::StreamError;
use crate::event::{AnyEvent, Event, EventCode};
use crate::source::{Direction, EventSource, Metadata};
use crate::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Evenly spaced sample instants.
///
/// Sample `k` lies at `begin + k * interval_ms` in calendar time and is encoded with the
/// timestamp codec, so every strategy sees bit-identical sample timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridFields")]
pub struct SampleGrid {
    begin: DateTime<Utc>,
    interval_ms: i64,
    count: u64,
}

impl SampleGrid {
    /// Creates a grid of `count` samples starting at `begin`.
    ///
    /// Fails with [`StreamError::Configuration`] if more than one sample is requested with a
    /// non-positive interval, or if the first or last sample falls outside the archive time
    /// range.
    pub fn new(begin: DateTime<Utc>, interval_ms: i64, count: u64) -> Result<Self, StreamError> {
        if count > 1 && interval_ms <= 0 {
            return Err(StreamError::Configuration(format!(
                "sample interval must be positive, got {interval_ms} ms for {count} samples"
            )));
        }
        time::try_to_archive_time(begin)?;
        let last = i64::try_from(count.saturating_sub(1))
            .ok()
            .and_then(|k| k.checked_mul(interval_ms))
            .and_then(|offset| time::plus_millis(begin, offset))
            .ok_or_else(|| {
                StreamError::Configuration(format!(
                    "{count} samples every {interval_ms} ms overflow the calendar"
                ))
            })?;
        time::try_to_archive_time(last)?;
        Ok(Self {
            begin,
            interval_ms,
            count,
        })
    }

    /// First sample instant.
    pub fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    /// Milliseconds between samples.
    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Number of samples.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Calendar instant of sample `index`.
    ///
    /// Indices past the grid saturate at the end of chrono's range.
    pub fn instant(&self, index: u64) -> DateTime<Utc> {
        let offset = i64::try_from(index)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.interval_ms);
        time::plus_millis(self.begin, offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Archive timestamp of sample `index`.
    pub fn timestamp(&self, index: u64) -> i64 {
        time::to_archive_time(self.instant(index))
    }

    /// Archive timestamp of the last sample, or of `begin` for an empty grid.
    pub fn end_timestamp(&self) -> i64 {
        self.timestamp(self.count.saturating_sub(1))
    }

    /// Number of samples at or before `timestamp`.
    pub fn samples_through(&self, timestamp: i64) -> u64 {
        if self.count == 0 || timestamp < self.timestamp(0) {
            return 0;
        }
        if self.interval_ms <= 0 {
            return self.count;
        }
        let elapsed = (time::from_archive_time(timestamp) - self.begin).num_milliseconds();
        let through = u64::try_from(elapsed / self.interval_ms).unwrap_or(0) + 1;
        through.min(self.count)
    }
}

#[derive(Deserialize)]
struct GridFields {
    begin: DateTime<Utc>,
    interval_ms: i64,
    count: u64,
}

impl TryFrom<GridFields> for SampleGrid {
    type Error = StreamError;

    fn try_from(fields: GridFields) -> Result<Self, StreamError> {
        Self::new(fields.begin, fields.interval_ms, fields.count)
    }
}

/// Placeholder sample for an instant with no known data.
pub(crate) fn undefined_at(metadata: &Metadata, timestamp: i64) -> AnyEvent {
    Event::new(timestamp, EventCode::Undefined, metadata.placeholder())
}

/// Last event strictly before the grid, or an `Undefined` placeholder at its first sample.
pub(crate) fn resolve_seed<Src: EventSource + ?Sized>(
    source: &Src,
    metadata: &Metadata,
    grid: &SampleGrid,
    updates_only: bool,
) -> Result<AnyEvent, StreamError> {
    let begin = grid.timestamp(0);
    let prior = source.find_nearest(metadata, begin, Direction::Before, false, updates_only)?;
    Ok(prior.unwrap_or_else(|| undefined_at(metadata, begin)))
}
