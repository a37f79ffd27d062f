//! Ready-made pipelines over an [`EventSource`].
//!
//! Each function resolves what the transform needs from the source (prior point, event count,
//! label history) and returns the assembled stream. Closing the returned stream releases the
//! source cursor.

use crate::analysis::AnalysisStream;
use crate::boundary::BoundaryStream;
use crate::config::SamplerStrategy;
use crate::decimate::DecimationStream;
use crate::downsample::VisualDownsampleStream;
use crate::error::StreamError;
use crate::event::{EventValue, NumericValue};
use crate::labels::{ENUM_STRINGS, LabeledEnumStream};
use crate::sampler::{GridSampler, HybridSampler, PointQuerySampler, SampleGrid, resolve_seed};
use crate::source::{Direction, EventSource, Metadata, SourceStream};
use crate::statistics::{RunningStatistics, StatisticsSnapshot};
use crate::stream::{EventStream, TypedStream};

/// Opens `[begin, end)` with points guaranteed on `begin` and `end`.
///
/// The prior point is the last event strictly before `begin`.
pub fn open_boundary_stream<'a, Src: EventSource + ?Sized>(
    source: &'a Src,
    metadata: &Metadata,
    begin: i64,
    end: i64,
    updates_only: bool,
) -> Result<BoundaryStream<SourceStream<'a>>, StreamError> {
    let prior = source.find_nearest(metadata, begin, Direction::Before, false, updates_only)?;
    let cursor = source.open_interval(metadata, begin, end, updates_only)?;
    Ok(BoundaryStream::new(cursor, begin, end, prior, updates_only))
}

/// Samples `grid` with the chosen strategy.
pub fn open_sampler<'a, Src: EventSource + ?Sized>(
    source: &'a Src,
    metadata: &Metadata,
    grid: SampleGrid,
    updates_only: bool,
    strategy: &SamplerStrategy,
) -> Result<SourceStream<'a>, StreamError> {
    #[cfg(feature = "logging")]
    log::debug!(
        "sampling '{}' at {} points with {strategy:?}",
        metadata.name,
        grid.count()
    );
    match strategy {
        SamplerStrategy::Stream => {
            let seed = resolve_seed(source, metadata, &grid, updates_only)?;
            let end = grid.end_timestamp().saturating_add(1);
            let cursor = source.open_interval(metadata, grid.timestamp(0), end, updates_only)?;
            let sampler = GridSampler::new(cursor, grid, Some(seed), updates_only)?;
            Ok(Box::new(sampler))
        }
        SamplerStrategy::PointQueries => Ok(Box::new(PointQuerySampler::new(
            source,
            metadata.clone(),
            grid,
            updates_only,
        ))),
        SamplerStrategy::Hybrid(config) => Ok(Box::new(HybridSampler::new(
            source,
            metadata.clone(),
            grid,
            updates_only,
            config.clone(),
        )?)),
    }
}

/// Visually downsamples `[begin, end)` into about `bins` bins.
pub fn open_visual_downsample<'a, V, Src>(
    source: &'a Src,
    metadata: &Metadata,
    begin: i64,
    end: i64,
    bins: u64,
    updates_only: bool,
) -> Result<VisualDownsampleStream<TypedStream<SourceStream<'a>, V>>, StreamError>
where
    V: NumericValue,
    Src: EventSource + ?Sized,
{
    let count = source.count(metadata, begin, end, updates_only)?;
    let cursor = source.open_interval(metadata, begin, end, updates_only)?;
    VisualDownsampleStream::new(TypedStream::new(cursor), count, bins)
}

/// Thins `[begin, end)` to about `limit` events.
pub fn open_decimated<'a, V, Src>(
    source: &'a Src,
    metadata: &Metadata,
    begin: i64,
    end: i64,
    limit: u64,
    updates_only: bool,
) -> Result<DecimationStream<TypedStream<SourceStream<'a>, V>>, StreamError>
where
    V: EventValue,
    Src: EventSource + ?Sized,
{
    let count = source.count(metadata, begin, end, updates_only)?;
    let cursor = source.open_interval(metadata, begin, end, updates_only)?;
    Ok(DecimationStream::new(TypedStream::new(cursor), count, limit))
}

/// Opens an enum channel's boundary-aware interval with every ordinal labeled.
pub fn open_labeled_enum<'a, Src: EventSource + ?Sized>(
    source: &'a Src,
    metadata: &Metadata,
    begin: i64,
    end: i64,
    updates_only: bool,
) -> Result<LabeledEnumStream<TypedStream<BoundaryStream<SourceStream<'a>>, i32>>, StreamError> {
    let history = source.find_extra_info(metadata, ENUM_STRINGS, end)?;
    let stream = open_boundary_stream(source, metadata, begin, end, updates_only)?;
    LabeledEnumStream::new(TypedStream::new(stream), history)
}

/// Computes time-weighted statistics of a float channel over `[begin, end)`.
///
/// The interval is boundary-aware, so the value in effect at `begin` contributes from `begin`
/// and the last value contributes up to `end` (or up to the last event when `end` is in the
/// future).
pub fn analyze<Src: EventSource + ?Sized>(
    source: &Src,
    metadata: &Metadata,
    begin: i64,
    end: i64,
    updates_only: bool,
) -> Result<StatisticsSnapshot, StreamError> {
    let stream = open_boundary_stream(source, metadata, begin, end, updates_only)?;
    let mut stats = RunningStatistics::new();
    let mut analysis = AnalysisStream::new(TypedStream::<_, f32>::new(stream), &mut stats);
    while analysis.read()?.is_some() {}
    analysis.close()?;
    Ok(analysis.snapshot())
}
