//! # pvstream
//!
//! Composable analytics over a time-ordered archive of process-variable events.
//!
//! Every transform in this crate implements the same pull-based [`EventStream`] contract and
//! owns the stream it wraps, so pipelines are built by plain construction and closing the
//! outermost stream releases the archive cursor underneath.
//!
//! ## Features
//!
//! - **Boundary-exact intervals**: [`BoundaryStream`] guarantees points on the query's begin
//!   and end instants
//! - **Grid sampling**: [`GridSampler`], [`PointQuerySampler`] and [`HybridSampler`] resample
//!   onto a [`SampleGrid`] and always agree sample for sample
//! - **Running statistics**: [`RunningStatistics`] keeps a time-weighted mean, sigma, RMS and
//!   compensated integral in constant memory
//! - **Visual downsampling**: [`VisualDownsampleStream`] keeps the largest-triangle point,
//!   extrema and disconnect markers of every bin
//! - **Decimation**: [`DecimationStream`] thins by count without synthesizing events
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use pvstream::{
//!     DataKind, Event, EventStream, MemoryArchive, SampleGrid, SamplerStrategy, ValueKind,
//!     open_sampler, to_archive_time,
//! };
//!
//! # fn main() -> Result<(), pvstream::StreamError> {
//! let mut archive = MemoryArchive::new("archiver1");
//! let channel = archive.add_channel("beam:current", 1, DataKind::Double)?;
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! archive.append(&channel, Event::update(to_archive_time(start), ValueKind::Float(3.5)))?;
//!
//! let grid = SampleGrid::new(start, 1_000, 4)?;
//! let mut samples = open_sampler(&archive, &channel, grid, false, &SamplerStrategy::Stream)?;
//! for sample in samples.drain()? {
//!     println!("{sample}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! With the `logging` feature enabled, boundary synthesis, strategy decisions and label
//! history problems are reported through the [`log`](https://docs.rs/log) facade.

#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

pub mod analysis;
pub mod boundary;
pub mod config;
pub mod decimate;
pub mod downsample;
pub mod error;
pub mod event;
pub mod labels;
pub mod memory;
pub mod query;
pub mod sampler;
pub mod source;
pub mod statistics;
pub mod stream;
pub mod time;

pub use analysis::{AnalysisStream, IntegrationStream};
pub use boundary::BoundaryStream;
pub use config::{HybridSamplerConfig, SamplerStrategy};
pub use decimate::DecimationStream;
pub use downsample::{DownsampleBucket, VisualDownsampleStream};
pub use error::StreamError;
pub use event::{
    AnalyzedFloatEvent, AnalyzedValue, AnyEvent, Event, EventCode, EventValue, FloatEvent,
    IntEvent, LabeledEnumEvent, LabeledValue, MultiStringEvent, NumericValue, ValueKind,
    ValueType,
};
pub use labels::{ENUM_STRINGS, EnumLabelResolver, ExtraInfo, LabeledEnumStream};
pub use memory::MemoryArchive;
pub use query::{
    analyze, open_boundary_stream, open_decimated, open_labeled_enum, open_sampler,
    open_visual_downsample,
};
pub use sampler::{GridSampler, HybridSampler, PointQuerySampler, SampleGrid};
pub use source::{DataKind, Direction, EventSource, Metadata, SourceStream};
pub use statistics::{EventStat, RunningStatistics, StatisticsSnapshot};
pub use stream::{EventStream, StreamIter, TypedStream, VecStream};
pub use time::{from_archive_time, to_archive_time, try_to_archive_time};
