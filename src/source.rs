//! The upstream event source contract and channel metadata.

use crate::error::StreamError;
use crate::event::{AnyEvent, ValueKind, ValueType};
use crate::labels::ExtraInfo;
use crate::stream::EventStream;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Data kind a channel was declared with in the archive catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// Fixed-width string.
    String,
    /// 16-bit integer.
    Short,
    /// Single precision float.
    Float,
    /// Enumerated ordinal with a label history.
    Enum,
    /// Character.
    Char,
    /// 64-bit integer.
    Long,
    /// Double precision float.
    Double,
}

/// Immutable channel description. Two instances are equal when their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Catalog id.
    pub id: u32,
    /// Channel name.
    pub name: String,
    /// Archive host holding the channel.
    pub host: String,
    /// Vector width. A width above one always means a string vector.
    pub width: usize,
    /// Declared data kind.
    pub kind: DataKind,
}

impl Metadata {
    /// Creates channel metadata.
    pub fn new(
        id: u32,
        name: impl Into<String>,
        host: impl Into<String>,
        width: usize,
        kind: DataKind,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            host: host.into(),
            width,
            kind,
        }
    }

    /// Value type the channel's events carry.
    pub fn value_type(&self) -> ValueType {
        if self.width > 1 {
            return ValueType::Strings(self.width);
        }
        match self.kind {
            DataKind::Short | DataKind::Long | DataKind::Enum => ValueType::Int,
            DataKind::Float | DataKind::Double => ValueType::Float,
            DataKind::String | DataKind::Char => ValueType::Strings(self.width),
        }
    }

    /// Value carried by an `Undefined` placeholder event on this channel.
    pub fn placeholder(&self) -> ValueKind {
        ValueKind::placeholder(self.value_type())
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Metadata {}

impl Hash for Metadata {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Search direction for [`EventSource::find_nearest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Latest event at or before the timestamp.
    Before,
    /// Earliest event at or after the timestamp.
    After,
}

/// Type-erased interval cursor returned by an [`EventSource`].
pub type SourceStream<'a> = Box<dyn EventStream<Value = ValueKind> + 'a>;

/// Ordered-cursor provider over an event archive.
///
/// Implementations own all I/O. Failures surface as [`StreamError::Transport`] and are never
/// retried by the transforms in this crate. An unrecognized status code in an upstream row is a
/// [`StreamError::Data`].
pub trait EventSource {
    /// Opens a cursor over `[begin, end)`, ascending by timestamp.
    fn open_interval(
        &self,
        metadata: &Metadata,
        begin: i64,
        end: i64,
        updates_only: bool,
    ) -> Result<SourceStream<'_>, StreamError>;

    /// Finds the event nearest to `timestamp` in `direction`.
    ///
    /// Among events sharing a timestamp, the last one archived is the nearest before and the
    /// first one archived is the nearest after.
    fn find_nearest(
        &self,
        metadata: &Metadata,
        timestamp: i64,
        direction: Direction,
        inclusive: bool,
        updates_only: bool,
    ) -> Result<Option<AnyEvent>, StreamError>;

    /// Counts the events in `[begin, end)`.
    fn count(
        &self,
        metadata: &Metadata,
        begin: i64,
        end: i64,
        updates_only: bool,
    ) -> Result<u64, StreamError>;

    /// Returns the `kind` history entries strictly before `end`, ascending by timestamp.
    fn find_extra_info(
        &self,
        metadata: &Metadata,
        kind: &str,
        end: i64,
    ) -> Result<Vec<ExtraInfo>, StreamError>;
}

impl<T: EventSource + ?Sized> EventSource for &T {
    fn open_interval(
        &self,
        metadata: &Metadata,
        begin: i64,
        end: i64,
        updates_only: bool,
    ) -> Result<SourceStream<'_>, StreamError> {
        (**self).open_interval(metadata, begin, end, updates_only)
    }

    fn find_nearest(
        &self,
        metadata: &Metadata,
        timestamp: i64,
        direction: Direction,
        inclusive: bool,
        updates_only: bool,
    ) -> Result<Option<AnyEvent>, StreamError> {
        (**self).find_nearest(metadata, timestamp, direction, inclusive, updates_only)
    }

    fn count(
        &self,
        metadata: &Metadata,
        begin: i64,
        end: i64,
        updates_only: bool,
    ) -> Result<u64, StreamError> {
        (**self).count(metadata, begin, end, updates_only)
    }

    fn find_extra_info(
        &self,
        metadata: &Metadata,
        kind: &str,
        end: i64,
    ) -> Result<Vec<ExtraInfo>, StreamError> {
        (**self).find_extra_info(metadata, kind, end)
    }
}
