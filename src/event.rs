//! Archived events: timestamp, status code and value.

use crate::error::StreamError;
use crate::time;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Archive status code attached to every event.
///
/// Only [`EventCode::Update`] carries a real data value. The other codes mark gaps or
/// informational points and are excluded from statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCode {
    /// Normal channel data point.
    Update,
    /// Network disconnection.
    NetworkDisconnection,
    /// Archiving of the channel was turned off.
    ArchivingTurnedOff,
    /// Archiver shutdown.
    ArchiverShutdown,
    /// Unknown unavailability.
    UnknownUnavailability,
    /// NaN or infinity encountered.
    NanOrInfinity,
    /// Origin of the channel's history.
    OriginOfHistory,
    /// Prior data moved offline.
    PriorDataMovedOffline,
    /// Prior data discarded.
    PriorDataDiscarded,
    /// Synthetic placeholder for "no value known". Never stored in the archive.
    Undefined,
}

impl EventCode {
    /// Numeric code as stored in the archive.
    pub fn number(self) -> u8 {
        match self {
            Self::Update => 0,
            Self::NetworkDisconnection => 1,
            Self::ArchivingTurnedOff => 2,
            Self::ArchiverShutdown => 3,
            Self::UnknownUnavailability => 4,
            Self::NanOrInfinity => 5,
            Self::OriginOfHistory => 16,
            Self::PriorDataMovedOffline => 32,
            Self::PriorDataDiscarded => 48,
            Self::Undefined => 128,
        }
    }

    /// Human readable description, matching the archive command line tools.
    pub fn description(self) -> &'static str {
        match self {
            Self::Update => "Normal channel data point",
            Self::NetworkDisconnection => "Network disconnection",
            Self::ArchivingTurnedOff => "Archiving of channel turned off",
            Self::ArchiverShutdown => "Archiver shutdown",
            Self::UnknownUnavailability => "Unknown unavailability",
            Self::NanOrInfinity => "NaN/infinity encountered",
            Self::OriginOfHistory => "Origin of channel's history",
            Self::PriorDataMovedOffline => "Channel's prior data moved offline",
            Self::PriorDataDiscarded => "Channel's prior data discarded",
            Self::Undefined => "undefined",
        }
    }

    /// Returns true if the code marks a gap in the channel history.
    pub fn is_disconnection(self) -> bool {
        matches!(
            self,
            Self::NetworkDisconnection
                | Self::ArchivingTurnedOff
                | Self::ArchiverShutdown
                | Self::UnknownUnavailability
        )
    }

    /// Returns true for [`EventCode::Update`].
    pub fn is_update(self) -> bool {
        self == Self::Update
    }

    /// Parses a stored code number.
    ///
    /// `Undefined` is synthetic and never appears in stored rows, so 128 is rejected along
    /// with any other unrecognized number.
    pub fn from_number(number: i32) -> Result<Self, StreamError> {
        match number {
            0 => Ok(Self::Update),
            1 => Ok(Self::NetworkDisconnection),
            2 => Ok(Self::ArchivingTurnedOff),
            3 => Ok(Self::ArchiverShutdown),
            4 => Ok(Self::UnknownUnavailability),
            5 => Ok(Self::NanOrInfinity),
            16 => Ok(Self::OriginOfHistory),
            32 => Ok(Self::PriorDataMovedOffline),
            48 => Ok(Self::PriorDataDiscarded),
            other => Err(StreamError::Data(format!("unknown code number: {other}"))),
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Type-erased event value, as delivered by an upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Scalar float.
    Float(f32),
    /// Scalar int.
    Int(i32),
    /// Fixed-width string vector.
    Strings(Vec<String>),
}

/// Which [`ValueKind`] variant a channel produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Events carry [`ValueKind::Float`].
    Float,
    /// Events carry [`ValueKind::Int`].
    Int,
    /// Events carry [`ValueKind::Strings`] of the given width.
    Strings(usize),
}

impl ValueKind {
    /// Value carried by an `Undefined` placeholder of the given type.
    pub fn placeholder(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Float => Self::Float(0.0),
            ValueType::Int => Self::Int(0),
            ValueType::Strings(width) => Self::Strings(vec![String::new(); width]),
        }
    }

    /// Returns the type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Float(_) => ValueType::Float,
            Self::Int(_) => ValueType::Int,
            Self::Strings(v) => ValueType::Strings(v.len()),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Strings(v) => write!(f, "{}", v.join(" ")),
        }
    }
}

/// A value that can ride on an [`Event`].
pub trait EventValue: Clone + fmt::Debug + PartialEq {
    /// Converts a type-erased upstream value, failing on a kind mismatch.
    fn from_kind(kind: ValueKind) -> Result<Self, StreamError>;

    /// Text shown for Update events by [`Event::format`].
    fn display(&self) -> String;
}

/// An [`EventValue`] with a numeric reading, usable by statistics and downsampling.
pub trait NumericValue: EventValue {
    /// Numeric reading of the value.
    fn as_f64(&self) -> f64;
}

fn kind_mismatch(expected: &str, got: &ValueKind) -> StreamError {
    StreamError::Data(format!("expected {expected} value, got {:?}", got.value_type()))
}

impl EventValue for ValueKind {
    fn from_kind(kind: ValueKind) -> Result<Self, StreamError> {
        Ok(kind)
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl EventValue for f32 {
    fn from_kind(kind: ValueKind) -> Result<Self, StreamError> {
        match kind {
            ValueKind::Float(v) => Ok(v),
            other => Err(kind_mismatch("float", &other)),
        }
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl NumericValue for f32 {
    fn as_f64(&self) -> f64 {
        f64::from(*self)
    }
}

impl EventValue for i32 {
    fn from_kind(kind: ValueKind) -> Result<Self, StreamError> {
        match kind {
            ValueKind::Int(v) => Ok(v),
            other => Err(kind_mismatch("int", &other)),
        }
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl NumericValue for i32 {
    fn as_f64(&self) -> f64 {
        f64::from(*self)
    }
}

impl EventValue for Vec<String> {
    fn from_kind(kind: ValueKind) -> Result<Self, StreamError> {
        match kind {
            ValueKind::Strings(v) => Ok(v),
            other => Err(kind_mismatch("string vector", &other)),
        }
    }

    fn display(&self) -> String {
        self.join(" ")
    }
}

/// Float value with running sub-statistics attached by
/// [`AnalysisStream`](crate::AnalysisStream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedValue {
    /// The original float value.
    pub value: f32,
    /// Sub-statistics in the order requested from
    /// [`RunningStatistics::with_event_stats`](crate::RunningStatistics::with_event_stats).
    pub stats: Vec<f64>,
}

impl EventValue for AnalyzedValue {
    fn from_kind(kind: ValueKind) -> Result<Self, StreamError> {
        f32::from_kind(kind).map(|value| Self {
            value,
            stats: Vec::new(),
        })
    }

    fn display(&self) -> String {
        self.value.to_string()
    }
}

impl NumericValue for AnalyzedValue {
    fn as_f64(&self) -> f64 {
        f64::from(self.value)
    }
}

/// Enum ordinal with the label that was in effect at the event's timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledValue {
    /// The enum ordinal.
    pub value: i32,
    /// Label for the ordinal, if the label history defines one.
    pub label: Option<String>,
}

impl EventValue for LabeledValue {
    fn from_kind(kind: ValueKind) -> Result<Self, StreamError> {
        i32::from_kind(kind).map(|value| Self { value, label: None })
    }

    fn display(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.value.to_string(),
        }
    }
}

impl NumericValue for LabeledValue {
    fn as_f64(&self) -> f64 {
        f64::from(self.value)
    }
}

/// One archived observation.
///
/// Events compare by timestamp only when ordering matters to a transform; `PartialEq` compares
/// all three fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<V> {
    timestamp: i64,
    code: EventCode,
    value: V,
}

/// Scalar float event.
pub type FloatEvent = Event<f32>;
/// Scalar int event.
pub type IntEvent = Event<i32>;
/// Fixed-width string vector event.
pub type MultiStringEvent = Event<Vec<String>>;
/// Type-erased event from an upstream source.
pub type AnyEvent = Event<ValueKind>;
/// Float event carrying running sub-statistics.
pub type AnalyzedFloatEvent = Event<AnalyzedValue>;
/// Enum event carrying its label.
pub type LabeledEnumEvent = Event<LabeledValue>;

impl<V: EventValue> Event<V> {
    /// Creates an event at an archive timestamp.
    pub fn new(timestamp: i64, code: EventCode, value: V) -> Self {
        Self {
            timestamp,
            code,
            value,
        }
    }

    /// Creates an update event at an archive timestamp.
    pub fn update(timestamp: i64, value: V) -> Self {
        Self::new(timestamp, EventCode::Update, value)
    }

    /// Creates an event at a calendar instant.
    pub fn at(instant: DateTime<Utc>, code: EventCode, value: V) -> Self {
        Self::new(time::to_archive_time(instant), code, value)
    }

    /// Copies this event to a new timestamp, keeping code and value.
    pub fn clone_at(&self, timestamp: i64) -> Self {
        Self {
            timestamp,
            code: self.code,
            value: self.value.clone(),
        }
    }

    /// Archive timestamp.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Unix seconds including fraction.
    pub fn timestamp_as_seconds(&self) -> f64 {
        time::archive_time_as_seconds(self.timestamp)
    }

    /// Timestamp as a calendar instant.
    pub fn instant(&self) -> DateTime<Utc> {
        time::from_archive_time(self.timestamp)
    }

    /// Status code.
    pub fn code(&self) -> EventCode {
        self.code
    }

    /// Returns true if the status code is [`EventCode::Update`].
    pub fn is_update(&self) -> bool {
        self.code.is_update()
    }

    /// Value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the event, returning its value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Replaces the value, keeping timestamp and code.
    pub fn map_value<U: EventValue>(self, f: impl FnOnce(V) -> U) -> Event<U> {
        Event {
            timestamp: self.timestamp,
            code: self.code,
            value: f(self.value),
        }
    }

    /// Renders the event in local time with `digits` fractional-second digits.
    ///
    /// Updates show their value; every other code shows `<description>`.
    pub fn format(&self, digits: u8) -> String {
        let instant = self.instant().with_timezone(&Local);
        let shown = if self.is_update() {
            self.value.display()
        } else {
            format!("<{}>", self.code.description())
        };
        format!("{} {shown}", time::format_instant(&instant, digits))
    }
}

impl Event<ValueKind> {
    /// Converts a type-erased event into a typed one.
    pub fn typed<V: EventValue>(self) -> Result<Event<V>, StreamError> {
        Ok(Event {
            timestamp: self.timestamp,
            code: self.code,
            value: V::from_kind(self.value)?,
        })
    }
}

impl<V: EventValue> fmt::Display for Event<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_numbers_round_trip() {
        let codes = [
            EventCode::Update,
            EventCode::NetworkDisconnection,
            EventCode::ArchivingTurnedOff,
            EventCode::ArchiverShutdown,
            EventCode::UnknownUnavailability,
            EventCode::NanOrInfinity,
            EventCode::OriginOfHistory,
            EventCode::PriorDataMovedOffline,
            EventCode::PriorDataDiscarded,
        ];
        for code in codes {
            assert_eq!(EventCode::from_number(i32::from(code.number())).unwrap(), code);
        }
    }

    #[test]
    fn test_unknown_code_is_data_error() {
        for n in [6, 7, 128, -1] {
            match EventCode::from_number(n) {
                Err(StreamError::Data(msg)) => assert!(msg.contains(&n.to_string())),
                other => panic!("Expected Data error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_disconnection_codes() {
        assert!(EventCode::NetworkDisconnection.is_disconnection());
        assert!(EventCode::ArchiverShutdown.is_disconnection());
        assert!(!EventCode::Update.is_disconnection());
        assert!(!EventCode::NanOrInfinity.is_disconnection());
        assert!(!EventCode::Undefined.is_disconnection());
    }

    #[test]
    fn test_clone_at_keeps_code_and_value() {
        let e = Event::new(100, EventCode::ArchiverShutdown, 4.5f32);
        let c = e.clone_at(900);
        assert_eq!(c.timestamp(), 900);
        assert_eq!(c.code(), EventCode::ArchiverShutdown);
        assert_eq!(*c.value(), 4.5);
        assert_eq!(e.timestamp(), 100);
    }

    #[test]
    fn test_typed_conversion() {
        let e = AnyEvent::update(10, ValueKind::Float(1.5));
        let f: FloatEvent = e.clone().typed().unwrap();
        assert_eq!(*f.value(), 1.5);

        let err = e.typed::<i32>().unwrap_err();
        assert!(matches!(err, StreamError::Data(_)));
    }

    #[test]
    fn test_placeholder_values() {
        assert_eq!(ValueKind::placeholder(ValueType::Float), ValueKind::Float(0.0));
        assert_eq!(ValueKind::placeholder(ValueType::Int), ValueKind::Int(0));
        assert_eq!(
            ValueKind::placeholder(ValueType::Strings(3)),
            ValueKind::Strings(vec![String::new(); 3])
        );
        assert_eq!(
            ValueKind::placeholder(ValueType::Strings(2)).value_type(),
            ValueType::Strings(2)
        );
    }

    #[test]
    fn test_format_shows_description_for_non_updates() {
        let e = Event::new(0, EventCode::NetworkDisconnection, 0.0f32);
        assert!(e.format(0).ends_with("<Network disconnection>"));

        let e = LabeledEnumEvent::update(
            0,
            LabeledValue {
                value: 1,
                label: Some("ON".to_string()),
            },
        );
        assert!(e.format(3).ends_with(" ON"));
    }
}
