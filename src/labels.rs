//! Enum label history and the stream that labels enum ordinals with it.

use crate::error::StreamError;
use crate::event::{Event, LabeledValue};
use crate::stream::{EventStream, ensure_open};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// History kind holding serialized enum label sets.
pub const ENUM_STRINGS: &str = "enum_strings";

/// One versioned entry of channel information that changes over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraInfo {
    /// Archive timestamp the entry took effect.
    pub timestamp: i64,
    /// History kind, such as `enum_strings` or `notes`.
    pub kind: String,
    /// Serialized value.
    pub value: String,
}

impl ExtraInfo {
    /// Creates a history entry.
    pub fn new(timestamp: i64, kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Splits the serialized value into labels on NUL. Trailing empty labels are dropped.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.value.split('\0').collect();
        while labels.last().is_some_and(|l| l.is_empty()) {
            labels.pop();
        }
        labels
    }
}

/// Resolves the label in effect for an ordinal at a timestamp.
///
/// Lookups must come in ascending timestamp order: entries superseded by a later entry at or
/// before the current lookup are dropped and never consulted again.
#[derive(Debug, Clone)]
pub struct EnumLabelResolver {
    history: VecDeque<ExtraInfo>,
}

impl EnumLabelResolver {
    /// Creates a resolver over an ascending `enum_strings` history.
    pub fn new(history: Vec<ExtraInfo>) -> Result<Self, StreamError> {
        if let Some(other) = history.iter().find(|info| info.kind != ENUM_STRINGS) {
            #[cfg(feature = "logging")]
            log::warn!("rejecting label history containing '{}' entries", other.kind);
            return Err(StreamError::Configuration(format!(
                "label history must only contain {ENUM_STRINGS}, found '{}'",
                other.kind
            )));
        }
        Ok(Self {
            history: history.into(),
        })
    }

    /// Entries still eligible for future lookups.
    pub fn remaining(&self) -> usize {
        self.history.len()
    }

    /// Label for `ordinal` at `timestamp`, or `None` when no entry is in effect yet or the
    /// ordinal is out of range.
    pub fn resolve(&mut self, timestamp: i64, ordinal: i32) -> Option<String> {
        while self.history.len() > 1 && self.history[1].timestamp <= timestamp {
            self.history.pop_front();
        }
        let entry = self.history.front().filter(|e| e.timestamp <= timestamp)?;
        let index = usize::try_from(ordinal).ok()?;
        entry.labels().get(index).map(|label| (*label).to_string())
    }
}

/// Labels every int event with the enum label in effect at its timestamp.
pub struct LabeledEnumStream<S> {
    inner: S,
    resolver: EnumLabelResolver,
}

impl<S: EventStream<Value = i32>> LabeledEnumStream<S> {
    /// Wraps `inner`. Fails with [`StreamError::Configuration`] if `history` holds anything
    /// other than `enum_strings` entries.
    pub fn new(inner: S, history: Vec<ExtraInfo>) -> Result<Self, StreamError> {
        Ok(Self {
            inner,
            resolver: EnumLabelResolver::new(history)?,
        })
    }
}

impl<S: EventStream<Value = i32>> EventStream for LabeledEnumStream<S> {
    type Value = LabeledValue;

    fn read(&mut self) -> Result<Option<Event<LabeledValue>>, StreamError> {
        ensure_open(self)?;
        let Some(event) = self.inner.read()? else {
            return Ok(None);
        };
        let label = self.resolver.resolve(event.timestamp(), *event.value());
        Ok(Some(event.map_value(|value| LabeledValue { value, label })))
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::VecStream;

    fn history() -> Vec<ExtraInfo> {
        vec![
            ExtraInfo::new(100, ENUM_STRINGS, "OFF\0ON"),
            ExtraInfo::new(200, ENUM_STRINGS, "CLOSED\0OPEN\0FAULT\0"),
        ]
    }

    #[test]
    fn test_labels_split_on_nul() {
        let info = ExtraInfo::new(0, ENUM_STRINGS, "A\0\0B\0\0");
        assert_eq!(info.labels(), vec!["A", "", "B"]);
    }

    #[test]
    fn test_resolver_picks_entry_in_effect() {
        let mut r = EnumLabelResolver::new(history()).unwrap();
        assert_eq!(r.resolve(50, 0), None);
        assert_eq!(r.resolve(100, 1).as_deref(), Some("ON"));
        assert_eq!(r.resolve(150, 2), None);
        assert_eq!(r.remaining(), 2);
        assert_eq!(r.resolve(200, 2).as_deref(), Some("FAULT"));
        assert_eq!(r.remaining(), 1);
        assert_eq!(r.resolve(900, -1), None);
        assert_eq!(r.resolve(900, 0).as_deref(), Some("CLOSED"));
    }

    #[test]
    fn test_rejects_other_history_kinds() {
        let mut h = history();
        h.push(ExtraInfo::new(300, "notes", "hello"));
        match LabeledEnumStream::new(VecStream::<i32>::new(vec![]), h) {
            Err(StreamError::Configuration(msg)) => assert!(msg.contains("notes")),
            Err(e) => panic!("Expected Configuration error, got {e:?}"),
            Ok(_) => panic!("Expected Configuration error"),
        }
    }

    #[test]
    fn test_stream_labels_events() {
        let events = vec![
            Event::update(90, 1),
            Event::update(120, 1),
            Event::update(250, 0),
        ];
        let mut s = LabeledEnumStream::new(VecStream::new(events), history()).unwrap();
        let labels: Vec<Option<String>> = s
            .drain()
            .unwrap()
            .into_iter()
            .map(|e| e.into_value().label)
            .collect();
        assert_eq!(
            labels,
            vec![None, Some("ON".to_string()), Some("CLOSED".to_string())]
        );
    }
}
