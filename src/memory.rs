//! In-memory [`EventSource`] backed by per-channel event vectors.

use crate::error::StreamError;
use crate::event::{AnyEvent, EventCode, ValueKind, ValueType};
use crate::labels::ExtraInfo;
use crate::source::{DataKind, Direction, EventSource, Metadata, SourceStream};
use crate::stream::{EventStream, ensure_open};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

struct Channel {
    metadata: Metadata,
    events: Vec<AnyEvent>,
    history: Vec<ExtraInfo>,
}

/// An event archive held in memory.
///
/// Each channel stores its events in arrival order, which must be non-decreasing by
/// timestamp. The archive counts point queries and open cursors so callers can observe how a
/// transform used it.
#[derive(Default)]
pub struct MemoryArchive {
    host: String,
    channels: Vec<Channel>,
    names: HashMap<String, usize>,
    point_queries: AtomicU64,
    open_cursors: AtomicU64,
}

impl MemoryArchive {
    /// Creates an empty archive reporting `host` as the channel host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Registers a channel and returns its metadata.
    ///
    /// Fails with [`StreamError::Configuration`] if the name is taken.
    pub fn add_channel(
        &mut self,
        name: &str,
        width: usize,
        kind: DataKind,
    ) -> Result<Metadata, StreamError> {
        if self.names.contains_key(name) {
            return Err(StreamError::Configuration(format!(
                "channel '{name}' already exists"
            )));
        }
        let id = u32::try_from(self.channels.len() + 1)
            .map_err(|_| StreamError::Configuration("too many channels".to_string()))?;
        let metadata = Metadata::new(id, name, self.host.clone(), width, kind);
        self.names.insert(name.to_string(), self.channels.len());
        self.channels.push(Channel {
            metadata: metadata.clone(),
            events: Vec::new(),
            history: Vec::new(),
        });
        Ok(metadata)
    }

    /// Looks up a channel by name.
    pub fn find_metadata(&self, name: &str) -> Option<&Metadata> {
        self.names.get(name).map(|&i| &self.channels[i].metadata)
    }

    /// Appends one event to a channel.
    ///
    /// Fails with [`StreamError::Data`] if the event is older than the channel's last event,
    /// carries the synthetic `Undefined` code, or does not match the channel's value type.
    pub fn append(&mut self, metadata: &Metadata, event: AnyEvent) -> Result<(), StreamError> {
        let channel = self.channel_mut(metadata)?;
        if let Some(last) = channel.events.last()
            && event.timestamp() < last.timestamp()
        {
            return Err(StreamError::Data(format!(
                "event at {} appended after {} on '{}'",
                event.timestamp(),
                last.timestamp(),
                channel.metadata.name
            )));
        }
        if event.code() == EventCode::Undefined {
            return Err(StreamError::Data(
                "undefined events are never archived".to_string(),
            ));
        }
        check_value(&channel.metadata, event.is_update(), event.value())?;
        channel.events.push(event);
        Ok(())
    }

    /// Appends events in order, stopping at the first rejected one.
    pub fn extend(
        &mut self,
        metadata: &Metadata,
        events: impl IntoIterator<Item = AnyEvent>,
    ) -> Result<(), StreamError> {
        for event in events {
            self.append(metadata, event)?;
        }
        Ok(())
    }

    /// Appends a history entry to a channel. Entries must be time-ordered per channel.
    pub fn add_extra_info(
        &mut self,
        metadata: &Metadata,
        info: ExtraInfo,
    ) -> Result<(), StreamError> {
        let channel = self.channel_mut(metadata)?;
        if channel
            .history
            .last()
            .is_some_and(|last| info.timestamp < last.timestamp)
        {
            return Err(StreamError::Data(format!(
                "history entry at {} is out of order",
                info.timestamp
            )));
        }
        channel.history.push(info);
        Ok(())
    }

    /// Number of `find_nearest` calls served so far.
    pub fn point_queries(&self) -> u64 {
        self.point_queries.load(Ordering::Relaxed)
    }

    /// Number of interval cursors opened and not yet released.
    pub fn open_cursors(&self) -> u64 {
        self.open_cursors.load(Ordering::Acquire)
    }

    fn channel(&self, metadata: &Metadata) -> Result<&Channel, StreamError> {
        self.names
            .get(&metadata.name)
            .map(|&i| &self.channels[i])
            .filter(|c| c.metadata.id == metadata.id)
            .ok_or_else(|| unknown_channel(metadata))
    }

    fn channel_mut(&mut self, metadata: &Metadata) -> Result<&mut Channel, StreamError> {
        let index = self
            .names
            .get(&metadata.name)
            .copied()
            .filter(|&i| self.channels[i].metadata.id == metadata.id)
            .ok_or_else(|| unknown_channel(metadata))?;
        Ok(&mut self.channels[index])
    }
}

fn unknown_channel(metadata: &Metadata) -> StreamError {
    StreamError::Configuration(format!(
        "unknown channel '{}' (id {})",
        metadata.name, metadata.id
    ))
}

fn check_value(metadata: &Metadata, update: bool, value: &ValueKind) -> Result<(), StreamError> {
    let expected = metadata.value_type();
    let ok = match (expected, value) {
        (ValueType::Float, ValueKind::Float(_)) | (ValueType::Int, ValueKind::Int(_)) => true,
        (ValueType::Strings(width), ValueKind::Strings(v)) => !update || v.len() == width,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(StreamError::Data(format!(
            "channel '{}' expects {expected:?}, got {:?}",
            metadata.name,
            value.value_type()
        )))
    }
}

fn accepts(updates_only: bool, event: &AnyEvent) -> bool {
    !updates_only || event.is_update()
}

impl EventSource for MemoryArchive {
    fn open_interval(
        &self,
        metadata: &Metadata,
        begin: i64,
        end: i64,
        updates_only: bool,
    ) -> Result<SourceStream<'_>, StreamError> {
        let events = &self.channel(metadata)?.events;
        let lo = events.partition_point(|e| e.timestamp() < begin);
        let hi = events.partition_point(|e| e.timestamp() < end).max(lo);

        self.open_cursors.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MemoryCursor {
            events: events[lo..hi].iter(),
            updates_only,
            open_cursors: &self.open_cursors,
            open: true,
        }))
    }

    fn find_nearest(
        &self,
        metadata: &Metadata,
        timestamp: i64,
        direction: Direction,
        inclusive: bool,
        updates_only: bool,
    ) -> Result<Option<AnyEvent>, StreamError> {
        let events = &self.channel(metadata)?.events;
        self.point_queries.fetch_add(1, Ordering::Relaxed);

        let found = match direction {
            Direction::Before => {
                let hi = if inclusive {
                    events.partition_point(|e| e.timestamp() <= timestamp)
                } else {
                    events.partition_point(|e| e.timestamp() < timestamp)
                };
                events[..hi].iter().rev().find(|e| accepts(updates_only, e))
            }
            Direction::After => {
                let lo = if inclusive {
                    events.partition_point(|e| e.timestamp() < timestamp)
                } else {
                    events.partition_point(|e| e.timestamp() <= timestamp)
                };
                events[lo..].iter().find(|e| accepts(updates_only, e))
            }
        };
        Ok(found.cloned())
    }

    fn count(
        &self,
        metadata: &Metadata,
        begin: i64,
        end: i64,
        updates_only: bool,
    ) -> Result<u64, StreamError> {
        let events = &self.channel(metadata)?.events;
        let lo = events.partition_point(|e| e.timestamp() < begin);
        let hi = events.partition_point(|e| e.timestamp() < end).max(lo);
        let n = events[lo..hi]
            .iter()
            .filter(|e| accepts(updates_only, e))
            .count();
        Ok(n as u64)
    }

    fn find_extra_info(
        &self,
        metadata: &Metadata,
        kind: &str,
        end: i64,
    ) -> Result<Vec<ExtraInfo>, StreamError> {
        Ok(self
            .channel(metadata)?
            .history
            .iter()
            .filter(|info| info.kind == kind && info.timestamp < end)
            .cloned()
            .collect())
    }
}

/// Cursor over a slice of one channel's events.
struct MemoryCursor<'a> {
    events: std::slice::Iter<'a, AnyEvent>,
    updates_only: bool,
    open_cursors: &'a AtomicU64,
    open: bool,
}

impl MemoryCursor<'_> {
    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.events = Default::default();
            self.open_cursors.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl EventStream for MemoryCursor<'_> {
    type Value = ValueKind;

    fn read(&mut self) -> Result<Option<AnyEvent>, StreamError> {
        ensure_open(self)?;
        let updates_only = self.updates_only;
        Ok(self.events.find(|e| accepts(updates_only, e)).cloned())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.release();
        Ok(())
    }
}

impl Drop for MemoryCursor<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn archive() -> (MemoryArchive, Metadata) {
        let mut archive = MemoryArchive::new("test");
        let md = archive.add_channel("ch1", 1, DataKind::Double).unwrap();
        archive
            .extend(
                &md,
                vec![
                    Event::update(10, ValueKind::Float(1.0)),
                    Event::new(20, EventCode::NetworkDisconnection, ValueKind::Float(0.0)),
                    Event::update(20, ValueKind::Float(2.0)),
                    Event::update(30, ValueKind::Float(3.0)),
                ],
            )
            .unwrap();
        (archive, md)
    }

    #[test]
    fn test_rejects_out_of_order_and_wrong_kind() {
        let (mut archive, md) = archive();
        let err = archive
            .append(&md, Event::update(5, ValueKind::Float(0.0)))
            .unwrap_err();
        assert!(matches!(err, StreamError::Data(_)));

        let err = archive
            .append(&md, Event::update(40, ValueKind::Int(0)))
            .unwrap_err();
        assert!(matches!(err, StreamError::Data(_)));

        let err = archive
            .append(&md, Event::new(40, EventCode::Undefined, ValueKind::Float(0.0)))
            .unwrap_err();
        assert!(matches!(err, StreamError::Data(_)));
    }

    #[test]
    fn test_string_width_is_checked_for_updates() {
        let mut archive = MemoryArchive::new("test");
        let md = archive.add_channel("vec", 2, DataKind::String).unwrap();
        let pair = ValueKind::Strings(vec!["a".into(), "b".into()]);
        archive.append(&md, Event::update(1, pair)).unwrap();

        let single = ValueKind::Strings(vec!["a".into()]);
        assert!(archive.append(&md, Event::update(2, single)).is_err());
        let gap = Event::new(3, EventCode::ArchiverShutdown, ValueKind::Strings(vec![]));
        archive.append(&md, gap).unwrap();
    }

    #[test]
    fn test_interval_is_half_open() {
        let (archive, md) = archive();
        let mut s = archive.open_interval(&md, 10, 30, false).unwrap();
        let ts: Vec<i64> = s.drain().unwrap().iter().map(Event::timestamp).collect();
        assert_eq!(ts, vec![10, 20, 20]);

        let mut s = archive.open_interval(&md, 10, 31, true).unwrap();
        assert_eq!(s.drain().unwrap().len(), 3);
        assert_eq!(archive.count(&md, 0, 100, false).unwrap(), 4);
        assert_eq!(archive.count(&md, 0, 100, true).unwrap(), 3);
        assert_eq!(archive.count(&md, 50, 10, true).unwrap(), 0);
    }

    #[test]
    fn test_find_nearest_ties_and_direction() {
        let (archive, md) = archive();
        let before = archive
            .find_nearest(&md, 20, Direction::Before, true, false)
            .unwrap()
            .unwrap();
        assert_eq!(before.value(), &ValueKind::Float(2.0));

        let after = archive
            .find_nearest(&md, 20, Direction::After, true, false)
            .unwrap()
            .unwrap();
        assert_eq!(after.code(), EventCode::NetworkDisconnection);

        let exclusive = archive
            .find_nearest(&md, 20, Direction::Before, false, false)
            .unwrap()
            .unwrap();
        assert_eq!(exclusive.timestamp(), 10);

        assert!(
            archive
                .find_nearest(&md, 10, Direction::Before, false, false)
                .unwrap()
                .is_none()
        );
        assert_eq!(archive.point_queries(), 4);
    }

    #[test]
    fn test_cursor_released_exactly_once() {
        let (archive, md) = archive();
        let mut a = archive.open_interval(&md, 0, 100, false).unwrap();
        let b = archive.open_interval(&md, 0, 100, false).unwrap();
        assert_eq!(archive.open_cursors(), 2);

        a.close().unwrap();
        a.close().unwrap();
        assert_eq!(archive.open_cursors(), 1);
        assert!(a.read().unwrap_err().is_closed_stream());

        drop(b);
        drop(a);
        assert_eq!(archive.open_cursors(), 0);
    }

    #[test]
    fn test_unknown_channel() {
        let (archive, _) = archive();
        let other = Metadata::new(99, "nope", "test", 1, DataKind::Float);
        assert!(matches!(
            archive.count(&other, 0, 1, false),
            Err(StreamError::Configuration(_))
        ));
    }
}
