//! The pull-based event stream contract and its basic implementations.

use crate::error::StreamError;
use crate::event::{Event, EventValue, ValueKind};
use std::collections::VecDeque;
use std::marker::PhantomData;

/// A single-reader, pull-based cursor over time-ordered events.
///
/// # Contract
///
/// - `read` yields events with non-decreasing timestamps and returns `Ok(None)` once the
///   stream is exhausted. Reading again after exhaustion keeps returning `Ok(None)`.
/// - Reading after `close` fails with [`StreamError::ClosedStream`].
/// - `close` is idempotent and releases the owned resource exactly once. A wrapping stream
///   owns its inner stream and forwards `close` and `is_open` to it.
///
/// A stream instance is not safe for concurrent reads. Distinct instances owning distinct
/// resources may run on separate threads.
pub trait EventStream {
    /// Value type of the events this stream yields.
    type Value: EventValue;

    /// Reads the next event, or `None` at end of stream.
    fn read(&mut self) -> Result<Option<Event<Self::Value>>, StreamError>;

    /// Returns true until the stream is closed.
    fn is_open(&self) -> bool;

    /// Closes the stream and releases its resource. Safe to call more than once.
    fn close(&mut self) -> Result<(), StreamError>;

    /// Borrows the stream as an iterator of events.
    fn iter(&mut self) -> StreamIter<'_, Self>
    where
        Self: Sized,
    {
        StreamIter { stream: self }
    }

    /// Reads every remaining event into a vector.
    fn drain(&mut self) -> Result<Vec<Event<Self::Value>>, StreamError>
    where
        Self: Sized,
    {
        self.iter().collect()
    }
}

impl<S: EventStream + ?Sized> EventStream for Box<S> {
    type Value = S::Value;

    fn read(&mut self) -> Result<Option<Event<Self::Value>>, StreamError> {
        (**self).read()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        (**self).close()
    }
}

/// Iterator adapter returned by [`EventStream::iter`].
///
/// Stops after the first `None` or the first error.
pub struct StreamIter<'a, S> {
    stream: &'a mut S,
}

impl<S: EventStream> Iterator for StreamIter<'_, S> {
    type Item = Result<Event<S::Value>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.read().transpose()
    }
}

/// Fails with [`StreamError::ClosedStream`] unless `stream` is open.
pub(crate) fn ensure_open<S: EventStream + ?Sized>(stream: &S) -> Result<(), StreamError> {
    if stream.is_open() {
        Ok(())
    } else {
        Err(StreamError::ClosedStream)
    }
}

/// A stream over an in-memory list of events.
#[derive(Debug, Clone)]
pub struct VecStream<V> {
    events: VecDeque<Event<V>>,
    open: bool,
}

impl<V: EventValue> VecStream<V> {
    /// Creates a stream yielding `events` in order.
    pub fn new(events: impl IntoIterator<Item = Event<V>>) -> Self {
        Self {
            events: events.into_iter().collect(),
            open: true,
        }
    }

    /// Number of events not yet read.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl<V: EventValue> EventStream for VecStream<V> {
    type Value = V;

    fn read(&mut self) -> Result<Option<Event<V>>, StreamError> {
        ensure_open(self)?;
        Ok(self.events.pop_front())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<(), StreamError> {
        if self.open {
            self.open = false;
            self.events = VecDeque::new();
        }
        Ok(())
    }
}

/// Converts a type-erased stream into a typed one.
///
/// A value of the wrong kind fails the read with [`StreamError::Data`].
pub struct TypedStream<S, V> {
    inner: S,
    _value: PhantomData<V>,
}

impl<S, V> TypedStream<S, V>
where
    S: EventStream<Value = ValueKind>,
    V: EventValue,
{
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            _value: PhantomData,
        }
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, V> EventStream for TypedStream<S, V>
where
    S: EventStream<Value = ValueKind>,
    V: EventValue,
{
    type Value = V;

    fn read(&mut self) -> Result<Option<Event<V>>, StreamError> {
        match self.inner.read()? {
            Some(event) => event.typed().map(Some),
            None => Ok(None),
        }
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close()
    }
}
