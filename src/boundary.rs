//! Guarantees a point exactly on the begin and end instants of a query interval.

use crate::error::StreamError;
use crate::event::Event;
use crate::stream::{EventStream, ensure_open};
use crate::time;

enum State<V> {
    NotStarted,
    /// First inner event, held back while the synthesized begin point is emitted.
    Buffered(Event<V>),
    Started,
    Finished,
}

/// Wraps an interval stream so that it has a point on `begin` and on `end`.
///
/// - If the first inner event is after `begin` (or the stream is empty) and a prior point is
///   known, a copy of the prior point at `begin` is emitted first.
/// - When the inner stream is exhausted, the last tracked event is copied to `end`, provided
///   it lies before `end` and `end` lies before the `now` captured at construction. A value is
///   never asserted for a future instant.
///
/// With `updates_only`, only Update events are tracked as the source of the end point, so an
/// all-non-update stream gets no end point.
pub struct BoundaryStream<S: EventStream> {
    inner: S,
    begin: i64,
    end: i64,
    prior: Option<Event<S::Value>>,
    updates_only: bool,
    now: i64,
    last_event: Option<Event<S::Value>>,
    state: State<S::Value>,
}

impl<S: EventStream> BoundaryStream<S> {
    /// Wraps `inner`, capturing the current wall-clock time as `now`.
    ///
    /// `prior` is the last known event strictly before `begin`, if any.
    pub fn new(
        inner: S,
        begin: i64,
        end: i64,
        prior: Option<Event<S::Value>>,
        updates_only: bool,
    ) -> Self {
        Self {
            inner,
            begin,
            end,
            prior,
            updates_only,
            now: time::now(),
            last_event: None,
            state: State::NotStarted,
        }
    }

    /// Replaces the captured `now`.
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    /// Interval begin.
    pub fn begin(&self) -> i64 {
        self.begin
    }

    /// Interval end.
    pub fn end(&self) -> i64 {
        self.end
    }

    /// The wrapped stream.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn track(&mut self, event: &Event<S::Value>) {
        if !self.updates_only || event.is_update() {
            self.last_event = Some(event.clone());
        }
    }

    fn first_read(&mut self) -> Result<Option<Event<S::Value>>, StreamError> {
        let first = self.inner.read()?;
        self.state = State::Started;

        let Some(prior) = self.prior.take() else {
            return Ok(first);
        };
        match first {
            Some(event) if event.timestamp() > self.begin => {
                self.state = State::Buffered(event);
                Ok(Some(prior.clone_at(self.begin)))
            }
            Some(event) => Ok(Some(event)),
            None => Ok(Some(prior.clone_at(self.begin))),
        }
    }

    fn finish(&mut self) -> Option<Event<S::Value>> {
        self.state = State::Finished;
        let last = self.last_event.take()?;
        if last.timestamp() < self.end && self.end < self.now {
            #[cfg(feature = "logging")]
            log::debug!("synthesizing end boundary point at {}", self.end);
            Some(last.clone_at(self.end))
        } else {
            None
        }
    }
}

impl<S: EventStream> EventStream for BoundaryStream<S> {
    type Value = S::Value;

    fn read(&mut self) -> Result<Option<Event<S::Value>>, StreamError> {
        ensure_open(self)?;

        let current = match std::mem::replace(&mut self.state, State::Started) {
            State::NotStarted => {
                self.state = State::NotStarted;
                self.first_read()?
            }
            State::Buffered(event) => Some(event),
            State::Started => self.inner.read()?,
            State::Finished => {
                self.state = State::Finished;
                return Ok(None);
            }
        };

        match current {
            Some(event) => {
                self.track(&event);
                Ok(Some(event))
            }
            None => Ok(self.finish()),
        }
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close()
    }
}
