//! Count-based uniform thinning of an event stream.

use crate::error::StreamError;
use crate::event::Event;
use crate::stream::{EventStream, ensure_open};

/// Emits the last event of each of `limit` consecutive bins of a stream holding `count` events.
///
/// Bins hold `count / limit` events, and the `count % limit` leftover events are spread evenly
/// over the bins with an exact integer accumulator. Nothing is synthesized, so any event stream
/// can be decimated. When `count <= limit` every event passes through.
pub struct DecimationStream<S> {
    inner: S,
    bin_size: u64,
    remainder: u64,
    limit: u64,
    calls: u64,
}

impl<S: EventStream> DecimationStream<S> {
    /// Wraps `inner`, which yields `count` events, to emit about `limit` of them.
    pub fn new(inner: S, count: u64, limit: u64) -> Self {
        let (bin_size, remainder) = if count > limit && limit > 0 {
            (count / limit, count % limit)
        } else {
            (1, 0)
        };
        Self {
            inner,
            bin_size,
            remainder,
            limit: limit.max(1),
            calls: 0,
        }
    }

    /// Events per bin before the remainder is spread.
    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }

    fn next_bin_size(&mut self) -> u64 {
        let before = u128::from(self.calls) * u128::from(self.remainder) / u128::from(self.limit);
        self.calls += 1;
        let after = u128::from(self.calls) * u128::from(self.remainder) / u128::from(self.limit);
        if after == before {
            self.bin_size
        } else {
            self.bin_size + 1
        }
    }
}

impl<S: EventStream> EventStream for DecimationStream<S> {
    type Value = S::Value;

    fn read(&mut self) -> Result<Option<Event<S::Value>>, StreamError> {
        ensure_open(self)?;
        let mut last = None;
        for _ in 0..self.next_bin_size() {
            match self.inner.read()? {
                Some(event) => last = Some(event),
                None => return Ok(None),
            }
        }
        Ok(last)
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close()
    }
}
