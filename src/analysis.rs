//! Streams that feed passing events through [`RunningStatistics`].

use crate::error::StreamError;
use crate::event::{AnalyzedValue, Event};
use crate::statistics::{RunningStatistics, StatisticsSnapshot};
use crate::stream::{EventStream, ensure_open};

/// Pushes every float event into a caller-owned accumulator and attaches the accumulator's
/// exported sub-statistics to the event, as they stand right after that push.
pub struct AnalysisStream<'a, S> {
    inner: S,
    stats: &'a mut RunningStatistics,
}

impl<'a, S: EventStream<Value = f32>> AnalysisStream<'a, S> {
    /// Wraps `inner`, accumulating into `stats`.
    pub fn new(inner: S, stats: &'a mut RunningStatistics) -> Self {
        Self { inner, stats }
    }

    /// Statistics over every event read so far.
    pub fn statistics(&self) -> &RunningStatistics {
        self.stats
    }

    /// Copy of the current statistics.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }
}

impl<S: EventStream<Value = f32>> EventStream for AnalysisStream<'_, S> {
    type Value = AnalyzedValue;

    fn read(&mut self) -> Result<Option<Event<AnalyzedValue>>, StreamError> {
        ensure_open(self)?;
        let Some(event) = self.inner.read()? else {
            return Ok(None);
        };
        self.stats.push(&event);
        let stats = self.stats.event_stats();
        Ok(Some(event.map_value(|value| AnalyzedValue { value, stats })))
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close()
    }
}

/// Replaces each float event's value with the running time-integral through that event.
///
/// The value is zero until the integral is known.
pub struct IntegrationStream<S> {
    inner: S,
    stats: RunningStatistics,
}

impl<S: EventStream<Value = f32>> IntegrationStream<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: RunningStatistics::new(),
        }
    }

    /// Statistics over every event read so far.
    pub fn statistics(&self) -> &RunningStatistics {
        &self.stats
    }
}

impl<S: EventStream<Value = f32>> EventStream for IntegrationStream<S> {
    type Value = f32;

    fn read(&mut self) -> Result<Option<Event<f32>>, StreamError> {
        ensure_open(self)?;
        let Some(event) = self.inner.read()? else {
            return Ok(None);
        };
        self.stats.push(&event);
        let integral = self.stats.integration().unwrap_or(0.0) as f32;
        Ok(Some(event.map_value(|_| integral)))
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close()
    }
}
