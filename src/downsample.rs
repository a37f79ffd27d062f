//! Visually faithful downsampling for plotting.
//!
//! Interior events are split into fixed-size bins. Each bin keeps the point forming the largest
//! triangle with the previous bin's selection and the next bin's first event, its minimum and
//! maximum, and every non-update event together with its update neighbours, so gaps in the
//! channel history stay visible. The first and last events always pass through.

use crate::error::StreamError;
use crate::event::{Event, NumericValue};
use crate::stream::{EventStream, ensure_open};
use std::collections::{BTreeMap, VecDeque};

/// Area of the triangle (`left`, `candidate`, `right`).
///
/// The x axis is seconds relative to `left`. A non-update `right` anchor takes `left`'s value.
pub fn triangle_area<V: NumericValue>(
    left: &Event<V>,
    candidate: &Event<V>,
    right: &Event<V>,
) -> f64 {
    let x2 = candidate.timestamp_as_seconds() - left.timestamp_as_seconds();
    let x3 = right.timestamp_as_seconds() - left.timestamp_as_seconds();

    let y1 = left.value().as_f64();
    let y2 = candidate.value().as_f64();
    let y3 = if right.is_update() {
        right.value().as_f64()
    } else {
        y1
    };

    0.5 * (x2 * (y3 - y1) + x3 * (y1 - y2)).abs()
}

/// One bin of raw events being reduced to a handful of representative points.
#[derive(Debug, Clone)]
pub struct DownsampleBucket<V> {
    events: Vec<Event<V>>,
    selected: Option<usize>,
    min: Option<usize>,
    max: Option<usize>,
    passthrough: Vec<usize>,
}

impl<V: NumericValue> DownsampleBucket<V> {
    /// Creates a bucket. Fails with [`StreamError::Configuration`] if `events` is empty.
    pub fn new(events: Vec<Event<V>>) -> Result<Self, StreamError> {
        if events.is_empty() {
            return Err(StreamError::Configuration(
                "downsample bucket requires at least one event".to_string(),
            ));
        }
        Ok(Self {
            events,
            selected: None,
            min: None,
            max: None,
            passthrough: Vec::new(),
        })
    }

    /// Scans the bin against its anchors and returns the point the next bin should use as its
    /// left anchor: the selected point, or `left` itself when no update formed a triangle of
    /// positive area.
    pub fn downsample(&mut self, left: &Event<V>, right: &Event<V>) -> Event<V> {
        let mut best_area = 0.0;
        let mut previous: Option<usize> = None;

        for (i, event) in self.events.iter().enumerate() {
            if !event.is_update() {
                if let Some(p) = previous {
                    self.passthrough.push(p);
                }
                self.passthrough.push(i);
                previous = Some(i);
                continue;
            }
            if previous.is_some_and(|p| !self.events[p].is_update()) {
                self.passthrough.push(i);
            }

            let area = triangle_area(left, event, right);
            if area > best_area {
                best_area = area;
                self.selected = Some(i);
            }

            let value = event.value().as_f64();
            if self
                .min
                .is_none_or(|m| value < self.events[m].value().as_f64())
            {
                self.min = Some(i);
            }
            if self
                .max
                .is_none_or(|m| value > self.events[m].value().as_f64())
            {
                self.max = Some(i);
            }
            previous = Some(i);
        }

        match self.selected {
            Some(i) => self.events[i].clone(),
            None => left.clone(),
        }
    }

    /// The points this bin contributes, ascending by timestamp. Among points sharing a
    /// timestamp the first of selected, min, max, pass-through wins.
    pub fn output(&self) -> Vec<Event<V>> {
        let mut out: BTreeMap<i64, usize> = BTreeMap::new();
        let picks = [self.selected, self.min, self.max]
            .into_iter()
            .flatten()
            .chain(self.passthrough.iter().copied());
        for i in picks {
            out.entry(self.events[i].timestamp()).or_insert(i);
        }
        out.into_values().map(|i| self.events[i].clone()).collect()
    }
}

/// Streams a bin-by-bin visual downsample of a numeric stream.
///
/// Holds at most one bin of raw events plus that bin's output at any time.
pub struct VisualDownsampleStream<S: EventStream> {
    inner: S,
    bin_size: u64,
    queue: VecDeque<Event<S::Value>>,
    has_first: bool,
    last_selected: Option<Event<S::Value>>,
    bin_boundary: u64,
    processed: u64,
    bin: Vec<Event<S::Value>>,
    lookahead: Option<Event<S::Value>>,
}

impl<S> VisualDownsampleStream<S>
where
    S: EventStream,
    S::Value: NumericValue,
{
    /// Wraps `inner`, which yields `total_count` events, to produce about `requested_bins`
    /// bins.
    ///
    /// Fails with [`StreamError::Configuration`] if fewer than three bins are requested, since
    /// the first and last events take one bin each.
    pub fn new(inner: S, total_count: u64, requested_bins: u64) -> Result<Self, StreamError> {
        if requested_bins < 3 {
            return Err(StreamError::Configuration(format!(
                "visual downsampling needs at least 3 bins, got {requested_bins}"
            )));
        }
        let bin_size = Self::bin_size_for(total_count, requested_bins);
        #[cfg(feature = "logging")]
        log::debug!("downsampling {total_count} events into bins of {bin_size}");
        Ok(Self {
            inner,
            bin_size,
            queue: VecDeque::new(),
            has_first: false,
            last_selected: None,
            bin_boundary: 0,
            processed: 0,
            bin: Vec::new(),
            lookahead: None,
        })
    }

    /// Interior events per bin, so that no more than `requested_bins - 2` interior bins form.
    pub fn bin_size_for(total_count: u64, requested_bins: u64) -> u64 {
        let interior_bins = requested_bins.saturating_sub(2).max(1);
        total_count
            .saturating_sub(2)
            .div_ceil(interior_bins)
            .max(1)
    }

    /// Interior events per bin.
    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }

    /// Events waiting to be read.
    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Forwards one event from before the first update, or the first update itself.
    fn queue_first(&mut self) -> Result<(), StreamError> {
        let Some(event) = self.inner.read()? else {
            return Ok(());
        };
        self.processed += 1;
        if event.is_update() {
            self.has_first = true;
            self.last_selected = Some(event.clone());
            self.bin_boundary = (self.processed / self.bin_size + 1) * self.bin_size;
        }
        self.queue.push_back(event);
        Ok(())
    }

    fn flush_bin(&mut self, right: &Event<S::Value>) -> Result<(), StreamError> {
        let Some(left) = self.last_selected.take() else {
            return Ok(());
        };
        let mut bucket = DownsampleBucket::new(std::mem::take(&mut self.bin))?;
        self.last_selected = Some(bucket.downsample(&left, right));
        self.queue.extend(bucket.output());
        Ok(())
    }

    fn process(&mut self) -> Result<(), StreamError> {
        if !self.has_first {
            return self.queue_first();
        }

        let mut previous = self.lookahead.take();
        while let Some(current) = self.inner.read()? {
            if let Some(event) = previous.take() {
                self.bin.push(event);
                self.processed += 1;
                if self.processed == self.bin_boundary {
                    self.bin_boundary += self.bin_size;
                    self.flush_bin(&current)?;
                    self.lookahead = Some(current);
                    return Ok(());
                }
            }
            previous = Some(current);
        }

        if let Some(last) = previous {
            if !self.bin.is_empty() {
                self.flush_bin(&last)?;
            }
            self.queue.push_back(last);
        }
        Ok(())
    }
}

impl<S> EventStream for VisualDownsampleStream<S>
where
    S: EventStream,
    S::Value: NumericValue,
{
    type Value = S::Value;

    fn read(&mut self) -> Result<Option<Event<S::Value>>, StreamError> {
        ensure_open(self)?;
        if self.queue.is_empty() {
            self.process()?;
        }
        Ok(self.queue.pop_front())
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.queue.clear();
        self.bin.clear();
        self.inner.close()
    }
}
