use super::SampleGrid;
use crate::boundary::BoundaryStream;
use crate::error::StreamError;
use crate::event::Event;
use crate::stream::{EventStream, ensure_open};

/// Samples one pass over an interval stream on a [`SampleGrid`].
///
/// The inner stream is wrapped in a [`BoundaryStream`] spanning the first to the last sample,
/// seeded with the last event before the grid. For each sample the sampler advances a
/// `(previous, current)` window until `previous <= sample < current` and emits `previous`
/// copied to the sample instant. Once the inner stream runs dry the last event is held
/// forward, keeping its code and value.
pub struct GridSampler<S: EventStream> {
    boundary: BoundaryStream<S>,
    grid: SampleGrid,
    index: u64,
    primed: bool,
    previous: Option<Event<S::Value>>,
    current: Option<Event<S::Value>>,
}

impl<S: EventStream> GridSampler<S> {
    /// Wraps `inner`, which must cover the grid from its first sample through its last.
    ///
    /// `seed` is the last event strictly before the first sample, or an `Undefined`
    /// placeholder at the first sample when the archive holds nothing earlier. Fails with
    /// [`StreamError::Configuration`] without one.
    pub fn new(
        inner: S,
        grid: SampleGrid,
        seed: Option<Event<S::Value>>,
        updates_only: bool,
    ) -> Result<Self, StreamError> {
        let Some(seed) = seed else {
            return Err(StreamError::Configuration(
                "grid sampler requires a seed event".to_string(),
            ));
        };
        let boundary = BoundaryStream::new(
            inner,
            grid.timestamp(0),
            grid.end_timestamp(),
            Some(seed),
            updates_only,
        );
        Ok(Self {
            boundary,
            grid,
            index: 0,
            primed: false,
            previous: None,
            current: None,
        })
    }

    /// Replaces the `now` captured by the boundary stream.
    pub fn with_now(mut self, now: i64) -> Self {
        self.boundary = self.boundary.with_now(now);
        self
    }

    /// The sampled grid.
    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    /// Samples emitted so far.
    pub fn samples_taken(&self) -> u64 {
        self.index
    }

    /// The boundary stream being sampled.
    pub fn boundary(&self) -> &BoundaryStream<S> {
        &self.boundary
    }

    fn next_event(
        &mut self,
        held: &Event<S::Value>,
        sample: i64,
    ) -> Result<Event<S::Value>, StreamError> {
        match self.boundary.read()? {
            Some(event) => Ok(event),
            None => {
                // Hold forward past the current sample.
                let next = self.grid.timestamp(self.index + 1).max(sample + 1);
                Ok(held.clone_at(next))
            }
        }
    }
}

impl<S: EventStream> EventStream for GridSampler<S> {
    type Value = S::Value;

    fn read(&mut self) -> Result<Option<Event<S::Value>>, StreamError> {
        ensure_open(self)?;
        if self.index >= self.grid.count() {
            return Ok(None);
        }
        let sample = self.grid.timestamp(self.index);

        if !self.primed {
            self.primed = true;
            self.previous = self.boundary.read()?;
            self.current = self.boundary.read()?;
        }
        let Some(mut previous) = self.previous.take() else {
            self.index = self.grid.count();
            return Ok(None);
        };
        let mut current = match self.current.take() {
            Some(event) => event,
            None => previous.clone_at(sample),
        };

        while previous.timestamp() <= sample && current.timestamp() <= sample {
            let next = self.next_event(&current, sample)?;
            previous = std::mem::replace(&mut current, next);
        }

        let out = previous.clone_at(sample);
        self.previous = Some(previous);
        self.current = Some(current);
        self.index += 1;
        Ok(Some(out))
    }

    fn is_open(&self) -> bool {
        self.boundary.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.boundary.close()
    }
}
