use super::{GridSampler, PointQuerySampler, SampleGrid, resolve_seed};
use crate::config::HybridSamplerConfig;
use crate::error::StreamError;
use crate::event::{AnyEvent, Event, ValueKind};
use crate::source::{EventSource, Metadata, SourceStream};
use crate::stream::{EventStream, ensure_open};
use crate::time;
use std::collections::VecDeque;

/// Replays a buffered prefix of a stream, then continues with the stream itself, counting
/// every event handed out.
pub(crate) struct LookaheadStream<S: EventStream> {
    buffer: VecDeque<Event<S::Value>>,
    inner: S,
    consumed: u64,
}

impl<S: EventStream> LookaheadStream<S> {
    /// Reads up to `capacity` events from `inner` into the buffer.
    pub(crate) fn fill(mut inner: S, capacity: usize) -> Result<Self, StreamError> {
        let mut buffer = VecDeque::with_capacity(capacity);
        while buffer.len() < capacity {
            match inner.read()? {
                Some(event) => buffer.push_back(event),
                None => break,
            }
        }
        Ok(Self {
            buffer,
            inner,
            consumed: 0,
        })
    }

    pub(crate) fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn last_buffered(&self) -> Option<i64> {
        self.buffer.back().map(Event::timestamp)
    }

    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl<S: EventStream> EventStream for LookaheadStream<S> {
    type Value = S::Value;

    fn read(&mut self) -> Result<Option<Event<S::Value>>, StreamError> {
        ensure_open(self)?;
        let event = match self.buffer.pop_front() {
            Some(event) => Some(event),
            None => self.inner.read()?,
        };
        if event.is_some() {
            self.consumed += 1;
        }
        Ok(event)
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.buffer.clear();
        self.inner.close()
    }
}

enum Mode<'a, Src: ?Sized> {
    Pending,
    Streaming(GridSampler<LookaheadStream<SourceStream<'a>>>),
    Points(PointQuerySampler<'a, Src>),
}

/// Samples a grid by streaming while the data is sparse and by point queries once it is dense.
///
/// Before the first sample, up to `lookahead` events are buffered. If the buffer fills and the
/// events per spanned sample exceed `density_threshold`, the sampler never streams. Otherwise it
/// streams and, after `delay` samples and every `check_interval` samples thereafter, compares
/// the events consumed per sample against the threshold, closing the cursor and continuing
/// with point queries once it is exceeded. Either way the samples are exactly those the other
/// strategies produce.
pub struct HybridSampler<'a, Src: ?Sized> {
    source: &'a Src,
    metadata: Metadata,
    grid: SampleGrid,
    updates_only: bool,
    config: HybridSamplerConfig,
    now: i64,
    emitted: u64,
    mode: Mode<'a, Src>,
    open: bool,
}

impl<'a, Src: EventSource + ?Sized> HybridSampler<'a, Src> {
    /// Creates a sampler over `metadata`'s channel in `source`, capturing the current time.
    ///
    /// Fails with [`StreamError::Configuration`] if `config` does not validate.
    pub fn new(
        source: &'a Src,
        metadata: Metadata,
        grid: SampleGrid,
        updates_only: bool,
        config: HybridSamplerConfig,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            source,
            metadata,
            grid,
            updates_only,
            config,
            now: time::now(),
            emitted: 0,
            mode: Mode::Pending,
            open: true,
        })
    }

    /// Replaces the captured `now`.
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    /// Returns true while samples come from point queries.
    pub fn is_point_querying(&self) -> bool {
        matches!(self.mode, Mode::Points(_))
    }

    fn points(&self, from: u64) -> PointQuerySampler<'a, Src> {
        PointQuerySampler::new(
            self.source,
            self.metadata.clone(),
            self.grid,
            self.updates_only,
        )
        .resume_at(from)
    }

    fn start(&mut self) -> Result<Mode<'a, Src>, StreamError> {
        let begin = self.grid.timestamp(0);
        let end = self.grid.end_timestamp().saturating_add(1);
        let cursor = self
            .source
            .open_interval(&self.metadata, begin, end, self.updates_only)?;
        let mut lookahead = LookaheadStream::fill(cursor, self.config.lookahead)?;

        if lookahead.buffered() >= self.config.lookahead {
            let last = lookahead.last_buffered().unwrap_or(begin);
            let spanned = self.grid.samples_through(last).max(1);
            let density = lookahead.buffered() as f64 / spanned as f64;
            if density > self.config.density_threshold {
                #[cfg(feature = "logging")]
                log::debug!(
                    "'{}': {density:.1} events/sample in lookahead, sampling by point queries",
                    self.metadata.name
                );
                lookahead.close()?;
                return Ok(Mode::Points(self.points(0)));
            }
        }

        let seed = resolve_seed(self.source, &self.metadata, &self.grid, self.updates_only)?;
        let sampler = GridSampler::new(lookahead, self.grid, Some(seed), self.updates_only)?
            .with_now(self.now);
        Ok(Mode::Streaming(sampler))
    }

    fn due_for_check(&self) -> bool {
        self.emitted >= self.config.delay
            && (self.emitted - self.config.delay) % self.config.check_interval == 0
            && self.emitted < self.grid.count()
    }
}

impl<Src: EventSource + ?Sized> EventStream for HybridSampler<'_, Src> {
    type Value = ValueKind;

    fn read(&mut self) -> Result<Option<AnyEvent>, StreamError> {
        ensure_open(self)?;
        if self.emitted >= self.grid.count() {
            return Ok(None);
        }
        if matches!(self.mode, Mode::Pending) {
            self.mode = self.start()?;
        }

        let (out, density) = match &mut self.mode {
            Mode::Streaming(sampler) => {
                let out = sampler.read()?;
                let consumed = sampler.boundary().inner().consumed();
                (out, consumed as f64 / (self.emitted + 1) as f64)
            }
            Mode::Points(sampler) => (sampler.read()?, 0.0),
            Mode::Pending => (None, 0.0),
        };
        if out.is_none() {
            return Ok(None);
        }
        self.emitted += 1;

        if matches!(self.mode, Mode::Streaming(_))
            && self.due_for_check()
            && density > self.config.density_threshold
        {
            #[cfg(feature = "logging")]
            log::info!(
                "'{}': {density:.1} events/sample after {} samples, switching to point queries",
                self.metadata.name,
                self.emitted
            );
            if let Mode::Streaming(sampler) = &mut self.mode {
                sampler.close()?;
            }
            self.mode = Mode::Points(self.points(self.emitted));
        }
        Ok(out)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.open = false;
        match &mut self.mode {
            Mode::Streaming(sampler) => sampler.close(),
            Mode::Points(sampler) => sampler.close(),
            Mode::Pending => Ok(()),
        }
    }
}
