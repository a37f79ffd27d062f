//! Online, time-weighted summary statistics over an event stream.

use crate::event::{Event, EventCode, NumericValue};
use crate::time;
use serde::{Deserialize, Serialize};

/// A running sub-statistic that can be attached to every analyzed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStat {
    /// Compensated time-integral so far (value units x seconds). Zero while unknown.
    Integration,
}

#[derive(Debug, Clone, Copy)]
struct Point {
    seconds: f64,
    code: EventCode,
    value: f64,
}

impl Point {
    fn of<V: NumericValue>(event: &Event<V>) -> Self {
        Self {
            seconds: time::archive_time_as_seconds(event.timestamp()),
            code: event.code(),
            value: event.value().as_f64(),
        }
    }
}

/// Time-weighted mean, variance, extrema and integral, accumulated one event at a time.
///
/// Each event's value holds until the next event arrives, so a value contributes with a weight
/// equal to the seconds between it and its successor. Spans that begin on a non-update event are
/// skipped entirely, which removes disconnect gaps from every statistic.
///
/// Mean and variance use Finch's weighted incremental formulas. The integral uses Neumaier
/// compensated summation.
///
/// Getters return `None` until at least one span has contributed. `sigma` and `rms`
/// additionally need a positive total duration.
#[derive(Debug, Clone, Default)]
pub struct RunningStatistics {
    current: Option<Point>,
    initialized: bool,
    min: f64,
    max: f64,
    mean: f64,
    sigma_sum: f64,
    duration: f64,
    integration: f64,
    correction: f64,
    event_count: u64,
    update_count: u64,
    event_stats: Vec<EventStat>,
}

impl RunningStatistics {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty accumulator that also exports `stats` through
    /// [`RunningStatistics::event_stats`].
    pub fn with_event_stats(stats: Vec<EventStat>) -> Self {
        Self {
            event_stats: stats,
            ..Self::default()
        }
    }

    /// Clears all accumulated state. The exported sub-statistic list is kept.
    pub fn reset(&mut self) {
        let event_stats = std::mem::take(&mut self.event_stats);
        *self = Self::with_event_stats(event_stats);
    }

    /// Accumulates the next event. Events must be pushed in ascending timestamp order.
    pub fn push<V: NumericValue>(&mut self, event: &Event<V>) {
        self.event_count += 1;
        let point = Point::of(event);

        let Some(previous) = self.current.replace(point) else {
            return;
        };

        if previous.code.is_update() {
            self.update_count += 1;
            self.contribute(previous.value, point.seconds - previous.seconds);
        }
    }

    fn contribute(&mut self, value: f64, weight: f64) {
        self.duration += weight;

        if !self.initialized {
            self.initialized = true;
            self.min = value;
            self.max = value;
            self.mean = value;
            self.integration = value * weight;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if self.duration > 0.0 {
            let delta = weight * (value - self.mean);
            self.mean += delta / self.duration;
            self.sigma_sum += delta * (value - self.mean);
        }
        self.add_integral(value * weight);
    }

    fn add_integral(&mut self, v: f64) {
        let t = self.integration + v;
        if self.integration.abs() >= v.abs() {
            self.correction += (self.integration - t) + v;
        } else {
            self.correction += (v - t) + self.integration;
        }
        self.integration = t;
    }

    fn known(&self, value: f64) -> Option<f64> {
        self.initialized.then_some(value)
    }

    /// Smallest contributing value.
    pub fn min(&self) -> Option<f64> {
        self.known(self.min)
    }

    /// Largest contributing value.
    pub fn max(&self) -> Option<f64> {
        self.known(self.max)
    }

    /// Time-weighted mean.
    pub fn mean(&self) -> Option<f64> {
        self.known(self.mean)
    }

    /// Seconds spent in the update state.
    pub fn duration(&self) -> Option<f64> {
        self.known(self.duration)
    }

    /// Compensated time-integral in value units x seconds.
    pub fn integration(&self) -> Option<f64> {
        self.known(self.integration + self.correction)
    }

    /// Time-weighted population standard deviation.
    pub fn sigma(&self) -> Option<f64> {
        (self.initialized && self.duration > 0.0).then(|| (self.sigma_sum / self.duration).sqrt())
    }

    /// Time-weighted root mean square.
    pub fn rms(&self) -> Option<f64> {
        (self.initialized && self.duration > 0.0)
            .then(|| (self.sigma_sum / self.duration + self.mean * self.mean).sqrt())
    }

    /// Events pushed, including any synthesized boundary points.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Spans that contributed to the statistics.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Current values of the exported sub-statistics, in the order they were requested.
    pub fn event_stats(&self) -> Vec<f64> {
        self.event_stats
            .iter()
            .map(|stat| match stat {
                EventStat::Integration => self.integration + self.correction,
            })
            .collect()
    }

    /// Copies the current results into a plain value.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            min: self.min(),
            max: self.max(),
            mean: self.mean(),
            sigma: self.sigma(),
            rms: self.rms(),
            duration: self.duration(),
            integration: self.integration(),
            event_count: self.event_count,
            update_count: self.update_count,
        }
    }
}

/// Read-only copy of a [`RunningStatistics`] state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Smallest contributing value.
    pub min: Option<f64>,
    /// Largest contributing value.
    pub max: Option<f64>,
    /// Time-weighted mean.
    pub mean: Option<f64>,
    /// Time-weighted standard deviation.
    pub sigma: Option<f64>,
    /// Time-weighted root mean square.
    pub rms: Option<f64>,
    /// Seconds in the update state.
    pub duration: Option<f64>,
    /// Time-integral.
    pub integration: Option<f64>,
    /// Events pushed.
    pub event_count: u64,
    /// Contributing spans.
    pub update_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FloatEvent;
    use chrono::{TimeZone, Utc};

    fn at(second: i64, code: EventCode, value: f32) -> FloatEvent {
        let instant = Utc.timestamp_opt(1_500_000_000 + second, 0).unwrap();
        Event::at(instant, code, value)
    }

    fn update(second: i64, value: f32) -> FloatEvent {
        at(second, EventCode::Update, value)
    }

    fn push_all(events: &[FloatEvent]) -> RunningStatistics {
        let mut stats = RunningStatistics::new();
        for e in events {
            stats.push(e);
        }
        stats
    }

    #[test]
    fn test_unknown_until_two_events() {
        let stats = push_all(&[update(0, 5.0)]);
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.sigma(), None);
        assert_eq!(stats.integration(), None);
        assert_eq!(stats.event_count(), 1);
        assert_eq!(stats.event_stats(), Vec::<f64>::new());
    }

    #[test]
    fn test_constant_value() {
        let stats = push_all(&[update(0, 2.0), update(10, 2.0), update(30, 2.0)]);
        assert_eq!(stats.mean(), Some(2.0));
        assert_eq!(stats.sigma(), Some(0.0));
        assert_eq!(stats.rms(), Some(2.0));
        assert_eq!(stats.duration(), Some(30.0));
        assert_eq!(stats.integration(), Some(60.0));
        assert_eq!(stats.update_count(), 2);
    }

    #[test]
    fn test_weighted_mean_and_sigma() {
        // 1.0 for 10 s, 3.0 for 30 s
        let stats = push_all(&[update(0, 1.0), update(10, 3.0), update(40, 0.0)]);
        assert!((stats.mean().unwrap() - 2.5).abs() < 1e-12);
        // Variance = (10*(1-2.5)^2 + 30*(3-2.5)^2) / 40 = 0.75
        assert!((stats.sigma().unwrap() - 0.75f64.sqrt()).abs() < 1e-12);
        assert!((stats.rms().unwrap() - (0.75f64 + 6.25).sqrt()).abs() < 1e-12);
        assert!((stats.integration().unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(stats.min(), Some(1.0));
        assert_eq!(stats.max(), Some(3.0));
    }

    #[test]
    fn test_disconnect_span_is_excluded() {
        let stats = push_all(&[
            update(0, 4.0),
            at(10, EventCode::NetworkDisconnection, 0.0),
            update(100, 8.0),
            update(110, 0.0),
        ]);
        assert_eq!(stats.duration(), Some(20.0));
        assert_eq!(stats.mean(), Some(6.0));
        assert_eq!(stats.min(), Some(4.0));
        assert_eq!(stats.integration(), Some(120.0));
        assert_eq!(stats.event_count(), 4);
        assert_eq!(stats.update_count(), 2);
    }

    #[test]
    fn test_zero_duration_is_not_nan() {
        let stats = push_all(&[update(0, 1.0), update(0, 2.0), update(0, 3.0)]);
        assert_eq!(stats.mean(), Some(1.0));
        assert_eq!(stats.duration(), Some(0.0));
        assert_eq!(stats.sigma(), None);
        assert_eq!(stats.rms(), None);
    }

    #[test]
    fn test_event_stats_and_reset() {
        let mut stats = RunningStatistics::with_event_stats(vec![EventStat::Integration]);
        stats.push(&update(0, 1.0));
        assert_eq!(stats.event_stats(), vec![0.0]);
        stats.push(&update(5, 1.0));
        assert_eq!(stats.event_stats(), vec![5.0]);

        stats.reset();
        assert_eq!(stats.event_count(), 0);
        assert_eq!(stats.integration(), None);
        assert_eq!(stats.event_stats(), vec![0.0]);
    }

    #[test]
    fn test_compensated_integral() {
        let mut stats = RunningStatistics::new();
        stats.push(&update(0, 1.0e8));
        for second in 1..=1_000 {
            stats.push(&update(second, 1.0e-3));
        }
        let expected = 1.0e8 + 999.0 * 1.0e-3;
        assert!((stats.integration().unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_matches_getters() {
        let stats = push_all(&[update(0, 1.0), update(2, 3.0), update(4, 3.0)]);
        let snap = stats.snapshot();
        assert_eq!(snap.mean, stats.mean());
        assert_eq!(snap.sigma, stats.sigma());
        assert_eq!(snap.event_count, 3);
        assert_eq!(RunningStatistics::new().snapshot().mean, None);
    }
}
