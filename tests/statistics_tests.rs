use pvstream::{
    AnalysisStream, DataKind, Event, EventCode, EventStat, EventStream, FloatEvent,
    MemoryArchive, RunningStatistics, ValueKind, VecStream, analyze,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SECOND: i64 = 1 << 28;

#[test]
fn test_constant_value_property() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let v = rng.random_range(-1_000.0f32..1_000.0);
        let t0 = rng.random_range(0..1_000_000) * SECOND;
        let t1 = t0 + rng.random_range(1..10_000) * SECOND;
        let t2 = t1 + rng.random_range(1..10_000) * SECOND;

        let mut stats = RunningStatistics::new();
        for ts in [t0, t1, t2] {
            stats.push(&Event::update(ts, v));
        }

        let expected = f64::from(v) * ((t2 - t0) / SECOND) as f64;
        assert_eq!(stats.sigma(), Some(0.0));
        assert_eq!(stats.mean(), Some(f64::from(v)));
        let integral = stats.integration().unwrap();
        assert!(
            (integral - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "{integral} != {expected}"
        );
    }
}

#[test]
fn test_mean_matches_direct_weighted_average() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut ts = 0i64;
    let mut events: Vec<FloatEvent> = Vec::new();
    for _ in 0..1_000 {
        ts += rng.random_range(1..100) * SECOND / 10;
        let code = if rng.random_bool(0.1) {
            EventCode::UnknownUnavailability
        } else {
            EventCode::Update
        };
        events.push(Event::new(ts, code, rng.random_range(0.0f32..50.0)));
    }

    let mut weighted = 0.0;
    let mut duration = 0.0;
    for pair in events.windows(2) {
        if pair[0].is_update() {
            let w = pair[1].timestamp_as_seconds() - pair[0].timestamp_as_seconds();
            weighted += f64::from(*pair[0].value()) * w;
            duration += w;
        }
    }

    let mut stats = RunningStatistics::new();
    for e in &events {
        stats.push(e);
    }
    assert!((stats.duration().unwrap() - duration).abs() < 1e-6);
    assert!((stats.mean().unwrap() - weighted / duration).abs() < 1e-6);
    assert!((stats.integration().unwrap() - weighted).abs() < 1e-6);
}

#[test]
fn test_analysis_stream_shares_accumulator() {
    let events: Vec<FloatEvent> = (0..5).map(|i| Event::update(i * SECOND, 2.0)).collect();
    let mut stats = RunningStatistics::with_event_stats(vec![EventStat::Integration]);
    {
        let mut s = AnalysisStream::new(VecStream::new(events), &mut stats);
        let last = s.drain().unwrap().pop().unwrap();
        assert_eq!(last.value().stats, vec![8.0]);
    }
    assert_eq!(stats.integration(), Some(8.0));
    assert_eq!(stats.event_count(), 5);
}

#[test]
fn test_analyze_over_archive() {
    let mut archive = MemoryArchive::new("test");
    let md = archive.add_channel("temp", 1, DataKind::Double).unwrap();
    archive
        .extend(
            &md,
            vec![
                Event::update(5 * SECOND, ValueKind::Float(10.0)),
                Event::update(20 * SECOND, ValueKind::Float(20.0)),
                Event::new(30 * SECOND, EventCode::NetworkDisconnection, ValueKind::Float(0.0)),
                Event::update(40 * SECOND, ValueKind::Float(30.0)),
            ],
        )
        .unwrap();

    let snap = analyze(&archive, &md, 10 * SECOND, 50 * SECOND, false).unwrap();
    // 10 for 10 s, 20 for 10 s, gap for 10 s, 30 for 10 s.
    assert_eq!(snap.duration, Some(30.0));
    assert_eq!(snap.mean, Some(20.0));
    assert_eq!(snap.integration, Some(600.0));
    assert_eq!(snap.min, Some(10.0));
    assert_eq!(snap.max, Some(30.0));
    assert_eq!(snap.event_count, 5);
    assert_eq!(archive.open_cursors(), 0);

    let json = serde_json::to_string(&snap).unwrap();
    assert!(json.contains("\"mean\":20.0"));
}
