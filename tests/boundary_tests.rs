use pvstream::{
    BoundaryStream, DataKind, Event, EventCode, EventStream, FloatEvent, MemoryArchive,
    ValueKind, VecStream, open_boundary_stream,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SECOND: i64 = 1 << 28;
const BEGIN: i64 = 1_000 * SECOND;
const END: i64 = 2_000 * SECOND;

fn random_events(rng: &mut StdRng) -> Vec<FloatEvent> {
    let n = rng.random_range(1..50);
    let mut stamps: Vec<i64> = (0..n).map(|_| rng.random_range(BEGIN..END)).collect();
    stamps.sort_unstable();
    stamps
        .into_iter()
        .map(|ts| {
            let code = if rng.random_bool(0.2) {
                EventCode::NetworkDisconnection
            } else {
                EventCode::Update
            };
            Event::new(ts, code, rng.random_range(-10.0f32..10.0))
        })
        .collect()
}

#[test]
fn test_boundary_points_for_random_inputs() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let events = random_events(&mut rng);
        let prior = Event::update(BEGIN - SECOND, 99.0f32);
        let mut s = BoundaryStream::new(
            VecStream::new(events.clone()),
            BEGIN,
            END,
            Some(prior.clone()),
            false,
        )
        .with_now(i64::MAX);
        let out = s.drain().unwrap();

        if events[0].timestamp() > BEGIN {
            assert_eq!(out[0], prior.clone_at(BEGIN));
        } else {
            assert_eq!(out[0], events[0]);
        }
        let last = out.last().unwrap();
        assert_eq!(last.timestamp(), END);
        assert_eq!(last.value(), events.last().unwrap().value());
        assert!(out.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
    }
}

#[test]
fn test_empty_input_counts() {
    let empty = || VecStream::<f32>::new(vec![]);

    let none = BoundaryStream::new(empty(), BEGIN, END, None, false).drain().unwrap();
    assert!(none.is_empty());

    let prior = Some(Event::update(BEGIN - 1, 1.0));
    let two = BoundaryStream::new(empty(), BEGIN, END, prior, false)
        .drain()
        .unwrap();
    assert_eq!(two.len(), 2);
}

#[test]
fn test_all_non_updates_pass_through_with_updates_only() {
    let events = vec![
        Event::new(BEGIN + 1, EventCode::ArchivingTurnedOff, 0.0f32),
        Event::new(BEGIN + 2, EventCode::ArchiverShutdown, 0.0f32),
    ];
    let out = BoundaryStream::new(VecStream::new(events.clone()), BEGIN, END, None, true)
        .drain()
        .unwrap();
    assert_eq!(out, events);
}

#[test]
fn test_from_archive_with_prior_point() {
    let mut archive = MemoryArchive::new("test");
    let md = archive.add_channel("ch", 1, DataKind::Float).unwrap();
    archive
        .extend(
            &md,
            vec![
                Event::update(BEGIN - 10, ValueKind::Float(1.0)),
                Event::update(BEGIN + 10, ValueKind::Float(2.0)),
                Event::update(END, ValueKind::Float(3.0)),
            ],
        )
        .unwrap();

    let mut s = open_boundary_stream(&archive, &md, BEGIN, END, false).unwrap();
    let out = s.drain().unwrap();
    let stamps: Vec<i64> = out.iter().map(Event::timestamp).collect();
    assert_eq!(stamps, vec![BEGIN, BEGIN + 10, END]);
    assert_eq!(out[0].value(), &ValueKind::Float(1.0));
    assert_eq!(out[2].value(), &ValueKind::Float(2.0));

    assert_eq!(archive.open_cursors(), 1);
    s.close().unwrap();
    assert_eq!(archive.open_cursors(), 0);
}
