//! Reconciliation properties under arbitrary arrival orders

use proptest::prelude::*;
use tickline_core::{SnapshotEnvelope, Tick};
use tickline_state::{ReconcileConfig, ReconcileOutcome, ReconciliationEngine};
use tickline_test::RecordingSimulation;
use tickline_time::{SequenceClock, TickClock};

#[derive(Clone, Debug)]
enum Event {
    /// Delta envelope for this tick arrives
    Arrive(u32),
    /// A full snapshot for this tick arrives
    ArriveFull(u32),
    /// Run one reconciliation pass, then step the clock
    Pass,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        6 => (3u32..80).prop_map(Event::Arrive),
        1 => (2u32..80).prop_map(Event::ArriveFull),
        4 => Just(Event::Pass),
    ]
}

fn delta_to(tick: u32) -> SnapshotEnvelope {
    SnapshotEnvelope::delta(Tick::new(tick - 1), Tick::new(tick))
        .unwrap()
        .with_world_delta(Tick::new(tick).to_bytes().to_vec())
}

fn steady_engine(ratio: u32) -> (ReconciliationEngine, TickClock, RecordingSimulation) {
    let mut engine = ReconciliationEngine::with_config(ReconcileConfig { target_ratio: ratio });
    let mut clock = TickClock::new();
    let mut sim = RecordingSimulation::new();
    let mut acks: Vec<Tick> = Vec::new();

    let full = SnapshotEnvelope::full(Tick::new(1))
        .unwrap()
        .with_world_delta(Tick::new(1).to_bytes().to_vec());
    engine.receive(full, &mut acks);
    engine.receive(delta_to(2), &mut acks);
    engine.reconcile_tick(&mut clock, &mut sim).unwrap();
    clock.step();

    (engine, clock, sim)
}

proptest! {
    #[test]
    fn steady_pass_applies_exactly_current_and_next(
        events in prop::collection::vec(event(), 0..200),
        ratio in 0u32..5,
    ) {
        let (mut engine, mut clock, mut sim) = steady_engine(ratio);
        let mut acks: Vec<Tick> = Vec::new();
        let mut received = 0usize;

        for event in events {
            match event {
                Event::Arrive(t) => {
                    engine.receive(delta_to(t), &mut acks);
                    received += 1;
                }
                Event::ArriveFull(t) => {
                    engine.receive(SnapshotEnvelope::full(Tick::new(t)).unwrap(), &mut acks);
                    received += 1;
                }
                Event::Pass => {
                    let cur = clock.current_tick();
                    let applied_before = sim.records().len();

                    let outcome = engine.reconcile_tick(&mut clock, &mut sim).unwrap();
                    let ReconcileOutcome::Applied(pair) = outcome else {
                        return Err(TestCaseError::fail("steady pass did not apply"));
                    };

                    prop_assert_eq!(sim.records().len(), applied_before + 1);
                    prop_assert_eq!(pair.current, cur);
                    prop_assert_eq!(pair.next, cur.next());
                    prop_assert_eq!(sim.last().unwrap().tick, cur);

                    // Nothing older than the previous tick survives a pass
                    let ticks = engine.buffer().ticks();
                    prop_assert!(ticks.iter().all(|t| !t.is_before(cur.prev())));
                    prop_assert!(engine.buffer().contains(cur));
                    prop_assert!(engine.buffer().contains(cur.next()));

                    let threshold = engine.config().fast_forward_threshold();
                    prop_assert_eq!(pair.fast_forward, engine.buffer().depth() > threshold);
                    prop_assert_eq!(clock.is_fast_forward(), pair.fast_forward);

                    clock.step();
                }
            }
        }

        prop_assert_eq!(acks.len(), received);
        prop_assert!(!engine.is_awaiting_full());
    }

    #[test]
    fn arrival_order_does_not_change_applied_data(
        order in Just((3u32..30).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let (mut engine, mut clock, mut sim) = steady_engine(2);
        for &t in &order {
            engine.receive(delta_to(t), &mut Vec::<Tick>::new());
        }

        for _ in 2..29 {
            engine.reconcile_tick(&mut clock, &mut sim).unwrap();
            clock.step();
        }

        // Everything arrived before its tick: no placeholders, in order
        let ticks: Vec<Tick> = sim.records()[1..].iter().map(|r| r.tick).collect();
        prop_assert_eq!(ticks, (2..29).map(Tick::new).collect::<Vec<_>>());
        prop_assert!(sim.records().iter().all(|r| r.payload_tick == Some(r.tick)));
        prop_assert_eq!(sim.placeholder_applies(), 0);
    }
}
