use cgmath::Vector3;
use plasma_lightning::bolt::{BoltEntity, BoltPhase};
use plasma_lightning::config::SimConfig;
use plasma_lightning::decode::{DecodedFrame, FrameSink, SnapshotDecoder};
use plasma_lightning::geometry::{BoltParams, RibbonMesh};
use plasma_lightning::replicator::{slot, Maker, Reading, Taker};
use plasma_lightning::simulator::Simulator;
use plasma_lightning::StateSnapshot;

const DT: f64 = 1.0 / 60.0;

fn source() -> Vector3<f32> {
    Vector3::new(5.0, 0.0, 0.0)
}

fn destination() -> Vector3<f32> {
    Vector3::new(0.1, 0.6, -1.0)
}

/// Simulator whose timer never fires, so only explicit strikes happen.
fn quiet_simulator(seed: u64) -> Simulator {
    Simulator::new(SimConfig {
        initial_pace: 1.0e9,
        seed: Some(seed),
        ..SimConfig::with_defaults()
    })
}

#[test]
fn single_unbranched_strike_reaches_the_snapshot() {
    let mut sim = quiet_simulator(1);
    sim.strike_between(source(), destination(), &BoltParams::default());
    assert_eq!(sim.bolts().front().map(|b| b.mesh().len()), Some(6 * 80));

    let report = sim.tick(DT);
    assert!(report.encode.is_lossless());
    let snapshot = sim.snapshot();
    assert_eq!(snapshot.bolt_count, 1);
    assert_eq!(snapshot.flat_bolts[0].point_count, 480);
    assert_eq!(snapshot.flat_bolts[0].ending, [0.1, 0.6, -1.0]);
}

#[test]
fn expired_front_bolt_is_removed() {
    let mut sim = quiet_simulator(2);
    sim.strike_between(source(), destination(), &BoltParams::default());
    let mut retired = 0;
    for _ in 0..96 {
        retired += sim.tick(DT).retired;
    }
    assert_eq!(retired, 1);
    assert!(sim.bolts().is_empty());
    assert_eq!(sim.snapshot().bolt_count, 0);
}

#[test]
fn expired_bolt_behind_live_one_stays_fully_faded() {
    let mut sim = quiet_simulator(3);
    sim.adopt(BoltEntity::from_mesh(
        source(),
        destination(),
        RibbonMesh::new(),
        sim.nucleus(),
        10.0,
    ));
    sim.strike_between(source(), destination(), &BoltParams::default());

    for _ in 0..96 {
        assert_eq!(sim.tick(DT).retired, 0);
    }

    assert_eq!(sim.bolts().len(), 2);
    let faded = sim.bolts().get(1).unwrap();
    assert_eq!(faded.phase(), BoltPhase::Expired);
    for color in &faded.mesh().colors {
        assert!(color.iter().all(|&channel| (0.0..0.02).contains(&channel)), "{color:?}");
    }
    assert_eq!(sim.snapshot().bolt_count, 2);
}

#[test]
fn seven_bolts_replicate_the_oldest_five() {
    let mut sim = quiet_simulator(4);
    let endings: Vec<Vector3<f32>> = (0..7)
        .map(|i| Vector3::new(0.1 * i as f32, 0.6, -1.0))
        .collect();
    for ending in &endings {
        sim.strike_between(source(), *ending, &BoltParams::default());
    }

    let report = sim.tick(DT);
    assert_eq!(report.encode.encoded_bolts, 5);
    assert_eq!(report.encode.dropped_bolts, 2);
    assert_eq!(sim.bolts().len(), 7);

    let snapshot = sim.snapshot();
    assert_eq!(snapshot.bolt_count, 5);
    for (flat, ending) in snapshot.active_bolts().iter().zip(&endings) {
        let expected: [f32; 3] = (*ending).into();
        assert_eq!(flat.ending, expected);
    }
}

#[derive(Default)]
struct CountingSink {
    frames: Vec<u32>,
    bolts: Vec<usize>,
}

impl FrameSink for CountingSink {
    fn draw(&mut self, frame: &DecodedFrame) {
        self.frames.push(frame.frame);
        self.bolts.push(frame.bolts().len());
    }
}

#[test]
fn simulator_to_renderer_through_slot() {
    let (mut writer, mut reader) = slot::channel::<StateSnapshot>();
    let mut decoder = SnapshotDecoder::new();
    let mut sink = CountingSink::default();

    // nothing published yet: the renderer skips drawing
    assert!(decoder.decode_reading(&reader.poll()).is_none());

    let mut sim = quiet_simulator(5);
    sim.strike_between(source(), destination(), &BoltParams::branching(2, 0.03));
    for _ in 0..3 {
        sim.tick(DT);
    }
    writer.publish(sim.snapshot()).unwrap();
    sim.tick(DT);
    writer.publish(sim.snapshot()).unwrap();

    let reading = reader.poll();
    assert!(matches!(reading, Reading::Fresh(_)));
    if let Some(frame) = decoder.decode_reading(&reading) {
        assert_eq!(frame.bolts()[0].mesh, *sim.bolts().front().unwrap().mesh());
        sink.draw(frame);
    }
    if let Some(frame) = decoder.decode_reading(&reader.poll()) {
        assert!(frame.repeated);
        sink.draw(frame);
    }

    assert_eq!(sink.frames, vec![3, 3]);
    assert_eq!(sink.bolts, vec![1, 1]);
}
