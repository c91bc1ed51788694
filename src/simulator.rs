//! The simulator context: owns the bolts and produces one snapshot per tick.

use crate::bolt::BoltEntity;
use crate::collection::BoltCollection;
use crate::config::SimConfig;
use crate::encode::{encode_snapshot, pose_record, EncodeReport, WorldState};
use crate::geometry::{BoltParams, GenerationStats};
use crate::trigger::{destination_for, shell_source, PointingRay, TimerTrigger};
use cgmath::{Quaternion, Vector3};
use plasma_common::{StateSnapshot, VERTEX_COUNT};
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Sample players strikes rotate over.
pub const VOICES: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StrikeOrigin {
    Timer,
    Gesture,
    Manual,
}

/// A bolt that has just been created.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Strike {
    pub origin: StrikeOrigin,
    /// Voice that should play the strike sound.
    pub voice: usize,
    pub source: Vector3<f32>,
    pub destination: Vector3<f32>,
    pub stats: GenerationStats,
}

/// Notified of every strike, e.g. to trigger a sound. Observers cannot feed
/// anything back into the simulation.
pub trait StrikeObserver {
    fn on_strike(&mut self, strike: &Strike);
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame counter written into this tick's snapshot.
    pub frame: u32,
    pub strikes: usize,
    pub retired: usize,
    pub encode: EncodeReport,
}

pub struct Simulator {
    config: SimConfig,
    rng: SmallRng,
    timer: TimerTrigger,
    bolts: BoltCollection,
    nucleus: Vector3<f32>,
    eye: Vector3<f32>,
    orientation: Quaternion<f32>,
    gestures: Vec<PointingRay>,
    observers: Vec<Box<dyn StrikeObserver>>,
    next_voice: usize,
    frame: u32,
    snapshot: Box<StateSnapshot>,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let timer = TimerTrigger::new(
            config.initial_pace,
            config.pace_upper_bound,
            config.pace_step,
            config.pace_min,
            config.pace_max,
        );
        Self {
            rng,
            timer,
            bolts: BoltCollection::new(),
            nucleus: config.center,
            eye: config.eye,
            orientation: config.orientation,
            gestures: Vec::new(),
            observers: Vec::new(),
            next_voice: 0,
            frame: 0,
            snapshot: StateSnapshot::boxed(),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn bolts(&self) -> &BoltCollection {
        &self.bolts
    }

    pub fn nucleus(&self) -> Vector3<f32> {
        self.nucleus
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn timer(&self) -> &TimerTrigger {
        &self.timer
    }

    /// Snapshot encoded by the most recent tick.
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn add_observer(&mut self, observer: Box<dyn StrikeObserver>) {
        self.observers.push(observer);
    }

    pub fn set_pose(&mut self, eye: Vector3<f32>, orientation: Quaternion<f32>) {
        self.eye = eye;
        self.orientation = orientation;
    }

    /// Queues a pointing gesture; it is resolved on the next tick.
    pub fn point(&mut self, ray: PointingRay) {
        self.gestures.push(ray);
    }

    pub fn faster(&mut self) -> f64 {
        self.timer.faster()
    }

    pub fn slower(&mut self) -> f64 {
        self.timer.slower()
    }

    /// Appends an already built bolt.
    pub fn adopt(&mut self, bolt: BoltEntity) {
        self.bolts.push_back(bolt);
    }

    /// Strikes a bolt between two explicit points, anchored on the nucleus.
    pub fn strike_between(
        &mut self,
        source: Vector3<f32>,
        destination: Vector3<f32>,
        params: &BoltParams,
    ) -> Strike {
        let anchor = self.nucleus;
        self.strike(StrikeOrigin::Manual, source, destination, anchor, params)
    }

    fn strike(
        &mut self,
        origin: StrikeOrigin,
        source: Vector3<f32>,
        destination: Vector3<f32>,
        anchor: Vector3<f32>,
        params: &BoltParams,
    ) -> Strike {
        let (bolt, stats) = BoltEntity::strike(&mut self.rng, source, destination, anchor, params);
        if bolt.mesh().len() > VERTEX_COUNT {
            log::warn!(
                "bolt has {} vertices, only {VERTEX_COUNT} will be replicated",
                bolt.mesh().len()
            );
        }
        let strike = Strike {
            origin,
            voice: self.next_voice,
            source,
            destination,
            stats,
        };
        self.next_voice = (self.next_voice + 1) % VOICES;
        log::debug!(
            "{origin:?} strike from {source:?}: {} vertices, {} branches, depth {}",
            bolt.mesh().len(),
            stats.branches,
            stats.max_depth
        );

        self.bolts.push_back(bolt);
        for observer in &mut self.observers {
            observer.on_strike(&strike);
        }
        strike
    }

    /// Advances the world by `dt` seconds and encodes the resulting snapshot.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport::default();

        if self.timer.advance(&mut self.rng, dt) {
            let wiggle = self.config.nucleus_wiggle;
            let jitter = Vector3::new(
                self.rng.random_range(-wiggle..=wiggle),
                self.rng.random_range(-wiggle..=wiggle),
                self.rng.random_range(-wiggle..=wiggle),
            );
            self.nucleus += jitter;
            let source = shell_source(&mut self.rng, self.config.shell_radius);
            let destination =
                destination_for(source, self.config.center, self.config.destination_offset);
            let params = self.config.timer_bolt;
            let anchor = self.nucleus;
            self.strike(StrikeOrigin::Timer, source, destination, anchor, &params);
            report.strikes += 1;
        } else {
            self.nucleus = self.config.center;
        }

        for ray in std::mem::take(&mut self.gestures) {
            let Some(source) = ray.shell_hit(self.config.shell_radius) else {
                log::debug!("pointing ray {ray:?} misses the shell");
                continue;
            };
            let destination =
                destination_for(source, self.config.center, self.config.destination_offset);
            let params = self.config.gesture_bolt;
            let anchor = self.config.center;
            self.strike(StrikeOrigin::Gesture, source, destination, anchor, &params);
            report.strikes += 1;
        }

        self.bolts.tick(dt, self.nucleus);
        report.retired = self.bolts.retire_expired_front();

        let world = WorldState {
            pose: pose_record(self.eye, self.orientation),
            nucleus: self.nucleus,
            frame: self.frame,
        };
        report.encode = encode_snapshot(&self.bolts, &world, &mut self.snapshot);
        report.frame = self.frame;
        self.frame = self.frame.wrapping_add(1);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;
    use std::sync::{Arc, Mutex};

    const DT: f64 = 1.0 / 60.0;

    fn quiet_config(seed: u64) -> SimConfig {
        SimConfig {
            initial_pace: 1.0e9,
            seed: Some(seed),
            ..SimConfig::with_defaults()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Strike>>>);

    impl StrikeObserver for Recorder {
        fn on_strike(&mut self, strike: &Strike) {
            self.0.lock().unwrap().push(*strike);
        }
    }

    #[test]
    fn timer_strikes_aim_at_nucleus_and_wiggle_it() {
        let mut sim = Simulator::new(SimConfig {
            seed: Some(4),
            ..SimConfig::with_defaults()
        });
        let recorder = Recorder::default();
        sim.add_observer(Box::new(recorder.clone()));

        let center = sim.config().center;
        let mut struck_at = None;
        for tick in 0..120 {
            let report = sim.tick(DT);
            if report.strikes > 0 {
                struck_at = Some(tick);
                let offset = sim.nucleus() - center;
                assert!(
                    offset.x.abs() <= 0.006 && offset.y.abs() <= 0.006 && offset.z.abs() <= 0.006
                );
                break;
            }
            assert_eq!(sim.nucleus(), center);
        }
        assert!(struck_at.is_some());

        let strikes = recorder.0.lock().unwrap();
        assert_eq!(strikes.len(), 1);
        assert_eq!(strikes[0].origin, StrikeOrigin::Timer);
        assert!(strikes[0].stats.max_depth <= 4);
        let reach = strikes[0].destination - center;
        assert!((reach.magnitude() - 0.1).abs() < 1e-5);
    }

    #[test]
    fn voices_rotate_round_robin() {
        let mut sim = Simulator::new(quiet_config(1));
        let voices: Vec<usize> = (0..7)
            .map(|_| {
                sim.strike_between(
                    Vector3::new(5.0, 0.0, 0.0),
                    Vector3::new(0.1, 0.6, -1.0),
                    &BoltParams::default(),
                )
                .voice
            })
            .collect();
        assert_eq!(voices, vec![0, 1, 2, 3, 4, 0, 1]);
    }

    #[test]
    fn gesture_strikes_from_shell_hit() {
        let mut sim = Simulator::new(quiet_config(2));
        sim.point(PointingRay::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)));
        sim.point(PointingRay::new(Vector3::new(0.0, 9.0, 0.0), Vector3::new(1.0, 0.0, 0.0)));
        let report = sim.tick(DT);

        assert_eq!(report.strikes, 1);
        assert_eq!(sim.bolts().len(), 1);
        let bolt = sim.bolts().front().unwrap();
        assert!((bolt.start() - Vector3::new(5.0, 0.0, 0.0)).magnitude() < 1e-5);
        assert_eq!(sim.snapshot().bolt_count, 1);
    }

    #[test]
    fn frame_counter_increments_per_tick() {
        let mut sim = Simulator::new(quiet_config(3));
        for expected in 0..5 {
            assert_eq!(sim.tick(DT).frame, expected);
            assert_eq!(sim.snapshot().frame, expected);
        }
        assert_eq!(sim.frame(), 5);
    }
}
