use crate::geometry::{generate_bolt, BoltParams, GenerationStats, RibbonMesh};
use cgmath::Vector3;
use rand::Rng;

pub const STRIKE_TIME: f64 = 1.5;
/// Elapsed time after which the bolt starts fading.
pub const FADE_DELAY: f64 = 0.3;
pub const EXPIRY_EPSILON: f64 = 0.002;
/// Remaining time below which the bulge is absorbed into the nucleus.
pub const BULGE_ABSORB_THRESHOLD: f64 = 1.15;
pub const BOLT_COLOR: [f32; 4] = [1.0, 0.7, 1.0, 1.0];

pub const FADE_FLOOR: f32 = 0.45;
pub const FADE_CEILING: f32 = 0.97;
const FADE_GAIN: f32 = 0.94;

const BULGE_INITIAL_SCALE: f32 = 0.035;
const BULGE_MAX_SCALE: f32 = 0.07;
const BULGE_GROWTH: f32 = 0.0002;
const BULGE_SPAWN_FRACTION: f32 = 0.6;
const BULGE_TARGET_FRACTION: f32 = 0.03;
const BULGE_EASE: f32 = 0.5;
const BULGE_DRIFT: f32 = 0.007;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoltPhase {
    Active,
    Fading,
    Expired,
}

/// Per-vertex color multiplier applied on every fading tick.
///
/// Grows toward the tail of the vertex sequence; always within
/// `[FADE_FLOOR, FADE_CEILING]`.
pub fn fade_coefficient(index: usize, len: usize) -> f32 {
    let len = len.max(1);
    let coefficient = FADE_GAIN * (index + 1) as f32 / len as f32;
    if coefficient < FADE_FLOOR {
        coefficient + FADE_FLOOR
    } else {
        coefficient.min(FADE_CEILING)
    }
}

/// One lightning strike owned by the simulator.
#[derive(Clone, Debug)]
pub struct BoltEntity {
    start: Vector3<f32>,
    ending: Vector3<f32>,
    mesh: RibbonMesh,
    strike_time: f64,
    timer: f64,
    bulge_position: Vector3<f32>,
    bulge_scale: Vector3<f32>,
}

impl BoltEntity {
    /// Generates the bolt geometry and places its bulge relative to `nucleus`.
    pub fn strike<R: Rng>(
        rng: &mut R,
        source: Vector3<f32>,
        destination: Vector3<f32>,
        nucleus: Vector3<f32>,
        params: &BoltParams,
    ) -> (Self, GenerationStats) {
        let mut mesh = RibbonMesh::new();
        let stats = generate_bolt(rng, &mut mesh, source, destination, params, BOLT_COLOR);
        let bolt = Self::from_mesh(source, destination, mesh, nucleus, STRIKE_TIME);
        (bolt, stats)
    }

    pub fn from_mesh(
        start: Vector3<f32>,
        ending: Vector3<f32>,
        mesh: RibbonMesh,
        nucleus: Vector3<f32>,
        strike_time: f64,
    ) -> Self {
        Self {
            start,
            ending,
            mesh,
            strike_time,
            timer: strike_time,
            bulge_position: (ending - nucleus) * BULGE_SPAWN_FRACTION + nucleus,
            bulge_scale: Vector3::new(
                BULGE_INITIAL_SCALE,
                BULGE_INITIAL_SCALE,
                BULGE_INITIAL_SCALE,
            ),
        }
    }

    pub fn start(&self) -> Vector3<f32> {
        self.start
    }

    pub fn ending(&self) -> Vector3<f32> {
        self.ending
    }

    pub fn mesh(&self) -> &RibbonMesh {
        &self.mesh
    }

    pub fn strike_time(&self) -> f64 {
        self.strike_time
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    pub fn elapsed(&self) -> f64 {
        self.strike_time - self.timer
    }

    pub fn bulge_position(&self) -> Vector3<f32> {
        self.bulge_position
    }

    pub fn bulge_scale(&self) -> Vector3<f32> {
        self.bulge_scale
    }

    pub fn is_expired(&self) -> bool {
        self.timer < EXPIRY_EPSILON
    }

    pub fn phase(&self) -> BoltPhase {
        if self.is_expired() {
            BoltPhase::Expired
        } else if self.elapsed() > FADE_DELAY {
            BoltPhase::Fading
        } else {
            BoltPhase::Active
        }
    }

    /// Advances the bolt by one simulator tick: fade, count down, then bulge.
    pub fn tick(&mut self, dt: f64, nucleus: Vector3<f32>) {
        self.fade_out();
        self.timer -= dt;
        self.animate_bulge(nucleus);
    }

    fn fade_out(&mut self) {
        if self.elapsed() <= FADE_DELAY {
            return;
        }
        let len = self.mesh.colors.len();
        for (index, color) in self.mesh.colors.iter_mut().enumerate() {
            let coefficient = fade_coefficient(index, len);
            for channel in color.iter_mut() {
                *channel *= coefficient;
            }
        }
    }

    fn animate_bulge(&mut self, nucleus: Vector3<f32>) {
        if self.timer > BULGE_ABSORB_THRESHOLD {
            let target = (self.ending - nucleus) * BULGE_TARGET_FRACTION + self.bulge_position;
            self.bulge_position += (target - self.bulge_position) * BULGE_EASE;
        } else {
            self.bulge_position += (nucleus - self.ending) * BULGE_DRIFT;
            let grown = (self.bulge_scale.x + BULGE_GROWTH).min(BULGE_MAX_SCALE);
            self.bulge_scale = Vector3::new(grown, grown, grown);
        }
    }
}
