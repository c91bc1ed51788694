//! Procedural lightning geometry.
//!
//! A bolt is a jittered path from a source to a destination, tessellated into
//! a constant-width ribbon of triangles. Branches are generated recursively and
//! appended to the same mesh.

use cgmath::{Deg, InnerSpace, Matrix3, Vector3};
use rand::Rng;
use std::sync::OnceLock;

pub const VERTICES_PER_SEGMENT: usize = 6;
pub const RAMP_WIDTH: usize = 256;

/// Maximum random-walk step of the displacement along the normal.
const SWAY: f32 = 1.0;
const ENVELOPE_START: f32 = 0.95;
const BRANCH_ANGLE_DEG: f32 = 30.0;
const BRANCH_REACH: f32 = 0.4;
const BRANCH_WIDTH_SCALE: f32 = 0.6;
const DEGENERATE_EPSILON: f32 = 1e-12;

const REFERENCE_AXIS: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 0.0,
    z: -1.0,
};
const FALLBACK_AXIS: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

/// Triangle list with per-vertex texture coordinates and colors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RibbonMesh {
    pub positions: Vec<Vector3<f32>>,
    pub tex_coords: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
}

impl RibbonMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.tex_coords.clear();
        self.colors.clear();
    }

    /// Appends one vertex with its attributes.
    pub fn push_vertex(&mut self, position: Vector3<f32>, tex_coord: [f32; 2], color: [f32; 4]) {
        self.positions.push(position);
        self.tex_coords.push(tex_coord);
        self.colors.push(color);
    }

    /// Two triangles spanning `from`..`to`, offset by `±offset`.
    fn push_segment(
        &mut self,
        from: Vector3<f32>,
        to: Vector3<f32>,
        offset: Vector3<f32>,
        v_from: f32,
        v_to: f32,
        color: [f32; 4],
    ) {
        self.positions.extend_from_slice(&[
            from + offset,
            from - offset,
            to + offset,
            to + offset,
            from - offset,
            to - offset,
        ]);
        self.tex_coords.extend_from_slice(&[
            [0.0, v_from],
            [1.0, v_from],
            [0.0, v_to],
            [0.0, v_to],
            [1.0, v_from],
            [1.0, v_to],
        ]);
        self.colors.extend_from_slice(&[color; VERTICES_PER_SEGMENT]);
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoltParams {
    pub max_branches: u32,
    pub branch_probability: f32,
    /// Half width of the ribbon. Values `<= 0` derive it from the path length.
    pub width: f32,
    pub subdivisions: usize,
}

impl Default for BoltParams {
    fn default() -> Self {
        Self {
            max_branches: 0,
            branch_probability: 0.01,
            width: 0.05,
            subdivisions: 80,
        }
    }
}

impl BoltParams {
    /// Auto width, default subdivisions.
    pub fn branching(max_branches: u32, branch_probability: f32) -> Self {
        Self {
            max_branches,
            branch_probability,
            width: 0.0,
            ..Self::default()
        }
    }

    pub fn resolved_width(&self, length: f32) -> f32 {
        if self.width > 0.0 {
            self.width
        } else {
            length / 25.0 + 0.01
        }
    }

    fn probability(&self) -> f64 {
        if self.branch_probability.is_finite() {
            self.branch_probability.clamp(0.0, 1.0) as f64
        } else {
            0.0
        }
    }
}

/// Instrumentation gathered while generating one bolt tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Deepest recursion level reached, the root bolt being level 0.
    pub max_depth: u32,
    pub branches: u32,
    pub segments: usize,
}

/// Unit vector perpendicular to `tangent` in the generation plane.
///
/// Never returns NaN: a tangent parallel to the reference axis falls back to
/// a second axis, and a zero tangent yields the X axis.
pub fn ribbon_normal(tangent: Vector3<f32>) -> Vector3<f32> {
    let normal = tangent.cross(REFERENCE_AXIS);
    if normal.magnitude2() > DEGENERATE_EPSILON {
        return normal.normalize();
    }
    let normal = tangent.cross(FALLBACK_AXIS);
    if normal.magnitude2() > DEGENERATE_EPSILON {
        return normal.normalize();
    }
    Vector3::unit_x()
}

/// `n` uniform samples in `[0, 1)` plus a leading 0, sorted ascending.
pub fn subdivision_positions<R: Rng>(rng: &mut R, n: usize) -> Vec<f32> {
    let mut positions = Vec::with_capacity(n + 1);
    positions.push(0.0);
    positions.extend((0..n).map(|_| rng.random::<f32>()));
    positions.sort_by(f32::total_cmp);
    positions
}

/// Generates a bolt from `source` to `destination` into `mesh`.
///
/// A non-branching call appends exactly `6 * subdivisions` vertices, and the
/// final segment always ends on `destination`.
pub fn generate_bolt<R: Rng>(
    rng: &mut R,
    mesh: &mut RibbonMesh,
    source: Vector3<f32>,
    destination: Vector3<f32>,
    params: &BoltParams,
    color: [f32; 4],
) -> GenerationStats {
    let mut stats = GenerationStats::default();
    emit_bolt(rng, mesh, source, destination, params, color, 0, &mut stats);
    stats
}

#[allow(clippy::too_many_arguments)]
fn emit_bolt<R: Rng>(
    rng: &mut R,
    mesh: &mut RibbonMesh,
    source: Vector3<f32>,
    destination: Vector3<f32>,
    params: &BoltParams,
    color: [f32; 4],
    depth: u32,
    stats: &mut GenerationStats,
) {
    stats.max_depth = stats.max_depth.max(depth);

    let n = params.subdivisions.max(1);
    let tangent = destination - source;
    let length = tangent.magnitude();
    let normal = ribbon_normal(tangent);
    let width = params.resolved_width(length);
    let offset = normal * width;
    let jaggedness = 1.0 / SWAY;
    let probability = params.probability();

    let positions = subdivision_positions(rng, n);
    let n_f = n as f32;

    let mut prev_point = source;
    let mut prev_displacement = 0.0f32;
    let mut branches = 0;

    for i in 1..n {
        let pos = positions[i];

        // closely spaced samples only get a small perpendicular step
        let scale = length * jaggedness * (pos - positions[i - 1]);
        let envelope = if pos > ENVELOPE_START {
            (1.0 - pos) / (1.0 - ENVELOPE_START)
        } else {
            1.0
        };
        let displacement =
            (rng.random_range(-SWAY..SWAY) * scale + prev_displacement) * envelope;

        let point = source + tangent * pos + normal * displacement;
        mesh.push_segment(
            prev_point,
            point,
            offset,
            (i - 1) as f32 / n_f,
            i as f32 / n_f,
            color,
        );
        stats.segments += 1;

        if branches < params.max_branches && rng.random_bool(probability) {
            let angle = Deg(rng.random_range(-BRANCH_ANGLE_DEG..BRANCH_ANGLE_DEG));
            let direction = Matrix3::from_angle_z(angle) * tangent;
            if direction.magnitude2() > DEGENERATE_EPSILON {
                branches += 1;
                stats.branches += 1;
                let reach = (destination - point).magnitude() * BRANCH_REACH;
                let child = BoltParams {
                    max_branches: params.max_branches - 1,
                    branch_probability: params.branch_probability,
                    width: width * BRANCH_WIDTH_SCALE,
                    subdivisions: (n / 2).max(1),
                };
                let target = point + direction.normalize() * reach;
                emit_bolt(rng, mesh, point, target, &child, color, depth + 1, stats);
            }
        }

        prev_point = point;
        prev_displacement = displacement;
    }

    mesh.push_segment(
        prev_point,
        destination,
        offset,
        (n - 1) as f32 / n_f,
        1.0,
        color,
    );
    stats.segments += 1;
}

fn map_range(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    out_lo + (value - in_lo) / (in_hi - in_lo) * (out_hi - out_lo)
}

fn build_luminance_ramp() -> [[u8; 2]; RAMP_WIDTH] {
    let mut ramp = [[0u8; 2]; RAMP_WIDTH];
    for (col, texel) in ramp.iter_mut().enumerate() {
        let x = (col as f32 / (RAMP_WIDTH - 1) as f32 * 2.0 - 1.0).abs();
        let luminance = if x < 0.2 {
            map_range(x, 0.0, 0.2, 255.0, 60.0)
        } else {
            map_range(x, 0.2, 1.0, 60.0, 0.0)
        };
        let luminance = luminance.clamp(0.0, 255.0) as u8;
        *texel = [luminance, luminance];
    }
    ramp
}

/// Luminance/alpha texture applied across every ribbon: bright on the center
/// line, falling off steeply to 60 and then slowly to transparent.
pub fn luminance_ramp() -> &'static [[u8; 2]; RAMP_WIDTH] {
    static RAMP: OnceLock<[[u8; 2]; RAMP_WIDTH]> = OnceLock::new();
    RAMP.get_or_init(build_luminance_ramp)
}

/// Triangle-list sphere used by renderers for the nucleus and the bulges.
#[derive(Clone, Debug, Default)]
pub struct SphereMesh {
    pub positions: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
}

pub fn uv_sphere(radius: f32, slices: usize, stacks: usize) -> SphereMesh {
    let slices = slices.max(3);
    let stacks = stacks.max(2);
    let point = |slice: usize, stack: usize| {
        let theta = std::f32::consts::TAU * slice as f32 / slices as f32;
        let phi = std::f32::consts::PI * stack as f32 / stacks as f32;
        Vector3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
    };

    let mut sphere = SphereMesh::default();
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = point(slice, stack);
            let b = point(slice + 1, stack);
            let c = point(slice, stack + 1);
            let d = point(slice + 1, stack + 1);
            for unit in [a, c, b, b, c, d] {
                sphere.positions.push(unit * radius);
                sphere.normals.push(unit);
            }
        }
    }
    sphere
}
