//! Projection of the live simulation onto the fixed-capacity wire record.

use crate::bolt::BoltEntity;
use crate::collection::BoltCollection;
use cgmath::{Quaternion, Vector3};
use plasma_common::{FlatBolt, Pose, StateSnapshot, MAX_BOLTS, VERTEX_COUNT};

/// What one encode pass had to leave out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodeReport {
    pub encoded_bolts: usize,
    /// Live bolts beyond the snapshot capacity.
    pub dropped_bolts: usize,
    /// Vertices cut from meshes larger than [`VERTEX_COUNT`], summed over bolts.
    pub truncated_vertices: usize,
}

impl EncodeReport {
    pub fn is_lossless(&self) -> bool {
        self.dropped_bolts == 0 && self.truncated_vertices == 0
    }
}

/// Per-tick simulator state that is copied verbatim into every snapshot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorldState {
    pub pose: Pose,
    pub nucleus: Vector3<f32>,
    pub frame: u32,
}

pub fn pose_record(position: Vector3<f32>, orientation: Quaternion<f32>) -> Pose {
    Pose {
        position: position.into(),
        orientation: [orientation.s, orientation.v.x, orientation.v.y, orientation.v.z],
    }
}

/// Copies one bolt into `flat`, returning how many vertices did not fit.
///
/// Slots past the copied vertex count keep their previous contents.
pub fn encode_bolt(bolt: &BoltEntity, flat: &mut FlatBolt) -> usize {
    let mesh = bolt.mesh();
    let count = mesh.len().min(VERTEX_COUNT);

    for (slot, position) in flat.points.iter_mut().zip(&mesh.positions[..count]) {
        *slot = (*position).into();
    }
    flat.tex_coords[..count].copy_from_slice(&mesh.tex_coords[..count]);
    flat.colors[..count].copy_from_slice(&mesh.colors[..count]);

    flat.point_count = count as u32;
    flat.ending = bolt.ending().into();
    flat.bulge_position = bolt.bulge_position().into();
    flat.bulge_scale = bolt.bulge_scale().into();

    mesh.len() - count
}

/// Writes the oldest bolts of `bolts` plus `world` into `out`.
///
/// At most [`MAX_BOLTS`] bolts are encoded, in collection order. Bolts past
/// the capacity stay untouched in the collection and are simply absent from
/// this frame.
pub fn encode_snapshot(
    bolts: &BoltCollection,
    world: &WorldState,
    out: &mut StateSnapshot,
) -> EncodeReport {
    let mut report = EncodeReport::default();

    for (index, (bolt, flat)) in bolts.iter().zip(out.flat_bolts.iter_mut()).enumerate() {
        let truncated = encode_bolt(bolt, flat);
        if truncated > 0 {
            log::debug!(
                "bolt {index} has {} vertices, {truncated} past the {VERTEX_COUNT} vertex ceiling were dropped",
                bolt.mesh().len()
            );
        }
        report.truncated_vertices += truncated;
        report.encoded_bolts += 1;
    }

    report.dropped_bolts = bolts.len().saturating_sub(MAX_BOLTS);
    if report.dropped_bolts > 0 {
        log::debug!(
            "{} live bolts, {} left out of frame {}",
            bolts.len(),
            report.dropped_bolts,
            world.frame
        );
    }

    out.pose = world.pose;
    out.frame = world.frame;
    out.bolt_count = report.encoded_bolts as u32;
    out.nucleus_position = world.nucleus.into();
    report
}
