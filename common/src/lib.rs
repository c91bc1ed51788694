//! Wire layout shared by the simulator and every renderer.
//!
//! The records are `#[repr(C)]`, padding free and made only of `f32`/`u32`
//! fields, so a snapshot can be sent as raw bytes and read back on any
//! little-endian host.

#[cfg(target_endian = "big")]
compile_error!("plasma-common snapshots are laid out in little-endian byte order");

mod layout_verify;
mod size_report;

use bytemuck::{Pod, Zeroable};
pub use size_report::{log_state_facts, LinkUsage, SizeClass, StateFacts};

/// Vertex ceiling of a single replicated bolt.
pub const VERTEX_COUNT: usize = 3600;
/// Number of bolts a snapshot can carry.
pub const MAX_BOLTS: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Pose {
    pub position: [f32; 3],
    /// Quaternion stored as `[w, x, y, z]`.
    pub orientation: [f32; 4],
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: [0.0; 3],
        orientation: [1.0, 0.0, 0.0, 0.0],
    };
}

/// Flattened triangle mesh of one bolt plus its bulge state.
#[derive(Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct FlatBolt {
    pub point_count: u32,
    pub points: [[f32; 3]; VERTEX_COUNT],
    pub tex_coords: [[f32; 2]; VERTEX_COUNT],
    pub colors: [[f32; 4]; VERTEX_COUNT],
    pub ending: [f32; 3],
    pub bulge_position: [f32; 3],
    pub bulge_scale: [f32; 3],
}

impl FlatBolt {
    /// Number of meaningful vertices, never above [`VERTEX_COUNT`].
    pub fn len(&self) -> usize {
        (self.point_count as usize).min(VERTEX_COUNT)
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }
}

/// One complete frame of world state.
///
/// Entries of `flat_bolts` at or beyond `bolt_count` hold whatever was left
/// there by earlier frames and must not be drawn.
#[derive(Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct StateSnapshot {
    pub pose: Pose,
    pub frame: u32,
    pub bolt_count: u32,
    pub flat_bolts: [FlatBolt; MAX_BOLTS],
    pub nucleus_position: [f32; 3],
}

impl StateSnapshot {
    /// Size of the record on the wire.
    pub const SIZE: usize = std::mem::size_of::<StateSnapshot>();

    /// Heap allocated, zero filled snapshot. The record is far too large to
    /// build on the stack.
    pub fn boxed() -> Box<StateSnapshot> {
        bytemuck::allocation::zeroed_box()
    }

    pub fn active_bolts(&self) -> &[FlatBolt] {
        let count = (self.bolt_count as usize).min(MAX_BOLTS);
        &self.flat_bolts[..count]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl std::fmt::Debug for StateSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSnapshot")
            .field("pose", &self.pose)
            .field("frame", &self.frame)
            .field("bolt_count", &self.bolt_count)
            .field("nucleus_position", &self.nucleus_position)
            .finish_non_exhaustive()
    }
}
