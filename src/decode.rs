//! Renderer-side reconstruction of drawable meshes from a snapshot.

use crate::geometry::RibbonMesh;
use crate::replicator::Reading;
use cgmath::{InnerSpace, Quaternion, Vector3};
use plasma_common::{FlatBolt, StateSnapshot, VERTEX_COUNT};

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedBolt {
    pub mesh: RibbonMesh,
    pub ending: Vector3<f32>,
    pub bulge_position: Vector3<f32>,
    pub bulge_scale: Vector3<f32>,
}

impl Default for DecodedBolt {
    fn default() -> Self {
        Self {
            mesh: RibbonMesh::default(),
            ending: Vector3::new(0.0, 0.0, 0.0),
            bulge_position: Vector3::new(0.0, 0.0, 0.0),
            bulge_scale: Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

impl DecodedBolt {
    fn fill(&mut self, flat: &FlatBolt) {
        let count = flat.len();
        self.mesh.clear();
        self.mesh
            .positions
            .extend(flat.points[..count].iter().map(|&p| Vector3::from(p)));
        self.mesh.tex_coords.extend_from_slice(&flat.tex_coords[..count]);
        self.mesh.colors.extend_from_slice(&flat.colors[..count]);
        self.ending = flat.ending.into();
        self.bulge_position = flat.bulge_position.into();
        self.bulge_scale = flat.bulge_scale.into();
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrawItem {
    Bolt(usize),
    Nucleus,
    Bulge(usize),
}

/// The renderer's local copy of the world for one frame.
#[derive(Clone, Debug)]
pub struct DecodedFrame {
    pub frame: u32,
    pub eye: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    pub nucleus: Vector3<f32>,
    /// Number of valid entries at the front of `bolts`.
    bolt_count: usize,
    bolts: Vec<DecodedBolt>,
    /// Simulator frames between this one and the previously decoded frame.
    pub missed_frames: u32,
    /// True when the reading repeated an already decoded snapshot.
    pub repeated: bool,
}

impl Default for DecodedFrame {
    fn default() -> Self {
        Self {
            frame: 0,
            eye: Vector3::new(0.0, 0.0, 0.0),
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            nucleus: Vector3::new(0.0, 0.0, 0.0),
            bolt_count: 0,
            bolts: Vec::new(),
            missed_frames: 0,
            repeated: false,
        }
    }
}

impl DecodedFrame {
    pub fn bolts(&self) -> &[DecodedBolt] {
        &self.bolts[..self.bolt_count]
    }

    /// Draw order used for blending against the nucleus: bolts whose ending
    /// lies behind the nucleus as seen from `eye`, then the nucleus, then the
    /// remaining bolts, then every bulge. Each group keeps snapshot order.
    pub fn draw_plan(&self, eye: Vector3<f32>) -> Vec<DrawItem> {
        let view = eye - self.nucleus;
        let behind = |bolt: &DecodedBolt| view.dot(bolt.ending - self.nucleus) < 0.0;

        let mut plan = Vec::with_capacity(2 * self.bolt_count + 1);
        plan.extend(
            self.bolts()
                .iter()
                .enumerate()
                .filter(|(_, bolt)| behind(bolt))
                .map(|(index, _)| DrawItem::Bolt(index)),
        );
        plan.push(DrawItem::Nucleus);
        plan.extend(
            self.bolts()
                .iter()
                .enumerate()
                .filter(|(_, bolt)| !behind(bolt))
                .map(|(index, _)| DrawItem::Bolt(index)),
        );
        plan.extend((0..self.bolt_count).map(DrawItem::Bulge));
        plan
    }
}

/// Renderer collaborator fed with each decoded frame.
pub trait FrameSink {
    fn draw(&mut self, frame: &DecodedFrame);
}

/// Turns snapshots into drawable frames, reusing mesh storage between calls.
#[derive(Debug, Default)]
pub struct SnapshotDecoder {
    frame: DecodedFrame,
    decoded_any: bool,
}

impl SnapshotDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&DecodedFrame> {
        self.decoded_any.then_some(&self.frame)
    }

    pub fn decode(&mut self, snapshot: &StateSnapshot) -> &DecodedFrame {
        let missed = match self.last_frame() {
            Some(previous) => snapshot.frame.wrapping_sub(previous.frame).saturating_sub(1),
            None => 0,
        };

        let active = snapshot.active_bolts();
        if active.len() < snapshot.bolt_count as usize {
            log::warn!(
                "snapshot {} claims {} bolts, decoding {}",
                snapshot.frame,
                snapshot.bolt_count,
                active.len()
            );
        }
        if self.frame.bolts.len() < active.len() {
            self.frame.bolts.resize_with(active.len(), DecodedBolt::default);
        }
        for (index, (decoded, flat)) in self.frame.bolts.iter_mut().zip(active).enumerate() {
            if flat.point_count as usize > VERTEX_COUNT {
                log::warn!(
                    "bolt {index} of snapshot {} claims {} points, clamping to {VERTEX_COUNT}",
                    snapshot.frame,
                    flat.point_count
                );
            }
            decoded.fill(flat);
        }

        let [w, x, y, z] = snapshot.pose.orientation;
        self.frame.frame = snapshot.frame;
        self.frame.eye = snapshot.pose.position.into();
        self.frame.orientation = Quaternion::new(w, x, y, z);
        self.frame.nucleus = snapshot.nucleus_position.into();
        self.frame.bolt_count = active.len();
        self.frame.missed_frames = missed;
        self.frame.repeated = false;
        self.decoded_any = true;
        &self.frame
    }

    /// Decodes a fresh reading, reuses the previous frame for a stale one,
    /// and yields nothing until the first snapshot has arrived.
    pub fn decode_reading(&mut self, reading: &Reading<StateSnapshot>) -> Option<&DecodedFrame> {
        match reading {
            Reading::Empty => None,
            Reading::Fresh(snapshot) => Some(self.decode(snapshot)),
            Reading::Stale(snapshot) => {
                if !self.decoded_any {
                    self.decode(snapshot);
                } else {
                    self.frame.missed_frames = 0;
                }
                self.frame.repeated = true;
                Some(&self.frame)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::BoltEntity;
    use crate::collection::BoltCollection;
    use crate::encode::{encode_snapshot, WorldState};
    use crate::geometry::BoltParams;
    use plasma_common::Pose;
    use rand::{rngs::SmallRng, SeedableRng};
    use std::sync::Arc;

    const NUCLEUS: Vector3<f32> = Vector3 {
        x: 0.0,
        y: 0.6,
        z: -1.0,
    };

    fn encoded(bolts: &BoltCollection, frame: u32) -> Box<StateSnapshot> {
        let mut snapshot = StateSnapshot::boxed();
        let world = WorldState {
            pose: Pose::IDENTITY,
            nucleus: NUCLEUS,
            frame,
        };
        encode_snapshot(bolts, &world, &mut snapshot);
        snapshot
    }

    fn struck(seed: u64, params: &BoltParams) -> BoltEntity {
        let mut rng = SmallRng::seed_from_u64(seed);
        BoltEntity::strike(
            &mut rng,
            Vector3::new(5.0, 0.0, 0.0),
            Vector3::new(0.1, 0.6, -1.0),
            NUCLEUS,
            params,
        )
        .0
    }

    #[test]
    fn decoding_reproduces_encoded_mesh() {
        let mut bolts = BoltCollection::new();
        bolts.push_back(struck(1, &BoltParams::default()));
        bolts.push_back(struck(2, &BoltParams::branching(2, 0.03)));
        let snapshot = encoded(&bolts, 0);

        let mut decoder = SnapshotDecoder::new();
        let frame = decoder.decode(&snapshot);
        assert_eq!(frame.bolts().len(), 2);
        for (decoded, live) in frame.bolts().iter().zip(bolts.iter()) {
            assert!(live.mesh().len() <= VERTEX_COUNT);
            assert_eq!(&decoded.mesh, live.mesh());
            assert_eq!(decoded.ending, live.ending());
            assert_eq!(decoded.bulge_position, live.bulge_position());
        }
    }

    #[test]
    fn stale_entries_past_count_are_ignored() {
        let mut bolts = BoltCollection::new();
        for seed in 0..3 {
            bolts.push_back(struck(seed, &BoltParams::default()));
        }
        let mut decoder = SnapshotDecoder::new();
        decoder.decode(&encoded(&bolts, 0));

        let mut fewer = BoltCollection::new();
        fewer.push_back(struck(9, &BoltParams::default()));
        let mut snapshot = encoded(&bolts, 1);
        encode_snapshot(
            &fewer,
            &WorldState {
                pose: Pose::IDENTITY,
                nucleus: NUCLEUS,
                frame: 1,
            },
            &mut snapshot,
        );
        assert!(snapshot.flat_bolts[2].point_count > 0);

        let frame = decoder.decode(&snapshot);
        assert_eq!(frame.bolts().len(), 1);
        assert_eq!(frame.draw_plan(Vector3::new(0.0, 0.0, 0.0)).len(), 3);
    }

    #[test]
    fn new_bolt_slots_start_empty_at_origin() {
        let blank = DecodedBolt::default();
        assert!(blank.mesh.positions.is_empty());
        assert_eq!(blank.ending, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(blank.bulge_scale, Vector3::new(0.0, 0.0, 0.0));

        let mut one = BoltCollection::new();
        one.push_back(struck(1, &BoltParams::default()));
        let mut decoder = SnapshotDecoder::new();
        decoder.decode(&encoded(&one, 0));

        let mut two = BoltCollection::new();
        two.push_back(struck(1, &BoltParams::default()));
        two.push_back(struck(2, &BoltParams::default()));
        let frame = decoder.decode(&encoded(&two, 1));
        assert_eq!(frame.bolts().len(), 2);
        assert_eq!(frame.bolts()[1].mesh.len(), two.get(1).unwrap().mesh().len());
        assert_eq!(frame.bolts()[1].ending, two.get(1).unwrap().ending());
    }

    #[test]
    fn empty_reading_skips_drawing() {
        let mut decoder = SnapshotDecoder::new();
        assert!(decoder.decode_reading(&Reading::Empty).is_none());
        assert!(decoder.last_frame().is_none());
    }

    #[test]
    fn frame_counter_reports_missed_and_repeated_frames() {
        let bolts = BoltCollection::new();
        let mut decoder = SnapshotDecoder::new();

        let first: Arc<StateSnapshot> = Arc::from(encoded(&bolts, 10));
        let frame = decoder.decode_reading(&Reading::Fresh(first.clone()));
        assert_eq!(frame.map(|f| (f.frame, f.missed_frames, f.repeated)), Some((10, 0, false)));

        let frame = decoder.decode_reading(&Reading::Stale(first));
        assert_eq!(frame.map(|f| (f.frame, f.repeated)), Some((10, true)));

        let later: Arc<StateSnapshot> = Arc::from(encoded(&bolts, 14));
        let frame = decoder.decode_reading(&Reading::Fresh(later));
        assert_eq!(frame.map(|f| (f.frame, f.missed_frames)), Some((14, 3)));
    }

    #[test]
    fn oversized_point_count_is_clamped() {
        let mut bolts = BoltCollection::new();
        bolts.push_back(struck(4, &BoltParams::default()));
        let mut snapshot = encoded(&bolts, 0);
        snapshot.flat_bolts[0].point_count = u32::MAX;
        snapshot.bolt_count = 40;

        let frame = SnapshotDecoder::new().decode(&snapshot).clone();
        assert_eq!(frame.bolts().len(), plasma_common::MAX_BOLTS);
        assert_eq!(frame.bolts()[0].mesh.len(), VERTEX_COUNT);
    }

    #[test]
    fn draw_plan_puts_hidden_bolts_before_nucleus() {
        let mut frame = DecodedFrame {
            nucleus: NUCLEUS,
            bolt_count: 3,
            ..DecodedFrame::default()
        };
        for z in [-1.5, -0.5, -1.2] {
            frame.bolts.push(DecodedBolt {
                ending: Vector3::new(0.0, 0.6, z),
                ..DecodedBolt::default()
            });
        }

        // eye in front of the nucleus along +z, bolts 0 and 2 end behind it
        let plan = frame.draw_plan(Vector3::new(0.0, 0.6, 0.0));
        assert_eq!(
            plan,
            vec![
                DrawItem::Bolt(0),
                DrawItem::Bolt(2),
                DrawItem::Nucleus,
                DrawItem::Bolt(1),
                DrawItem::Bulge(0),
                DrawItem::Bulge(1),
                DrawItem::Bulge(2),
            ]
        );
    }
}
