//! Procedural lightning bolts and latest-value replication of the world
//! state from a simulator to independent renderers.

pub mod bolt;
pub mod collection;
pub mod config;
pub mod decode;
pub mod encode;
pub mod geometry;
pub mod replicator;
pub mod simulator;
pub mod trigger;

pub use bolt::{BoltEntity, BoltPhase};
pub use collection::BoltCollection;
pub use config::{ReplicatorConfig, SimConfig};
pub use decode::{DecodedBolt, DecodedFrame, DrawItem, FrameSink, SnapshotDecoder};
pub use encode::{encode_snapshot, EncodeReport, WorldState};
pub use geometry::{generate_bolt, BoltParams, GenerationStats, RibbonMesh};
pub use plasma_common::{FlatBolt, Pose, StateSnapshot, MAX_BOLTS, VERTEX_COUNT};
pub use replicator::{Maker, Reading, ReplicatorError, Taker};
pub use simulator::{Simulator, Strike, StrikeObserver, TickReport};

/// Installs `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
