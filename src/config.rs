use crate::geometry::BoltParams;
use cgmath::{Quaternion, Vector3};
use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 63059;
pub const DEFAULT_PACKET_SIZE: usize = 1400;

/// Tunables of the simulator.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// Radius of the shell the strikes start from.
    pub shell_radius: f32,
    /// Rest position of the nucleus; every strike aims at it.
    pub center: Vector3<f32>,
    pub initial_pace: f64,
    pub pace_upper_bound: f64,
    pub pace_step: f64,
    pub pace_min: f64,
    pub pace_max: f64,
    pub timer_bolt: BoltParams,
    pub gesture_bolt: BoltParams,
    pub nucleus_wiggle: f32,
    /// Distance from the nucleus center at which a bolt ends.
    pub destination_offset: f32,
    pub eye: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    pub tick_hz: f64,
    pub seed: Option<u64>,
}

impl SimConfig {
    pub fn with_defaults() -> Self {
        Self {
            shell_radius: 5.0,
            center: Vector3::new(0.0, 0.6, -1.0),
            initial_pace: 1.0,
            pace_upper_bound: 2.5,
            pace_step: 0.5,
            pace_min: 0.5,
            pace_max: 30.0,
            timer_bolt: BoltParams::branching(4, 0.06),
            gesture_bolt: BoltParams::branching(2, 0.03),
            nucleus_wiggle: 0.006,
            destination_offset: 0.1,
            eye: Vector3::new(0.0, 0.454005, -0.011147),
            orientation: Quaternion::new(0.999998, -0.001988, 0.0, 0.0),
            tick_hz: 60.0,
            seed: None,
        }
    }

    pub fn tick_dt(&self) -> f64 {
        1.0 / self.tick_hz.max(1.0)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Addresses and datagram size of the replication link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicatorConfig {
    /// Local address the sending socket binds to.
    pub bind: SocketAddr,
    /// Where fragments are sent, usually a broadcast address.
    pub target: SocketAddr,
    /// Address the receiving socket listens on.
    pub listen: SocketAddr,
    /// Upper bound of a datagram, header included.
    pub packet_size: usize,
    pub broadcast: bool,
}

impl ReplicatorConfig {
    pub fn with_defaults() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            target: SocketAddr::from((Ipv4Addr::BROADCAST, DEFAULT_PORT)),
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            packet_size: DEFAULT_PACKET_SIZE,
            broadcast: true,
        }
    }

    /// Sender and receiver on the loopback interface, receiver on an
    /// ephemeral port.
    pub fn loopback() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            target: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            packet_size: DEFAULT_PACKET_SIZE,
            broadcast: false,
        }
    }
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}
