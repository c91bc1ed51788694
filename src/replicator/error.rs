use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Failures local to one side of the replication link.
#[derive(Debug, Error)]
pub enum ReplicatorError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure UDP socket: {0}")]
    Configure(#[source] io::Error),

    #[error("failed to send fragment to {target}: {source}")]
    Send {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to receive datagram: {0}")]
    Receive(#[source] io::Error),

    #[error("failed to start the receive thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("packet size {packet_size} leaves no room after the {header}-byte header")]
    PacketSizeTooSmall { packet_size: usize, header: usize },

    #[error("datagram of {len} bytes is shorter than a fragment header")]
    PacketTooSmall { len: usize },

    #[error("datagram does not start with the fragment magic")]
    BadMagic,

    #[error("record of {got} bytes announced, expected {expected}")]
    RecordSizeMismatch { expected: usize, got: usize },

    #[error("fragment {part} of {parts} does not fit a {record_len}-byte record in {chunk}-byte chunks")]
    FragmentOutOfRange {
        part: u16,
        parts: u16,
        chunk: u32,
        record_len: u32,
    },
}
