//! Latest-value replication of fixed-size records.
//!
//! A [`Maker`] publishes whole records and a [`Taker`] polls for the most
//! recent one. Nothing is queued: a publish replaces whatever was there, and
//! a poll never waits for a new value.

mod assembler;
mod error;
pub mod slot;
mod udp;

use bytemuck::Pod;
use std::sync::Arc;

pub use assembler::{FragmentHeader, FrameAssembler, FRAGMENT_MAGIC, HEADER_LEN};
pub use error::ReplicatorError;
pub use udp::{UdpMaker, UdpTaker};

/// Outcome of polling a [`Taker`].
#[derive(Debug)]
pub enum Reading<T> {
    /// Nothing has been published yet.
    Empty,
    /// The record returned by the previous poll.
    Stale(Arc<T>),
    /// A record published since the previous poll.
    Fresh(Arc<T>),
}

impl<T> Reading<T> {
    pub fn latest(&self) -> Option<&Arc<T>> {
        match self {
            Reading::Empty => None,
            Reading::Stale(value) | Reading::Fresh(value) => Some(value),
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Reading::Fresh(_))
    }
}

impl<T> Clone for Reading<T> {
    fn clone(&self) -> Self {
        match self {
            Reading::Empty => Reading::Empty,
            Reading::Stale(value) => Reading::Stale(value.clone()),
            Reading::Fresh(value) => Reading::Fresh(value.clone()),
        }
    }
}

/// Producer side of a replication link.
pub trait Maker<T>: Send {
    /// Replaces the published record with a copy of `value`.
    fn publish(&mut self, value: &T) -> Result<(), ReplicatorError>;
}

/// Consumer side of a replication link.
pub trait Taker<T>: Send {
    fn poll(&mut self) -> Reading<T>;
}

/// Heap copy of a plain-data record without staging it on the stack.
pub(crate) fn boxed_copy<T: Pod>(value: &T) -> Box<T> {
    let mut boxed: Box<T> = bytemuck::allocation::zeroed_box();
    bytemuck::bytes_of_mut(&mut *boxed).copy_from_slice(bytemuck::bytes_of(value));
    boxed
}

/// Rebuilds a record from its raw bytes, `None` when the length is wrong.
pub(crate) fn boxed_from_bytes<T: Pod>(bytes: &[u8]) -> Option<Box<T>> {
    if bytes.len() != std::mem::size_of::<T>() {
        return None;
    }
    let mut boxed: Box<T> = bytemuck::allocation::zeroed_box();
    bytemuck::bytes_of_mut(&mut *boxed).copy_from_slice(bytes);
    Some(boxed)
}
