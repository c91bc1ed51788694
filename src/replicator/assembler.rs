//! Datagram framing for records larger than one packet.
//!
//! Every datagram starts with a [`FragmentHeader`]; the payload is the
//! `part`-th `chunk`-sized slice of the record (the last one may be shorter).

use super::ReplicatorError;
use bytemuck::{Pod, Zeroable};

pub const FRAGMENT_MAGIC: [u8; 4] = *b"PLSM";
pub const HEADER_LEN: usize = std::mem::size_of::<FragmentHeader>();

#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct FragmentHeader {
    pub magic: [u8; 4],
    pub sequence: u32,
    pub part: u16,
    pub parts: u16,
    pub chunk: u32,
    pub record_len: u32,
}

impl FragmentHeader {
    pub fn parse(datagram: &[u8]) -> Result<(Self, &[u8]), ReplicatorError> {
        if datagram.len() < HEADER_LEN {
            return Err(ReplicatorError::PacketTooSmall { len: datagram.len() });
        }
        let (head, payload) = datagram.split_at(HEADER_LEN);
        let header: FragmentHeader = bytemuck::pod_read_unaligned(head);
        if header.magic != FRAGMENT_MAGIC {
            return Err(ReplicatorError::BadMagic);
        }
        Ok((header, payload))
    }

    /// Byte range of this fragment within the record, if consistent.
    fn span(&self) -> Option<std::ops::Range<usize>> {
        let chunk = self.chunk as usize;
        let record_len = self.record_len as usize;
        if chunk == 0 || fragment_count(record_len, chunk) != self.parts as usize {
            return None;
        }
        if self.part >= self.parts {
            return None;
        }
        let start = self.part as usize * chunk;
        Some(start..(start + chunk).min(record_len))
    }
}

pub fn fragment_count(record_len: usize, chunk: usize) -> usize {
    record_len.div_ceil(chunk.max(1)).max(1)
}

/// Clears `out` and fills it with datagram `part` of `record`.
pub fn write_fragment(out: &mut Vec<u8>, record: &[u8], sequence: u32, part: u16, chunk: usize) {
    let parts = fragment_count(record.len(), chunk);
    let start = (part as usize * chunk).min(record.len());
    let end = (start + chunk).min(record.len());
    let header = FragmentHeader {
        magic: FRAGMENT_MAGIC,
        sequence,
        part,
        parts: parts as u16,
        chunk: chunk as u32,
        record_len: record.len() as u32,
    };
    out.clear();
    out.extend_from_slice(bytemuck::bytes_of(&header));
    out.extend_from_slice(&record[start..end]);
}

/// True when `a` comes after `b`, allowing the counter to wrap.
pub fn sequence_newer(a: u32, b: u32) -> bool {
    a != b && a.wrapping_sub(b) < 1 << 31
}

/// How far behind the newest frame a sequence may fall and still count as a
/// late fragment rather than a restarted sender.
pub const RESTART_WINDOW: u32 = 1024;

/// True when `a` is so far behind `b` that the sender must have started over.
pub fn sequence_restarted(a: u32, b: u32) -> bool {
    !sequence_newer(a, b) && b.wrapping_sub(a) > RESTART_WINDOW
}

#[derive(Debug)]
struct Pending {
    sequence: u32,
    received: Vec<bool>,
    remaining: usize,
}

/// Rebuilds records from fragments, one frame at a time.
///
/// A fragment of a newer frame abandons the frame in progress; fragments of
/// older frames are ignored. A sequence more than [`RESTART_WINDOW`] frames
/// behind starts a new stream. Only fully received records are handed out.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    pending: Option<Pending>,
    last_complete: Option<u32>,
    abandoned: u64,
}

impl FrameAssembler {
    pub fn new(record_len: usize) -> Self {
        Self {
            buffer: vec![0; record_len],
            pending: None,
            last_complete: None,
            abandoned: 0,
        }
    }

    pub fn record_len(&self) -> usize {
        self.buffer.len()
    }

    /// Frames dropped because a newer one started before they completed.
    pub fn abandoned(&self) -> u64 {
        self.abandoned
    }

    /// Feeds one datagram, returning the record it completed, if any.
    pub fn accept(&mut self, datagram: &[u8]) -> Result<Option<&[u8]>, ReplicatorError> {
        let (header, payload) = FragmentHeader::parse(datagram)?;
        if header.record_len as usize != self.buffer.len() {
            return Err(ReplicatorError::RecordSizeMismatch {
                expected: self.buffer.len(),
                got: header.record_len as usize,
            });
        }
        let span = header
            .span()
            .filter(|span| span.len() == payload.len())
            .ok_or(ReplicatorError::FragmentOutOfRange {
                part: header.part,
                parts: header.parts,
                chunk: header.chunk,
                record_len: header.record_len,
            })?;

        let newest = match (&self.pending, self.last_complete) {
            (Some(pending), _) => Some(pending.sequence),
            (None, last) => last,
        };
        if newest.is_some_and(|newest| sequence_restarted(header.sequence, newest)) {
            log::info!(
                "sender restarted at frame {} (newest seen {newest:?})",
                header.sequence
            );
            self.pending = None;
            self.last_complete = None;
        }

        if let Some(last) = self.last_complete {
            if !sequence_newer(header.sequence, last) {
                return Ok(None);
            }
        }

        let restart = match &self.pending {
            None => true,
            Some(pending) if sequence_newer(header.sequence, pending.sequence) => {
                self.abandoned += 1;
                log::trace!(
                    "frame {} abandoned with {} fragments missing",
                    pending.sequence,
                    pending.remaining
                );
                true
            }
            Some(pending) if pending.sequence != header.sequence => return Ok(None),
            Some(_) => false,
        };
        if restart {
            self.pending = Some(Pending {
                sequence: header.sequence,
                received: vec![false; header.parts as usize],
                remaining: header.parts as usize,
            });
        }

        let Some(pending) = self.pending.as_mut() else {
            return Ok(None);
        };
        let part = header.part as usize;
        if pending.received[part] {
            return Ok(None);
        }
        pending.received[part] = true;
        pending.remaining -= 1;
        self.buffer[span].copy_from_slice(payload);

        if pending.remaining > 0 {
            return Ok(None);
        }
        self.last_complete = Some(header.sequence);
        self.pending = None;
        Ok(Some(self.buffer.as_slice()))
    }
}
