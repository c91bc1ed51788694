//! Best-effort replication over UDP, typically to a broadcast address.

use super::assembler::{fragment_count, write_fragment, FrameAssembler, HEADER_LEN};
use super::slot::{self, SlotReader, SlotWriter};
use super::{boxed_from_bytes, Maker, Reading, ReplicatorError, Taker};
use crate::config::ReplicatorConfig;
use bytemuck::Pod;
use std::io;
use std::marker::PhantomData;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const RECV_POLL: Duration = Duration::from_millis(100);
const MAX_DATAGRAM: usize = 65_536;

/// Sends every published record as a burst of fragments.
///
/// The socket never blocks: when the send buffer fills up, the rest of that
/// frame is dropped and the next publish starts a new frame.
#[derive(Debug)]
pub struct UdpMaker<T> {
    socket: UdpSocket,
    target: SocketAddr,
    chunk: usize,
    sequence: u32,
    datagram: Vec<u8>,
    _record: PhantomData<fn(&T)>,
}

impl<T: Pod> UdpMaker<T> {
    pub fn bind(config: &ReplicatorConfig) -> Result<Self, ReplicatorError> {
        let chunk = config.packet_size.saturating_sub(HEADER_LEN);
        let record_len = std::mem::size_of::<T>();
        if chunk == 0 || fragment_count(record_len, chunk) > u16::MAX as usize {
            return Err(ReplicatorError::PacketSizeTooSmall {
                packet_size: config.packet_size,
                header: HEADER_LEN,
            });
        }

        let socket = UdpSocket::bind(config.bind).map_err(|source| ReplicatorError::Bind {
            addr: config.bind,
            source,
        })?;
        socket
            .set_broadcast(config.broadcast)
            .map_err(ReplicatorError::Configure)?;
        socket
            .set_nonblocking(true)
            .map_err(ReplicatorError::Configure)?;

        log::info!(
            "replicating {record_len}-byte records to {} in {} datagrams of at most {} bytes",
            config.target,
            fragment_count(record_len, chunk),
            config.packet_size
        );
        Ok(Self {
            socket,
            target: config.target,
            chunk,
            sequence: 0,
            datagram: Vec::with_capacity(config.packet_size),
            _record: PhantomData,
        })
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl<T: Pod> Maker<T> for UdpMaker<T> {
    fn publish(&mut self, value: &T) -> Result<(), ReplicatorError> {
        let record = bytemuck::bytes_of(value);
        let parts = fragment_count(record.len(), self.chunk);
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        for part in 0..parts {
            write_fragment(&mut self.datagram, record, sequence, part as u16, self.chunk);
            match self.socket.send_to(&self.datagram, self.target) {
                Ok(_) => {}
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    log::debug!(
                        "send buffer full, dropped {} of {parts} fragments of frame {sequence}",
                        parts - part
                    );
                    return Ok(());
                }
                Err(source) => {
                    return Err(ReplicatorError::Send {
                        target: self.target,
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}

/// Receives fragments on a background thread and exposes the latest
/// complete record through a single-slot mailbox.
#[derive(Debug)]
pub struct UdpTaker<T> {
    reader: SlotReader<T>,
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Pod + Send + Sync> UdpTaker<T> {
    pub fn bind(config: &ReplicatorConfig) -> Result<Self, ReplicatorError> {
        let socket = UdpSocket::bind(config.listen).map_err(|source| ReplicatorError::Bind {
            addr: config.listen,
            source,
        })?;
        socket
            .set_read_timeout(Some(RECV_POLL))
            .map_err(ReplicatorError::Configure)?;
        let local_addr = socket.local_addr().map_err(ReplicatorError::Configure)?;

        let (writer, reader) = slot::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker = thread::Builder::new()
            .name("plasma-udp-taker".to_string())
            .spawn({
                let stop = stop.clone();
                move || receive_loop(socket, writer, &stop)
            })
            .map_err(ReplicatorError::Spawn)?;

        log::info!("listening for replicated state on {local_addr}");
        Ok(Self {
            reader,
            local_addr,
            stop,
            worker: Some(worker),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl<T: Pod + Send + Sync> Taker<T> for UdpTaker<T> {
    fn poll(&mut self) -> Reading<T> {
        self.reader.read()
    }
}

impl<T> Drop for UdpTaker<T> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("receive thread panicked");
            }
        }
    }
}

fn receive_loop<T: Pod>(socket: UdpSocket, mut writer: SlotWriter<T>, stop: &AtomicBool) {
    let mut assembler = FrameAssembler::new(std::mem::size_of::<T>());
    let mut datagram = vec![0u8; MAX_DATAGRAM];

    while !stop.load(Ordering::Relaxed) {
        let len = match socket.recv(&mut datagram) {
            Ok(len) => len,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(error) => {
                log::warn!("{}", ReplicatorError::Receive(error));
                thread::sleep(RECV_POLL);
                continue;
            }
        };

        match assembler.accept(&datagram[..len]) {
            Ok(Some(bytes)) => {
                if let Some(record) = boxed_from_bytes::<T>(bytes) {
                    writer.store(Arc::from(record));
                }
            }
            Ok(None) => {}
            Err(error) => log::debug!("dropping datagram: {error}"),
        }
    }
    log::debug!(
        "receive thread stopped, {} incomplete frames abandoned",
        assembler.abandoned()
    );
}
