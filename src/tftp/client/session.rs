use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::tftp::core::{Packet, PinnedSocket, RetryTimer, Step, TransferError, Transport};

/// State of one transfer, owned by the [`Client`](super::Client) until it
/// reaches Done or Aborted.
///
/// `block` is the last block number acknowledged, so it starts at 0: a read
/// expects block 1 next, a write waits for the server's ACK 0.
pub struct TransferSession<S: Transport> {
    socket: PinnedSocket<S>,
    timer: RetryTimer,
    pub(super) block: u16,
    pub(super) bytes: u64,
    pub(super) blocks: u64,
    started: Instant,
}

impl<S: Transport> TransferSession<S> {
    pub fn new(socket: S, server: SocketAddr, timer: RetryTimer) -> Self {
        Self {
            socket: PinnedSocket::new(socket, server),
            timer,
            block: 0,
            bytes: 0,
            blocks: 0,
            started: Instant::now(),
        }
    }

    /// Runs one round trip through the retry timer.
    pub fn exchange<T, F>(&mut self, request: &[u8], classify: F) -> Result<T, TransferError>
    where
        F: FnMut(Packet) -> Result<Step<T>, TransferError>,
    {
        self.timer.exchange(&mut self.socket, request, classify)
    }

    /// Sends a packet to the current destination without waiting for a reply.
    pub fn send(&mut self, packet: &Packet) -> Result<(), TransferError> {
        let bytes = encode(packet)?;
        self.socket.send(&bytes).map_err(TransferError::Network)
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.socket.peer()
    }

    pub fn retransmits(&self) -> u64 {
        self.timer.retransmits()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn into_transport(self) -> S {
        self.socket.into_inner()
    }
}

pub(super) fn encode(packet: &Packet) -> Result<Vec<u8>, TransferError> {
    packet.serialize().map_err(TransferError::InvalidRequest)
}
