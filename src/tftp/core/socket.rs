use super::Packet;
use super::packet::FormatError;
use std::{
    io::{self, ErrorKind},
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

/// Receive buffer size; larger than any valid TFTP datagram so that
/// oversized data packets are seen whole instead of silently truncated.
const RECV_BUFFER_SIZE: usize = 65536;

/// Outcome of a failed receive
#[derive(Debug)]
pub enum RecvError {
    /// Nothing arrived within the timeout
    Timeout,
    Io(io::Error),
}

impl From<io::Error> for RecvError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => RecvError::Timeout,
            _ => RecvError::Io(e),
        }
    }
}

/// Transport `trait` is the datagram primitive the client runs on, allowing
/// the sessions to be driven by something other than a real UDP socket.
pub trait Transport {
    /// Sends raw bytes to `to`.
    fn send_to(&mut self, bytes: &[u8], to: SocketAddr) -> io::Result<()>;
    /// Waits at most `timeout` for one datagram and returns it with its source.
    fn recv_from(&mut self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), RecvError>;
}

impl Transport for UdpSocket {
    fn send_to(&mut self, bytes: &[u8], to: SocketAddr) -> io::Result<()> {
        UdpSocket::send_to(self, bytes, to)?;

        Ok(())
    }

    fn recv_from(&mut self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), RecvError> {
        // A zero read timeout is rejected by the OS
        let timeout = timeout.max(Duration::from_millis(1));
        self.set_read_timeout(Some(timeout))?;

        let mut buf = vec![0; RECV_BUFFER_SIZE];
        let (amt, addr) = UdpSocket::recv_from(self, &mut buf)?;
        buf.truncate(amt);

        Ok((buf, addr))
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_to(&mut self, bytes: &[u8], to: SocketAddr) -> io::Result<()> {
        (**self).send_to(bytes, to)
    }

    fn recv_from(&mut self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), RecvError> {
        (**self).recv_from(timeout)
    }
}

/// What [`PinnedSocket::recv`] observed
#[derive(Debug)]
pub enum Received {
    Packet(Packet),
    /// Datagram from the peer that could not be decoded
    Malformed(FormatError),
    /// Datagram from an address other than the pinned peer
    Stray(SocketAddr),
    Timeout,
}

/// PinnedSocket `struct` wraps a [`Transport`] with the TFTP peer rules:
/// the request goes to the server's well-known address, and the source of the
/// first valid reply becomes the peer for the rest of the transfer.
pub struct PinnedSocket<S: Transport> {
    socket: S,
    server: SocketAddr,
    peer: Option<SocketAddr>,
}

impl<S: Transport> PinnedSocket<S> {
    /// Creates a new [`PinnedSocket`] addressing `server` until a reply pins the peer.
    pub fn new(socket: S, server: SocketAddr) -> Self {
        Self {
            socket,
            server,
            peer: None,
        }
    }

    /// Address outgoing datagrams are sent to
    pub fn destination(&self) -> SocketAddr {
        self.peer.unwrap_or(self.server)
    }

    /// Pinned transfer peer, once the first valid reply arrived
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let to = self.destination();
        self.socket.send_to(bytes, to)
    }

    pub fn recv(&mut self, timeout: Duration) -> io::Result<Received> {
        let (buf, src) = match self.socket.recv_from(timeout) {
            Ok(datagram) => datagram,
            Err(RecvError::Timeout) => return Ok(Received::Timeout),
            Err(RecvError::Io(e)) => return Err(e),
        };

        if let Some(peer) = self.peer {
            if src != peer {
                return Ok(Received::Stray(src));
            }
        }

        match Packet::deserialize(&buf) {
            Ok(packet) => {
                if self.peer.is_none() {
                    log::debug!("Transfer peer pinned to {}", src);
                    self.peer = Some(src);
                }
                Ok(Received::Packet(packet))
            }
            Err(e) => Ok(Received::Malformed(e)),
        }
    }

    pub fn into_inner(self) -> S {
        self.socket
    }
}
