//! In-memory transport for driving sessions from a fixed script of replies

use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use super::Packet;
use super::socket::{RecvError, Transport};

pub fn addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

enum Event {
    Datagram(Vec<u8>, SocketAddr),
    Timeout,
}

/// Replays scripted datagrams in order; an exhausted script times out forever.
#[derive(Default)]
pub struct ScriptedTransport {
    script: VecDeque<Event>,
    pub sent: Vec<(Vec<u8>, SocketAddr)>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, packet: Packet, from: SocketAddr) {
        self.push_raw(packet.serialize().unwrap(), from);
    }

    pub fn push_raw(&mut self, bytes: Vec<u8>, from: SocketAddr) {
        self.script.push_back(Event::Datagram(bytes, from));
    }

    pub fn push_timeout(&mut self) {
        self.script.push_back(Event::Timeout);
    }

    pub fn sent_packets(&self) -> Vec<Packet> {
        self.sent
            .iter()
            .map(|(bytes, _)| Packet::deserialize(bytes).unwrap())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send_to(&mut self, bytes: &[u8], to: SocketAddr) -> io::Result<()> {
        self.sent.push((bytes.to_vec(), to));
        Ok(())
    }

    fn recv_from(&mut self, _timeout: Duration) -> Result<(Vec<u8>, SocketAddr), RecvError> {
        match self.script.pop_front() {
            Some(Event::Datagram(bytes, from)) => Ok((bytes, from)),
            Some(Event::Timeout) | None => Err(RecvError::Timeout),
        }
    }
}
