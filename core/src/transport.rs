//! transport.rs
//! Datagram boundary between the engines and the network.
//!
//! Design notes:
//! - `recv` waits at most a bounded time and reports a timeout as `Ok(None)`,
//!   so receive loops can poll their stop signal.
//! - A datagram longer than the caller's buffer is truncated, as with UDP.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use thiserror::Error;

use crate::config::{ClientConfig, ServerConfig};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("transport closed")]
    Closed,
}

pub trait Transport: Send + Sync {
    /// Send one datagram. Returns the number of bytes written.
    fn send(&self, bytes: &[u8], destination: SocketAddr) -> Result<usize, TransportError>;

    /// Receive one datagram into `buf`, or `Ok(None)` if nothing arrived in time.
    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError>;
}

// ---------------------------------------------------------------------------
// UDP multicast
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UdpMulticastTransport {
    socket: UdpSocket,
    joined: Option<(Ipv4Addr, Ipv4Addr)>,
}

impl UdpMulticastTransport {
    /// Socket for sending to the configured group.
    pub fn sender(config: &ServerConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(config.interface, 0))?;
        socket.set_multicast_ttl_v4(config.ttl)?;
        socket.set_multicast_loop_v4(config.multicast_loop)?;
        debug!("[TRANSPORT] sender bound to {}", socket.local_addr()?);
        Ok(Self { socket, joined: None })
    }

    /// Socket bound to the group port and joined to the group.
    pub fn receiver(config: &ClientConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(config.bind_addr())?;
        socket.join_multicast_v4(&config.multicast_group, &config.interface)?;
        socket.set_read_timeout(Some(config.recv_timeout()))?;
        debug!(
            "[TRANSPORT] receiver on {} joined {} via {}",
            socket.local_addr()?, config.multicast_group, config.interface
        );
        Ok(Self { socket, joined: Some((config.multicast_group, config.interface)) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpMulticastTransport {
    fn send(&self, bytes: &[u8], destination: SocketAddr) -> Result<usize, TransportError> {
        Ok(self.socket.send_to(bytes, destination)?)
    }

    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.socket.recv_from(buf) {
            Ok((n, _)) => Ok(Some(n)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for UdpMulticastTransport {
    fn drop(&mut self) {
        if let Some((group, interface)) = self.joined.take() {
            if let Err(e) = self.socket.leave_multicast_v4(&group, &interface) {
                warn!("[TRANSPORT] leaving {group} failed: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-process loopback
// ---------------------------------------------------------------------------

/// In-process datagram bus. Every clone shares one queue; destinations are
/// ignored.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    recv_timeout: Duration,
}

impl LoopbackTransport {
    pub fn new(recv_timeout: Duration) -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx, recv_timeout }
    }

    /// Datagrams sent but not yet received.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, bytes: &[u8], _destination: SocketAddr) -> Result<usize, TransportError> {
        self.tx.send(bytes.to_vec()).map_err(|_| TransportError::Closed)?;
        Ok(bytes.len())
    }

    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.rx.recv_timeout(self.recv_timeout) {
            Ok(datagram) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(Some(n))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}
