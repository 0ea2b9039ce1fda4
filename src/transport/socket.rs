//! UDP socket endpoint for the telemetry stream.
//!
//! Owns the socket, binds with local-port fallback, sends heartbeats, and
//! receives datagrams under a timeout.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::core::{
    BIND_ATTEMPTS, HEARTBEAT, MAX_DATAGRAM_SIZE, RECV_PORT, RECV_TIMEOUT, SEND_PORT,
    TransportError,
};

/// Socket endpoint settings.
///
/// Only `recv_port` changes after construction: it follows the port the
/// last successful bind landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Console address; datagrams from any other IP are ignored.
    pub remote_ip: IpAddr,
    /// Console port heartbeats go to.
    pub send_port: u16,
    /// First local port to bind.
    pub recv_port: u16,
    /// Local interface to bind.
    pub bind_ip: IpAddr,
    /// Receive timeout.
    pub recv_timeout: Duration,
    /// Consecutive ports tried per bind.
    pub bind_attempts: u16,
    /// Receive buffer size.
    pub max_datagram_size: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            remote_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            send_port: SEND_PORT,
            recv_port: RECV_PORT,
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            recv_timeout: RECV_TIMEOUT,
            bind_attempts: BIND_ATTEMPTS,
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl EndpointConfig {
    /// Where heartbeats are sent.
    pub fn remote_send_addr(&self) -> SocketAddr {
        SocketAddr::new(self.remote_ip, self.send_port)
    }
}

/// Telemetry socket.
///
/// Starts unbound; [`bind`](Self::bind) may be called again at any time to
/// replace the socket.
#[derive(Debug)]
pub struct TelemetrySocket {
    config: EndpointConfig,
    socket: Option<UdpSocket>,
    recv_buffer: Vec<u8>,
}

impl TelemetrySocket {
    /// Create an unbound endpoint.
    pub fn new(config: EndpointConfig) -> Self {
        let recv_buffer = vec![0u8; config.max_datagram_size];
        Self {
            config,
            socket: None,
            recv_buffer,
        }
    }

    /// Endpoint settings.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Check if a socket is currently bound.
    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    /// Get the local address of the bound socket.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotBound)?;
        socket.local_addr().map_err(TransportError::ReceiveFailed)
    }

    /// Bind a fresh socket, closing any existing one first.
    ///
    /// Tries `recv_port`, then each following port, up to `bind_attempts`
    /// ports in total. On success `recv_port` is updated to the bound port.
    pub async fn bind(&mut self) -> Result<SocketAddr, TransportError> {
        self.close();

        let first_port = self.config.recv_port;
        let mut last_err = io::Error::new(io::ErrorKind::InvalidInput, "no bind attempts allowed");
        let mut attempts = 0;

        for offset in 0..self.config.bind_attempts {
            let Some(port) = first_port.checked_add(offset) else {
                break;
            };
            attempts += 1;

            match UdpSocket::bind(SocketAddr::new(self.config.bind_ip, port)).await {
                Ok(socket) => {
                    let local = socket.local_addr().map_err(TransportError::ReceiveFailed)?;
                    if port != first_port {
                        info!(first_port, port = local.port(), "bound on fallback port");
                    }
                    self.config.recv_port = local.port();
                    self.socket = Some(socket);
                    return Ok(local);
                }
                Err(e) => {
                    debug!(port, error = %e, "bind attempt failed");
                    last_err = e;
                }
            }
        }

        Err(TransportError::BindExhausted {
            first_port,
            attempts,
            source: last_err,
        })
    }

    /// Close the socket, if bound.
    pub fn close(&mut self) {
        self.socket = None;
    }

    /// Send the single-byte heartbeat to the console. Never retries.
    pub async fn send_heartbeat(&self) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotBound)?;
        socket
            .send_to(HEARTBEAT, self.config.remote_send_addr())
            .await
            .map_err(TransportError::SendFailed)?;
        Ok(())
    }

    /// Wait up to the receive timeout for one datagram.
    pub async fn receive(&mut self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotBound)?;
        let timeout = self.config.recv_timeout;

        match tokio::time::timeout(timeout, socket.recv_from(&mut self.recv_buffer)).await {
            Ok(Ok((len, from))) => Ok((self.recv_buffer[..len].to_vec(), from)),
            Ok(Err(e)) => Err(TransportError::ReceiveFailed(e)),
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }

    /// Check whether a datagram came from the configured console.
    pub fn is_from_remote(&self, from: SocketAddr) -> bool {
        from.ip() == self.config.remote_ip
    }
}
