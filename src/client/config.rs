//! Receiver configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::{
    BACKOFF_MAX, BACKOFF_MIN, BIND_ATTEMPTS, COMMAND_CAPACITY, HEARTBEAT_INTERVAL,
    MAX_DATAGRAM_SIZE, RECV_PORT, RECV_TIMEOUT, SEND_PORT,
};
use crate::transport::{Backoff, EndpointConfig};

/// Receiver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Console address.
    pub remote_ip: IpAddr,

    /// Console heartbeat port.
    pub send_port: u16,

    /// First local port to bind for telemetry.
    pub recv_port: u16,

    /// Local interface to bind.
    pub bind_ip: IpAddr,

    /// Receive timeout.
    pub recv_timeout: Duration,

    /// Heartbeat interval.
    pub heartbeat_interval: Duration,

    /// Consecutive local ports tried per bind.
    pub bind_attempts: u16,

    /// Reconnect backoff floor.
    pub backoff_min: Duration,

    /// Reconnect backoff ceiling.
    pub backoff_max: Duration,

    /// Receive buffer size.
    pub max_datagram_size: usize,

    /// Depth of the control command queue.
    pub command_capacity: usize,

    /// Directory recording sessions are written to.
    pub recording_dir: PathBuf,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            remote_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            send_port: SEND_PORT,
            recv_port: RECV_PORT,
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            recv_timeout: RECV_TIMEOUT,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            bind_attempts: BIND_ATTEMPTS,
            backoff_min: BACKOFF_MIN,
            backoff_max: BACKOFF_MAX,
            max_datagram_size: MAX_DATAGRAM_SIZE,
            command_capacity: COMMAND_CAPACITY,
            recording_dir: PathBuf::from("."),
        }
    }
}

impl ReceiverConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> ReceiverConfigBuilder {
        ReceiverConfigBuilder::new()
    }

    /// Where heartbeats are sent.
    pub fn remote_send_addr(&self) -> SocketAddr {
        SocketAddr::new(self.remote_ip, self.send_port)
    }

    /// Socket endpoint settings.
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            remote_ip: self.remote_ip,
            send_port: self.send_port,
            recv_port: self.recv_port,
            bind_ip: self.bind_ip,
            recv_timeout: self.recv_timeout,
            bind_attempts: self.bind_attempts,
            max_datagram_size: self.max_datagram_size,
        }
    }

    /// Fresh backoff state.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.backoff_min, self.backoff_max)
    }
}

/// Builder for [`ReceiverConfig`].
#[derive(Debug, Default)]
pub struct ReceiverConfigBuilder {
    config: ReceiverConfig,
}

impl ReceiverConfigBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the console address.
    pub fn remote_ip(mut self, ip: IpAddr) -> Self {
        self.config.remote_ip = ip;
        self
    }

    /// Set the console heartbeat port.
    pub fn send_port(mut self, port: u16) -> Self {
        self.config.send_port = port;
        self
    }

    /// Set the first local port to bind.
    pub fn recv_port(mut self, port: u16) -> Self {
        self.config.recv_port = port;
        self
    }

    /// Set the local interface to bind.
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.config.bind_ip = ip;
        self
    }

    /// Set the receive timeout.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.config.recv_timeout = timeout;
        self
    }

    /// Set the heartbeat interval.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set how many consecutive ports a bind tries.
    pub fn bind_attempts(mut self, attempts: u16) -> Self {
        self.config.bind_attempts = attempts;
        self
    }

    /// Set the reconnect backoff bounds.
    pub fn backoff(mut self, min: Duration, max: Duration) -> Self {
        self.config.backoff_min = min;
        self.config.backoff_max = max;
        self
    }

    /// Set the receive buffer size.
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.config.max_datagram_size = size;
        self
    }

    /// Set the command queue depth.
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.config.command_capacity = capacity.max(1);
        self
    }

    /// Set the directory recordings are written to.
    pub fn recording_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.recording_dir = dir.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ReceiverConfig {
        self.config
    }
}
