//! Reconnection state machine.
//!
//! ```text
//!             timeout / recv error / send error / bind error
//!   Connected ─────────────────────────────────────────────▶ Recovering
//!       ▲                                                        │
//!       │  probe heartbeat ok            (backoff unchanged)     │
//!       ├────────────────────────────────────────────────────────┤
//!       │  rebind ok + heartbeat ok      (backoff reset)         │
//!       └────────────────────────────────────────────────────────┘
//!                         otherwise: stay Recovering, wait backoff, double it
//! ```
//!
//! At most one heartbeat is sent per socket per recovery attempt: one
//! probe on the existing socket, and one on the fresh socket after a
//! successful rebind.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::socket::TelemetrySocket;
use super::timing::Backoff;
use crate::core::TransportError;

/// Link lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Exchanging datagrams normally.
    Connected,
    /// A fault was seen; the next iteration runs a recovery attempt.
    Recovering,
}

/// Result of one recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The probe heartbeat went out on the existing socket.
    Resumed,
    /// A fresh socket was bound and accepted a heartbeat.
    Rebound(SocketAddr),
    /// The cycle failed; wait this long before the next attempt.
    Failed {
        /// Backoff delay charged to this failure.
        retry_in: Duration,
    },
}

/// What the state machine needs from the socket.
pub trait Link {
    /// Send one heartbeat.
    fn send_heartbeat(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close and re-bind the socket.
    fn rebind(&mut self) -> impl Future<Output = Result<SocketAddr, TransportError>> + Send;
}

impl Link for TelemetrySocket {
    async fn send_heartbeat(&mut self) -> Result<(), TransportError> {
        TelemetrySocket::send_heartbeat(self).await
    }

    async fn rebind(&mut self) -> Result<SocketAddr, TransportError> {
        self.bind().await
    }
}

/// Reconnection state machine with its backoff.
///
/// Owned and driven only by the receive loop.
#[derive(Debug, Clone)]
pub struct Reconnector {
    state: LinkState,
    backoff: Backoff,
}

impl Default for Reconnector {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

impl Reconnector {
    /// Create a connected state machine.
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: LinkState::Connected,
            backoff,
        }
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Backoff state.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Check if a recovery attempt is pending.
    pub fn is_recovering(&self) -> bool {
        self.state == LinkState::Recovering
    }

    /// Record a transport fault and move to `Recovering`.
    pub fn on_fault(&mut self, error: &TransportError) {
        match error {
            TransportError::Timeout(after) => {
                info!(?after, "telemetry timed out, attempting to reconnect")
            }
            other => warn!(error = %other, "transport fault, attempting to reconnect"),
        }
        self.state = LinkState::Recovering;
    }

    /// Record a successful exchange. Resets backoff while connected.
    pub fn on_exchange(&mut self) {
        if self.state == LinkState::Connected {
            self.backoff.reset();
        }
    }

    /// Run one recovery attempt.
    ///
    /// Never fails: every transport error becomes an outcome. On
    /// [`RecoveryOutcome::Failed`] the caller waits `retry_in` before the
    /// next attempt.
    pub async fn recover<L: Link>(&mut self, link: &mut L) -> RecoveryOutcome {
        match link.send_heartbeat().await {
            Ok(()) => {
                debug!("probe heartbeat sent, resuming");
                self.state = LinkState::Connected;
                return RecoveryOutcome::Resumed;
            }
            Err(e) => warn!(error = %e, "probe heartbeat failed, rebinding"),
        }

        match link.rebind().await {
            Ok(addr) => match link.send_heartbeat().await {
                Ok(()) => {
                    info!(%addr, "reconnected");
                    self.backoff.reset();
                    self.state = LinkState::Connected;
                    return RecoveryOutcome::Rebound(addr);
                }
                Err(e) => warn!(%addr, error = %e, "heartbeat failed on fresh socket"),
            },
            Err(e) => warn!(error = %e, "rebind failed"),
        }

        let retry_in = self.backoff.next_delay();
        warn!(?retry_in, "reconnect failed, backing off");
        RecoveryOutcome::Failed { retry_in }
    }
}
