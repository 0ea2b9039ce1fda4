//! Error types for the telemetry receiver.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors at the socket layer.
///
/// These are the only errors that feed the reconnection state machine.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Every candidate local port was in use or refused.
    #[error("bind exhausted after {attempts} attempts starting at port {first_port}: {source}")]
    BindExhausted {
        /// First port tried.
        first_port: u16,
        /// Number of ports tried.
        attempts: u16,
        /// Error from the last attempt.
        #[source]
        source: io::Error,
    },

    /// Heartbeat could not be sent.
    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    /// Receive failed for a reason other than the timeout.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// Nothing arrived within the receive timeout.
    #[error("no datagram within {0:?}")]
    Timeout(Duration),

    /// Socket has not been bound yet (or was lost).
    #[error("socket not bound")]
    NotBound,
}

impl TransportError {
    /// Check if this is the expected periodic timeout rather than a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Errors turning a datagram into a frame.
///
/// Always soft: the datagram is skipped and the loop continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Decrypted bytes did not carry the frame magic.
    #[error("decryption failed (bad magic)")]
    DecryptionFailed,

    /// Datagram too short to be a frame.
    #[error("malformed datagram ({len} bytes)")]
    Malformed {
        /// Length of the offending datagram.
        len: usize,
    },
}

/// Errors in the recording sink.
#[derive(Debug, Error)]
pub enum RecordError {
    /// File could not be created or written.
    #[error("recording i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Top-level receiver errors.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Recording error.
    #[error("recording error: {0}")]
    Record(#[from] RecordError),

    /// The receive loop has exited; commands can no longer be delivered.
    #[error("receiver stopped")]
    Stopped,
}
