//! # gt7-telemetry
//!
//! Resilient receiver for the Gran Turismo 7 UDP telemetry stream.
//!
//! The console streams encrypted telemetry packets at ~60 Hz to whoever
//! sent it a heartbeat within the last few seconds. This crate keeps that
//! stream alive and turns it into an ordered sequence of decrypted frames:
//!
//! - **Keep-alive**: periodic single-byte heartbeats to the console
//! - **Decryption**: pluggable [`Decryptor`], with the built-in Salsa20
//!   [`Gt7Decryptor`](crypto::Gt7Decryptor)
//! - **Ordering**: sequence tracking with loss and time-travel detection
//! - **Resilience**: probe heartbeat, socket rebind with port fallback,
//!   and exponential backoff
//! - **Recording**: raw datagram capture to timestamped files
//!
//! ## Feature Flags
//!
//! - `transport` (default): socket endpoint, heartbeat, backoff, reconnection
//! - `crypto` (default): built-in Salsa20 decryptor
//! - `client` (default): receive loop, control handle, frame dispatch
//!
//! ## Modules
//!
//! - [`core`]: traits, constants, and error types (always included)
//! - [`stream`]: frames, sequence tracking, recording, counters (always included)
//! - [`transport`]: transport layer (requires `transport` feature)
//! - [`crypto`]: decryption (requires `crypto` feature)
//! - [`client`]: the receiver (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use gt7_telemetry::prelude::*;
//!
//! let mut tracker = SequenceTracker::new();
//! assert_eq!(tracker.observe(100).accepted, Some(Continuity::Primed));
//! assert_eq!(tracker.observe(103).lost(), 2);
//!
//! // The console restarted.
//! let verdict = tracker.observe(5);
//! assert_eq!(verdict.time_travel, Some(103));
//! assert!(verdict.dispatch());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Stream state (always included)
pub mod stream;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Receiver API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    pub use crate::stream::{
        Continuity, Frame, RecordingSink, RecordingSummary, SequenceTracker, StreamStats, Verdict,
    };

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        Backoff, EndpointConfig, HeartbeatScheduler, LinkState, Reconnector, RecoveryOutcome,
        TelemetrySocket,
    };

    #[cfg(feature = "crypto")]
    pub use crate::crypto::*;

    #[cfg(feature = "client")]
    pub use crate::client::{
        FrameReceiver, ReceiverConfig, ReceiverConfigBuilder, ReceiverHandle, TelemetryReceiver,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{CryptoError, Decryptor, ReceiverError, RecordError, TransportError};
pub use stream::{Frame, StreamStats};

#[cfg(feature = "crypto")]
pub use crypto::Gt7Decryptor;

#[cfg(feature = "client")]
pub use client::{ReceiverConfig, ReceiverHandle, TelemetryReceiver};
