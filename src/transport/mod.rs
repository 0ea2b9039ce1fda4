//! Transport layer.
//!
//! Socket lifecycle, heartbeat keep-alive, and reconnection:
//!
//! - **Socket endpoint**: [`TelemetrySocket`] binds with local-port
//!   fallback, sends heartbeats, receives under a timeout
//! - **Heartbeat scheduling**: [`HeartbeatScheduler`]
//! - **Backoff**: [`Backoff`], 1s doubling to 30s
//! - **Reconnection**: [`Reconnector`], an explicit `Connected` /
//!   `Recovering` state machine over any [`Link`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Receive loop                 │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   socket, heartbeat, backoff, recovery  │
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```

mod connection;
mod socket;
mod timing;

pub use connection::*;
pub use socket::*;
pub use timing::{Backoff, HeartbeatScheduler};
