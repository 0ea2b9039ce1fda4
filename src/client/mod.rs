//! Telemetry receiver client.
//!
//! The receive loop, its controller handle, configuration, and frame
//! delivery.

mod command;
mod config;
mod dispatch;
mod receiver;

pub use command::*;
pub use config::*;
pub use dispatch::*;
pub use receiver::*;
