//! Stream layer: frames, sequence tracking, recording, counters.
//!
//! Everything here is synchronous and owned by the receive loop.

mod frame;
mod recorder;
mod stats;
mod tracker;

pub use frame::Frame;
pub use recorder::{RecordingSink, RecordingSummary, file_stem};
pub use stats::StreamStats;
pub use tracker::{Continuity, SequenceTracker, Verdict};
