//! Stream counters.

/// Counters published by the receive loop.
///
/// A plain snapshot; reading it never touches loop-owned state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Datagrams received from the console.
    pub datagrams: u64,
    /// Datagrams from any other source, ignored.
    pub foreign_datagrams: u64,
    /// Datagrams that failed decryption or were too short.
    pub decrypt_failures: u64,
    /// Frames the sequence tracker rejected as stale.
    pub stale_frames: u64,
    /// Frames delivered to the consumer channel.
    pub frames_dispatched: u64,
    /// Accepted frames dropped (no consumer or channel full).
    pub frames_dropped: u64,
    /// Loss events.
    pub loss_events: u64,
    /// Sum of all reported gaps.
    pub packets_lost: u64,
    /// Time-travel events.
    pub time_travels: u64,
    /// Receive timeouts.
    pub timeouts: u64,
    /// Recovery attempts.
    pub recoveries: u64,
    /// Successful rebinds.
    pub rebinds: u64,
    /// Bytes written to recordings.
    pub bytes_recorded: u64,
}

impl StreamStats {
    /// Fraction of expected packets that were lost.
    pub fn loss_ratio(&self) -> f64 {
        let expected = self.frames_dispatched + self.frames_dropped + self.packets_lost;
        if expected == 0 {
            0.0
        } else {
            self.packets_lost as f64 / expected as f64
        }
    }
}
