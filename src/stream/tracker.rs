//! Packet sequence tracking.
//!
//! Each accepted frame advances a cursor holding the last accepted
//! sequence number. Two independent rules run over that cursor, in order:
//!
//! 1. **Time travel**: a sequence number below the cursor means the
//!    console restarted or a replay began. The cursor is rewound to
//!    `seq - 1` so the frame is evaluated as the next in-order one.
//! 2. **Advance**: the frame is accepted if ignore-sequence is set or it
//!    is strictly newer than the cursor. A jump larger than one is
//!    reported as a loss of `seq - cursor - 1` packets.
//!
//! Arithmetic is done in `i64`, so an apparent `i32` wraparound is just
//! another time travel.

/// How an accepted frame relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// First frame since the tracker was created.
    Primed,
    /// Exactly `cursor + 1`.
    InOrder,
    /// Packets were skipped; holds the number lost.
    Gap(u64),
    /// Not newer than the cursor; only accepted with ignore-sequence on.
    Repeat,
}

/// Result of observing one sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Cursor before the time-travel rewind, if one happened.
    pub time_travel: Option<i64>,
    /// `Some` if the frame should be dispatched.
    pub accepted: Option<Continuity>,
}

impl Verdict {
    /// Check if the frame should be dispatched.
    pub fn dispatch(&self) -> bool {
        self.accepted.is_some()
    }

    /// Number of packets reported lost by this frame.
    pub fn lost(&self) -> u64 {
        match self.accepted {
            Some(Continuity::Gap(n)) => n,
            _ => 0,
        }
    }
}

/// Stream cursor with the ignore-sequence switch.
///
/// Owned and mutated only by the receive loop.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    /// Last accepted sequence number.
    cursor: Option<i64>,
    /// Dispatch regardless of ordering.
    ignore_sequence: bool,
}

impl SequenceTracker {
    /// Create a tracker with no cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker whose last accepted sequence number is `seq`.
    pub fn with_cursor(seq: i32) -> Self {
        Self {
            cursor: Some(i64::from(seq)),
            ignore_sequence: false,
        }
    }

    /// Last accepted sequence number.
    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    /// Whether ordering is currently ignored for dispatch.
    pub fn ignore_sequence(&self) -> bool {
        self.ignore_sequence
    }

    /// Toggle ignore-sequence. Cursor bookkeeping is unaffected.
    pub fn set_ignore_sequence(&mut self, ignore: bool) {
        self.ignore_sequence = ignore;
    }

    /// Classify a frame's sequence number and update the cursor.
    pub fn observe(&mut self, seq: i32) -> Verdict {
        let seq = i64::from(seq);
        let time_travel = self.rewind(seq);
        let accepted = self.advance(seq);
        Verdict {
            time_travel,
            accepted,
        }
    }

    /// Rule 1. Returns the cursor that was abandoned.
    fn rewind(&mut self, seq: i64) -> Option<i64> {
        match self.cursor {
            Some(cursor) if seq < cursor => {
                self.cursor = Some(seq - 1);
                Some(cursor)
            }
            _ => None,
        }
    }

    /// Rule 2.
    fn advance(&mut self, seq: i64) -> Option<Continuity> {
        let continuity = match self.cursor {
            None => Continuity::Primed,
            Some(cursor) if !self.ignore_sequence && seq <= cursor => return None,
            Some(cursor) => match seq - cursor - 1 {
                0 => Continuity::InOrder,
                gap if gap > 0 => Continuity::Gap(gap as u64),
                _ => Continuity::Repeat,
            },
        };
        self.cursor = Some(seq);
        Some(continuity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_primes() {
        let mut tracker = SequenceTracker::new();
        let verdict = tracker.observe(5000);
        assert_eq!(verdict.accepted, Some(Continuity::Primed));
        assert_eq!(verdict.lost(), 0);
        assert_eq!(tracker.cursor(), Some(5000));
    }

    #[test]
    fn test_consecutive_frames_never_report_loss() {
        let mut tracker = SequenceTracker::new();
        for seq in 1..=500 {
            let verdict = tracker.observe(seq);
            assert!(verdict.dispatch());
            assert_eq!(verdict.lost(), 0);
            assert_eq!(verdict.time_travel, None);
        }
        assert_eq!(tracker.cursor(), Some(500));
    }

    #[test]
    fn test_gap_reports_loss_and_dispatches() {
        for k in [1, 2, 17, 1000] {
            let mut tracker = SequenceTracker::with_cursor(100);
            let verdict = tracker.observe(100 + 1 + k);
            assert_eq!(verdict.accepted, Some(Continuity::Gap(k as u64)));
            assert_eq!(verdict.lost(), k as u64);
            assert_eq!(tracker.cursor(), Some(i64::from(101 + k)));
        }
    }

    #[test]
    fn test_time_travel_rewinds_cursor() {
        let mut tracker = SequenceTracker::with_cursor(900);

        let verdict = tracker.observe(10);
        assert_eq!(verdict.time_travel, Some(900));
        // After the rewind the frame is exactly next in line.
        assert_eq!(verdict.accepted, Some(Continuity::InOrder));
        assert_eq!(tracker.cursor(), Some(10));

        let next = tracker.observe(11);
        assert_eq!(next.time_travel, None);
        assert_eq!(next.accepted, Some(Continuity::InOrder));
    }

    #[test]
    fn test_duplicate_is_dropped() {
        let mut tracker = SequenceTracker::with_cursor(42);
        let verdict = tracker.observe(42);
        assert!(!verdict.dispatch());
        assert_eq!(verdict.time_travel, None);
        assert_eq!(tracker.cursor(), Some(42));
    }

    #[test]
    fn test_ignore_sequence_dispatches_everything() {
        let mut tracker = SequenceTracker::with_cursor(42);
        tracker.set_ignore_sequence(true);

        let dup = tracker.observe(42);
        assert_eq!(dup.accepted, Some(Continuity::Repeat));
        assert_eq!(dup.lost(), 0);

        // Bookkeeping still runs: a step back is still a time travel.
        let back = tracker.observe(7);
        assert_eq!(back.time_travel, Some(42));
        assert!(back.dispatch());
        assert_eq!(tracker.cursor(), Some(7));

        let jump = tracker.observe(10);
        assert_eq!(jump.accepted, Some(Continuity::Gap(2)));
    }

    #[test]
    fn test_ignore_sequence_matches_cursor_bookkeeping() {
        let ids = [3, 4, 9, 2, 2, 5, 6, 100];
        let mut strict = SequenceTracker::with_cursor(0);
        let mut lenient = SequenceTracker::with_cursor(0);
        lenient.set_ignore_sequence(true);

        for id in ids {
            let s = strict.observe(id);
            let l = lenient.observe(id);
            assert_eq!(s.time_travel, l.time_travel);
            assert!(l.dispatch());
        }
        assert_eq!(strict.cursor(), lenient.cursor());
    }

    #[test]
    fn test_wraparound_is_time_travel() {
        let mut tracker = SequenceTracker::with_cursor(i32::MAX);
        let verdict = tracker.observe(i32::MIN);
        assert_eq!(verdict.time_travel, Some(i64::from(i32::MAX)));
        assert!(verdict.dispatch());
        assert_eq!(tracker.cursor(), Some(i64::from(i32::MIN)));
    }

    #[test]
    fn test_extreme_gap_does_not_overflow() {
        let mut tracker = SequenceTracker::with_cursor(i32::MIN);
        let verdict = tracker.observe(i32::MAX);
        assert_eq!(verdict.lost(), u32::MAX as u64 - 1);
    }
}
