//! 16-bit sequence number tracking

/// How a record's sequence number relates to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    First,
    InOrder,
    Duplicate,
    /// `missing` records were skipped between the previous and this one
    Gap { missing: u16 },
    /// Sequence went backwards
    Reordered,
}

/// Tracks the last sequence number seen, wrapping at 2^16.
#[derive(Debug, Default, Clone)]
pub struct SequenceTracker {
    last: Option<u16>,
    gaps: u64,
    missing: u64,
    reordered: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sequence: u16) -> SequenceEvent {
        let Some(last) = self.last else {
            self.last = Some(sequence);
            return SequenceEvent::First;
        };

        let delta = sequence.wrapping_sub(last);
        let event = match delta {
            0 => SequenceEvent::Duplicate,
            1 => SequenceEvent::InOrder,
            d if d < 0x8000 => {
                self.gaps += 1;
                self.missing += (d - 1) as u64;
                SequenceEvent::Gap { missing: d - 1 }
            }
            _ => {
                self.reordered += 1;
                SequenceEvent::Reordered
            }
        };

        // Late packets don't move the high-water mark
        if !matches!(event, SequenceEvent::Reordered | SequenceEvent::Duplicate) {
            self.last = Some(sequence);
        }
        event
    }

    /// Number of discontinuities seen
    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    /// Total number of records skipped across all gaps
    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn reordered(&self) -> u64 {
        self.reordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_order_stream() {
        let mut t = SequenceTracker::new();
        assert_eq!(t.observe(10), SequenceEvent::First);
        assert_eq!(t.observe(11), SequenceEvent::InOrder);
        assert_eq!(t.observe(12), SequenceEvent::InOrder);
        assert_eq!(t.gaps(), 0);
    }

    #[test]
    fn test_wraparound_is_in_order() {
        let mut t = SequenceTracker::new();
        t.observe(u16::MAX);
        assert_eq!(t.observe(0), SequenceEvent::InOrder);
    }

    #[test]
    fn test_gap_counts_missing() {
        let mut t = SequenceTracker::new();
        t.observe(100);
        assert_eq!(t.observe(104), SequenceEvent::Gap { missing: 3 });
        assert_eq!(t.observe(106), SequenceEvent::Gap { missing: 1 });
        assert_eq!(t.gaps(), 2);
        assert_eq!(t.missing(), 4);
    }

    #[test]
    fn test_reordered_and_duplicate() {
        let mut t = SequenceTracker::new();
        t.observe(50);
        assert_eq!(t.observe(50), SequenceEvent::Duplicate);
        assert_eq!(t.observe(49), SequenceEvent::Reordered);
        assert_eq!(t.observe(51), SequenceEvent::InOrder);
        assert_eq!(t.reordered(), 1);
    }
}
