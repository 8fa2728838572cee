use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Half-open time interval `[start, end)`.
///
/// Excluding the end instant is what lets two back-to-back appointments share
/// a boundary without counting as an overlap. Well-formedness (`start < end`)
/// is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True iff the two intervals share at least one instant.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff `inner` lies entirely within `self`, boundaries included.
    pub fn contains(&self, inner: &TimeRange) -> bool {
        self.start <= inner.start && inner.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 5, 20, hour, min, 0).unwrap()
    }

    #[test]
    fn test_overlapping_ranges() {
        let a = TimeRange::new(at(10, 0), at(11, 0));
        let b = TimeRange::new(at(10, 30), at(11, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        let a = TimeRange::new(at(10, 0), at(10, 30));
        let b = TimeRange::new(at(10, 30), at(11, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_one_minute_overlap() {
        let a = TimeRange::new(at(10, 0), at(10, 30));
        let b = TimeRange::new(at(10, 29), at(10, 59));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_contained_range() {
        let outer = TimeRange::new(at(9, 0), at(17, 0));
        let inner = TimeRange::new(at(9, 0), at(9, 30));
        assert!(outer.contains(&inner));
    }

    #[test]
    fn test_contains_accepts_exact_bounds() {
        let outer = TimeRange::new(at(9, 0), at(17, 0));
        assert!(outer.contains(&outer));
        assert!(outer.contains(&TimeRange::new(at(16, 30), at(17, 0))));
    }

    #[test]
    fn test_contains_rejects_spill_past_end() {
        let outer = TimeRange::new(at(9, 0), at(17, 0));
        let inner = TimeRange::new(at(16, 31), at(17, 1));
        assert!(!outer.contains(&inner));
    }

    #[test]
    fn test_contains_rejects_early_start() {
        let outer = TimeRange::new(at(9, 0), at(17, 0));
        let inner = TimeRange::new(at(8, 30), at(9, 0));
        assert!(!outer.contains(&inner));
    }
}
