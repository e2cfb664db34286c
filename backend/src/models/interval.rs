//! Half-open time windows used for conflict detection.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A time window `[start, end)`.
///
/// The end instant is excluded, so two appointments where one ends exactly
/// when the other starts do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeInterval {
    /// Create an interval from explicit bounds. Returns `None` unless `start < end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Create the interval `[start, start + minutes)`.
    ///
    /// The end saturates at `NaiveDateTime::MAX`. A non-positive duration
    /// yields an empty interval starting and ending at `start`; callers are
    /// expected to reject such durations before asking about overlaps.
    pub fn from_minutes(start: NaiveDateTime, minutes: i32) -> Self {
        let minutes = i64::from(minutes.max(0));
        let end = start
            .checked_add_signed(Duration::minutes(minutes))
            .unwrap_or(NaiveDateTime::MAX);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Strict half-open overlap test.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        overlaps(self, other)
    }
}

/// `a.start < b.end && b.start < a.end`.
pub fn overlaps(a: &TimeInterval, b: &TimeInterval) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 3, 4)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_back_to_back_intervals_do_not_overlap() {
        let a = TimeInterval::from_minutes(at(9, 0), 30);
        let b = TimeInterval::from_minutes(at(9, 30), 30);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_partial_overlap() {
        let a = TimeInterval::from_minutes(at(9, 0), 30);
        let b = TimeInterval::from_minutes(at(9, 15), 30);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_containment_overlaps() {
        let outer = TimeInterval::from_minutes(at(9, 0), 120);
        let inner = TimeInterval::from_minutes(at(9, 30), 15);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_interval_overlaps_itself() {
        let a = TimeInterval::from_minutes(at(10, 0), 45);
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        assert!(TimeInterval::new(at(10, 0), at(9, 0)).is_none());
        assert!(TimeInterval::new(at(10, 0), at(10, 0)).is_none());
        assert!(TimeInterval::new(at(9, 0), at(10, 0)).is_some());
    }

    #[test]
    fn test_from_minutes_end_and_duration() {
        let a = TimeInterval::from_minutes(at(9, 0), 90);
        assert_eq!(a.end(), at(10, 30));
        assert_eq!(a.duration(), Duration::minutes(90));
        assert!(TimeInterval::from_minutes(at(9, 0), 0).is_empty());
        assert!(TimeInterval::from_minutes(at(9, 0), -5).is_empty());
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            a_start in 0i64..10_000,
            a_len in 1i32..600,
            b_start in 0i64..10_000,
            b_len in 1i32..600,
        ) {
            let base = at(0, 0);
            let a = TimeInterval::from_minutes(base + Duration::minutes(a_start), a_len);
            let b = TimeInterval::from_minutes(base + Duration::minutes(b_start), b_len);
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }

        #[test]
        fn prop_adjacent_never_overlap(start in 0i64..10_000, len_a in 1i32..600, len_b in 1i32..600) {
            let base = at(0, 0) + Duration::minutes(start);
            let a = TimeInterval::from_minutes(base, len_a);
            let b = TimeInterval::from_minutes(a.end(), len_b);
            prop_assert!(!a.overlaps(&b));
        }
    }
}
