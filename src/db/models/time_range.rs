use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// A half-open interval `[start, end)` of wall-clock time.
///
/// Every temporal predicate in the scheduling core goes through this type so
/// the boundary semantics live in exactly one place: two ranges that merely
/// touch (`a.end == b.start`) do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeRange {
    /// Returns `None` when `end <= start`.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Option<Self> {
        if end <= start {
            None
        } else {
            Some(Self { start, end })
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap: `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// `other` lies fully inside this range (endpoints inclusive).
    pub fn contains(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn range(start_hour: u8, end_hour: u8) -> TimeRange {
        TimeRange {
            start: datetime!(2025-03-03 0:00 UTC) + Duration::hours(start_hour as i64),
            end: datetime!(2025-03-03 0:00 UTC) + Duration::hours(end_hour as i64),
        }
    }

    #[test]
    fn rejects_empty_and_inverted_intervals() {
        let at = datetime!(2025-03-03 9:00 UTC);
        assert!(TimeRange::new(at, at).is_none());
        assert!(TimeRange::new(at, at - Duration::hours(1)).is_none());
        assert!(TimeRange::new(at, at + Duration::minutes(1)).is_some());
    }

    #[test]
    fn nested_and_partial_intervals_overlap() {
        assert!(range(9, 17).overlaps(&range(12, 13)));
        assert!(range(12, 13).overlaps(&range(9, 17)));
        assert!(range(9, 12).overlaps(&range(11, 14)));
    }

    #[test]
    fn touching_endpoints_do_not_overlap() {
        assert!(!range(9, 12).overlaps(&range(12, 15)));
        assert!(!range(12, 15).overlaps(&range(9, 12)));
        assert!(!range(9, 10).overlaps(&range(11, 12)));
    }

    #[test]
    fn containment_is_inclusive_of_endpoints() {
        assert!(range(9, 17).contains(&range(9, 17)));
        assert!(range(9, 17).contains(&range(10, 11)));
        assert!(!range(9, 17).contains(&range(8, 10)));
        assert!(!range(9, 17).contains(&range(16, 18)));
    }
}
