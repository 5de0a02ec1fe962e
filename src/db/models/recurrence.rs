use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, Weekday};

use super::time_range::TimeRange;

/// Upper bound on occurrences produced by a single materialization, so an
/// open-ended rule can never make conflict checks unbounded.
pub const MAX_MATERIALIZED_OCCURRENCES: usize = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceWeekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl RecurrenceWeekday {
    fn days_from_monday(self) -> i64 {
        match self {
            RecurrenceWeekday::Monday => 0,
            RecurrenceWeekday::Tuesday => 1,
            RecurrenceWeekday::Wednesday => 2,
            RecurrenceWeekday::Thursday => 3,
            RecurrenceWeekday::Friday => 4,
            RecurrenceWeekday::Saturday => 5,
            RecurrenceWeekday::Sunday => 6,
        }
    }
}

/// Recurrence metadata attached to an availability block.
///
/// The rule is stored as-is; concrete intervals are materialized lazily per
/// query via [`RecurrenceRule::occurrences_between`], so overlap detection
/// only ever reasons about simple [`TimeRange`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    /// Every `interval` days/weeks; values below 1 are treated as 1.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Weekly rules only: which weekdays carry an occurrence. Empty or
    /// absent means "same weekday as the base occurrence".
    #[serde(default)]
    pub by_weekday: Option<Vec<RecurrenceWeekday>>,
    /// Last admissible occurrence start.
    pub until: Option<OffsetDateTime>,
    /// Total number of occurrences in the series, counted from the base.
    pub count: Option<u32>,
}

fn default_interval() -> u32 {
    1
}

impl RecurrenceRule {
    /// Materializes the occurrences of the series defined by `base` that
    /// overlap `window`, in ascending order.
    ///
    /// The base interval supplies the time-of-day and duration of every
    /// occurrence. Weekly rules with a weekday set anchor on the Monday of
    /// the base occurrence's week; occurrences before the base are skipped.
    pub fn occurrences_between(&self, base: &TimeRange, window: &TimeRange) -> Vec<TimeRange> {
        let interval = self.interval.max(1) as i64;
        match self.frequency {
            RecurrenceFrequency::Daily => {
                self.stride_occurrences(base, window, Duration::days(interval))
            }
            RecurrenceFrequency::Weekly => match self.by_weekday.as_deref() {
                Some(days) if !days.is_empty() => {
                    self.weekday_occurrences(base, window, interval, days)
                }
                _ => self.stride_occurrences(base, window, Duration::weeks(interval)),
            },
        }
    }

    fn stride_occurrences(
        &self,
        base: &TimeRange,
        window: &TimeRange,
        stride: Duration,
    ) -> Vec<TimeRange> {
        let duration = base.duration();
        let mut out = Vec::new();
        for k in 0..MAX_MATERIALIZED_OCCURRENCES {
            if let Some(count) = self.count {
                if k as u32 >= count {
                    break;
                }
            }
            let start = base.start + stride * (k as i32);
            if self.past_until(start) || start >= window.end {
                break;
            }
            let occurrence = TimeRange {
                start,
                end: start + duration,
            };
            if occurrence.overlaps(window) {
                out.push(occurrence);
            }
        }
        out
    }

    fn weekday_occurrences(
        &self,
        base: &TimeRange,
        window: &TimeRange,
        interval: i64,
        days: &[RecurrenceWeekday],
    ) -> Vec<TimeRange> {
        let duration = base.duration();
        let mut days: Vec<RecurrenceWeekday> = days.to_vec();
        days.sort();
        days.dedup();

        // Monday 00:00-equivalent anchor: same time-of-day as the base,
        // shifted back to the Monday of its week.
        let anchor = base.start - Duration::days(days_from_monday(base.start) as i64);

        let mut out = Vec::new();
        let mut produced: u32 = 0;
        'weeks: for week in 0..MAX_MATERIALIZED_OCCURRENCES {
            let week_start = anchor + Duration::weeks((week as i64) * interval);
            if self.past_until(week_start) || week_start >= window.end {
                break;
            }
            for day in &days {
                let start = week_start + Duration::days(day.days_from_monday());
                if start < base.start {
                    continue;
                }
                if let Some(count) = self.count {
                    if produced >= count {
                        break 'weeks;
                    }
                }
                if self.past_until(start) {
                    break 'weeks;
                }
                produced += 1;
                if start >= window.end {
                    continue;
                }
                let occurrence = TimeRange {
                    start,
                    end: start + duration,
                };
                if occurrence.overlaps(window) {
                    out.push(occurrence);
                }
            }
        }
        out
    }

    fn past_until(&self, start: OffsetDateTime) -> bool {
        self.until.is_some_and(|until| start > until)
    }
}

fn days_from_monday(at: OffsetDateTime) -> u8 {
    match at.weekday() {
        Weekday::Monday => 0,
        Weekday::Tuesday => 1,
        Weekday::Wednesday => 2,
        Weekday::Thursday => 3,
        Weekday::Friday => 4,
        Weekday::Saturday => 5,
        Weekday::Sunday => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    // 2025-03-03 is a Monday.
    fn base() -> TimeRange {
        TimeRange {
            start: datetime!(2025-03-03 9:00 UTC),
            end: datetime!(2025-03-03 10:00 UTC),
        }
    }

    fn window(days: i64) -> TimeRange {
        TimeRange {
            start: datetime!(2025-03-03 0:00 UTC),
            end: datetime!(2025-03-03 0:00 UTC) + Duration::days(days),
        }
    }

    #[test]
    fn daily_rule_materializes_each_day_in_window() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Daily,
            interval: 1,
            by_weekday: None,
            until: None,
            count: None,
        };
        let occurrences = rule.occurrences_between(&base(), &window(4));
        assert_eq!(occurrences.len(), 4);
        assert_eq!(occurrences[0].start, datetime!(2025-03-03 9:00 UTC));
        assert_eq!(occurrences[3].start, datetime!(2025-03-06 9:00 UTC));
    }

    #[test]
    fn interval_skips_days() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Daily,
            interval: 2,
            by_weekday: None,
            until: None,
            count: None,
        };
        let occurrences = rule.occurrences_between(&base(), &window(5));
        let starts: Vec<_> = occurrences.iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![
                datetime!(2025-03-03 9:00 UTC),
                datetime!(2025-03-05 9:00 UTC),
                datetime!(2025-03-07 9:00 UTC),
            ]
        );
    }

    #[test]
    fn count_bounds_the_series() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Daily,
            interval: 1,
            by_weekday: None,
            until: None,
            count: Some(2),
        };
        assert_eq!(rule.occurrences_between(&base(), &window(30)).len(), 2);
    }

    #[test]
    fn until_bounds_the_series() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Daily,
            interval: 1,
            by_weekday: None,
            until: Some(datetime!(2025-03-05 9:00 UTC)),
            count: None,
        };
        // Base day plus two more; the until bound is inclusive.
        assert_eq!(rule.occurrences_between(&base(), &window(30)).len(), 3);
    }

    #[test]
    fn weekly_weekday_set_hits_selected_days_only() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Weekly,
            interval: 1,
            by_weekday: Some(vec![
                RecurrenceWeekday::Monday,
                RecurrenceWeekday::Wednesday,
            ]),
            until: None,
            count: None,
        };
        let occurrences = rule.occurrences_between(&base(), &window(14));
        let starts: Vec<_> = occurrences.iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![
                datetime!(2025-03-03 9:00 UTC),
                datetime!(2025-03-05 9:00 UTC),
                datetime!(2025-03-10 9:00 UTC),
                datetime!(2025-03-12 9:00 UTC),
            ]
        );
    }

    #[test]
    fn weekday_occurrences_before_the_base_are_skipped() {
        // Base starts on a Wednesday; the Monday of that week is not part
        // of the series even though the set includes it.
        let base = TimeRange {
            start: datetime!(2025-03-05 9:00 UTC),
            end: datetime!(2025-03-05 10:00 UTC),
        };
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Weekly,
            interval: 1,
            by_weekday: Some(vec![
                RecurrenceWeekday::Monday,
                RecurrenceWeekday::Wednesday,
            ]),
            until: None,
            count: None,
        };
        let occurrences = rule.occurrences_between(&base, &window(8));
        assert_eq!(occurrences[0].start, datetime!(2025-03-05 9:00 UTC));
        assert_eq!(occurrences[1].start, datetime!(2025-03-10 9:00 UTC));
    }

    #[test]
    fn occurrence_touching_window_start_still_counts_as_overlap() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Daily,
            interval: 1,
            by_weekday: None,
            until: None,
            count: None,
        };
        // Window begins mid-occurrence.
        let w = TimeRange {
            start: datetime!(2025-03-04 9:30 UTC),
            end: datetime!(2025-03-04 11:00 UTC),
        };
        let occurrences = rule.occurrences_between(&base(), &w);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].start, datetime!(2025-03-04 9:00 UTC));
    }

    #[test]
    fn open_ended_rule_is_capped() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Daily,
            interval: 1,
            by_weekday: None,
            until: None,
            count: None,
        };
        let occurrences = rule.occurrences_between(&base(), &window(100_000));
        assert_eq!(occurrences.len(), MAX_MATERIALIZED_OCCURRENCES);
    }
}
