use serde::{Deserialize, Serialize};
use sqlx::types::{Json, Uuid};
use time::OffsetDateTime;
use validator::Validate;

use super::recurrence::RecurrenceRule;
use super::time_range::TimeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Available,
    Unavailable,
    Busy,
}

impl BlockType {
    pub fn is_available(self) -> bool {
        matches!(self, BlockType::Available)
    }
}

/// A provider-declared interval of availability status.
///
/// Invariant: per provider, no two `available`-type blocks overlap under the
/// half-open predicate (touching endpoints are fine). Recurring blocks carry
/// their rule as metadata; conflict checks work on materialized occurrences.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AvailabilityBlock {
    pub id: Uuid,
    pub provider_user_id: Uuid,
    pub title: Option<String>,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub is_recurring: bool,
    pub recurrence: Option<Json<RecurrenceRule>>,
    pub is_available: bool,
    pub block_type: BlockType,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl AvailabilityBlock {
    pub fn interval(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Concrete intervals this block occupies within `window`, ascending.
    /// A single block yields its own interval (when it overlaps); a
    /// recurring one yields its materialized occurrences.
    pub fn occurrences_within(&self, window: &TimeRange) -> Vec<TimeRange> {
        match &self.recurrence {
            Some(rule) if self.is_recurring => rule.occurrences_between(&self.interval(), window),
            _ => {
                let interval = self.interval();
                if interval.overlaps(window) {
                    vec![interval]
                } else {
                    Vec::new()
                }
            }
        }
    }

    pub fn intersects(&self, window: &TimeRange) -> bool {
        !self.occurrences_within(window).is_empty()
    }

    pub fn intersects_any(&self, windows: &[TimeRange]) -> bool {
        windows.iter().any(|window| self.intersects(window))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAvailabilityBlock {
    pub provider_user_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    pub block_type: BlockType,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAvailabilityBlock {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
    pub block_type: Option<BlockType>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}
