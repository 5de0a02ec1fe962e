use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use super::time_range::TimeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
}

/// A confirmed booking of provider time against one job.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ScheduleReservation {
    pub id: Uuid,
    pub provider_user_id: Uuid,
    pub job_id: Uuid,
    pub application_id: Option<Uuid>,
    pub scheduled_start_time: OffsetDateTime,
    pub scheduled_end_time: OffsetDateTime,
    pub actual_start_time: Option<OffsetDateTime>,
    pub actual_end_time: Option<OffsetDateTime>,
    pub status: ReservationStatus,
    /// Busy block created alongside the reservation, when the slot did not
    /// intersect any declared availability.
    pub availability_block_id: Option<Uuid>,
    pub time_entry_id: Option<Uuid>,
    pub location: Option<String>,
    pub reminder_sent: bool,
    pub reminder_sent_at: Option<OffsetDateTime>,
    pub lateness_alert_sent: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ScheduleReservation {
    pub fn interval(&self) -> TimeRange {
        TimeRange {
            start: self.scheduled_start_time,
            end: self.scheduled_end_time,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewScheduleReservation {
    pub provider_user_id: Uuid,
    pub job_id: Uuid,
    pub application_id: Option<Uuid>,
    pub scheduled_start_time: OffsetDateTime,
    pub scheduled_end_time: OffsetDateTime,
    #[validate(length(min = 1, max = 500))]
    pub location: Option<String>,
}
