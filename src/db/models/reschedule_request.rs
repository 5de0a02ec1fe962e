use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use super::time_range::TimeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

/// A negotiation artifact proposing a new interval for a reservation.
///
/// Exactly one transition out of `pending` is permitted; the original
/// interval snapshot is the only audit trail once an approval mutates the
/// reservation in place.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub job_id: Uuid,
    pub requested_by: Uuid,
    /// Counterparty whose approval is required.
    pub requested_for: Uuid,
    pub original_start_time: OffsetDateTime,
    pub original_end_time: OffsetDateTime,
    pub requested_start_time: OffsetDateTime,
    pub requested_end_time: OffsetDateTime,
    pub reason: Option<String>,
    pub status: RescheduleStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<OffsetDateTime>,
    pub rejection_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl RescheduleRequest {
    pub fn requested_interval(&self) -> TimeRange {
        TimeRange {
            start: self.requested_start_time,
            end: self.requested_end_time,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRescheduleRequest {
    pub schedule_id: Uuid,
    pub job_id: Uuid,
    pub requested_by: Uuid,
    pub requested_for: Uuid,
    pub original_start_time: OffsetDateTime,
    pub original_end_time: OffsetDateTime,
    pub requested_start_time: OffsetDateTime,
    pub requested_end_time: OffsetDateTime,
    #[validate(length(min = 1, max = 2000))]
    pub reason: Option<String>,
}
