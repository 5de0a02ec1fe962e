use sqlx::types::Uuid;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

use crate::db::error::DatabaseError;
use crate::db::models::{NewRescheduleRequest, RescheduleRequest, RescheduleStatus, TimeRange};

/// Store for reschedule requests. The pending -> terminal transitions are
/// status-guarded UPDATEs so two concurrent approve/reject calls can never
/// both succeed.
pub struct RescheduleRepository;

impl RescheduleRepository {
    pub async fn create(
        pool: &SqlitePool,
        data: &NewRescheduleRequest,
        now: OffsetDateTime,
    ) -> Result<RescheduleRequest, DatabaseError> {
        TimeRange::new(data.requested_start_time, data.requested_end_time).ok_or_else(|| {
            DatabaseError::InvalidInput(
                "requested_start_time must precede requested_end_time".to_string(),
            )
        })?;

        let request = RescheduleRequest {
            id: Uuid::new_v4(),
            schedule_id: data.schedule_id,
            job_id: data.job_id,
            requested_by: data.requested_by,
            requested_for: data.requested_for,
            original_start_time: data.original_start_time,
            original_end_time: data.original_end_time,
            requested_start_time: data.requested_start_time,
            requested_end_time: data.requested_end_time,
            reason: data.reason.clone(),
            status: RescheduleStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO reschedule_requests
                (id, schedule_id, job_id, requested_by, requested_for,
                 original_start_time, original_end_time, requested_start_time,
                 requested_end_time, reason, status, approved_by, approved_at,
                 rejection_reason, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(request.id)
        .bind(request.schedule_id)
        .bind(request.job_id)
        .bind(request.requested_by)
        .bind(request.requested_for)
        .bind(request.original_start_time)
        .bind(request.original_end_time)
        .bind(request.requested_start_time)
        .bind(request.requested_end_time)
        .bind(&request.reason)
        .bind(request.status)
        .bind(request.approved_by)
        .bind(request.approved_at)
        .bind(&request.rejection_reason)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(pool)
        .await?;

        Ok(request)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<RescheduleRequest>, DatabaseError> {
        let request =
            sqlx::query_as::<_, RescheduleRequest>("SELECT * FROM reschedule_requests WHERE id = ?1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(request)
    }

    /// Pending requests awaiting `user_id`'s approval, oldest first.
    pub async fn find_pending_for(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<RescheduleRequest>, DatabaseError> {
        let mut requests = sqlx::query_as::<_, RescheduleRequest>(
            "SELECT * FROM reschedule_requests WHERE requested_for = ?1 AND status = ?2",
        )
        .bind(user_id)
        .bind(RescheduleStatus::Pending)
        .fetch_all(pool)
        .await?;
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    pub async fn find_by_status(
        pool: &SqlitePool,
        status: RescheduleStatus,
    ) -> Result<Vec<RescheduleRequest>, DatabaseError> {
        let mut requests = sqlx::query_as::<_, RescheduleRequest>(
            "SELECT * FROM reschedule_requests WHERE status = ?1",
        )
        .bind(status)
        .fetch_all(pool)
        .await?;
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    /// Guarded pending -> approved. Returns false when the request was no
    /// longer pending (the caller decides between not-found and
    /// invalid-state).
    pub async fn approve(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        approved_by: Uuid,
        at: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE reschedule_requests
            SET status = ?1, approved_by = ?2, approved_at = ?3, updated_at = ?3
            WHERE id = ?4 AND status = ?5
            "#,
        )
        .bind(RescheduleStatus::Approved)
        .bind(approved_by)
        .bind(at)
        .bind(id)
        .bind(RescheduleStatus::Pending)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Guarded pending -> rejected.
    pub async fn reject(
        pool: &SqlitePool,
        id: Uuid,
        rejection_reason: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE reschedule_requests
            SET status = ?1, rejection_reason = ?2, updated_at = ?3
            WHERE id = ?4 AND status = ?5
            "#,
        )
        .bind(RescheduleStatus::Rejected)
        .bind(rejection_reason)
        .bind(now)
        .bind(id)
        .bind(RescheduleStatus::Pending)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Guarded pending -> cancelled (requester withdraws).
    pub async fn cancel(
        pool: &SqlitePool,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE reschedule_requests
            SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND status = ?4
            "#,
        )
        .bind(RescheduleStatus::Cancelled)
        .bind(now)
        .bind(id)
        .bind(RescheduleStatus::Pending)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
