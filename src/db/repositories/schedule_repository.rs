use sqlx::types::Uuid;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::{Duration, OffsetDateTime};

use crate::db::error::DatabaseError;
use crate::db::models::{
    NewScheduleReservation, ReservationStatus, ScheduleReservation, TimeRange,
};

/// How far past its scheduled start a reservation can run before the
/// lateness scan gives up on it (stale rows are not worth alerting on).
const LATENESS_WINDOW: Duration = Duration::minutes(60);
/// Grace period before a missed start counts as late.
const LATENESS_GRACE: Duration = Duration::minutes(5);

pub struct ScheduleRepository;

impl ScheduleRepository {
    pub async fn create(
        tx: &mut Transaction<'_, Sqlite>,
        data: &NewScheduleReservation,
        now: OffsetDateTime,
    ) -> Result<ScheduleReservation, DatabaseError> {
        let interval =
            TimeRange::new(data.scheduled_start_time, data.scheduled_end_time).ok_or_else(|| {
                DatabaseError::InvalidInput(
                    "scheduled_start_time must precede scheduled_end_time".to_string(),
                )
            })?;

        let reservation = ScheduleReservation {
            id: Uuid::new_v4(),
            provider_user_id: data.provider_user_id,
            job_id: data.job_id,
            application_id: data.application_id,
            scheduled_start_time: interval.start,
            scheduled_end_time: interval.end,
            actual_start_time: None,
            actual_end_time: None,
            status: ReservationStatus::Scheduled,
            availability_block_id: None,
            time_entry_id: None,
            location: data.location.clone(),
            reminder_sent: false,
            reminder_sent_at: None,
            lateness_alert_sent: false,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO schedule_reservations
                (id, provider_user_id, job_id, application_id, scheduled_start_time,
                 scheduled_end_time, actual_start_time, actual_end_time, status,
                 availability_block_id, time_entry_id, location, reminder_sent,
                 reminder_sent_at, lateness_alert_sent, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.provider_user_id)
        .bind(reservation.job_id)
        .bind(reservation.application_id)
        .bind(reservation.scheduled_start_time)
        .bind(reservation.scheduled_end_time)
        .bind(reservation.actual_start_time)
        .bind(reservation.actual_end_time)
        .bind(reservation.status)
        .bind(reservation.availability_block_id)
        .bind(reservation.time_entry_id)
        .bind(&reservation.location)
        .bind(reservation.reminder_sent)
        .bind(reservation.reminder_sent_at)
        .bind(reservation.lateness_alert_sent)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(reservation)
    }

    /// Attaches the busy block created alongside a reservation.
    pub async fn link_block(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        block_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE schedule_reservations SET availability_block_id = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(block_id)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<ScheduleReservation>, DatabaseError> {
        let reservation = sqlx::query_as::<_, ScheduleReservation>(
            "SELECT * FROM schedule_reservations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(reservation)
    }

    /// Reservations fully contained in the window (containment, not
    /// overlap: this backs calendar-window listing, not conflict checks).
    pub async fn find_in_range(
        pool: &SqlitePool,
        provider_user_id: Uuid,
        window: &TimeRange,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ScheduleReservation>, DatabaseError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, ScheduleReservation>(
                    "SELECT * FROM schedule_reservations WHERE provider_user_id = ?1 AND status = ?2",
                )
                .bind(provider_user_id)
                .bind(status)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ScheduleReservation>(
                    "SELECT * FROM schedule_reservations WHERE provider_user_id = ?1",
                )
                .bind(provider_user_id)
                .fetch_all(pool)
                .await?
            }
        };
        let mut reservations: Vec<_> = rows
            .into_iter()
            .filter(|r| window.contains(&r.interval()))
            .collect();
        reservations.sort_by_key(|r| r.scheduled_start_time);
        Ok(reservations)
    }

    pub async fn find_upcoming(
        pool: &SqlitePool,
        provider_user_id: Uuid,
        now: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<ScheduleReservation>, DatabaseError> {
        let mut reservations: Vec<_> = sqlx::query_as::<_, ScheduleReservation>(
            "SELECT * FROM schedule_reservations WHERE provider_user_id = ?1 AND status = ?2",
        )
        .bind(provider_user_id)
        .bind(ReservationStatus::Scheduled)
        .fetch_all(pool)
        .await?
        .into_iter()
        .filter(|r| r.scheduled_start_time >= now)
        .collect();
        reservations.sort_by_key(|r| r.scheduled_start_time);
        reservations.truncate(limit);
        Ok(reservations)
    }

    /// Scheduled reservations starting within `[now, now + minutes_before]`
    /// that have not been reminded yet.
    pub async fn find_needing_reminder(
        pool: &SqlitePool,
        now: OffsetDateTime,
        minutes_before: i64,
    ) -> Result<Vec<ScheduleReservation>, DatabaseError> {
        let horizon = now + Duration::minutes(minutes_before);
        let mut reservations: Vec<_> = Self::unsent(pool, "reminder_sent")
            .await?
            .into_iter()
            .filter(|r| r.scheduled_start_time >= now && r.scheduled_start_time <= horizon)
            .collect();
        reservations.sort_by_key(|r| r.scheduled_start_time);
        Ok(reservations)
    }

    /// Scheduled reservations whose start slipped past the grace period
    /// without a transition to in_progress: start within
    /// `(now - 60min, now - 5min)`, both bounds exclusive.
    pub async fn find_late(
        pool: &SqlitePool,
        now: OffsetDateTime,
    ) -> Result<Vec<ScheduleReservation>, DatabaseError> {
        let oldest = now - LATENESS_WINDOW;
        let latest = now - LATENESS_GRACE;
        let mut reservations: Vec<_> = Self::unsent(pool, "lateness_alert_sent")
            .await?
            .into_iter()
            .filter(|r| r.scheduled_start_time > oldest && r.scheduled_start_time < latest)
            .collect();
        reservations.sort_by_key(|r| r.scheduled_start_time);
        Ok(reservations)
    }

    pub async fn mark_reminder_sent(
        pool: &SqlitePool,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_reservations
            SET reminder_sent = 1, reminder_sent_at = ?1, updated_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    pub async fn mark_lateness_alert_sent(
        pool: &SqlitePool,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE schedule_reservations SET lateness_alert_sent = 1, updated_at = ?1 WHERE id = ?2",
        )
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    /// Moves the scheduled interval and marks the reservation rescheduled;
    /// part of the reschedule-approval transaction.
    pub async fn reschedule(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        window: &TimeRange,
        now: OffsetDateTime,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_reservations
            SET scheduled_start_time = ?1, scheduled_end_time = ?2, status = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(ReservationStatus::Rescheduled)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    /// scheduled -> in_progress. Returns false when the guard misses.
    pub async fn set_started(
        pool: &SqlitePool,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_reservations
            SET status = ?1, actual_start_time = ?2, updated_at = ?2
            WHERE id = ?3 AND status = ?4
            "#,
        )
        .bind(ReservationStatus::InProgress)
        .bind(at)
        .bind(id)
        .bind(ReservationStatus::Scheduled)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// in_progress -> completed. Returns false when the guard misses.
    pub async fn set_completed(
        pool: &SqlitePool,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_reservations
            SET status = ?1, actual_end_time = ?2, updated_at = ?2
            WHERE id = ?3 AND status = ?4
            "#,
        )
        .bind(ReservationStatus::Completed)
        .bind(at)
        .bind(id)
        .bind(ReservationStatus::InProgress)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// scheduled | in_progress -> cancelled. Returns false when the guard
    /// misses.
    pub async fn set_cancelled(
        pool: &SqlitePool,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_reservations
            SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND status IN ('scheduled', 'in_progress')
            "#,
        )
        .bind(ReservationStatus::Cancelled)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unsent(
        pool: &SqlitePool,
        flag_column: &str,
    ) -> Result<Vec<ScheduleReservation>, DatabaseError> {
        let query = format!(
            "SELECT * FROM schedule_reservations WHERE status = ?1 AND {flag_column} = 0"
        );
        let reservations = sqlx::query_as::<_, ScheduleReservation>(&query)
            .bind(ReservationStatus::Scheduled)
            .fetch_all(pool)
            .await?;
        Ok(reservations)
    }
}
