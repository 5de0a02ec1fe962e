use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use sqlx::types::Uuid;
use std::cmp;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{error, warn};

use crate::db::models::{
    AvailabilityBlock, BlockType, NewAvailabilityBlock, NewRescheduleRequest,
    NewScheduleReservation, NotificationChannel, NotificationPriority, NotificationRequest,
    NotificationType, RecurrenceRule, RescheduleRequest, RescheduleStatus, ScheduleReservation,
    TimeRange, UpdateAvailabilityBlock,
};
use crate::db::{
    AvailabilityRepository, DatabaseError, JobRepository, RescheduleRepository, ScheduleRepository,
};
use crate::error::{AppError, AppResult};
use crate::services::clock::Clock;
use crate::services::notifier::Notifier;

/// How far ahead a recurring block is materialized when its occurrences
/// are conflict-checked at creation/update time.
const CONFLICT_HORIZON: Duration = Duration::days(365);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarViewType {
    Day,
    Week,
    Month,
}

/// Read-only composition of a provider's blocks and reservations over a
/// window.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub provider_user_id: Uuid,
    pub view: CalendarViewType,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub blocks: Vec<AvailabilityBlock>,
    pub reservations: Vec<ScheduleReservation>,
}

/// Orchestrates the availability, schedule and reschedule stores: declared
/// availability, auto-blocking on job acceptance, calendar composition,
/// the reschedule negotiation workflow, and the reminder/lateness scans.
///
/// Every conflict-check-then-write sequence runs inside one transaction;
/// notifications are dispatched after commit and never fail the mutation.
pub struct AvailabilityService {
    db: SqlitePool,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(db: SqlitePool, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            notifier,
            clock,
        }
    }

    /// Persists a new availability block unless it (or, for a recurring
    /// rule, any materialized occurrence) overlaps an existing
    /// `available`-type block of the same provider.
    pub async fn create_availability(
        &self,
        data: &NewAvailabilityBlock,
    ) -> AppResult<AvailabilityBlock> {
        let interval = TimeRange::new(data.start_time, data.end_time).ok_or_else(|| {
            AppError::Validation("start_time must precede end_time".to_string())
        })?;
        let windows = materialize_windows(interval, data.recurrence.as_ref());

        let mut tx = self.db.begin().await.map_err(DatabaseError::from)?;
        let conflicts = AvailabilityRepository::find_conflicting_any(
            &mut tx,
            data.provider_user_id,
            &windows,
            None,
        )
        .await?;
        if !conflicts.is_empty() {
            return Err(AppError::Conflict(format!(
                "interval overlaps {} existing availability block(s)",
                conflicts.len()
            )));
        }
        let block = AvailabilityRepository::create(&mut tx, data, self.clock.now()).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        Ok(block)
    }

    /// Applies a partial edit; when the resulting block is
    /// `available`-type its interval is re-checked against the provider's
    /// other blocks (excluding itself).
    pub async fn update_availability(
        &self,
        id: Uuid,
        patch: &UpdateAvailabilityBlock,
    ) -> AppResult<AvailabilityBlock> {
        let mut tx = self.db.begin().await.map_err(DatabaseError::from)?;
        let existing = AvailabilityRepository::find_by_id_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("availability block not found".to_string()))?;

        let start = patch.start_time.unwrap_or(existing.start_time);
        let end = patch.end_time.unwrap_or(existing.end_time);
        let block_type = patch.block_type.unwrap_or(existing.block_type);
        let interval = TimeRange::new(start, end).ok_or_else(|| {
            AppError::Validation("start_time must precede end_time".to_string())
        })?;

        if block_type.is_available() {
            let rule = existing.recurrence.as_ref().map(|json| &json.0);
            let windows = materialize_windows(interval, rule);
            let conflicts = AvailabilityRepository::find_conflicting_any(
                &mut tx,
                existing.provider_user_id,
                &windows,
                Some(id),
            )
            .await?;
            if !conflicts.is_empty() {
                return Err(AppError::Conflict(format!(
                    "interval overlaps {} existing availability block(s)",
                    conflicts.len()
                )));
            }
        }

        let block = AvailabilityRepository::update(&mut tx, id, patch, self.clock.now()).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        Ok(block)
    }

    pub async fn delete_availability(&self, id: Uuid) -> AppResult<()> {
        AvailabilityRepository::delete(&self.db, id)
            .await
            .map_err(|err| match err {
                DatabaseError::NotFound => {
                    AppError::NotFound("availability block not found".to_string())
                }
                other => other.into(),
            })
    }

    pub async fn get_availability(&self, id: Uuid) -> AppResult<AvailabilityBlock> {
        AvailabilityRepository::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("availability block not found".to_string()))
    }

    /// Reserves provider time for an accepted job. The reservation is
    /// always created; a busy block is additionally created and linked iff
    /// the window intersects no declared `available`-type block. (When a
    /// declared availability covers the slot, the calendar already shows
    /// the provider as spoken for through the reservation itself.)
    pub async fn auto_block_time_for_job(
        &self,
        data: &NewScheduleReservation,
    ) -> AppResult<ScheduleReservation> {
        let interval = TimeRange::new(data.scheduled_start_time, data.scheduled_end_time)
            .ok_or_else(|| {
                AppError::Validation(
                    "scheduled_start_time must precede scheduled_end_time".to_string(),
                )
            })?;
        let job = JobRepository::find_by_id(&self.db, data.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {} not found", data.job_id)))?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await.map_err(DatabaseError::from)?;
        let mut reservation = ScheduleRepository::create(&mut tx, data, now).await?;

        let conflicts = AvailabilityRepository::find_overlapping(
            &mut tx,
            data.provider_user_id,
            &interval,
            None,
        )
        .await?;
        if conflicts.is_empty() {
            let block = AvailabilityRepository::create(
                &mut tx,
                &NewAvailabilityBlock {
                    provider_user_id: data.provider_user_id,
                    title: Some(format!("Reserved: {}", job.title)),
                    start_time: interval.start,
                    end_time: interval.end,
                    recurrence: None,
                    block_type: BlockType::Busy,
                    notes: None,
                },
                now,
            )
            .await?;
            ScheduleRepository::link_block(&mut tx, reservation.id, block.id, now).await?;
            reservation.availability_block_id = Some(block.id);
        }
        tx.commit().await.map_err(DatabaseError::from)?;

        self.notify(NotificationRequest {
            target_user_id: reservation.provider_user_id,
            notification_type: NotificationType::JobScheduled,
            title: "Job scheduled".to_string(),
            message: format!(
                "\"{}\" has been scheduled for {}",
                job.title, reservation.scheduled_start_time
            ),
            data: json!({
                "reservation_id": reservation.id,
                "job_id": reservation.job_id,
            }),
            priority: NotificationPriority::High,
            channels: None,
        })
        .await;

        Ok(reservation)
    }

    /// Read-only calendar composition; no mutation.
    pub async fn get_calendar_view(
        &self,
        provider_user_id: Uuid,
        view: CalendarViewType,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> AppResult<CalendarView> {
        let window = TimeRange::new(start, end)
            .ok_or_else(|| AppError::Validation("start must precede end".to_string()))?;
        let blocks =
            AvailabilityRepository::find_in_range(&self.db, provider_user_id, &window).await?;
        let reservations =
            ScheduleRepository::find_in_range(&self.db, provider_user_id, &window, None).await?;
        Ok(CalendarView {
            provider_user_id,
            view,
            start,
            end,
            blocks,
            reservations,
        })
    }

    pub async fn get_upcoming(
        &self,
        provider_user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ScheduleReservation>> {
        Ok(ScheduleRepository::find_upcoming(
            &self.db,
            provider_user_id,
            self.clock.now(),
            limit,
        )
        .await?)
    }

    pub async fn get_reservation(&self, id: Uuid) -> AppResult<ScheduleReservation> {
        ScheduleRepository::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("schedule reservation not found".to_string()))
    }

    /// Opens a reschedule negotiation against a reservation, snapshotting
    /// its current interval, and notifies the counterparty.
    pub async fn create_reschedule_request(
        &self,
        schedule_id: Uuid,
        requested_by: Uuid,
        requested_for: Uuid,
        new_start: OffsetDateTime,
        new_end: OffsetDateTime,
        reason: Option<String>,
    ) -> AppResult<RescheduleRequest> {
        let interval = TimeRange::new(new_start, new_end).ok_or_else(|| {
            AppError::Validation("requested start must precede requested end".to_string())
        })?;
        let reservation = self.get_reservation(schedule_id).await?;

        let request = RescheduleRepository::create(
            &self.db,
            &NewRescheduleRequest {
                schedule_id,
                job_id: reservation.job_id,
                requested_by,
                requested_for,
                original_start_time: reservation.scheduled_start_time,
                original_end_time: reservation.scheduled_end_time,
                requested_start_time: interval.start,
                requested_end_time: interval.end,
                reason,
            },
            self.clock.now(),
        )
        .await?;

        self.notify(NotificationRequest {
            target_user_id: requested_for,
            notification_type: NotificationType::RescheduleRequested,
            title: "Reschedule requested".to_string(),
            message: format!(
                "A new time has been proposed: {} to {}",
                request.requested_start_time, request.requested_end_time
            ),
            data: json!({
                "request_id": request.id,
                "reservation_id": schedule_id,
            }),
            priority: NotificationPriority::High,
            channels: None,
        })
        .await;

        Ok(request)
    }

    /// Approves a pending request: the request, the target reservation and
    /// its linked block (if any) move in one transaction. A request that
    /// already left `pending` fails with an invalid-state error.
    pub async fn approve_reschedule_request(
        &self,
        request_id: Uuid,
        approved_by: Uuid,
    ) -> AppResult<RescheduleRequest> {
        let mut request = self.get_reschedule_request(request_id).await?;
        let reservation = ScheduleRepository::find_by_id(&self.db, request.schedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound("schedule reservation not found".to_string()))?;

        let now = self.clock.now();
        let window = request.requested_interval();

        let mut tx = self.db.begin().await.map_err(DatabaseError::from)?;
        let approved = RescheduleRepository::approve(&mut tx, request_id, approved_by, now).await?;
        if !approved {
            return Err(AppError::InvalidState(
                "reschedule request is no longer pending".to_string(),
            ));
        }
        ScheduleRepository::reschedule(&mut tx, request.schedule_id, &window, now).await?;
        if let Some(block_id) = reservation.availability_block_id {
            AvailabilityRepository::shift_interval(&mut tx, block_id, &window, now).await?;
        }
        tx.commit().await.map_err(DatabaseError::from)?;

        request.status = RescheduleStatus::Approved;
        request.approved_by = Some(approved_by);
        request.approved_at = Some(now);
        request.updated_at = now;

        self.notify(NotificationRequest {
            target_user_id: request.requested_by,
            notification_type: NotificationType::RescheduleApproved,
            title: "Reschedule approved".to_string(),
            message: format!(
                "The job has been moved to {} to {}",
                window.start, window.end
            ),
            data: json!({
                "request_id": request.id,
                "reservation_id": request.schedule_id,
            }),
            priority: NotificationPriority::High,
            channels: None,
        })
        .await;

        Ok(request)
    }

    /// Rejects a pending request. The target reservation is never touched.
    pub async fn reject_reschedule_request(
        &self,
        request_id: Uuid,
        rejection_reason: Option<String>,
    ) -> AppResult<RescheduleRequest> {
        let mut request = self.get_reschedule_request(request_id).await?;

        let now = self.clock.now();
        let rejected =
            RescheduleRepository::reject(&self.db, request_id, rejection_reason.as_deref(), now)
                .await?;
        if !rejected {
            return Err(AppError::InvalidState(
                "reschedule request is no longer pending".to_string(),
            ));
        }

        request.status = RescheduleStatus::Rejected;
        request.rejection_reason = rejection_reason;
        request.updated_at = now;

        self.notify(NotificationRequest {
            target_user_id: request.requested_by,
            notification_type: NotificationType::RescheduleRejected,
            title: "Reschedule rejected".to_string(),
            message: "The proposed time was declined; the original schedule stands".to_string(),
            data: json!({
                "request_id": request.id,
                "reservation_id": request.schedule_id,
            }),
            priority: NotificationPriority::Normal,
            channels: None,
        })
        .await;

        Ok(request)
    }

    /// Requester withdraws a pending request.
    pub async fn cancel_reschedule_request(
        &self,
        request_id: Uuid,
    ) -> AppResult<RescheduleRequest> {
        let mut request = self.get_reschedule_request(request_id).await?;

        let now = self.clock.now();
        let cancelled = RescheduleRepository::cancel(&self.db, request_id, now).await?;
        if !cancelled {
            return Err(AppError::InvalidState(
                "reschedule request is no longer pending".to_string(),
            ));
        }

        request.status = RescheduleStatus::Cancelled;
        request.updated_at = now;
        Ok(request)
    }

    pub async fn get_reschedule_request(&self, id: Uuid) -> AppResult<RescheduleRequest> {
        RescheduleRepository::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("reschedule request not found".to_string()))
    }

    pub async fn pending_reschedules_for(&self, user_id: Uuid) -> AppResult<Vec<RescheduleRequest>> {
        Ok(RescheduleRepository::find_pending_for(&self.db, user_id).await?)
    }

    /// scheduled -> in_progress; records the real-world start.
    pub async fn start_reservation(&self, id: Uuid) -> AppResult<ScheduleReservation> {
        let now = self.clock.now();
        let started = ScheduleRepository::set_started(&self.db, id, now).await?;
        if !started {
            return Err(self.reservation_transition_error(id, "start").await);
        }
        let reservation = self.get_reservation(id).await?;

        if let Ok(Some(job)) = JobRepository::find_by_id(&self.db, reservation.job_id).await {
            self.notify(NotificationRequest {
                target_user_id: job.client_user_id,
                notification_type: NotificationType::JobStarted,
                title: "Job started".to_string(),
                message: format!("Work on \"{}\" has started", job.title),
                data: json!({ "reservation_id": reservation.id, "job_id": job.id }),
                priority: NotificationPriority::Normal,
                channels: None,
            })
            .await;
        }

        Ok(reservation)
    }

    /// in_progress -> completed; records the real-world completion.
    pub async fn complete_reservation(&self, id: Uuid) -> AppResult<ScheduleReservation> {
        let now = self.clock.now();
        let completed = ScheduleRepository::set_completed(&self.db, id, now).await?;
        if !completed {
            return Err(self.reservation_transition_error(id, "complete").await);
        }
        let reservation = self.get_reservation(id).await?;

        if let Ok(Some(job)) = JobRepository::find_by_id(&self.db, reservation.job_id).await {
            self.notify(NotificationRequest {
                target_user_id: job.client_user_id,
                notification_type: NotificationType::JobCompleted,
                title: "Job completed".to_string(),
                message: format!("Work on \"{}\" has been completed", job.title),
                data: json!({ "reservation_id": reservation.id, "job_id": job.id }),
                priority: NotificationPriority::Normal,
                channels: None,
            })
            .await;
        }

        Ok(reservation)
    }

    /// scheduled | in_progress -> cancelled.
    pub async fn cancel_reservation(&self, id: Uuid) -> AppResult<ScheduleReservation> {
        let now = self.clock.now();
        let cancelled = ScheduleRepository::set_cancelled(&self.db, id, now).await?;
        if !cancelled {
            return Err(self.reservation_transition_error(id, "cancel").await);
        }
        let reservation = self.get_reservation(id).await?;

        self.notify(NotificationRequest {
            target_user_id: reservation.provider_user_id,
            notification_type: NotificationType::JobCancelled,
            title: "Reservation cancelled".to_string(),
            message: format!(
                "The reservation for {} has been cancelled",
                reservation.scheduled_start_time
            ),
            data: json!({ "reservation_id": reservation.id, "job_id": reservation.job_id }),
            priority: NotificationPriority::Normal,
            channels: None,
        })
        .await;

        Ok(reservation)
    }

    /// Scans for reservations starting within `minutes_before` minutes and
    /// dispatches one reminder each. The `reminder_sent` flag flips only
    /// after a dispatch attempt, so repeated scans within one window never
    /// double-notify; one record's failure does not abort the batch.
    pub async fn send_job_start_reminders(&self, minutes_before: i64) -> AppResult<usize> {
        let now = self.clock.now();
        let due = ScheduleRepository::find_needing_reminder(&self.db, now, minutes_before).await?;

        let mut processed = 0;
        for reservation in due {
            let minutes_until = (reservation.scheduled_start_time - now).whole_minutes();
            self.notify(NotificationRequest {
                target_user_id: reservation.provider_user_id,
                notification_type: NotificationType::JobStartReminder,
                title: "Upcoming job".to_string(),
                message: format!("Your job starts in {} minute(s)", minutes_until),
                data: json!({
                    "reservation_id": reservation.id,
                    "job_id": reservation.job_id,
                    "scheduled_start_time": reservation.scheduled_start_time,
                }),
                priority: NotificationPriority::High,
                channels: Some(vec![NotificationChannel::Push, NotificationChannel::Sms]),
            })
            .await;

            if let Err(err) =
                ScheduleRepository::mark_reminder_sent(&self.db, reservation.id, now).await
            {
                error!(
                    reservation_id = %reservation.id,
                    error = %err,
                    "failed to record reminder flag; continuing scan"
                );
                continue;
            }
            processed += 1;
        }
        Ok(processed)
    }

    /// Scans for reservations whose start slipped past the grace period
    /// without being started and dispatches one urgent alert each.
    pub async fn send_lateness_alerts(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let late = ScheduleRepository::find_late(&self.db, now).await?;

        let mut processed = 0;
        for reservation in late {
            let minutes_late = (now - reservation.scheduled_start_time).whole_minutes();
            self.notify(NotificationRequest {
                target_user_id: reservation.provider_user_id,
                notification_type: NotificationType::LatenessAlert,
                title: "Job not started".to_string(),
                message: format!(
                    "Your job was scheduled to start {} minute(s) ago",
                    minutes_late
                ),
                data: json!({
                    "reservation_id": reservation.id,
                    "job_id": reservation.job_id,
                    "scheduled_start_time": reservation.scheduled_start_time,
                }),
                priority: NotificationPriority::Urgent,
                channels: Some(vec![NotificationChannel::Push]),
            })
            .await;

            if let Err(err) =
                ScheduleRepository::mark_lateness_alert_sent(&self.db, reservation.id, now).await
            {
                error!(
                    reservation_id = %reservation.id,
                    error = %err,
                    "failed to record lateness flag; continuing scan"
                );
                continue;
            }
            processed += 1;
        }
        Ok(processed)
    }

    async fn reservation_transition_error(&self, id: Uuid, action: &str) -> AppError {
        match ScheduleRepository::find_by_id(&self.db, id).await {
            Ok(Some(reservation)) => AppError::InvalidState(format!(
                "cannot {} a reservation in status {:?}",
                action, reservation.status
            )),
            Ok(None) => AppError::NotFound("schedule reservation not found".to_string()),
            Err(err) => err.into(),
        }
    }

    /// Best-effort dispatch: failures are logged, never propagated.
    async fn notify(&self, request: NotificationRequest) {
        if let Err(err) = self.notifier.dispatch(request).await {
            warn!(error = %err, "notification dispatch failed");
        }
    }
}

fn materialize_windows(interval: TimeRange, rule: Option<&RecurrenceRule>) -> Vec<TimeRange> {
    match rule {
        Some(rule) => {
            let horizon = TimeRange {
                start: interval.start,
                end: cmp::max(interval.start + CONFLICT_HORIZON, interval.end),
            };
            rule.occurrences_between(&interval, &horizon)
        }
        None => vec![interval],
    }
}
