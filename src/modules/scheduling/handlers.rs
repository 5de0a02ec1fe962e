use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use crate::app_state::AppState;
use crate::authz::{is_counterparty, is_owner, is_participant};
use crate::db::models::{
    NewScheduleReservation, RescheduleRequest, ScheduleReservation,
};
use crate::error::{AppError, AppResult};
use crate::modules::extractors::ActorId;

#[derive(Debug, Deserialize, Validate)]
pub struct SchedulePayload {
    pub job_id: Uuid,
    pub application_id: Option<Uuid>,
    pub scheduled_start_time: OffsetDateTime,
    pub scheduled_end_time: OffsetDateTime,
    #[validate(length(min = 1, max = 500))]
    pub location: Option<String>,
}

/// Called by the job-acceptance flow: reserves the provider's time and
/// auto-blocks the calendar when the slot is free.
pub async fn schedule_job(
    State(state): State<AppState>,
    actor: ActorId,
    Json(payload): Json<SchedulePayload>,
) -> AppResult<(StatusCode, Json<ScheduleReservation>)> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let reservation = state
        .availability
        .auto_block_time_for_job(&NewScheduleReservation {
            provider_user_id: actor.0,
            job_id: payload.job_id,
            application_id: payload.application_id,
            scheduled_start_time: payload.scheduled_start_time,
            scheduled_end_time: payload.scheduled_end_time,
            location: payload.location,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<usize>,
}

pub async fn upcoming_reservations(
    State(state): State<AppState>,
    actor: ActorId,
    Query(query): Query<UpcomingQuery>,
) -> AppResult<Json<Vec<ScheduleReservation>>> {
    let reservations = state
        .availability
        .get_upcoming(actor.0, query.limit.unwrap_or(10))
        .await?;
    Ok(Json(reservations))
}

pub async fn start_reservation(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ScheduleReservation>> {
    require_reservation_owner(&state, actor, id).await?;
    let reservation = state.availability.start_reservation(id).await?;
    Ok(Json(reservation))
}

pub async fn complete_reservation(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ScheduleReservation>> {
    require_reservation_owner(&state, actor, id).await?;
    let reservation = state.availability.complete_reservation(id).await?;
    Ok(Json(reservation))
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ScheduleReservation>> {
    require_reservation_owner(&state, actor, id).await?;
    let reservation = state.availability.cancel_reservation(id).await?;
    Ok(Json(reservation))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReschedulePayload {
    pub schedule_id: Uuid,
    /// Counterparty whose approval is required.
    pub requested_for: Uuid,
    pub requested_start_time: OffsetDateTime,
    pub requested_end_time: OffsetDateTime,
    #[validate(length(min = 1, max = 2000))]
    pub reason: Option<String>,
}

pub async fn create_reschedule(
    State(state): State<AppState>,
    actor: ActorId,
    Json(payload): Json<CreateReschedulePayload>,
) -> AppResult<(StatusCode, Json<RescheduleRequest>)> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    // One side of the negotiation must be the reservation's provider:
    // either the provider is asking, or the provider is being asked.
    let reservation = state.availability.get_reservation(payload.schedule_id).await?;
    if !is_owner(actor.0, &reservation) && !is_owner(payload.requested_for, &reservation) {
        return Err(AppError::Authorization(
            "only a party to the reservation may propose a new time".to_string(),
        ));
    }

    let request = state
        .availability
        .create_reschedule_request(
            payload.schedule_id,
            actor.0,
            payload.requested_for,
            payload.requested_start_time,
            payload.requested_end_time,
            payload.reason,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn get_reschedule(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RescheduleRequest>> {
    let request = state.availability.get_reschedule_request(id).await?;
    if !is_participant(actor.0, &request) {
        return Err(AppError::Authorization(
            "only a party to the request may view it".to_string(),
        ));
    }
    Ok(Json(request))
}

pub async fn pending_reschedules(
    State(state): State<AppState>,
    actor: ActorId,
) -> AppResult<Json<Vec<RescheduleRequest>>> {
    let requests = state.availability.pending_reschedules_for(actor.0).await?;
    Ok(Json(requests))
}

pub async fn approve_reschedule(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RescheduleRequest>> {
    let request = state.availability.get_reschedule_request(id).await?;
    if !is_counterparty(actor.0, &request) {
        return Err(AppError::Authorization(
            "only the named counterparty may approve this request".to_string(),
        ));
    }

    let request = state
        .availability
        .approve_reschedule_request(id, actor.0)
        .await?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectReschedulePayload {
    #[validate(length(min = 1, max = 2000))]
    pub rejection_reason: Option<String>,
}

pub async fn reject_reschedule(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectReschedulePayload>,
) -> AppResult<Json<RescheduleRequest>> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let request = state.availability.get_reschedule_request(id).await?;
    if !is_counterparty(actor.0, &request) {
        return Err(AppError::Authorization(
            "only the named counterparty may reject this request".to_string(),
        ));
    }

    let request = state
        .availability
        .reject_reschedule_request(id, payload.rejection_reason)
        .await?;
    Ok(Json(request))
}

pub async fn cancel_reschedule(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RescheduleRequest>> {
    let request = state.availability.get_reschedule_request(id).await?;
    if request.requested_by != actor.0 {
        return Err(AppError::Authorization(
            "only the requester may withdraw this request".to_string(),
        ));
    }

    let request = state.availability.cancel_reschedule_request(id).await?;
    Ok(Json(request))
}

async fn require_reservation_owner(state: &AppState, actor: ActorId, id: Uuid) -> AppResult<()> {
    let reservation = state.availability.get_reservation(id).await?;
    if !is_owner(actor.0, &reservation) {
        return Err(AppError::Authorization(
            "only the owning provider may act on this reservation".to_string(),
        ));
    }
    Ok(())
}
