use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use crate::app_state::AppState;
use crate::authz::is_owner;
use crate::db::models::{
    AvailabilityBlock, BlockType, NewAvailabilityBlock, RecurrenceRule, UpdateAvailabilityBlock,
};
use crate::error::{AppError, AppResult};
use crate::modules::extractors::ActorId;
use crate::services::{CalendarView, CalendarViewType};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAvailabilityPayload {
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

pub async fn create_availability(
    State(state): State<AppState>,
    actor: ActorId,
    Json(payload): Json<CreateAvailabilityPayload>,
) -> AppResult<(StatusCode, Json<AvailabilityBlock>)> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let block = state
        .availability
        .create_availability(&NewAvailabilityBlock {
            provider_user_id: actor.0,
            title: payload.title,
            start_time: payload.start_time,
            end_time: payload.end_time,
            recurrence: payload.recurrence,
            block_type: payload.block_type,
            notes: payload.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(block)))
}

pub async fn update_availability(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityBlock>,
) -> AppResult<Json<AvailabilityBlock>> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let existing = state.availability.get_availability(id).await?;
    if !is_owner(actor.0, &existing) {
        return Err(AppError::Authorization(
            "only the owning provider may edit this block".to_string(),
        ));
    }

    let block = state.availability.update_availability(id, &payload).await?;
    Ok(Json(block))
}

pub async fn delete_availability(
    State(state): State<AppState>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let existing = state.availability.get_availability(id).await?;
    if !is_owner(actor.0, &existing) {
        return Err(AppError::Authorization(
            "only the owning provider may delete this block".to_string(),
        ));
    }

    state.availability.delete_availability(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub view: CalendarViewType,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

pub async fn calendar_view(
    State(state): State<AppState>,
    actor: ActorId,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarView>> {
    let view = state
        .availability
        .get_calendar_view(actor.0, query.view, query.start, query.end)
        .await?;
    Ok(Json(view))
}
