use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{
    approve_reschedule, cancel_reschedule, cancel_reservation, complete_reservation,
    create_reschedule, get_reschedule, pending_reschedules, reject_reschedule, schedule_job,
    start_reservation, upcoming_reservations,
};
use crate::app_state::AppState;

pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(schedule_job))
        .route("/upcoming", get(upcoming_reservations))
        .route("/{id}/start", post(start_reservation))
        .route("/{id}/complete", post(complete_reservation))
        .route("/{id}/cancel", post(cancel_reservation))
}

pub fn reschedule_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_reschedule))
        .route("/pending", get(pending_reschedules))
        .route("/{id}", get(get_reschedule))
        .route("/{id}/approve", post(approve_reschedule))
        .route("/{id}/reject", post(reject_reschedule))
        .route("/{id}/cancel", post(cancel_reschedule))
}
