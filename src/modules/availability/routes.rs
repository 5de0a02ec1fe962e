use axum::{
    Router,
    routing::{get, patch, post},
};

use super::handlers::{calendar_view, create_availability, delete_availability, update_availability};
use crate::app_state::AppState;

pub fn availability_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_availability))
        .route("/calendar", get(calendar_view))
        .route(
            "/{id}",
            patch(update_availability).delete(delete_availability),
        )
}
