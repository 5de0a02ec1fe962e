use axum::{Json, Router, middleware, routing::get};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::{
    app_state::AppState,
    middleware::request_span::request_span_middleware,
    modules::availability::routes::availability_routes,
    modules::scheduling::routes::{reschedule_routes, schedule_routes},
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/availability", availability_routes())
        .nest("/schedule", schedule_routes())
        .nest("/reschedule", reschedule_routes())
        .layer(middleware::from_fn(request_span_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn hello() -> &'static str {
    "Gigwork Backend says hello!\n"
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let db_result = sqlx::query("SELECT 1").execute(&state.db).await;

    let db_status = match db_result {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    Json(json!({
        "status": "ok",
        "timestamp": time::OffsetDateTime::now_utc().to_string(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "scheduler": if state.scheduler.is_running() { "running" } else { "stopped" },
        }
    }))
}
