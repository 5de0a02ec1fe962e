use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use gigwork_backend::app::create_router;
use gigwork_backend::app_state::AppState;
use gigwork_backend::services::{
    AutomationScheduler, AvailabilityService, LoggingNotifier, SystemClock,
};
use gigwork_backend::{config, db, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = config::init()?;
    telemetry::init_tracing()?;

    let pool = db::init_pool().await?;

    let service = Arc::new(AvailabilityService::new(
        pool.clone(),
        Arc::new(LoggingNotifier),
        Arc::new(SystemClock),
    ));
    let scheduler = Arc::new(AutomationScheduler::new(
        Arc::clone(&service),
        Duration::from_secs(config.scheduler.tick_interval_minutes * 60),
        config.scheduler.reminder_lead_minutes,
    ));
    if config.scheduler.enabled {
        scheduler.start();
    }

    let state = AppState::new(pool, config.clone(), service, Arc::clone(&scheduler));
    let app = create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to serve application")?;

    Ok(())
}
