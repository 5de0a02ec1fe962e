use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config;
use crate::services::{AutomationScheduler, AvailabilityService};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub env: config::Config,
    pub availability: Arc<AvailabilityService>,
    pub scheduler: Arc<AutomationScheduler>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        env: config::Config,
        availability: Arc<AvailabilityService>,
        scheduler: Arc<AutomationScheduler>,
    ) -> Self {
        Self {
            db,
            env,
            availability,
            scheduler,
        }
    }
}
