#![allow(dead_code)]

use std::sync::Arc;

use gigwork_backend::db::JobRepository;
use gigwork_backend::db::models::{
    BlockType, Job, JobStatus, NewAvailabilityBlock, NewJob, NewScheduleReservation,
};
use gigwork_backend::services::{AvailabilityService, ManualClock, RecordingNotifier};
use sqlx::SqlitePool;
use sqlx::types::Uuid;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

/// Monday, 08:00 UTC.
pub const T0: OffsetDateTime = datetime!(2025-03-03 8:00 UTC);

pub struct TestContext {
    pub pool: SqlitePool,
    pub service: Arc<AvailabilityService>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
}

/// Service wired to a recording notifier and a manual clock pinned at
/// [`T0`].
pub fn context(pool: SqlitePool) -> TestContext {
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(T0));
    let service = Arc::new(AvailabilityService::new(
        pool.clone(),
        notifier.clone(),
        clock.clone(),
    ));
    TestContext {
        pool,
        service,
        notifier,
        clock,
    }
}

/// Monday at the given wall-clock time.
pub fn monday_at(hour: i64, minute: i64) -> OffsetDateTime {
    datetime!(2025-03-03 0:00 UTC) + Duration::hours(hour) + Duration::minutes(minute)
}

pub fn available_block(
    provider: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> NewAvailabilityBlock {
    NewAvailabilityBlock {
        provider_user_id: provider,
        title: None,
        start_time: start,
        end_time: end,
        recurrence: None,
        block_type: BlockType::Available,
        notes: None,
    }
}

pub async fn seed_job(pool: &SqlitePool, client: Uuid) -> Job {
    JobRepository::create(
        pool,
        &NewJob {
            client_user_id: client,
            title: "Deck repair".to_string(),
            status: JobStatus::Accepted,
        },
        T0,
    )
    .await
    .expect("failed to seed job")
}

pub fn reservation_for(
    provider: Uuid,
    job_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> NewScheduleReservation {
    NewScheduleReservation {
        provider_user_id: provider,
        job_id,
        application_id: None,
        scheduled_start_time: start,
        scheduled_end_time: end,
        location: Some("12 Foxglove Lane".to_string()),
    }
}
