mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use common::{context, monday_at, reservation_for, seed_job, T0};
use gigwork_backend::db::ScheduleRepository;
use gigwork_backend::db::models::NotificationType;
use gigwork_backend::services::AutomationScheduler;
use sqlx::SqlitePool;
use sqlx::types::Uuid;
use time::Duration;

#[sqlx::test]
async fn reminders_fire_once_per_reservation_per_window(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    // Starts 30 minutes from now: inside the 60-minute lead window.
    ctx.service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            T0 + Duration::minutes(30),
            T0 + Duration::minutes(90),
        ))
        .await
        .unwrap();

    let processed = ctx.service.send_job_start_reminders(60).await.unwrap();
    assert_eq!(processed, 1);
    assert_eq!(ctx.notifier.count_of(NotificationType::JobStartReminder), 1);

    // Second scan within the same window: the flag blocks a re-send.
    let processed = ctx.service.send_job_start_reminders(60).await.unwrap();
    assert_eq!(processed, 0);
    assert_eq!(ctx.notifier.count_of(NotificationType::JobStartReminder), 1);
}

#[sqlx::test]
async fn reminder_flag_and_timestamp_are_recorded(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    let reservation = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            T0 + Duration::minutes(45),
            T0 + Duration::minutes(105),
        ))
        .await
        .unwrap();

    ctx.service.send_job_start_reminders(60).await.unwrap();

    let stored = ScheduleRepository::find_by_id(&ctx.pool, reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.reminder_sent);
    assert_eq!(stored.reminder_sent_at, Some(T0));
}

#[sqlx::test]
async fn reservations_outside_the_lead_window_are_not_reminded(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    // Two hours out with a one-hour lead.
    ctx.service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            T0 + Duration::hours(2),
            T0 + Duration::hours(3),
        ))
        .await
        .unwrap();

    let processed = ctx.service.send_job_start_reminders(60).await.unwrap();
    assert_eq!(processed, 0);
    assert_eq!(ctx.notifier.count_of(NotificationType::JobStartReminder), 0);
}

#[sqlx::test]
async fn lateness_respects_the_grace_period_and_fires_once(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    ctx.service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            monday_at(9, 0),
            monday_at(10, 0),
        ))
        .await
        .unwrap();

    // Four minutes past the scheduled start: still within grace.
    ctx.clock.set(monday_at(9, 4));
    let processed = ctx.service.send_lateness_alerts().await.unwrap();
    assert_eq!(processed, 0);

    // Six minutes past: late.
    ctx.clock.set(monday_at(9, 6));
    let processed = ctx.service.send_lateness_alerts().await.unwrap();
    assert_eq!(processed, 1);
    assert_eq!(ctx.notifier.count_of(NotificationType::LatenessAlert), 1);

    // A repeat scan does not re-flag.
    let processed = ctx.service.send_lateness_alerts().await.unwrap();
    assert_eq!(processed, 0);
    assert_eq!(ctx.notifier.count_of(NotificationType::LatenessAlert), 1);
}

#[sqlx::test]
async fn stale_reservations_age_out_of_the_lateness_scan(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    ctx.service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            monday_at(9, 0),
            monday_at(10, 0),
        ))
        .await
        .unwrap();

    ctx.clock.set(monday_at(10, 1));
    let processed = ctx.service.send_lateness_alerts().await.unwrap();
    assert_eq!(processed, 0);
}

#[sqlx::test]
async fn started_work_is_never_flagged_late(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    let reservation = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            monday_at(9, 0),
            monday_at(10, 0),
        ))
        .await
        .unwrap();
    ctx.service.start_reservation(reservation.id).await.unwrap();

    ctx.clock.set(monday_at(9, 15));
    let processed = ctx.service.send_lateness_alerts().await.unwrap();
    assert_eq!(processed, 0);
}

#[sqlx::test]
async fn a_tick_runs_both_scans(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    // One reservation due for a reminder, one already late.
    ctx.service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            T0 + Duration::minutes(30),
            T0 + Duration::minutes(90),
        ))
        .await
        .unwrap();
    ctx.service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            T0 - Duration::minutes(10),
            T0 + Duration::minutes(50),
        ))
        .await
        .unwrap();

    let scheduler = Arc::new(AutomationScheduler::new(
        Arc::clone(&ctx.service),
        StdDuration::from_secs(900),
        60,
    ));

    scheduler.tick().await;
    assert_eq!(ctx.notifier.count_of(NotificationType::JobStartReminder), 1);
    assert_eq!(ctx.notifier.count_of(NotificationType::LatenessAlert), 1);

    // Ticks are idempotent per record per window.
    scheduler.tick().await;
    assert_eq!(ctx.notifier.count_of(NotificationType::JobStartReminder), 1);
    assert_eq!(ctx.notifier.count_of(NotificationType::LatenessAlert), 1);
}

#[sqlx::test]
async fn scheduler_start_is_idempotent(pool: SqlitePool) {
    let ctx = context(pool);
    let scheduler = Arc::new(AutomationScheduler::new(
        Arc::clone(&ctx.service),
        StdDuration::from_secs(900),
        60,
    ));

    assert!(!scheduler.is_running());
    scheduler.start();
    assert!(scheduler.is_running());

    // Second start while running: logged no-op.
    scheduler.start();
    assert!(scheduler.is_running());

    scheduler.stop();
    assert!(!scheduler.is_running());
}
