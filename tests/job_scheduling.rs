mod common;

use common::{available_block, context, monday_at, reservation_for, seed_job};
use gigwork_backend::db::AvailabilityRepository;
use gigwork_backend::db::models::{
    BlockType, NotificationType, ReservationStatus, TimeRange,
};
use gigwork_backend::error::AppError;
use sqlx::SqlitePool;
use sqlx::types::Uuid;

#[sqlx::test]
async fn auto_block_creates_reservation_and_busy_block_when_slot_is_unclaimed(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    let reservation = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            monday_at(10, 0),
            monday_at(11, 0),
        ))
        .await
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::Scheduled);
    assert_eq!(reservation.job_id, job.id);

    let block_id = reservation
        .availability_block_id
        .expect("an unclaimed slot gets a linked busy block");
    let block = AvailabilityRepository::find_by_id(&ctx.pool, block_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(block.block_type, BlockType::Busy);
    assert!(!block.is_available);
    assert_eq!(block.start_time, monday_at(10, 0));
    assert_eq!(block.end_time, monday_at(11, 0));

    assert_eq!(ctx.notifier.count_of(NotificationType::JobScheduled), 1);
}

#[sqlx::test]
async fn auto_block_skips_the_block_when_availability_covers_the_slot(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    ctx.service
        .create_availability(&available_block(
            provider,
            monday_at(9, 0),
            monday_at(17, 0),
        ))
        .await
        .unwrap();

    let reservation = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            monday_at(10, 0),
            monday_at(11, 0),
        ))
        .await
        .unwrap();

    // The reservation exists but carries no linked block.
    assert_eq!(reservation.status, ReservationStatus::Scheduled);
    assert!(reservation.availability_block_id.is_none());

    let window = TimeRange::new(monday_at(0, 0), monday_at(23, 59)).unwrap();
    let blocks = AvailabilityRepository::find_in_range(&ctx.pool, provider, &window)
        .await
        .unwrap();
    assert_eq!(blocks.len(), 1, "no busy block was created");
}

#[sqlx::test]
async fn auto_block_rejects_an_unknown_job(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();

    let err = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            provider,
            Uuid::new_v4(),
            monday_at(10, 0),
            monday_at(11, 0),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let upcoming = ctx.service.get_upcoming(provider, 10).await.unwrap();
    assert!(upcoming.is_empty());
    assert_eq!(ctx.notifier.sent().len(), 0);
}

#[sqlx::test]
async fn auto_block_rejects_an_inverted_interval(pool: SqlitePool) {
    let ctx = context(pool);
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    let err = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            Uuid::new_v4(),
            job.id,
            monday_at(11, 0),
            monday_at(10, 0),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test]
async fn reservation_walks_the_happy_path_state_machine(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    let reservation = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            monday_at(10, 0),
            monday_at(11, 0),
        ))
        .await
        .unwrap();

    let started = ctx.service.start_reservation(reservation.id).await.unwrap();
    assert_eq!(started.status, ReservationStatus::InProgress);
    assert_eq!(started.actual_start_time, Some(common::T0));

    let completed = ctx
        .service
        .complete_reservation(reservation.id)
        .await
        .unwrap();
    assert_eq!(completed.status, ReservationStatus::Completed);
    assert_eq!(completed.actual_end_time, Some(common::T0));

    assert_eq!(ctx.notifier.count_of(NotificationType::JobStarted), 1);
    assert_eq!(ctx.notifier.count_of(NotificationType::JobCompleted), 1);
}

#[sqlx::test]
async fn invalid_transitions_are_rejected(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    let reservation = ctx
        .service
        .auto_block_time_for_job(&reservation_for(
            provider,
            job.id,
            monday_at(10, 0),
            monday_at(11, 0),
        ))
        .await
        .unwrap();

    // Completing a reservation that never started.
    let err = ctx
        .service
        .complete_reservation(reservation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    ctx.service.start_reservation(reservation.id).await.unwrap();

    // Starting twice.
    let err = ctx
        .service
        .start_reservation(reservation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Cancelling in_progress work is allowed; cancelling again is not.
    ctx.service.cancel_reservation(reservation.id).await.unwrap();
    let err = ctx
        .service
        .cancel_reservation(reservation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = ctx
        .service
        .start_reservation(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test]
async fn upcoming_reservations_are_sorted_and_capped(pool: SqlitePool) {
    let ctx = context(pool);
    let provider = Uuid::new_v4();
    let job = seed_job(&ctx.pool, Uuid::new_v4()).await;

    for hour in [15, 9, 12] {
        ctx.service
            .auto_block_time_for_job(&reservation_for(
                provider,
                job.id,
                monday_at(hour, 0),
                monday_at(hour + 1, 0),
            ))
            .await
            .unwrap();
    }

    let upcoming = ctx.service.get_upcoming(provider, 2).await.unwrap();
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[0].scheduled_start_time, monday_at(9, 0));
    assert_eq!(upcoming[1].scheduled_start_time, monday_at(12, 0));
}
