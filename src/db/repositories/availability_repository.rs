use sqlx::types::{Json, Uuid};
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

use crate::db::error::DatabaseError;
use crate::db::models::{
    AvailabilityBlock, BlockType, NewAvailabilityBlock, TimeRange, UpdateAvailabilityBlock,
};

/// Store for availability blocks. SQL narrows by provider and block type;
/// the temporal predicates (half-open overlap, recurrence expansion) are
/// applied in Rust so they live in one tested place.
pub struct AvailabilityRepository;

impl AvailabilityRepository {
    pub async fn create(
        tx: &mut Transaction<'_, Sqlite>,
        data: &NewAvailabilityBlock,
        now: OffsetDateTime,
    ) -> Result<AvailabilityBlock, DatabaseError> {
        let interval = TimeRange::new(data.start_time, data.end_time).ok_or_else(|| {
            DatabaseError::InvalidInput("start_time must precede end_time".to_string())
        })?;

        let block = AvailabilityBlock {
            id: Uuid::new_v4(),
            provider_user_id: data.provider_user_id,
            title: data.title.clone(),
            start_time: interval.start,
            end_time: interval.end,
            is_recurring: data.recurrence.is_some(),
            recurrence: data.recurrence.clone().map(Json),
            is_available: data.block_type.is_available(),
            block_type: data.block_type,
            notes: data.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO availability_blocks
                (id, provider_user_id, title, start_time, end_time, is_recurring,
                 recurrence, is_available, block_type, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(block.id)
        .bind(block.provider_user_id)
        .bind(&block.title)
        .bind(block.start_time)
        .bind(block.end_time)
        .bind(block.is_recurring)
        .bind(&block.recurrence)
        .bind(block.is_available)
        .bind(block.block_type)
        .bind(&block.notes)
        .bind(block.created_at)
        .bind(block.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(block)
    }

    pub async fn update(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        patch: &UpdateAvailabilityBlock,
        now: OffsetDateTime,
    ) -> Result<AvailabilityBlock, DatabaseError> {
        let mut block = Self::find_by_id_tx(tx, id)
            .await?
            .ok_or(DatabaseError::NotFound)?;

        if let Some(title) = &patch.title {
            block.title = Some(title.clone());
        }
        if let Some(start) = patch.start_time {
            block.start_time = start;
        }
        if let Some(end) = patch.end_time {
            block.end_time = end;
        }
        if let Some(block_type) = patch.block_type {
            block.block_type = block_type;
            block.is_available = block_type.is_available();
        }
        if let Some(notes) = &patch.notes {
            block.notes = Some(notes.clone());
        }
        TimeRange::new(block.start_time, block.end_time).ok_or_else(|| {
            DatabaseError::InvalidInput("start_time must precede end_time".to_string())
        })?;
        block.updated_at = now;

        sqlx::query(
            r#"
            UPDATE availability_blocks
            SET title = ?1, start_time = ?2, end_time = ?3, is_available = ?4,
                block_type = ?5, notes = ?6, updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(&block.title)
        .bind(block.start_time)
        .bind(block.end_time)
        .bind(block.is_available)
        .bind(block.block_type)
        .bind(&block.notes)
        .bind(block.updated_at)
        .bind(block.id)
        .execute(&mut **tx)
        .await?;

        Ok(block)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM availability_blocks WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<AvailabilityBlock>, DatabaseError> {
        let block =
            sqlx::query_as::<_, AvailabilityBlock>("SELECT * FROM availability_blocks WHERE id = ?1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(block)
    }

    pub async fn find_by_id_tx(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<Option<AvailabilityBlock>, DatabaseError> {
        let block =
            sqlx::query_as::<_, AvailabilityBlock>("SELECT * FROM availability_blocks WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(block)
    }

    /// `available`-type blocks of the provider whose interval, or any
    /// materialized occurrence, intersects the half-open `window`.
    /// `exclude` skips a block id when an existing block is re-checked
    /// during update.
    pub async fn find_overlapping(
        tx: &mut Transaction<'_, Sqlite>,
        provider_user_id: Uuid,
        window: &TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<Vec<AvailabilityBlock>, DatabaseError> {
        Ok(Self::available_blocks(tx, provider_user_id, exclude)
            .await?
            .into_iter()
            .filter(|block| block.intersects(window))
            .collect())
    }

    /// Same predicate over a set of candidate windows; used when a
    /// recurring block is created and every materialized occurrence must
    /// be conflict-free.
    pub async fn find_conflicting_any(
        tx: &mut Transaction<'_, Sqlite>,
        provider_user_id: Uuid,
        windows: &[TimeRange],
        exclude: Option<Uuid>,
    ) -> Result<Vec<AvailabilityBlock>, DatabaseError> {
        Ok(Self::available_blocks(tx, provider_user_id, exclude)
            .await?
            .into_iter()
            .filter(|block| block.intersects_any(windows))
            .collect())
    }

    /// Blocks of any type intersecting the window, sorted by start time.
    pub async fn find_in_range(
        pool: &SqlitePool,
        provider_user_id: Uuid,
        window: &TimeRange,
    ) -> Result<Vec<AvailabilityBlock>, DatabaseError> {
        let mut blocks = sqlx::query_as::<_, AvailabilityBlock>(
            "SELECT * FROM availability_blocks WHERE provider_user_id = ?1",
        )
        .bind(provider_user_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .filter(|block| block.intersects(window))
        .collect::<Vec<_>>();
        blocks.sort_by_key(|block| block.start_time);
        Ok(blocks)
    }

    /// Shifts a block's interval in place; part of the reschedule-approval
    /// transaction.
    pub async fn shift_interval(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        window: &TimeRange,
        now: OffsetDateTime,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE availability_blocks
            SET start_time = ?1, end_time = ?2, updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn available_blocks(
        tx: &mut Transaction<'_, Sqlite>,
        provider_user_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Vec<AvailabilityBlock>, DatabaseError> {
        let blocks = sqlx::query_as::<_, AvailabilityBlock>(
            "SELECT * FROM availability_blocks WHERE provider_user_id = ?1 AND block_type = ?2",
        )
        .bind(provider_user_id)
        .bind(BlockType::Available)
        .fetch_all(&mut **tx)
        .await?;
        Ok(blocks
            .into_iter()
            .filter(|block| exclude != Some(block.id))
            .collect())
    }
}
