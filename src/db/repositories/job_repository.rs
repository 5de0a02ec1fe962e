use sqlx::types::Uuid;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::db::error::DatabaseError;
use crate::db::models::{Job, NewJob};

pub struct JobRepository;

impl JobRepository {
    pub async fn create(
        pool: &SqlitePool,
        data: &NewJob,
        now: OffsetDateTime,
    ) -> Result<Job, DatabaseError> {
        let job = Job {
            id: Uuid::new_v4(),
            client_user_id: data.client_user_id,
            title: data.title.clone(),
            status: data.status,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO jobs (id, client_user_id, title, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(job.id)
        .bind(job.client_user_id)
        .bind(&job.title)
        .bind(job.status)
        .bind(job.created_at)
        .execute(pool)
        .await?;

        Ok(job)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Job>, DatabaseError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(job)
    }
}
