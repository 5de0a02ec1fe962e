use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Accepted,
    Completed,
    Cancelled,
}

/// Minimal job record. Matching and acceptance live elsewhere; the
/// scheduling core only validates that a referenced job exists.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub client_user_id: Uuid,
    pub title: String,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewJob {
    pub client_user_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub status: JobStatus,
}
