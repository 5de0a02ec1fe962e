use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}
