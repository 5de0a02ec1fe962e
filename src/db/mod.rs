mod error;
pub mod models;
pub mod repositories;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config;

pub use error::DatabaseError;
pub use models::*;
pub use repositories::*;

/// Initialize the database connection pool and apply migrations.
pub async fn init_pool() -> Result<SqlitePool> {
    let config = config::get();
    let pool = connect(
        &config.database.url,
        config.database.max_connections.unwrap_or(5),
    )
    .await?;
    Ok(pool)
}

/// Connect to `url` and run the embedded migrations. Used by `init_pool`
/// and by test harnesses that point at throwaway databases.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
