use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;

pub type DbPool = SqlitePool;

/// Application state holding the database connection pool and the settings
/// the commands need per request
pub struct AppState {
  pub db: DbPool,
  pub config: AppConfig,
}

impl AppState {
  pub async fn init(config: AppConfig) -> Result<Self> {
    let db = initialize_db(&config).await?;
    Ok(Self { db, config })
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(config: &AppConfig) -> Result<DbPool> {
  info!(url = %config.database_url, "initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("database initialized");
  Ok(pool)
}
