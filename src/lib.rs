pub mod chart;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod progression;
pub mod repository;
pub mod submission;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use commands::WorkoutCommands;
pub use config::AppConfig;
pub use db::AppState;
pub use error::{Result, WorkoutError};
pub use repository::{SqliteWorkoutRepository, WorkoutRepository};

/// Load `.env`, read the configuration and install logging.
/// Returns the configuration the caller should build `AppState` from.
pub fn bootstrap() -> std::result::Result<AppConfig, config::ConfigError> {
  dotenvy::dotenv().ok();
  let config = AppConfig::from_env()?;
  logging::init_tracing(&config.log);
  Ok(config)
}
