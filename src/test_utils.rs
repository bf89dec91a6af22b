//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seeding helpers that go through the repository
//! - Mock row factories for the pure aggregation tests

use crate::models::{NewSetRecord, Plan, SetRow, Workout};
use crate::repository::{SqliteWorkoutRepository, WorkoutRepository};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

pub async fn seed_plan(repo: &SqliteWorkoutRepository, user_id: &str, name: &str) -> Plan {
  repo
    .create_plan(user_id, name)
    .await
    .expect("Failed to seed plan")
}

/// Insert one workout; each exercise gets an id from its position and its
/// sets are numbered from 1. Returns the workout id.
pub async fn seed_workout(
  repo: &SqliteWorkoutRepository,
  plan_id: i64,
  performed_at: DateTime<Utc>,
  exercises: &[(&str, Vec<(f64, i64)>)],
) -> i64 {
  let mut sets = Vec::new();
  for (position, (name, pairs)) in exercises.iter().enumerate() {
    for (i, &(weight, reps)) in pairs.iter().enumerate() {
      sets.push(NewSetRecord {
        exercise_id: (position + 1).to_string(),
        exercise_name: name.to_string(),
        set_number: i as i64 + 1,
        weight,
        reps,
      });
    }
  }
  let total: f64 = sets.iter().map(|s| s.weight * s.reps as f64).sum();

  repo
    .create_workout_with_sets(plan_id, performed_at, total, &sets, true)
    .await
    .expect("Failed to seed workout")
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Parse "YYYY-MM-DD HH:MM:SS" as a UTC timestamp
pub fn at(timestamp: &str) -> DateTime<Utc> {
  NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S")
    .expect("valid test timestamp")
    .and_utc()
}

pub fn mock_plan(id: i64, name: &str) -> Plan {
  Plan {
    id,
    user_id: "user-1".to_string(),
    name: name.to_string(),
    created_at: None,
  }
}

pub fn mock_workout(id: i64, performed_at: DateTime<Utc>, total_weight: f64) -> Workout {
  Workout {
    id,
    plan_id: 1,
    total_weight,
    performed_at,
  }
}

pub fn set_row(
  workout_id: i64,
  performed_at: DateTime<Utc>,
  exercise_name: &str,
  set_number: i64,
  weight: f64,
  reps: i64,
  session_total_weight: f64,
) -> SetRow {
  SetRow {
    workout_id,
    performed_at,
    exercise_name: exercise_name.to_string(),
    set_number,
    weight,
    reps,
    session_total_weight,
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workout_plans', 'workouts', 'workout_details')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 3, "Expected 3 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_workout_inserts_every_set() {
    let pool = setup_test_db().await;
    let repo = SqliteWorkoutRepository::new(pool.clone());
    let plan = seed_plan(&repo, "user-1", "Push").await;

    seed_workout(
      &repo,
      plan.id,
      at("2024-01-01 10:00:00"),
      &[("Bench Press", vec![(80.0, 5), (85.0, 5)]), ("Dips", vec![(0.0, 12)])],
    )
    .await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_details")
      .fetch_one(&pool)
      .await
      .expect("Failed to count sets");
    assert_eq!(count, 3);

    let total: f64 = sqlx::query_scalar("SELECT total_weight FROM workouts")
      .fetch_one(&pool)
      .await
      .expect("Failed to read total");
    crate::assert_approx_eq!(total, 825.0, 1e-9);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_at_parses_utc() {
    assert_eq!(at("2024-01-08 10:00:00").to_rfc3339(), "2024-01-08T10:00:00+00:00");
  }
}
