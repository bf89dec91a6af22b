use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workout {
  pub id: i64,
  pub plan_id: i64,
  pub total_weight: f64,
  pub performed_at: DateTime<Utc>,
}

/// One persisted set joined with its session, as returned by
/// `WorkoutRepository::find_sessions_by_plan`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SetRow {
  pub workout_id: i64,
  pub performed_at: DateTime<Utc>,
  pub exercise_name: String,
  pub set_number: i64,
  pub weight: f64,
  pub reps: i64,
  /// Total weight of the whole session, repeated on every row
  pub session_total_weight: f64,
}

/// For inserting new sets (without id, workout_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSetRecord {
  pub exercise_id: String,
  pub exercise_name: String,
  /// 1-based, dense per exercise within one session
  pub set_number: i64,
  pub weight: f64,
  pub reps: i64,
}
