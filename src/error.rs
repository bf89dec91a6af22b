use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WorkoutError {
  /// Negative or missing input in a submitted workout. No write happens.
  #[error("{0}")]
  Validation(String),

  #[error("Plan {plan_name} ({plan_id}) has {sessions} recorded workout(s); at least 2 are needed")]
  InsufficientData {
    plan_id: i64,
    plan_name: String,
    sessions: usize,
  },

  #[error("Unknown chart kind: {0}")]
  UnknownChartKind(String),

  /// An exercise id referenced by the submission is missing from one of its maps,
  /// or its weight and rep sequences disagree in length
  #[error("Exercise {exercise_id} has no matching {field} entry")]
  Lookup { exercise_id: String, field: String },

  /// A second workout of the same plan within the same second
  #[error("A workout of this plan is already recorded at {date}")]
  DuplicateSession { date: String },

  #[error("Two plans share the name {name}")]
  DuplicatePlan { name: String },

  #[error("Workout plan {0} not found")]
  PlanNotFound(i64),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl WorkoutError {
  /// Errors a caller should render as a message instead of aborting the request
  pub fn is_user_facing(&self) -> bool {
    matches!(
      self,
      Self::Validation(_)
        | Self::InsufficientData { .. }
        | Self::UnknownChartKind(_)
        | Self::DuplicateSession { .. }
    )
  }
}

impl Serialize for WorkoutError {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

pub type Result<T> = std::result::Result<T, WorkoutError>;
