//! Workout persistence
//!
//! `WorkoutRepository` is the only place that touches the database. Commands
//! fetch through it, then hand plain rows to the pure aggregation functions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{Result, WorkoutError};
use crate::history::{format_session_date, MergePolicy};
use crate::models::{NewSetRecord, Plan, SetRow, Workout};
use crate::progression::TotalWeightSeries;

const SESSIONS_BY_PLAN: &str = r#"
  SELECT
    w.id AS workout_id,
    w.performed_at AS performed_at,
    d.name AS exercise_name,
    d.set_number AS set_number,
    d.weight AS weight,
    d.reps AS reps,
    w.total_weight AS session_total_weight
  FROM workouts w
  JOIN workout_details d ON d.workout_id = w.id
  WHERE w.plan_id = ?1
  ORDER BY w.performed_at ASC, w.id ASC, d.id ASC
"#;

const WORKOUTS_BY_PLAN: &str = r#"
  SELECT id, plan_id, total_weight, performed_at
  FROM workouts
  WHERE plan_id = ?1
  ORDER BY performed_at ASC, id ASC
"#;

/// Set rows and workout totals of one plan, read in a single transaction
#[derive(Debug, Clone, Default)]
pub struct PlanSnapshot {
  pub rows: Vec<SetRow>,
  pub workouts: Vec<Workout>,
}

#[async_trait]
pub trait WorkoutRepository: Send + Sync {
  async fn find_plan(&self, plan_id: i64) -> Result<Option<Plan>>;

  async fn find_plans_by_user(&self, user_id: &str) -> Result<Vec<Plan>>;

  /// Every set of every workout of the plan, ordered by session date, then
  /// workout, then submission order
  async fn find_sessions_by_plan(&self, plan_id: i64) -> Result<Vec<SetRow>>;

  /// One total per session date; same-date workouts follow `policy`
  async fn find_total_weight_series_by_plan(
    &self,
    plan_id: i64,
    policy: MergePolicy,
  ) -> Result<TotalWeightSeries>;

  /// Sessions and workout totals from one consistent read
  async fn find_plan_snapshot(&self, plan_id: i64) -> Result<PlanSnapshot>;

  /// Insert the workout and all of its sets atomically; returns the workout id.
  /// With `unique_session`, a workout of the same plan whose date formats to
  /// the same session key fails the insert with `DuplicateSession`.
  async fn create_workout_with_sets(
    &self,
    plan_id: i64,
    performed_at: DateTime<Utc>,
    total_weight: f64,
    sets: &[NewSetRecord],
    unique_session: bool,
  ) -> Result<i64>;
}

/// SQLite implementation of `WorkoutRepository`
#[derive(Clone)]
pub struct SqliteWorkoutRepository {
  pool: SqlitePool,
}

impl SqliteWorkoutRepository {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  pub async fn create_plan(&self, user_id: &str, name: &str) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
      r#"
      INSERT INTO workout_plans (user_id, name)
      VALUES (?1, ?2)
      RETURNING id, user_id, name, created_at
      "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(&self.pool)
    .await?;
    Ok(plan)
  }

  pub async fn find_workouts_by_plan(&self, plan_id: i64) -> Result<Vec<Workout>> {
    let workouts = sqlx::query_as::<_, Workout>(WORKOUTS_BY_PLAN)
      .bind(plan_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(workouts)
  }
}

#[async_trait]
impl WorkoutRepository for SqliteWorkoutRepository {
  async fn find_plan(&self, plan_id: i64) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>(
      "SELECT id, user_id, name, created_at FROM workout_plans WHERE id = ?1",
    )
    .bind(plan_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(plan)
  }

  async fn find_plans_by_user(&self, user_id: &str) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>(
      "SELECT id, user_id, name, created_at FROM workout_plans WHERE user_id = ?1 ORDER BY id ASC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(plans)
  }

  async fn find_sessions_by_plan(&self, plan_id: i64) -> Result<Vec<SetRow>> {
    let rows = sqlx::query_as::<_, SetRow>(SESSIONS_BY_PLAN)
      .bind(plan_id)
      .fetch_all(&self.pool)
      .await?;

    debug!(plan_id, rows = rows.len(), "fetched session rows");
    Ok(rows)
  }

  async fn find_total_weight_series_by_plan(
    &self,
    plan_id: i64,
    policy: MergePolicy,
  ) -> Result<TotalWeightSeries> {
    let workouts = self.find_workouts_by_plan(plan_id).await?;
    TotalWeightSeries::from_workouts(&workouts, policy)
  }

  async fn find_plan_snapshot(&self, plan_id: i64) -> Result<PlanSnapshot> {
    let mut tx = self.pool.begin().await?;

    let rows = sqlx::query_as::<_, SetRow>(SESSIONS_BY_PLAN)
      .bind(plan_id)
      .fetch_all(&mut *tx)
      .await?;
    let workouts = sqlx::query_as::<_, Workout>(WORKOUTS_BY_PLAN)
      .bind(plan_id)
      .fetch_all(&mut *tx)
      .await?;

    tx.commit().await?;
    debug!(plan_id, rows = rows.len(), workouts = workouts.len(), "fetched plan snapshot");
    Ok(PlanSnapshot { rows, workouts })
  }

  async fn create_workout_with_sets(
    &self,
    plan_id: i64,
    performed_at: DateTime<Utc>,
    total_weight: f64,
    sets: &[NewSetRecord],
    unique_session: bool,
  ) -> Result<i64> {
    let mut tx = self.pool.begin().await?;

    if unique_session {
      let date = format_session_date(&performed_at);
      let existing: Vec<DateTime<Utc>> =
        sqlx::query_scalar("SELECT performed_at FROM workouts WHERE plan_id = ?1")
          .bind(plan_id)
          .fetch_all(&mut *tx)
          .await?;
      if existing.iter().any(|at| format_session_date(at) == date) {
        warn!(plan_id, %date, "session already recorded for this date");
        return Err(WorkoutError::DuplicateSession { date });
      }
    }

    let workout_id = sqlx::query(
      "INSERT INTO workouts (plan_id, total_weight, performed_at) VALUES (?1, ?2, ?3)",
    )
    .bind(plan_id)
    .bind(total_weight)
    .bind(performed_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for set in sets {
      sqlx::query(
        r#"
        INSERT INTO workout_details (workout_id, exercise_id, name, set_number, weight, reps)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
      )
      .bind(workout_id)
      .bind(&set.exercise_id)
      .bind(&set.exercise_name)
      .bind(set.set_number)
      .bind(set.weight)
      .bind(set.reps)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(workout_id)
  }
}
