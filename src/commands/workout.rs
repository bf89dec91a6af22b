//! Workout commands: store a session, list history, build progression charts
//! and export a plan's history

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::chart::ChartSpec;
use crate::config::AppConfig;
use crate::error::{Result, WorkoutError};
use crate::history::{
  aggregate_sessions, reduce_plan_histories, ExerciseHistory, MergePolicy, PlanHistory,
};
use crate::models::Plan;
use crate::progression::{ensure_enough_sessions, ChartKind, MaxWeightSeries, TotalWeightSeries};
use crate::repository::WorkoutRepository;
use crate::submission::{expand_sets, total_weight, validate_submission, WorkoutSubmission};

pub const INSUFFICIENT_DATA_MESSAGE: &str =
  "You have to complete at least 2 of this workout to check progression!";
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

/// ---------------------------------------------------------------------------
/// Views
/// ---------------------------------------------------------------------------

/// One plan's history. `workouts` is absent when nothing was recorded yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanHistoryView {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub workouts: Option<ExerciseHistory>,
}

/// Progression page data. Either `chart` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionView {
  pub plan: String,
  pub id: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub chart: Option<ChartSpec>,
  #[serde(rename = "chartType", skip_serializing_if = "Option::is_none")]
  pub chart_kind: Option<ChartKind>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ProgressionView {
  fn soft_error(plan: &Plan, message: &str) -> Self {
    Self {
      plan: plan.name.clone(),
      id: plan.id,
      chart: None,
      chart_kind: None,
      error: Some(message.to_string()),
    }
  }
}

/// Aggregated plan data handed to the document export step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanExport {
  pub plan: String,
  /// Suggested file stem, e.g. "upper_body_a"
  pub file_stem: String,
  pub generated_at: DateTime<Utc>,
  pub history: ExerciseHistory,
}

/// Lowercase ASCII slug with `_` between words
pub fn slugify(name: &str) -> String {
  name
    .split(|c: char| !c.is_ascii_alphanumeric())
    .filter(|part| !part.is_empty())
    .map(|part| part.to_ascii_lowercase())
    .collect::<Vec<_>>()
    .join("_")
}

/// ---------------------------------------------------------------------------
/// Commands
/// ---------------------------------------------------------------------------

pub struct WorkoutCommands<R: WorkoutRepository> {
  repo: R,
  config: AppConfig,
}

impl<R: WorkoutRepository> WorkoutCommands<R> {
  pub fn new(repo: R, config: AppConfig) -> Self {
    Self { repo, config }
  }

  pub fn repository(&self) -> &R {
    &self.repo
  }

  async fn require_plan(&self, plan_id: i64) -> Result<Plan> {
    self
      .repo
      .find_plan(plan_id)
      .await?
      .ok_or(WorkoutError::PlanNotFound(plan_id))
  }

  /// Validate, total and persist a submitted workout, timestamped now
  pub async fn store_workout(&self, submission: &WorkoutSubmission) -> Result<i64> {
    self.store_workout_at(submission, Utc::now()).await
  }

  /// Nothing is written unless every input passes validation. Unless the
  /// merge policy combines sessions, a second workout of the plan in the same
  /// second is refused so the history stays readable.
  pub async fn store_workout_at(
    &self,
    submission: &WorkoutSubmission,
    performed_at: DateTime<Utc>,
  ) -> Result<i64> {
    if let Err(e) = validate_submission(submission, &self.config.validation) {
      warn!(plan_id = submission.workout_plan_id, "workout rejected by validation");
      return Err(e);
    }

    let plan = self.require_plan(submission.workout_plan_id).await?;
    let total = total_weight(submission)?;
    let sets = expand_sets(submission)?;

    let unique_session = self.config.merge_policy != MergePolicy::Combine;
    let workout_id = self
      .repo
      .create_workout_with_sets(plan.id, performed_at, total, &sets, unique_session)
      .await
      .inspect_err(|e| {
        if !e.is_user_facing() {
          error!(plan_id = plan.id, error = %e, "failed to store workout")
        }
      })?;

    info!(
      workout_id,
      plan_id = plan.id,
      sets = sets.len(),
      total_weight = total,
      "stored workout"
    );
    Ok(workout_id)
  }

  pub async fn plan_history(&self, plan_id: i64) -> Result<PlanHistoryView> {
    let plan = self.require_plan(plan_id).await?;
    let rows = self.repo.find_sessions_by_plan(plan_id).await?;

    let workouts = if rows.is_empty() {
      None
    } else {
      Some(aggregate_sessions(&rows, self.config.merge_policy)?)
    };

    Ok(PlanHistoryView {
      name: plan.name,
      workouts,
    })
  }

  /// Every plan of the user that has at least one recorded workout
  pub async fn user_history(&self, user_id: &str) -> Result<PlanHistory> {
    let plans = self.repo.find_plans_by_user(user_id).await?;

    let mut sources = Vec::with_capacity(plans.len());
    for plan in plans {
      let rows = self.repo.find_sessions_by_plan(plan.id).await?;
      sources.push((plan, rows));
    }

    reduce_plan_histories(sources, self.config.merge_policy)
  }

  /// Build the requested progression chart. Too few sessions and unknown
  /// chart kinds come back as a message on the view, not as an error.
  pub async fn progression(&self, plan_id: i64, chart: Option<&str>) -> Result<ProgressionView> {
    let plan = self.require_plan(plan_id).await?;
    let snapshot = self.repo.find_plan_snapshot(plan_id).await?;
    let history = aggregate_sessions(&snapshot.rows, self.config.merge_policy)?;

    if let Err(e) = ensure_enough_sessions(plan.id, &plan.name, history.len()) {
      warn!(error = %e, "progression requested without enough sessions");
      return Ok(ProgressionView::soft_error(&plan, INSUFFICIENT_DATA_MESSAGE));
    }

    let kind = match ChartKind::from_query(chart) {
      Ok(kind) => kind,
      Err(e) => {
        warn!(plan_id, error = %e, "unknown chart kind requested");
        return Ok(ProgressionView::soft_error(&plan, GENERIC_ERROR_MESSAGE));
      }
    };

    let chart_spec = match kind {
      ChartKind::MaxLifts => {
        ChartSpec::max_lifts(&MaxWeightSeries::from_history(&history), &self.config.colors)
      }
      ChartKind::TotalWeight => {
        let series = TotalWeightSeries::from_workouts(&snapshot.workouts, self.config.merge_policy)?;
        ChartSpec::total_weight(&series)
      }
    };

    Ok(ProgressionView {
      plan: plan.name,
      id: plan.id,
      chart: Some(chart_spec),
      chart_kind: Some(kind),
      error: None,
    })
  }

  pub async fn export_plan(&self, plan_id: i64) -> Result<PlanExport> {
    let plan = self.require_plan(plan_id).await?;
    let rows = self.repo.find_sessions_by_plan(plan_id).await?;
    let history = aggregate_sessions(&rows, self.config.merge_policy)?;

    info!(plan_id, sessions = history.len(), "exporting plan history");
    Ok(PlanExport {
      file_stem: slugify(&plan.name),
      plan: plan.name,
      generated_at: Utc::now(),
      history,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chart::{hashed_color, DatasetColors};
  use crate::history::MergePolicy;
  use crate::repository::SqliteWorkoutRepository;
  use crate::test_utils::{at, seed_plan, seed_workout, setup_test_db, teardown_test_db};
  use crate::validation::{ValidationRules, NEGATIVE_INPUT_MESSAGE};
  use std::collections::BTreeMap;

  fn submission(plan_id: i64) -> WorkoutSubmission {
    WorkoutSubmission {
      workout_plan_id: plan_id,
      exercise_ids: vec!["1".into(), "2".into()],
      names: BTreeMap::from([
        ("1".to_string(), "Bench Press".to_string()),
        ("2".to_string(), "Row".to_string()),
      ]),
      weight: BTreeMap::from([
        ("1".to_string(), vec![80.0, 85.0]),
        ("2".to_string(), vec![60.0]),
      ]),
      reps: BTreeMap::from([("1".to_string(), vec![5, 5]), ("2".to_string(), vec![8])]),
    }
  }

  async fn commands() -> (WorkoutCommands<SqliteWorkoutRepository>, sqlx::SqlitePool) {
    let pool = setup_test_db().await;
    let repo = SqliteWorkoutRepository::new(pool.clone());
    (WorkoutCommands::new(repo, AppConfig::default()), pool)
  }

  async fn count(pool: &sqlx::SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
      .fetch_one(pool)
      .await
      .expect("Failed to count rows")
  }

  #[tokio::test]
  async fn test_store_workout_persists_sets_and_total() {
    let (commands, pool) = commands().await;
    let plan = seed_plan(commands.repository(), "user-1", "Push").await;

    let id = commands
      .store_workout_at(&submission(plan.id), at("2024-01-01 10:00:00"))
      .await
      .unwrap();
    assert!(id > 0);
    assert_eq!(count(&pool, "workout_details").await, 3);

    let view = commands.plan_history(plan.id).await.unwrap();
    let history = view.workouts.unwrap();
    let bucket = history.get("01-01-2024 10:00:00").unwrap();
    assert_eq!(bucket.total_weight, 80.0 * 5.0 + 85.0 * 5.0 + 60.0 * 8.0);
    assert_eq!(bucket.exercise("Bench Press").unwrap().len(), 2);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_store_workout_rejects_negative_without_writing() {
    let (commands, pool) = commands().await;
    let plan = seed_plan(commands.repository(), "user-1", "Push").await;

    let mut bad = submission(plan.id);
    bad.reps.insert("2".into(), vec![-8]);

    match commands.store_workout(&bad).await {
      Err(WorkoutError::Validation(message)) => assert_eq!(message, NEGATIVE_INPUT_MESSAGE),
      other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(count(&pool, "workouts").await, 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_store_workout_zero_weight_depends_on_rules() {
    let pool = setup_test_db().await;
    let repo = SqliteWorkoutRepository::new(pool.clone());
    let plan = seed_plan(&repo, "user-1", "Core").await;

    let mut bodyweight = submission(plan.id);
    bodyweight.weight.insert("2".into(), vec![0.0]);

    let lenient = WorkoutCommands::new(repo.clone(), AppConfig::default());
    assert!(lenient.store_workout(&bodyweight).await.is_ok());

    // Weights arrive as a sequence; only scalar fields are subject to the zero rule
    let mut zero_id = submission(plan.id);
    zero_id.exercise_ids = vec!["0".into()];
    zero_id.names = BTreeMap::from([("0".to_string(), "Plank".to_string())]);
    zero_id.weight = BTreeMap::from([("0".to_string(), vec![0.0])]);
    zero_id.reps = BTreeMap::from([("0".to_string(), vec![1])]);

    let strict = WorkoutCommands::new(
      repo,
      AppConfig {
        validation: ValidationRules { reject_zero: true },
        ..AppConfig::default()
      },
    );
    assert!(matches!(
      strict.store_workout(&zero_id).await,
      Err(WorkoutError::Validation(_))
    ));
    assert_eq!(count(&pool, "workouts").await, 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_store_workout_unknown_plan() {
    let (commands, pool) = commands().await;
    assert!(matches!(
      commands.store_workout(&submission(99)).await,
      Err(WorkoutError::PlanNotFound(99))
    ));
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_store_workout_missing_name_is_lookup_error() {
    let (commands, pool) = commands().await;
    let plan = seed_plan(commands.repository(), "user-1", "Push").await;

    let mut broken = submission(plan.id);
    broken.names.remove("2");
    broken.names.insert("3".into(), "Curl".into());

    assert!(matches!(
      commands.store_workout(&broken).await,
      Err(WorkoutError::Lookup { .. })
    ));
    assert_eq!(count(&pool, "workouts").await, 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_plan_history_without_workouts_has_name_only() {
    let (commands, pool) = commands().await;
    let plan = seed_plan(commands.repository(), "user-1", "Legs").await;

    let view = commands.plan_history(plan.id).await.unwrap();
    assert_eq!(view.name, "Legs");
    assert!(view.workouts.is_none());
    assert_eq!(serde_json::to_value(&view).unwrap(), serde_json::json!({"name": "Legs"}));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_user_history_skips_empty_plans() {
    let (commands, pool) = commands().await;
    let repo = commands.repository();
    let push = seed_plan(repo, "user-1", "Push").await;
    seed_plan(repo, "user-1", "Pull").await;
    let other = seed_plan(repo, "user-2", "Legs").await;

    seed_workout(repo, push.id, at("2024-01-01 10:00:00"), &[("Bench Press", vec![(80.0, 5)])]).await;
    seed_workout(repo, other.id, at("2024-01-01 10:00:00"), &[("Squat", vec![(100.0, 5)])]).await;

    let history = commands.user_history("user-1").await.unwrap();
    assert_eq!(history.plan_names(), vec!["Push"]);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_user_history_duplicate_plan_names_follow_policy() {
    let pool = setup_test_db().await;
    let repo = SqliteWorkoutRepository::new(pool.clone());
    let first = seed_plan(&repo, "user-1", "Full Body").await;
    let second = seed_plan(&repo, "user-1", "Full Body").await;
    seed_workout(&repo, first.id, at("2024-01-01 10:00:00"), &[("Squat", vec![(100.0, 5)])]).await;
    seed_workout(&repo, second.id, at("2024-01-02 10:00:00"), &[("Squat", vec![(105.0, 5)])]).await;

    let rejecting = WorkoutCommands::new(repo.clone(), AppConfig::default());
    assert!(matches!(
      rejecting.user_history("user-1").await,
      Err(WorkoutError::DuplicatePlan { .. })
    ));

    let combining = WorkoutCommands::new(
      repo,
      AppConfig {
        merge_policy: MergePolicy::Combine,
        ..AppConfig::default()
      },
    );
    let history = combining.user_history("user-1").await.unwrap();
    assert_eq!(history.get("Full Body").unwrap().len(), 2);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_progression_with_one_session_is_soft_error() {
    let (commands, pool) = commands().await;
    let plan = seed_plan(commands.repository(), "user-1", "Push").await;
    seed_workout(commands.repository(), plan.id, at("2024-01-01 10:00:00"), &[("Bench Press", vec![(80.0, 5)])]).await;

    let view = commands.progression(plan.id, None).await.unwrap();
    assert_eq!(view.plan, "Push");
    assert_eq!(view.id, plan.id);
    assert!(view.chart.is_none());
    assert_eq!(view.error.as_deref(), Some(INSUFFICIENT_DATA_MESSAGE));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_progression_unknown_kind_is_soft_error() {
    let (commands, pool) = commands().await;
    let repo = commands.repository();
    let plan = seed_plan(repo, "user-1", "Push").await;
    seed_workout(repo, plan.id, at("2024-01-01 10:00:00"), &[("Bench Press", vec![(80.0, 5)])]).await;
    seed_workout(repo, plan.id, at("2024-01-08 10:00:00"), &[("Bench Press", vec![(90.0, 3)])]).await;

    let view = commands.progression(plan.id, Some("pie")).await.unwrap();
    assert_eq!(view.error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
    assert!(view.chart_kind.is_none());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_progression_max_lifts_default() {
    let (commands, pool) = commands().await;
    let repo = commands.repository();
    let plan = seed_plan(repo, "user-1", "Push").await;
    seed_workout(
      repo,
      plan.id,
      at("2024-01-01 10:00:00"),
      &[("Bench Press", vec![(80.0, 5), (85.0, 5)]), ("Dips", vec![(10.0, 10)])],
    )
    .await;
    seed_workout(repo, plan.id, at("2024-01-08 10:00:00"), &[("Bench Press", vec![(90.0, 3)])]).await;

    let view = commands.progression(plan.id, None).await.unwrap();
    assert!(view.error.is_none());
    assert_eq!(view.chart_kind, Some(ChartKind::MaxLifts));

    let chart = view.chart.unwrap();
    assert_eq!(chart.labels, vec!["01-01-2024 10:00:00", "08-01-2024 10:00:00"]);
    assert_eq!(chart.datasets[0].data, vec![Some(85.0), Some(90.0)]);
    assert_eq!(chart.datasets[0].border_color, hashed_color("Bench Press"));
    assert_eq!(chart.datasets[1].data, vec![Some(10.0), None]);
    assert_eq!(chart.options.y_max(), Some(100.0));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_progression_total_weight_uses_palette_free_bar_chart() {
    let pool = setup_test_db().await;
    let repo = SqliteWorkoutRepository::new(pool.clone());
    let plan = seed_plan(&repo, "user-1", "Legs").await;
    seed_workout(&repo, plan.id, at("2024-03-01 08:00:00"), &[("Squat", vec![(100.0, 5)])]).await;
    seed_workout(&repo, plan.id, at("2024-03-04 08:00:00"), &[("Squat", vec![(110.0, 5), (110.0, 5)])]).await;

    let commands = WorkoutCommands::new(
      repo,
      AppConfig {
        colors: DatasetColors::Palette(vec!["#123456".into()]),
        ..AppConfig::default()
      },
    );
    let view = commands.progression(plan.id, Some("total-weight")).await.unwrap();
    assert_eq!(view.chart_kind, Some(ChartKind::TotalWeight));

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["chartType"], "total-weight");
    assert!(json.get("error").is_none());

    let chart = view.chart.unwrap();
    assert_eq!(chart.datasets.len(), 1);
    assert_eq!(chart.datasets[0].data, vec![Some(500.0), Some(1100.0)]);
    assert_eq!(chart.datasets[0].border_color, "rgba(0, 0, 0, 0.9)");
    assert_eq!(chart.options.y_max(), Some(1400.0));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_progression_unknown_plan_is_hard_error() {
    let (commands, pool) = commands().await;
    assert!(matches!(
      commands.progression(7, None).await,
      Err(WorkoutError::PlanNotFound(7))
    ));
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_export_plan() {
    let (commands, pool) = commands().await;
    let repo = commands.repository();
    let plan = seed_plan(repo, "user-1", "Upper Body - A").await;
    seed_workout(repo, plan.id, at("2024-01-01 10:00:00"), &[("Bench Press", vec![(80.0, 5)])]).await;

    let export = commands.export_plan(plan.id).await.unwrap();
    assert_eq!(export.plan, "Upper Body - A");
    assert_eq!(export.file_stem, "upper_body_a");
    assert_eq!(export.history.len(), 1);

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["history"]["01-01-2024 10:00:00"]["total_weight"], 400.0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_double_submit_within_one_second_keeps_history_readable() {
    let (commands, pool) = commands().await;
    let plan = seed_plan(commands.repository(), "user-1", "Push").await;
    let first = at("2024-01-01 10:00:00");

    commands.store_workout_at(&submission(plan.id), first).await.unwrap();
    let second = commands
      .store_workout_at(&submission(plan.id), first + chrono::Duration::milliseconds(300))
      .await;
    match second {
      Err(e @ WorkoutError::DuplicateSession { .. }) => assert!(e.is_user_facing()),
      other => panic!("expected duplicate session, got {:?}", other),
    }
    assert_eq!(count(&pool, "workouts").await, 1);

    let view = commands.plan_history(plan.id).await.unwrap();
    assert_eq!(view.workouts.unwrap().len(), 1);
    let progression = commands.progression(plan.id, None).await.unwrap();
    assert_eq!(progression.error.as_deref(), Some(INSUFFICIENT_DATA_MESSAGE));
    assert_eq!(commands.export_plan(plan.id).await.unwrap().history.len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_combine_policy_folds_same_second_workouts_in_both_charts() {
    let pool = setup_test_db().await;
    let commands = WorkoutCommands::new(
      SqliteWorkoutRepository::new(pool.clone()),
      AppConfig {
        merge_policy: MergePolicy::Combine,
        ..AppConfig::default()
      },
    );
    let plan = seed_plan(commands.repository(), "user-1", "Push").await;
    let first = at("2024-01-01 10:00:00");

    commands.store_workout_at(&submission(plan.id), first).await.unwrap();
    commands
      .store_workout_at(&submission(plan.id), first + chrono::Duration::milliseconds(300))
      .await
      .unwrap();
    commands
      .store_workout_at(&submission(plan.id), at("2024-01-08 10:00:00"))
      .await
      .unwrap();

    let history = commands.plan_history(plan.id).await.unwrap().workouts.unwrap();
    assert_eq!(history.len(), 2);

    let max_lifts = commands.progression(plan.id, Some("max-lifts")).await.unwrap();
    let totals = commands.progression(plan.id, Some("total-weight")).await.unwrap();
    let max_labels = max_lifts.chart.unwrap().labels;
    let total_chart = totals.chart.unwrap();
    assert_eq!(total_chart.labels, max_labels);
    assert_eq!(total_chart.labels, history.dates());

    let session = 80.0 * 5.0 + 85.0 * 5.0 + 60.0 * 8.0;
    assert_eq!(total_chart.datasets[0].data, vec![Some(2.0 * session), Some(session)]);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_slugify() {
    assert_eq!(slugify("Push Day"), "push_day");
    assert_eq!(slugify("  Legs & Core!! "), "legs_core");
    assert_eq!(slugify("5x5"), "5x5");
  }
}
