//! Parsed workout form and the computations that run before it is persisted

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkoutError};
use crate::models::NewSetRecord;
use crate::validation::{ensure_valid, FormField, ValidationRules};

/// A submitted workout, already decoded from the form.
/// `weight` and `reps` are keyed by exercise id and index-aligned by set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkoutSubmission {
  pub workout_plan_id: i64,
  pub exercise_ids: Vec<String>,
  pub names: BTreeMap<String, String>,
  pub weight: BTreeMap<String, Vec<f64>>,
  pub reps: BTreeMap<String, Vec<i64>>,
}

impl WorkoutSubmission {
  /// Resolve the submission into the validator's groups:
  /// names, exercise ids, weights, reps.
  pub fn field_groups(&self) -> Vec<Vec<FormField>> {
    let names = self.names.values().map(|n| FormField::text(n.as_str())).collect();
    let ids = self.exercise_ids.iter().map(|id| FormField::text(id.as_str())).collect();
    let weights = self
      .weight
      .values()
      .map(|w| FormField::Sequence(w.clone()))
      .collect();
    let reps = self
      .reps
      .values()
      .map(|r| FormField::Sequence(r.iter().map(|&n| n as f64).collect()))
      .collect();

    vec![names, ids, weights, reps]
  }

  fn sets_for(&self, exercise_id: &str) -> Result<(&[f64], &[i64])> {
    let weights = self.weight.get(exercise_id).ok_or_else(|| lookup(exercise_id, "weight"))?;
    let reps = self.reps.get(exercise_id).ok_or_else(|| lookup(exercise_id, "reps"))?;
    if weights.len() != reps.len() {
      return Err(lookup(exercise_id, "reps"));
    }
    Ok((weights, reps))
  }
}

fn lookup(exercise_id: &str, field: &str) -> WorkoutError {
  WorkoutError::Lookup {
    exercise_id: exercise_id.to_string(),
    field: field.to_string(),
  }
}

/// Reject the whole submission if any field is missing or negative
pub fn validate_submission(submission: &WorkoutSubmission, rules: &ValidationRules) -> Result<()> {
  ensure_valid(&submission.field_groups(), rules)
}

/// Sum of weight x reps over every set of every submitted exercise
pub fn total_weight(submission: &WorkoutSubmission) -> Result<f64> {
  let mut total = 0.0;
  for exercise_id in &submission.exercise_ids {
    let (weights, reps) = submission.sets_for(exercise_id)?;
    total += weights
      .iter()
      .zip(reps)
      .map(|(w, &r)| w * r as f64)
      .sum::<f64>();
  }
  Ok(total)
}

/// One record per submitted set, numbered 1..N per exercise in submission order
pub fn expand_sets(submission: &WorkoutSubmission) -> Result<Vec<NewSetRecord>> {
  let mut records = Vec::new();
  for exercise_id in &submission.exercise_ids {
    let name = submission
      .names
      .get(exercise_id)
      .ok_or_else(|| lookup(exercise_id, "name"))?;
    let (weights, reps) = submission.sets_for(exercise_id)?;

    records.extend(weights.iter().zip(reps).enumerate().map(|(i, (&weight, &reps))| {
      NewSetRecord {
        exercise_id: exercise_id.clone(),
        exercise_name: name.clone(),
        set_number: i as i64 + 1,
        weight,
        reps,
      }
    }));
  }
  Ok(records)
}
