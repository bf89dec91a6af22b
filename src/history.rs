//! Workout history aggregation
//!
//! Folds flat set rows into per-session buckets keyed by the formatted session
//! date, then by exercise name, keeping the order in which dates and exercise
//! names were first seen. Rows are expected pre-sorted by date ascending; no
//! sorting happens here.
//!
//! Key collisions are never resolved implicitly. When two different workouts
//! format to the same date string, the `MergePolicy` decides what happens.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WorkoutError};
use crate::models::{Plan, SetRow};

/// Session key format, e.g. "08-01-2024 10:00:00"
pub const SESSION_DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

pub fn format_session_date(date: &DateTime<Utc>) -> String {
    date.format(SESSION_DATE_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
/// Merge Policy: what to do when two sources claim the same key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Refuse the merge with `DuplicateSession` / `DuplicatePlan`
    #[default]
    Reject,
    /// Keep whatever arrived first and drop the later source
    KeepFirst,
    /// Fold the later source into the existing bucket
    Combine,
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::KeepFirst => write!(f, "keep_first"),
            Self::Combine => write!(f, "combine"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reject" => Ok(Self::Reject),
            "keep_first" => Ok(Self::KeepFirst),
            "combine" => Ok(Self::Combine),
            _ => Err(format!("Unknown merge policy: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
/// History Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    pub set: i64,
    pub reps: i64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSets {
    pub name: String,
    pub sets: Vec<SetEntry>,
}

/// One date bucket: the session's total weight plus its sets grouped by exercise
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBucket {
    pub date: String,
    pub total_weight: f64,
    pub exercises: Vec<ExerciseSets>,
    workout_ids: Vec<i64>,
}

impl SessionBucket {
    fn new(date: String, workout_id: i64, total_weight: f64) -> Self {
        Self {
            date,
            total_weight,
            exercises: Vec::new(),
            workout_ids: vec![workout_id],
        }
    }

    /// Workouts folded into this bucket (more than one only under `Combine`)
    pub fn workout_ids(&self) -> &[i64] {
        &self.workout_ids
    }

    pub fn exercise(&self, name: &str) -> Option<&[SetEntry]> {
        self.exercises
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.sets.as_slice())
    }

    fn push_set(&mut self, exercise: &str, entry: SetEntry) {
        match self.exercises.iter_mut().find(|e| e.name == exercise) {
            Some(existing) => existing.sets.push(entry),
            None => self.exercises.push(ExerciseSets {
                name: exercise.to_string(),
                sets: vec![entry],
            }),
        }
    }

    fn absorb(&mut self, other: SessionBucket) {
        self.total_weight += other.total_weight;
        self.workout_ids.extend(other.workout_ids);
        for exercise in other.exercises {
            for entry in exercise.sets {
                self.push_set(&exercise.name, entry);
            }
        }
    }
}

impl Serialize for SessionBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Exercises<'a>(&'a [ExerciseSets]);

        impl Serialize for Exercises<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for exercise in self.0 {
                    map.serialize_entry(&exercise.name, &exercise.sets)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("total_weight", &self.total_weight)?;
        map.serialize_entry("exercises", &Exercises(&self.exercises))?;
        map.end()
    }
}

/// Date-keyed view of one plan's sessions. Built per query, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseHistory {
    sessions: Vec<SessionBucket>,
    index: HashMap<String, usize>,
}

impl ExerciseHistory {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions(&self) -> &[SessionBucket] {
        &self.sessions
    }

    pub fn get(&self, date: &str) -> Option<&SessionBucket> {
        self.index.get(date).map(|&i| &self.sessions[i])
    }

    /// Session dates in the order they were first seen
    pub fn dates(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.date.clone()).collect()
    }

    fn insert(&mut self, bucket: SessionBucket) -> usize {
        let position = self.sessions.len();
        self.index.insert(bucket.date.clone(), position);
        self.sessions.push(bucket);
        position
    }
}

impl Serialize for ExerciseHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sessions.len()))?;
        for session in &self.sessions {
            map.serialize_entry(&session.date, session)?;
        }
        map.end()
    }
}

/// Plan name -> history, for listing all of a user's workouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanHistory {
    plans: Vec<(String, ExerciseHistory)>,
}

impl PlanHistory {
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn get(&self, plan_name: &str) -> Option<&ExerciseHistory> {
        self.plans
            .iter()
            .find(|(name, _)| name == plan_name)
            .map(|(_, history)| history)
    }

    pub fn plan_names(&self) -> Vec<&str> {
        self.plans.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Serialize for PlanHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.plans.len()))?;
        for (name, history) in &self.plans {
            map.serialize_entry(name, history)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
/// Session Aggregator
// ---------------------------------------------------------------------------

/// Build a date -> exercise -> sets history from flat set rows.
/// An empty input yields an empty history.
pub fn aggregate_sessions(rows: &[SetRow], policy: MergePolicy) -> Result<ExerciseHistory> {
    let mut history = ExerciseHistory::default();

    for row in rows {
        let date = format_session_date(&row.performed_at);

        let position = match history.index.get(&date).copied() {
            None => history.insert(SessionBucket::new(
                date,
                row.workout_id,
                row.session_total_weight,
            )),
            Some(position) => {
                let bucket = &mut history.sessions[position];
                if !bucket.workout_ids.contains(&row.workout_id) {
                    match policy {
                        MergePolicy::Reject => {
                            return Err(WorkoutError::DuplicateSession { date });
                        }
                        MergePolicy::KeepFirst => continue,
                        MergePolicy::Combine => {
                            bucket.workout_ids.push(row.workout_id);
                            bucket.total_weight += row.session_total_weight;
                        }
                    }
                }
                position
            }
        };

        history.sessions[position].push_set(
            &row.exercise_name,
            SetEntry {
                set: row.set_number,
                reps: row.reps,
                weight: row.weight,
            },
        );
    }

    debug!(rows = rows.len(), sessions = history.len(), "aggregated sessions");
    Ok(history)
}

/// Fold `source` into `target` date by date under `policy`
pub fn merge_history(
    target: &mut ExerciseHistory,
    source: ExerciseHistory,
    policy: MergePolicy,
) -> Result<()> {
    for bucket in source.sessions {
        match target.index.get(&bucket.date).copied() {
            None => {
                target.insert(bucket);
            }
            Some(position) => match policy {
                MergePolicy::Reject => {
                    return Err(WorkoutError::DuplicateSession { date: bucket.date });
                }
                MergePolicy::KeepFirst => {}
                MergePolicy::Combine => target.sessions[position].absorb(bucket),
            },
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
/// History Reducer
// ---------------------------------------------------------------------------

/// Combine per-plan rows into a plan-name keyed history.
/// Plans without any rows are left out of the result.
pub fn reduce_plan_histories(
    sources: Vec<(Plan, Vec<SetRow>)>,
    policy: MergePolicy,
) -> Result<PlanHistory> {
    let mut result = PlanHistory::default();

    for (plan, rows) in sources {
        if rows.is_empty() {
            debug!(plan_id = plan.id, "plan has no workouts, skipping");
            continue;
        }

        let history = aggregate_sessions(&rows, policy)?;

        match result.plans.iter_mut().find(|(name, _)| *name == plan.name) {
            None => result.plans.push((plan.name, history)),
            Some((_, existing)) => match policy {
                MergePolicy::Reject => {
                    return Err(WorkoutError::DuplicatePlan { name: plan.name });
                }
                MergePolicy::KeepFirst => {}
                MergePolicy::Combine => merge_history(existing, history, policy)?,
            },
        }
    }

    Ok(result)
}
