//! Progression series extraction
//!
//! Two derivations feed the progression charts:
//! - max lifts: best weight per exercise per session date, taken from the
//!   aggregated history
//! - total weight: one weight x reps total per session, read straight from the
//!   stored workouts
//!
//! Key principles:
//! - A missing session for an exercise is a gap (`None`), never zero load
//! - Labels follow the history's date order, which is submission order
//! - Fewer than two sessions is reported as insufficient data, not a crash

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkoutError};
use crate::history::{format_session_date, ExerciseHistory, MergePolicy};
use crate::models::Workout;

/// Sessions needed before any progression chart makes sense
pub const MIN_SESSIONS: usize = 2;

// ---------------------------------------------------------------------------
/// Chart Kind: which progression the caller asked for
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum ChartKind {
    /// Best weight per exercise per session
    #[default]
    MaxLifts,
    /// Total weight x reps per session
    TotalWeight,
}

impl ChartKind {
    /// Parse the request parameter; an absent parameter means max lifts
    pub fn from_query(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(Self::default()),
            Some(raw) => raw.parse(),
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxLifts => write!(f, "max-lifts"),
            Self::TotalWeight => write!(f, "total-weight"),
        }
    }
}

impl std::str::FromStr for ChartKind {
    type Err = WorkoutError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "max-lifts" => Ok(Self::MaxLifts),
            "total-weight" => Ok(Self::TotalWeight),
            _ => Err(WorkoutError::UnknownChartKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
/// Session Count Guard
// ---------------------------------------------------------------------------

pub fn ensure_enough_sessions(plan_id: i64, plan_name: &str, sessions: usize) -> Result<()> {
    if sessions < MIN_SESSIONS {
        return Err(WorkoutError::InsufficientData {
            plan_id,
            plan_name: plan_name.to_string(),
            sessions,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
/// Max Weight Series: exercise -> date -> best weight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseMaxes {
    pub name: String,
    pub by_date: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaxWeightSeries {
    /// Every session date, in history order. This is the chart's X axis.
    pub labels: Vec<String>,
    pub exercises: Vec<ExerciseMaxes>,
}

impl MaxWeightSeries {
    pub fn from_history(history: &ExerciseHistory) -> Self {
        let mut exercises: Vec<ExerciseMaxes> = Vec::new();

        for session in history.sessions() {
            for exercise in &session.exercises {
                let entry = match exercises.iter().position(|e| e.name == exercise.name) {
                    Some(i) => &mut exercises[i],
                    None => {
                        exercises.push(ExerciseMaxes {
                            name: exercise.name.clone(),
                            by_date: HashMap::new(),
                        });
                        let last = exercises.len() - 1;
                        &mut exercises[last]
                    }
                };

                for set in &exercise.sets {
                    entry
                        .by_date
                        .entry(session.date.clone())
                        .and_modify(|best| {
                            if set.weight > *best {
                                *best = set.weight;
                            }
                        })
                        .or_insert(set.weight);
                }
            }
        }

        Self {
            labels: history.dates(),
            exercises,
        }
    }

    pub fn max_on(&self, exercise: &str, date: &str) -> Option<f64> {
        self.exercises
            .iter()
            .find(|e| e.name == exercise)
            .and_then(|e| e.by_date.get(date).copied())
    }

    /// One value per label; `None` where the exercise was not performed
    pub fn aligned(&self, exercise: &ExerciseMaxes) -> Vec<Option<f64>> {
        self.labels
            .iter()
            .map(|label| exercise.by_date.get(label).copied())
            .collect()
    }

    /// Highest weight anywhere in the series, 0 when empty
    pub fn observed_max(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|e| e.by_date.values())
            .fold(0.0, |acc: f64, &w| acc.max(w))
    }
}

// ---------------------------------------------------------------------------
/// Total Weight Series: date -> session total
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalWeightPoint {
    pub date: String,
    pub total_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalWeightSeries {
    pub points: Vec<TotalWeightPoint>,
}

impl TotalWeightSeries {
    /// Build from stored workouts, already ordered by date ascending.
    /// One point per session date; workouts sharing a date follow `policy`
    /// the same way the session history does.
    pub fn from_workouts(workouts: &[Workout], policy: MergePolicy) -> Result<Self> {
        let mut points: Vec<TotalWeightPoint> = Vec::with_capacity(workouts.len());

        for workout in workouts {
            let date = format_session_date(&workout.performed_at);
            match points.iter_mut().find(|p| p.date == date) {
                None => points.push(TotalWeightPoint {
                    date,
                    total_weight: workout.total_weight,
                }),
                Some(existing) => match policy {
                    MergePolicy::Reject => return Err(WorkoutError::DuplicateSession { date }),
                    MergePolicy::KeepFirst => {}
                    MergePolicy::Combine => existing.total_weight += workout.total_weight,
                },
            }
        }

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|p| p.date.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.total_weight).collect()
    }

    pub fn observed_max(&self) -> f64 {
        self.points.iter().fold(0.0, |acc: f64, p| acc.max(p.total_weight))
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
