//! Input validation for submitted workouts
//!
//! A submission is resolved into groups of `FormField`s once, at the parsing
//! boundary. The validator then walks every group and rejects the whole
//! submission if any group is empty, any scalar is empty or negative, or any
//! member of a sequence is negative.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WorkoutError};

pub const NEGATIVE_INPUT_MESSAGE: &str = "You cannot set a negative value to weight or repetition!";

/// ---------------------------------------------------------------------------
/// Field Shapes
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
  Number(f64),
  Text(String),
}

impl ScalarValue {
  /// Numeric view of the value. Text counts when it parses as a number.
  pub fn as_number(&self) -> Option<f64> {
    match self {
      ScalarValue::Number(n) => Some(*n),
      ScalarValue::Text(s) => s.trim().parse::<f64>().ok(),
    }
  }

  pub fn is_negative(&self) -> bool {
    self.as_number().is_some_and(|n| n < 0.0)
  }

  pub fn is_zero(&self) -> bool {
    self.as_number().is_some_and(|n| n == 0.0)
  }

  pub fn is_blank(&self) -> bool {
    match self {
      ScalarValue::Number(n) => !n.is_finite(),
      ScalarValue::Text(s) => s.is_empty(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FormField {
  Scalar(ScalarValue),
  Sequence(Vec<f64>),
}

impl FormField {
  pub fn text(value: impl Into<String>) -> Self {
    FormField::Scalar(ScalarValue::Text(value.into()))
  }

  pub fn number(value: f64) -> Self {
    FormField::Scalar(ScalarValue::Number(value))
  }
}

/// ---------------------------------------------------------------------------
/// Rules
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
  /// Treat a scalar `0` as an empty field. Off by default; a zero is a valid
  /// non-negative value unless the product explicitly wants it refused.
  pub reject_zero: bool,
}

impl ValidationRules {
  fn scalar_ok(&self, value: &ScalarValue) -> bool {
    if value.is_negative() || value.is_blank() {
      return false;
    }
    !(self.reject_zero && value.is_zero())
  }
}

/// ---------------------------------------------------------------------------
/// Validator
/// ---------------------------------------------------------------------------

/// All-or-nothing check over every provided collection
pub fn validate_inputs(groups: &[Vec<FormField>], rules: &ValidationRules) -> bool {
  for (index, group) in groups.iter().enumerate() {
    if group.is_empty() {
      debug!(group = index, "empty input group");
      return false;
    }

    for field in group {
      let ok = match field {
        FormField::Scalar(value) => rules.scalar_ok(value),
        FormField::Sequence(values) => values.iter().all(|v| v.is_finite() && *v >= 0.0),
      };
      if !ok {
        debug!(group = index, ?field, "rejected input field");
        return false;
      }
    }
  }
  true
}

/// Same check, reported as the user-facing `WorkoutError::Validation`
pub fn ensure_valid(groups: &[Vec<FormField>], rules: &ValidationRules) -> Result<()> {
  if validate_inputs(groups, rules) {
    Ok(())
  } else {
    Err(WorkoutError::Validation(NEGATIVE_INPUT_MESSAGE.to_string()))
  }
}
