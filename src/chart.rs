//! Renderer-agnostic chart descriptions
//!
//! Produces the Chart.js builder shape (name, type, size, labels, datasets,
//! options) from a progression series. Rendering and export happen elsewhere.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::progression::{MaxWeightSeries, TotalWeightSeries};

/// ---------------------------------------------------------------------------
/// Constants
/// ---------------------------------------------------------------------------

pub const CHART_NAME: &str = "WorkoutProgressionChart";
pub const CHART_WIDTH: u32 = 400;
pub const CHART_HEIGHT: u32 = 200;

/// Y grid step for max-lift charts (kg)
pub const MAX_CHART_STEP: f64 = 10.0;
/// Y grid step for total-weight charts (kg)
pub const TOTAL_CHART_STEP: f64 = 200.0;

const MAX_LIFTS_TITLE: &str = "Max Weight per Exercise";
const TOTAL_WEIGHT_TITLE: &str = "Total Weight per Workout";
const TOTAL_WEIGHT_LABEL: &str = "Total Weight";
const TOTAL_WEIGHT_BORDER: &str = "rgba(0, 0, 0, 0.9)";
const TOTAL_WEIGHT_FILL: &str = "rgba(234, 90, 21, 1)";

/// Upper bound of the Y axis: the observed max rounded up to the step, plus
/// one more step so the highest point never sits on the top edge
pub fn y_axis_max(observed_max: f64, step: f64) -> f64 {
  (observed_max / step).ceil() * step + step
}

/// ---------------------------------------------------------------------------
/// Dataset Colors
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "colors", rename_all = "snake_case")]
pub enum DatasetColors {
  /// Color derived from a SHA-256 of the exercise name
  #[default]
  Hashed,
  /// Fixed palette, cycled in dataset order
  Palette(Vec<String>),
}

impl DatasetColors {
  pub fn color_for(&self, exercise: &str, index: usize) -> String {
    match self {
      DatasetColors::Palette(colors) if !colors.is_empty() => colors[index % colors.len()].clone(),
      _ => hashed_color(exercise),
    }
  }
}

/// Same name, same color, every render. Channels stay within 50..=255.
pub fn hashed_color(name: &str) -> String {
  let digest = Sha256::digest(name.as_bytes());
  let channel = |byte: u8| 50 + (byte as u16 % 206);
  format!(
    "rgba({}, {}, {}, 0.7)",
    channel(digest[0]),
    channel(digest[1]),
    channel(digest[2])
  )
}

/// ---------------------------------------------------------------------------
/// Chart Description
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
  Line,
  Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSize {
  pub width: u32,
  pub height: u32,
}

impl Default for ChartSize {
  fn default() -> Self {
    Self {
      width: CHART_WIDTH,
      height: CHART_HEIGHT,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
  pub label: String,
  /// `None` serializes as `null`, a gap the renderer must not interpolate as 0
  pub data: Vec<Option<f64>>,
  pub fill: bool,
  pub border_color: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub border_width: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub background_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleLabel {
  pub display: bool,
  pub label_string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XTicks {
  pub auto_skip: bool,
  pub max_ticks_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YTicks {
  pub begin_at_zero: bool,
  pub max: f64,
  pub step_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XAxis {
  pub scale_label: ScaleLabel,
  pub ticks: XTicks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YAxis {
  pub ticks: YTicks,
  pub scale_label: ScaleLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scales {
  #[serde(rename = "xAxes")]
  pub x_axes: Vec<XAxis>,
  #[serde(rename = "yAxes")]
  pub y_axes: Vec<YAxis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
  pub display: bool,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugins {
  pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
  pub scales: Scales,
  pub plugins: Plugins,
}

impl ChartOptions {
  pub fn new(y_max: f64, step: f64, title: &str) -> Self {
    Self {
      scales: Scales {
        x_axes: vec![XAxis {
          scale_label: ScaleLabel {
            display: true,
            label_string: "Workout Date".to_string(),
          },
          ticks: XTicks {
            auto_skip: true,
            max_ticks_limit: 10,
          },
        }],
        y_axes: vec![YAxis {
          ticks: YTicks {
            begin_at_zero: true,
            max: y_max,
            step_size: step,
          },
          scale_label: ScaleLabel {
            display: true,
            label_string: "Weight (kg)".to_string(),
          },
        }],
      },
      plugins: Plugins {
        title: Title {
          display: true,
          text: title.to_string(),
        },
      },
    }
  }

  pub fn y_max(&self) -> Option<f64> {
    self.scales.y_axes.first().map(|axis| axis.ticks.max)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
  pub name: String,
  #[serde(rename = "type")]
  pub chart_type: ChartType,
  pub size: ChartSize,
  pub labels: Vec<String>,
  pub datasets: Vec<Dataset>,
  pub options: ChartOptions,
}

impl ChartSpec {
  /// Line chart, one dataset per exercise, gaps where an exercise was skipped
  pub fn max_lifts(series: &MaxWeightSeries, colors: &DatasetColors) -> Self {
    let datasets = series
      .exercises
      .iter()
      .enumerate()
      .map(|(i, exercise)| Dataset {
        label: exercise.name.clone(),
        data: series.aligned(exercise),
        fill: false,
        border_color: colors.color_for(&exercise.name, i),
        border_width: None,
        background_color: None,
      })
      .collect();

    let y_max = y_axis_max(series.observed_max(), MAX_CHART_STEP);

    Self {
      name: CHART_NAME.to_string(),
      chart_type: ChartType::Line,
      size: ChartSize::default(),
      labels: series.labels.clone(),
      datasets,
      options: ChartOptions::new(y_max, MAX_CHART_STEP, MAX_LIFTS_TITLE),
    }
  }

  /// Bar chart with a single dataset of per-session totals
  pub fn total_weight(series: &TotalWeightSeries) -> Self {
    let dataset = Dataset {
      label: TOTAL_WEIGHT_LABEL.to_string(),
      data: series.values().into_iter().map(Some).collect(),
      fill: false,
      border_color: TOTAL_WEIGHT_BORDER.to_string(),
      border_width: Some(1),
      background_color: Some(TOTAL_WEIGHT_FILL.to_string()),
    };

    let y_max = y_axis_max(series.observed_max(), TOTAL_CHART_STEP);

    Self {
      name: CHART_NAME.to_string(),
      chart_type: ChartType::Bar,
      size: ChartSize::default(),
      labels: series.labels(),
      datasets: vec![dataset],
      options: ChartOptions::new(y_max, TOTAL_CHART_STEP, TOTAL_WEIGHT_TITLE),
    }
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }
}
