use std::env;

use crate::chart::DatasetColors;
use crate::history::MergePolicy;
use crate::validation::ValidationRules;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://lift-log.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_FILTER: &str = "lift_log=info,sqlx=warn";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  Invalid { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
  pub filter: String,
  pub json: bool,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      filter: DEFAULT_LOG_FILTER.to_string(),
      json: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub database_url: String,
  pub max_connections: u32,
  pub log: LogConfig,
  pub validation: ValidationRules,
  pub merge_policy: MergePolicy,
  pub colors: DatasetColors,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
      log: LogConfig::default(),
      validation: ValidationRules::default(),
      merge_policy: MergePolicy::default(),
      colors: DatasetColors::default(),
    }
  }
}

impl AppConfig {
  /// Read configuration from the environment (call `dotenvy::dotenv()` first)
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    let log = LogConfig {
      filter: env::var("RUST_LOG").unwrap_or(defaults.log.filter),
      json: match env::var("LOG_FORMAT").ok().as_deref() {
        None | Some("text") => false,
        Some("json") => true,
        Some(other) => return Err(invalid("LOG_FORMAT", other)),
      },
    };

    let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
      Ok(raw) => raw
        .parse::<u32>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| invalid("DATABASE_MAX_CONNECTIONS", &raw))?,
      Err(_) => defaults.max_connections,
    };

    let validation = ValidationRules {
      reject_zero: match env::var("VALIDATION_REJECT_ZERO") {
        Ok(raw) => parse_bool(&raw).ok_or_else(|| invalid("VALIDATION_REJECT_ZERO", &raw))?,
        Err(_) => defaults.validation.reject_zero,
      },
    };

    let merge_policy = match env::var("HISTORY_MERGE_POLICY") {
      Ok(raw) => raw
        .parse::<MergePolicy>()
        .map_err(|_| invalid("HISTORY_MERGE_POLICY", &raw))?,
      Err(_) => defaults.merge_policy,
    };

    let colors = match env::var("CHART_PALETTE") {
      Ok(raw) => {
        let palette: Vec<String> = raw
          .split(';')
          .map(str::trim)
          .filter(|c| !c.is_empty())
          .map(String::from)
          .collect();
        if palette.is_empty() {
          return Err(invalid("CHART_PALETTE", &raw));
        }
        DatasetColors::Palette(palette)
      }
      Err(_) => defaults.colors,
    };

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
      max_connections,
      log,
      validation,
      merge_policy,
      colors,
    })
  }
}

fn invalid(key: &str, value: &str) -> ConfigError {
  ConfigError::Invalid {
    key: key.to_string(),
    value: value.to_string(),
  }
}

fn parse_bool(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}
