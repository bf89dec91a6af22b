use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global tracing subscriber. Safe to call more than once; later
/// calls leave the first subscriber in place.
pub fn init_tracing(config: &LogConfig) {
  let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
    eprintln!("Invalid log filter {:?}: {}", config.filter, e);
    EnvFilter::new("info")
  });

  let result = if config.json {
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(false)
      .json()
      .try_init()
  } else {
    tracing_subscriber::fmt().with_env_filter(env_filter).try_init()
  };

  if result.is_err() {
    tracing::debug!("tracing subscriber already installed");
  }
}
