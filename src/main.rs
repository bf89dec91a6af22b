//! Command line front end for the workout log.
//!
//! Usage:
//! ```bash
//! lift-log new-plan --user u1 --name "Push Day"
//! lift-log store workout.json          # or `-` for stdin
//! lift-log plan 1
//! lift-log history u1
//! lift-log progression 1 --chart total-weight
//! lift-log export 1
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use lift_log_lib::submission::WorkoutSubmission;
use lift_log_lib::{bootstrap, AppState, SqliteWorkoutRepository, WorkoutCommands};

#[derive(Parser)]
#[command(
  name = "lift-log",
  about = "Strength workout log",
  long_about = "Record workouts and inspect history and progression charts as JSON"
)]
struct Cli {
  /// Database URL override
  #[arg(long, global = true)]
  database_url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create a workout plan
  NewPlan {
    #[arg(long)]
    user: String,
    #[arg(long)]
    name: String,
  },
  /// Store a workout submission read from a JSON file (`-` for stdin)
  Store { input: PathBuf },
  /// Every plan history of a user
  History { user: String },
  /// History of one plan
  Plan { plan_id: i64 },
  /// Progression chart for a plan
  Progression {
    plan_id: i64,
    /// `max-lifts` (default) or `total-weight`
    #[arg(long)]
    chart: Option<String>,
  },
  /// Plan history prepared for document export
  Export { plan_id: i64 },
}

fn read_submission(input: &Path) -> Result<WorkoutSubmission> {
  let raw = if input.as_os_str() == "-" {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("Failed to read submission from stdin")?;
    buf
  } else {
    std::fs::read_to_string(input)
      .with_context(|| format!("Failed to read {}", input.display()))?
  };
  serde_json::from_str(&raw).context("Submission is not valid JSON")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let mut config = bootstrap()?;
  if let Some(url) = cli.database_url {
    config.database_url = url;
  }

  let state = AppState::init(config).await?;
  let repo = SqliteWorkoutRepository::new(state.db.clone());
  let commands = WorkoutCommands::new(repo, state.config.clone());

  match cli.command {
    Command::NewPlan { user, name } => {
      let plan = commands.repository().create_plan(&user, &name).await?;
      info!(plan_id = plan.id, "created plan");
      print_json(&plan)?;
    }
    Command::Store { input } => {
      let submission = read_submission(&input)?;
      let workout_id = commands.store_workout(&submission).await?;
      print_json(&serde_json::json!({ "workout_id": workout_id }))?;
    }
    Command::History { user } => print_json(&commands.user_history(&user).await?)?,
    Command::Plan { plan_id } => print_json(&commands.plan_history(plan_id).await?)?,
    Command::Progression { plan_id, chart } => {
      print_json(&commands.progression(plan_id, chart.as_deref()).await?)?
    }
    Command::Export { plan_id } => print_json(&commands.export_plan(plan_id).await?)?,
  }

  state.db.close().await;
  Ok(())
}
