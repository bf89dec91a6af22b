pub mod workout;

pub use workout::{
  slugify, PlanExport, PlanHistoryView, ProgressionView, WorkoutCommands, GENERIC_ERROR_MESSAGE,
  INSUFFICIENT_DATA_MESSAGE,
};
