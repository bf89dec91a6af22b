pub mod plan;
pub mod workout;

pub use plan::Plan;
pub use workout::{NewSetRecord, SetRow, Workout};
