//! # Models
//!
//! Data passed between the optimizer and its critics during one control cycle.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod critic_data;
mod path;
mod state;
mod trajectories;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use critic_data::CriticData;
pub use path::{Path, PathError};
pub use state::{Pose2, State, Twist2};
pub use trajectories::{Trajectories, TrajectoriesError};
