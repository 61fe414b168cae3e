//! # MPPI critic library.
//!
//! Trajectory scoring for a Model Predictive Path Integral controller. A batch of candidate
//! trajectories is scored by a set of critics, each adding its own cost term, and the controller
//! prefers the cheapest trajectories.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cost map - grid of traversal costs used to find blocked path points
pub mod costmap;

/// Critic manager - loads critics by name and evaluates them in order
pub mod critic_manager;

/// Critics - the individual cost terms
pub mod critics;

/// Models - states, paths, trajectory batches and the per-cycle critic data
pub mod models;

/// Executable parameters
pub mod params;

/// Utilities shared between critics
pub mod utils;
