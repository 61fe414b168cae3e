//! Per-cycle data shared by all critics

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use ndarray::Array1;

use super::{Path, State, Trajectories};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything a critic may read while scoring, plus the cost accumulator it adds to.
///
/// A new `CriticData` is built for every optimizer iteration, so the two lazily computed caches
/// (`furthest_reached_path_point` and `path_pts_valid`) start out empty each cycle. The first
/// critic which needs one of them populates it, and every later critic in the same cycle reuses
/// that value.
#[derive(Debug)]
pub struct CriticData<'a> {
    pub state: &'a State,
    pub trajectories: &'a Trajectories,
    pub path: &'a Path,

    /// One running cost per trajectory. Critics only ever add to this.
    pub costs: &'a mut Array1<f64>,

    /// Time step of the rollouts in seconds.
    pub model_dt: f64,

    /// Set by a critic to stop the remaining critics being evaluated this cycle.
    pub fail_flag: bool,

    /// Index of the furthest path point reached by any trajectory.
    pub furthest_reached_path_point: Option<usize>,

    /// One flag per path point except the last, `true` if the point can be used as a target.
    pub path_pts_valid: Option<Vec<bool>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<'a> CriticData<'a> {
    /// Start a new cycle with empty caches.
    ///
    /// `costs` must hold one entry per trajectory in `trajectories`.
    pub fn new(
        state: &'a State,
        trajectories: &'a Trajectories,
        path: &'a Path,
        costs: &'a mut Array1<f64>,
        model_dt: f64,
    ) -> Self {
        debug_assert_eq!(
            costs.len(),
            trajectories.batch_size(),
            "Cost accumulator and trajectory batch sizes differ"
        );

        Self {
            state,
            trajectories,
            path,
            costs,
            model_dt,
            fail_flag: false,
            furthest_reached_path_point: None,
            path_pts_valid: None,
        }
    }
}
