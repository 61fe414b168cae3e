//! # MPPI Executable Parameters
//!
//! Parameters of the demonstration scenario run by the executable. Critic parameters are not
//! included here, they're read by each critic from a [`util::params::ParamStore`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::costmap::CostmapParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MppiExecParams {
    /// Namespace of the controller's parameters, critics are configured under
    /// `<controller_ns>.<critic name>`
    pub controller_ns: String,

    pub costmap: CostmapParams,

    pub demo: DemoParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoParams {
    /// Start pose as `[x, y, heading]` in meters and radians
    pub start_pose: [f64; 3],

    /// End of the reference path in meters
    pub goal_m: [f64; 2],

    /// Maximum separation between points of the reference path
    pub path_point_sep_m: f64,

    /// Obstacles dropped onto the costmap as `[x, y, radius]` in meters
    #[serde(default)]
    pub obstacles_m: Vec<[f64; 3]>,

    /// Number of rollouts, spread evenly over `[-max_curvature_m, max_curvature_m]`
    pub num_rollouts: usize,

    pub max_curvature_m: f64,

    pub speed_ms: f64,

    pub model_dt_s: f64,

    /// Number of poses in each rollout
    pub time_steps: usize,

    /// Number of rollout steps the robot advances along the chosen trajectory each cycle
    pub steps_per_cycle: usize,

    /// Stop once the robot is this close to the goal
    pub goal_tolerance_m: f64,

    pub max_cycles: usize,
}
