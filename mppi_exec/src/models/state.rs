//! Robot state used as the origin of every rollout

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A planar pose in the costmap frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2 {
    /// Position in meters
    pub position_m: Vector2<f64>,

    /// Heading (angle to the +ve x axis) in radians
    pub heading_rad: f64,
}

/// Body-frame velocity of the robot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist2 {
    pub linear_ms: f64,
    pub angular_rads: f64,
}

/// The measured state of the robot at the start of a control cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub pose: Pose2,
    pub speed: Twist2,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }
}

impl State {
    /// A state at the given pose with zero velocity.
    pub fn at(pose: Pose2) -> Self {
        Self {
            pose,
            speed: Twist2::default(),
        }
    }
}
