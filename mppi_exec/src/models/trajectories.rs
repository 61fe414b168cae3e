//! # Trajectories
//!
//! A batch of candidate rollouts. Each row is one trajectory and each column one time step, so
//! the terminal poses of the whole batch are the last column of each array.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::Pose2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Batch of rollouts, all arrays have shape `[batch_size, time_steps]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectories {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub yaws: Array2<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajectoriesError {
    #[error("Trajectory arrays must share a shape, got x: {0:?}, y: {1:?}, yaws: {2:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>, Vec<usize>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Trajectories {
    /// A batch of `batch_size` trajectories of `time_steps` poses, all at the origin.
    pub fn zeros(batch_size: usize, time_steps: usize) -> Self {
        Self {
            x: Array2::zeros((batch_size, time_steps)),
            y: Array2::zeros((batch_size, time_steps)),
            yaws: Array2::zeros((batch_size, time_steps)),
        }
    }

    /// Build a batch from its component arrays.
    pub fn from_parts(
        x: Array2<f64>,
        y: Array2<f64>,
        yaws: Array2<f64>,
    ) -> Result<Self, TrajectoriesError> {
        if x.shape() != y.shape() || x.shape() != yaws.shape() {
            return Err(TrajectoriesError::ShapeMismatch(
                x.shape().to_vec(),
                y.shape().to_vec(),
                yaws.shape().to_vec(),
            ));
        }

        Ok(Self { x, y, yaws })
    }

    /// Roll out a fan of constant curvature arcs at constant speed from `start`, one trajectory
    /// per curvature.
    ///
    /// The first time step is the first integration step, not `start` itself.
    pub fn arc_fan(
        start: &Pose2,
        speed_ms: f64,
        curvatures_m: &[f64],
        dt_s: f64,
        time_steps: usize,
    ) -> Self {
        let mut trajs = Self::zeros(curvatures_m.len(), time_steps);

        for (k, &curv_m) in curvatures_m.iter().enumerate() {
            let mut x = start.position_m.x;
            let mut y = start.position_m.y;
            let mut head_rad = start.heading_rad;

            for t in 0..time_steps {
                head_rad += speed_ms * curv_m * dt_s;
                x += speed_ms * head_rad.cos() * dt_s;
                y += speed_ms * head_rad.sin() * dt_s;

                trajs.x[[k, t]] = x;
                trajs.y[[k, t]] = y;
                trajs.yaws[[k, t]] = head_rad;
            }
        }

        trajs
    }

    /// Number of trajectories in the batch.
    pub fn batch_size(&self) -> usize {
        self.x.nrows()
    }

    /// Number of poses in each trajectory.
    pub fn time_steps(&self) -> usize {
        self.x.ncols()
    }

    /// Terminal x of every trajectory, or `None` if the trajectories are empty.
    pub fn last_x(&self) -> Option<ArrayView1<'_, f64>> {
        let last = self.time_steps().checked_sub(1)?;
        Some(self.x.index_axis(Axis(1), last))
    }

    /// Terminal y of every trajectory, or `None` if the trajectories are empty.
    pub fn last_y(&self) -> Option<ArrayView1<'_, f64>> {
        let last = self.time_steps().checked_sub(1)?;
        Some(self.y.index_axis(Axis(1), last))
    }
}
