//! # Path
//!
//! The reference path the controller is tracking this cycle, stored as separate coordinate
//! arrays so critics can operate on whole columns at once.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A path defining the desired trajectory of the robot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub x: Array1<f64>,
    pub y: Array1<f64>,

    /// Heading of the segment leaving each point. The last point repeats the heading of the
    /// segment arriving at it.
    pub yaws: Array1<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Point separation must be positive and finite, got {0}")]
    InvalidSeparation(f64),

    #[error("Path arrays have different lengths (x: {0}, y: {1}, yaws: {2})")]
    LengthMismatch(usize, usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Path {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Build a path from its coordinate arrays, which must all have the same length.
    pub fn from_parts(
        x: Array1<f64>,
        y: Array1<f64>,
        yaws: Array1<f64>,
    ) -> Result<Self, PathError> {
        if x.len() != y.len() || x.len() != yaws.len() {
            return Err(PathError::LengthMismatch(x.len(), y.len(), yaws.len()));
        }

        Ok(Self { x, y, yaws })
    }

    /// Build a path through the given points, in order.
    pub fn from_points(points_m: &[Vector2<f64>]) -> Self {
        let x = points_m.iter().map(|p| p.x).collect::<Array1<f64>>();
        let y = points_m.iter().map(|p| p.y).collect::<Array1<f64>>();

        let mut yaws = Array1::zeros(points_m.len());
        for (i, seg) in points_m.windows(2).enumerate() {
            let d = seg[1] - seg[0];
            yaws[i] = d.y.atan2(d.x);
        }
        if points_m.len() >= 2 {
            let n = points_m.len();
            yaws[n - 1] = yaws[n - 2];
        }

        Self { x, y, yaws }
    }

    /// Produces a direct path between the two position vectors, with each point in the path having
    /// at most the given separation. Both `from` and `to` are included.
    pub fn direct(
        from: Vector2<f64>,
        to: Vector2<f64>,
        point_sep_m: f64,
    ) -> Result<Self, PathError> {
        if !(point_sep_m > 0.0 && point_sep_m.is_finite()) {
            return Err(PathError::InvalidSeparation(point_sep_m));
        }

        let diff_vec = to - from;

        // Number of segments needed so that none is longer than the separation. Always at least
        // one so the path has a start and an end.
        let num_segs = ((diff_vec.norm() / point_sep_m).ceil() as usize).max(1);

        let points: Vec<Vector2<f64>> = (0..=num_segs)
            .map(|i| from + diff_vec * (i as f64 / num_segs as f64))
            .collect();

        Ok(Self::from_points(&points))
    }

    /// Get the number of points in the path.
    ///
    /// Only points with both coordinates set are counted.
    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the point at `idx`, or `None` if out of range.
    pub fn point(&self, idx: usize) -> Option<Vector2<f64>> {
        Some(Vector2::new(*self.x.get(idx)?, *self.y.get(idx)?))
    }

    /// Position of the final point of the path.
    pub fn goal(&self) -> Option<Vector2<f64>> {
        self.point(self.len().checked_sub(1)?)
    }

    /// Return the length of the path in meters.
    ///
    /// If the path is empty (not enough points) then `None` is returned.
    pub fn length_m(&self) -> Option<f64> {
        if self.len() < 2 {
            return None;
        }

        Some(
            (1..self.len())
                .map(|i| (self.x[i] - self.x[i - 1]).hypot(self.y[i] - self.y[i - 1]))
                .sum(),
        )
    }
}
