//! # Critic utilities
//!
//! Procedures shared between critics. The `set_*_if_not_set` functions fill the lazily computed
//! caches of [`CriticData`], so whichever critic runs first in a cycle pays for the computation.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use crate::costmap::{Costmap, INSCRIBED_INFLATED_OBSTACLE, LETHAL_OBSTACLE, NO_INFORMATION};
use crate::models::{CriticData, Path, Pose2};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Returns true if `pose` is strictly closer than `tolerance_m` to the last point of `path`.
///
/// An empty path is never within tolerance.
pub fn within_position_goal_tolerance(tolerance_m: f64, pose: &Pose2, path: &Path) -> bool {
    match path.goal() {
        Some(goal) => (pose.position_m - goal).norm_squared() < tolerance_m * tolerance_m,
        None => false,
    }
}

/// Find the furthest path point reached by the batch.
///
/// For every trajectory the path point closest to its terminal pose is found (the first one wins
/// on ties), and the largest of those indices is returned. An empty batch or path gives 0.
pub fn find_path_furthest_reached_point(data: &CriticData) -> usize {
    let (last_x, last_y) = match (data.trajectories.last_x(), data.trajectories.last_y()) {
        (Some(x), Some(y)) => (x, y),
        _ => return 0,
    };

    let path_x = &data.path.x;
    let path_y = &data.path.y;

    let mut max_id_by_trajectories = 0;

    for (&tx, &ty) in last_x.iter().zip(last_y.iter()) {
        let mut min_id_by_path = 0;
        let mut min_dist_sq = f64::INFINITY;

        for (j, (&px, &py)) in path_x.iter().zip(path_y.iter()).enumerate() {
            let dx = px - tx;
            let dy = py - ty;
            let dist_sq = dx * dx + dy * dy;

            if dist_sq < min_dist_sq {
                min_dist_sq = dist_sq;
                min_id_by_path = j;
            }
        }

        max_id_by_trajectories = max_id_by_trajectories.max(min_id_by_path);
    }

    max_id_by_trajectories
}

/// Compute the furthest reached path point if no critic has done so yet this cycle.
pub fn set_path_furthest_point_if_not_set(data: &mut CriticData) {
    if data.furthest_reached_path_point.is_none() {
        let idx = find_path_furthest_reached_point(data);
        debug!("Furthest reached path point: {}", idx);
        data.furthest_reached_path_point = Some(idx);
    }
}

/// Decide, for every path point except the last, whether it can be used as a target.
///
/// A point is invalid if it lies off the costmap or on a lethal or inscribed cell. Points on
/// unknown cells are valid only if the costmap tracks unknown space.
pub fn find_path_costs(data: &CriticData, costmap: &Costmap) -> Vec<bool> {
    let num_segments = data.path.len().saturating_sub(1);
    let tracking_unknown = costmap.is_tracking_unknown();

    (0..num_segments)
        .map(|idx| {
            let cost = data
                .path
                .point(idx)
                .and_then(|p| costmap.cost_at_world(p.x, p.y));

            match cost {
                None => false,
                Some(LETHAL_OBSTACLE) | Some(INSCRIBED_INFLATED_OBSTACLE) => false,
                Some(NO_INFORMATION) => tracking_unknown,
                Some(_) => true,
            }
        })
        .collect()
}

/// Compute the path point validity flags if no critic has done so yet this cycle.
pub fn set_path_costs_if_not_set(data: &mut CriticData, costmap: &Costmap) {
    if data.path_pts_valid.is_none() {
        let valid = find_path_costs(data, costmap);
        debug!(
            "Path point validity computed, {} of {} points blocked",
            valid.iter().filter(|v| !**v).count(),
            valid.len()
        );
        data.path_pts_valid = Some(valid);
    }
}

/// Get the signed angular distance from `from` to `to`, in the range [-pi, pi].
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let d = (to - from).rem_euclid(tau);

    if d > std::f64::consts::PI {
        d - tau
    } else {
        d
    }
}
