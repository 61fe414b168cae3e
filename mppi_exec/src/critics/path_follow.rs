//! # Path follow critic
//!
//! Pulls the batch along the path by penalising the distance between each trajectory's terminal
//! point and a target point a fixed number of points ahead of the furthest point reached so far.
//!
//! If the target lies on a blocked path point (e.g. a dynamic obstacle sitting on the path) the
//! target is moved further along the path to the next clear point, so the robot is steered to
//! drive past the obstacle rather than into it.
//!
//! ```text
//!  furthest      furthest + offset      target
//!     │                 │                 │
//!  ───●────●────●────●──✕────✕────●────●──●──
//!                      blocked points
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use log::{trace, warn};
use ndarray::{ArrayView1, ArrayViewMut1, Zip};
use util::params::ParamGetter;

use super::{CriticBase, CriticFunction};
use crate::{
    costmap::read_shared,
    models::CriticData,
    utils::{
        set_path_costs_if_not_set, set_path_furthest_point_if_not_set,
        within_position_goal_tolerance,
    },
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const DEFAULT_THRESHOLD_TO_CONSIDER_M: f64 = 1.4;
const DEFAULT_OFFSET_FROM_FURTHEST: usize = 6;
const DEFAULT_COST_POWER: i32 = 1;
const DEFAULT_COST_WEIGHT: f64 = 5.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PathFollowCritic {
    base: CriticBase,

    /// The critic is inactive once the robot is closer than this to the end of the path.
    threshold_to_consider_m: f64,

    /// Number of path points between the furthest reached point and the target.
    offset_from_furthest: usize,

    /// Exponent applied to the weighted distance, always positive.
    power: i32,

    weight: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PathFollowCritic {
    fn default() -> Self {
        Self {
            base: CriticBase::default(),
            threshold_to_consider_m: DEFAULT_THRESHOLD_TO_CONSIDER_M,
            offset_from_furthest: DEFAULT_OFFSET_FROM_FURTHEST,
            power: DEFAULT_COST_POWER,
            weight: DEFAULT_COST_WEIGHT,
        }
    }
}

impl CriticFunction for PathFollowCritic {
    fn base(&self) -> &CriticBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CriticBase {
        &mut self.base
    }

    fn initialize(&mut self, params: &ParamGetter) {
        self.threshold_to_consider_m =
            params.get("threshold_to_consider", DEFAULT_THRESHOLD_TO_CONSIDER_M);
        self.offset_from_furthest = params.get("offset_from_furthest", DEFAULT_OFFSET_FROM_FURTHEST);
        self.power = read_cost_power(params);
        self.weight = params.get("cost_weight", DEFAULT_COST_WEIGHT);
    }

    fn score(&mut self, data: &mut CriticData) {
        if !self.base.enabled
            || data.path.len() < 2
            || within_position_goal_tolerance(
                self.threshold_to_consider_m,
                &data.state.pose,
                data.path,
            )
        {
            return;
        }

        set_path_furthest_point_if_not_set(data);
        if let Some(costmap) = &self.base.costmap {
            set_path_costs_if_not_set(data, &read_shared(costmap));
        }

        let target_idx = select_target_index(
            data.furthest_reached_path_point.unwrap_or(0),
            self.offset_from_furthest,
            data.path.len(),
            data.path_pts_valid.as_deref(),
        );

        let target = match data.path.point(target_idx) {
            Some(p) => p,
            None => return,
        };
        let (target_x, target_y) = (target.x, target.y);

        trace!(
            "{}: target point {} at ({:.3}, {:.3})",
            self.base.name,
            target_idx,
            target_x,
            target_y
        );

        let (last_x, last_y) = match (data.trajectories.last_x(), data.trajectories.last_y()) {
            (Some(x), Some(y)) => (x, y),
            _ => return,
        };

        if data.costs.len() != last_x.len() {
            warn!(
                "{}: {} costs for {} trajectories, skipping",
                self.base.name,
                data.costs.len(),
                last_x.len()
            );
            return;
        }

        let weight = self.weight;

        if self.power > 1 {
            let power = self.power;
            add_terminal_costs(data.costs.view_mut(), last_x, last_y, move |x, y| {
                (weight * (x - target_x).hypot(y - target_y)).powi(power)
            });
        } else {
            add_terminal_costs(data.costs.view_mut(), last_x, last_y, move |x, y| {
                weight * (x - target_x).hypot(y - target_y)
            });
        }
    }
}

impl PathFollowCritic {
    pub fn threshold_to_consider_m(&self) -> f64 {
        self.threshold_to_consider_m
    }

    pub fn offset_from_furthest(&self) -> usize {
        self.offset_from_furthest
    }

    pub fn cost_power(&self) -> i32 {
        self.power
    }

    pub fn cost_weight(&self) -> f64 {
        self.weight
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read `cost_power`, which must be a positive exponent representable as an `i32`.
fn read_cost_power(params: &ParamGetter) -> i32 {
    let power: u32 = params.get("cost_power", DEFAULT_COST_POWER as u32);

    match i32::try_from(power) {
        Ok(p) if p > 0 => p,
        _ => {
            warn!(
                "Parameter {}.cost_power of {} is out of range, using the default",
                params.namespace(),
                power
            );
            DEFAULT_COST_POWER
        }
    }
}

/// Select the index of the path point to target.
///
/// Starts `offset` points past `furthest`, clamped to the last path point, then skips forward
/// over points flagged invalid in `valid`. The skip never moves past the second to last point. If
/// no valid point is found the last point examined is returned even though it is invalid.
///
/// A missing validity mask, or a mask too short to cover an index, treats the point as valid.
///
/// `path_len` must be at least 2.
pub fn select_target_index(
    furthest: usize,
    offset: usize,
    path_len: usize,
    valid: Option<&[bool]>,
) -> usize {
    let path_size = path_len - 1;
    let mut idx = furthest.saturating_add(offset).min(path_size);

    if let Some(valid) = valid {
        while idx < path_size - 1 && !valid.get(idx).copied().unwrap_or(true) {
            idx += 1;
        }
    }

    idx
}

/// Add `cost(x, y)` of each terminal point onto the matching entry of `costs`.
///
/// Trajectories are independent of each other, so with the `rayon` feature the batch is split
/// across the thread pool.
fn add_terminal_costs<F>(
    costs: ArrayViewMut1<f64>,
    last_x: ArrayView1<f64>,
    last_y: ArrayView1<f64>,
    cost: F,
) where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    let zip = Zip::from(costs).and(last_x).and(last_y);

    #[cfg(feature = "rayon")]
    zip.par_for_each(|c, &x, &y| *c += cost(x, y));

    #[cfg(not(feature = "rayon"))]
    zip.for_each(|c, &x, &y| *c += cost(x, y));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::costmap::{Costmap, CostmapParams, SharedCostmap, FREE_SPACE, LETHAL_OBSTACLE};
    use crate::models::{Path, Pose2, State, Trajectories};
    use nalgebra::Vector2;
    use ndarray::{Array1, Array2};
    use util::params::{ParamStore, ParamValue};

    /// Path of N points along the x axis at 1 m spacing.
    fn line_path(n: usize) -> Path {
        let points: Vec<_> = (0..n).map(|i| Vector2::new(i as f64, 0.0)).collect();
        Path::from_points(&points)
    }

    /// Trajectories of two steps, ending at the given points.
    fn ending_at(points: &[(f64, f64)]) -> Trajectories {
        let k = points.len();
        let mut trajs = Trajectories::zeros(k, 2);
        for (i, &(x, y)) in points.iter().enumerate() {
            trajs.x[[i, 1]] = x;
            trajs.y[[i, 1]] = y;
        }
        trajs
    }

    fn free_costmap() -> SharedCostmap {
        Costmap::new(CostmapParams {
            size_x: 40,
            size_y: 20,
            resolution_m: 0.5,
            origin_m: [-5.0, -5.0],
            track_unknown_space: false,
            default_cost: FREE_SPACE,
        })
        .unwrap()
        .into_shared()
    }

    /// Build a configured critic with the given parameter overrides.
    fn configured_critic(overrides: &[(&str, ParamValue)]) -> PathFollowCritic {
        let mut params = ParamStore::new();
        for (name, value) in overrides {
            params.set("ctrl.PathFollowCritic", name, value.clone());
        }

        let mut critic = PathFollowCritic::default();
        critic.on_configure("ctrl", "PathFollowCritic", &params, free_costmap());
        critic
    }

    /// Score a batch with pre-set caches, returning the costs.
    fn score_with(
        critic: &mut PathFollowCritic,
        path: &Path,
        trajs: &Trajectories,
        furthest: Option<usize>,
        valid: Option<Vec<bool>>,
    ) -> Array1<f64> {
        let state = State::at(Pose2::new(0.0, 0.0, 0.0));
        let mut costs = Array1::zeros(trajs.batch_size());

        let mut data = CriticData::new(&state, trajs, path, &mut costs, 0.1);
        data.furthest_reached_path_point = furthest;
        data.path_pts_valid = valid;
        critic.score(&mut data);

        costs
    }

    #[test]
    fn test_defaults() {
        let critic = configured_critic(&[]);

        assert_eq!(critic.threshold_to_consider_m(), 1.4);
        assert_eq!(critic.offset_from_furthest(), 6);
        assert_eq!(critic.cost_power(), 1);
        assert_eq!(critic.cost_weight(), 5.0);
        assert!(critic.is_enabled());

        // Values that can't be represented fall back to the defaults
        let critic = configured_critic(&[
            ("offset_from_furthest", ParamValue::Integer(-3)),
            ("cost_power", ParamValue::String("two".into())),
        ]);
        assert_eq!(critic.offset_from_furthest(), 6);
        assert_eq!(critic.cost_power(), 1);

        // Exponents that don't fit an i32, or are zero, fall back to the default
        for &power in [u32::MAX as i64, i32::MAX as i64 + 1, 0].iter() {
            let critic = configured_critic(&[("cost_power", ParamValue::Integer(power))]);
            assert_eq!(critic.cost_power(), 1);
        }
        let critic = configured_critic(&[("cost_power", ParamValue::Integer(i32::MAX as i64))]);
        assert_eq!(critic.cost_power(), i32::MAX);
    }

    #[test]
    fn test_out_of_range_power_keeps_costs_non_negative() {
        let mut critic = configured_critic(&[
            ("cost_power", ParamValue::Integer(u32::MAX as i64)),
            ("cost_weight", ParamValue::Float(0.1)),
        ]);
        let path = line_path(8);
        let trajs = ending_at(&[(6.0, 0.0), (6.0, 5.0)]);

        let costs = score_with(&mut critic, &path, &trajs, Some(0), None);

        assert_eq!(costs[0], 0.0);
        assert!((costs[1] - 0.1 * 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_target_on_path() {
        // furthest 0 + offset 6 lands on (6, 0), which the first trajectory ends on exactly
        let mut critic = configured_critic(&[]);
        let path = line_path(8);
        let trajs = ending_at(&[(6.0, 0.0), (6.0, 2.0), (3.0, 4.0)]);

        let costs = score_with(&mut critic, &path, &trajs, Some(0), Some(vec![true; 7]));

        assert_eq!(costs[0], 0.0);
        assert_eq!(costs[1], 5.0 * 2.0);
        assert!((costs[2] - 5.0 * 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_target_clamped_to_path_end() {
        // min(3 + 6, 7) = 7
        assert_eq!(select_target_index(3, 6, 8, Some(&[true; 7])), 7);

        let mut critic = configured_critic(&[]);
        let path = line_path(8);
        let trajs = ending_at(&[(7.0, 0.0), (6.0, 0.0)]);

        let costs = score_with(&mut critic, &path, &trajs, Some(3), Some(vec![true; 7]));

        assert_eq!(costs[0], 0.0);
        assert_eq!(costs[1], 5.0);
    }

    #[test]
    fn test_skips_invalid_point() {
        let mut valid = vec![true; 7];
        valid[2] = false;

        assert_eq!(select_target_index(0, 2, 8, Some(&valid)), 3);

        let mut critic = configured_critic(&[("offset_from_furthest", ParamValue::Integer(2))]);
        let path = line_path(8);
        let trajs = ending_at(&[(3.0, 0.0), (2.0, 0.0)]);

        let costs = score_with(&mut critic, &path, &trajs, Some(0), Some(valid));

        assert_eq!(costs[0], 0.0);
        assert_eq!(costs[1], 5.0);
    }

    #[test]
    fn test_all_invalid_stops_before_path_end() {
        // Scan stops at path_size - 1 = 6 even though it's invalid
        assert_eq!(select_target_index(0, 0, 8, Some(&[false; 7])), 6);

        let mut critic = configured_critic(&[("offset_from_furthest", ParamValue::Integer(0))]);
        let path = line_path(8);
        let trajs = ending_at(&[(6.0, 0.0), (7.0, 0.0)]);

        let costs = score_with(&mut critic, &path, &trajs, Some(0), Some(vec![false; 7]));

        assert_eq!(costs[0], 0.0);
        assert_eq!(costs[1], 5.0);
    }

    #[test]
    fn test_select_target_index_bounds() {
        // Never beyond the last point, never scanned past the second to last
        for path_len in 2..12 {
            let path_size = path_len - 1;
            for furthest in 0..path_len {
                for offset in [0, 1, 3, 6, 100, usize::MAX].iter().copied() {
                    let all_invalid = vec![false; path_len - 1];
                    let idx = select_target_index(furthest, offset, path_len, Some(&all_invalid));
                    let start = furthest.saturating_add(offset).min(path_size);

                    assert!(idx <= path_size);
                    assert!(idx == start || idx == path_size - 1);

                    let idx = select_target_index(furthest, offset, path_len, None);
                    assert_eq!(idx, start);
                }
            }
        }

        // Deterministic for repeated calls
        let valid = [true, false, false, true, false, true, true];
        let first = select_target_index(1, 0, 8, Some(&valid));
        assert_eq!(first, 3);
        for _ in 0..10 {
            assert_eq!(select_target_index(1, 0, 8, Some(&valid)), first);
        }

        // A short mask treats missing points as valid
        assert_eq!(select_target_index(0, 2, 8, Some(&[false, false])), 2);
    }

    #[test]
    fn test_power() {
        let path = line_path(8);
        let trajs = ending_at(&[(6.0, 3.0), (6.0, 0.0), (0.3, 0.7)]);

        let mut linear = configured_critic(&[("cost_power", ParamValue::Integer(1))]);
        let costs = score_with(&mut linear, &path, &trajs, Some(0), None);
        assert_eq!(costs[0], 15.0);
        assert_eq!(costs[1], 0.0);

        // Exactly the weighted distance, no pow round trip
        let d = (0.3f64 - 6.0).hypot(0.7 - 0.0);
        assert_eq!(costs[2], 5.0 * d);

        let mut squared = configured_critic(&[
            ("cost_power", ParamValue::Integer(2)),
            ("cost_weight", ParamValue::Float(2.0)),
        ]);
        let costs = score_with(&mut squared, &path, &trajs, Some(0), None);
        assert_eq!(costs[0], 36.0);
        assert_eq!(costs[1], 0.0);
        assert!((costs[2] - (2.0 * d).powi(2)).abs() < 1e-9);
    }

    #[test]
    fn test_adds_to_existing_costs() {
        let mut critic = configured_critic(&[]);
        let path = line_path(8);
        let trajs = ending_at(&[(6.0, 1.0), (6.0, 0.0)]);
        let state = State::default();

        let mut costs = Array1::from(vec![10.0, 2.5]);
        let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
        data.furthest_reached_path_point = Some(0);
        critic.score(&mut data);

        assert_eq!(costs, Array1::from(vec![15.0, 2.5]));
    }

    #[test]
    fn test_skip_conditions() {
        let trajs = ending_at(&[(6.0, 1.0), (1.0, 1.0)]);
        let initial = Array1::from(vec![1.0, 2.0]);

        // Disabled
        let mut disabled = configured_critic(&[("enabled", ParamValue::Boolean(false))]);
        let path = line_path(8);
        let state = State::default();
        let mut costs = initial.clone();
        let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
        disabled.score(&mut data);
        assert!(data.furthest_reached_path_point.is_none());
        assert!(data.path_pts_valid.is_none());
        assert_eq!(costs, initial);

        let mut critic = configured_critic(&[]);

        // Too few points
        for n in 0..2 {
            let path = line_path(n);
            let mut costs = initial.clone();
            let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
            critic.score(&mut data);
            assert!(data.furthest_reached_path_point.is_none());
            assert_eq!(costs, initial);
        }

        // Within 1.4 m of the goal
        let path = line_path(8);
        let state = State::at(Pose2::new(6.0, 0.5, 0.0));
        let mut costs = initial.clone();
        let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
        critic.score(&mut data);
        assert_eq!(costs, initial);

        // Empty horizon or batch
        let state = State::default();
        let empty = Trajectories::zeros(2, 0);
        let mut costs = initial.clone();
        let mut data = CriticData::new(&state, &empty, &path, &mut costs, 0.1);
        critic.score(&mut data);
        assert_eq!(costs, initial);

        let empty = Trajectories::zeros(0, 4);
        let mut costs = Array1::zeros(0);
        let mut data = CriticData::new(&state, &empty, &path, &mut costs, 0.1);
        critic.score(&mut data);
        assert!(costs.is_empty());
    }

    #[test]
    fn test_ragged_path_uses_complete_points() {
        // y is two points short, so the path ends at (7, 0)
        let full = line_path(10);
        let path = Path {
            x: full.x.clone(),
            y: full.y.slice(ndarray::s![..8]).to_owned(),
            yaws: full.yaws.clone(),
        };
        assert_eq!(path.len(), 8);

        let mut critic = configured_critic(&[]);
        let trajs = ending_at(&[(7.0, 0.0), (9.0, 0.0)]);

        let costs = score_with(&mut critic, &path, &trajs, Some(3), None);

        assert_eq!(costs[0], 0.0);
        assert_eq!(costs[1], 5.0 * 2.0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_batch_matches_serial() {
        let mut critic = configured_critic(&[("cost_power", ParamValue::Integer(2))]);
        let path = line_path(8);

        let num = 4096;
        let mut x = Array2::zeros((num, 2));
        let mut y = Array2::zeros((num, 2));
        for k in 0..num {
            x[[k, 1]] = (k % 97) as f64 * 0.1;
            y[[k, 1]] = (k % 13) as f64 * 0.2 - 1.2;
        }
        let trajs = Trajectories::from_parts(x, y, Array2::zeros((num, 2))).unwrap();

        let costs = score_with(&mut critic, &path, &trajs, Some(0), None);

        for k in 0..num {
            let d = (trajs.x[[k, 1]] - 6.0).hypot(trajs.y[[k, 1]]);
            assert_eq!(costs[k], (5.0 * d).powi(2));
        }
    }

    #[test]
    fn test_costs_non_negative() {
        let mut critic = configured_critic(&[("cost_power", ParamValue::Integer(3))]);
        let path = line_path(8);

        let mut x = Array2::zeros((50, 3));
        let mut y = Array2::zeros((50, 3));
        for k in 0..50 {
            let a = k as f64 * 0.37;
            x[[k, 2]] = 6.0 + 4.0 * a.cos() * (k % 7) as f64 / 7.0;
            y[[k, 2]] = 4.0 * a.sin() * (k % 5) as f64 / 5.0;
        }
        let trajs = Trajectories::from_parts(x, y, Array2::zeros((50, 3))).unwrap();

        let costs = score_with(&mut critic, &path, &trajs, Some(0), None);

        for (k, &c) in costs.iter().enumerate() {
            assert!(c >= 0.0);
            let at_target = trajs.x[[k, 2]] == 6.0 && trajs.y[[k, 2]] == 0.0;
            assert_eq!(c == 0.0, at_target);
        }
    }

    #[test]
    fn test_lazy_caches_from_costmap() {
        let path = line_path(10);
        let costmap = free_costmap();
        {
            let mut map = costmap.write().unwrap();
            // Blocks path points 6 and 7
            map.fill_circle(Vector2::new(6.5, 0.0), 1.0, LETHAL_OBSTACLE);
        }

        let mut critic = PathFollowCritic::default();
        critic.on_configure("ctrl", "PathFollowCritic", &ParamStore::new(), costmap);

        // Terminal points closest to path point 1
        let trajs = ending_at(&[(1.1, 0.2), (0.9, -0.1)]);
        let state = State::default();
        let mut costs = Array1::zeros(2);
        let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
        critic.score(&mut data);

        assert_eq!(data.furthest_reached_path_point, Some(1));
        let valid = data.path_pts_valid.clone().unwrap();
        assert_eq!(valid.len(), 9);
        assert_eq!(valid.iter().filter(|v| !**v).count(), 2);
        assert!(!valid[6] && !valid[7]);

        // 1 + 6 = 7 is blocked, so the target moves on to 8, the scan boundary
        let expected = 5.0 * (1.1f64 - 8.0).hypot(0.2);
        assert!((costs[0] - expected).abs() < 1e-12);
    }
}
