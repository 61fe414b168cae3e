//! # Cost Map
//!
//! A 2D grid of 8-bit costs used to decide which path points are blocked. Cell `(mx, my)` covers
//! the world square starting at `origin + (mx, my) * resolution`.
//!
//! ```text
//!   0            252 253       254     255
//!   │  free ...   │   │         │       │
//!   FREE_SPACE        INSCRIBED LETHAL  NO_INFORMATION
//! ```

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use nalgebra::Vector2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

pub const FREE_SPACE: u8 = 0;
pub const INSCRIBED_INFLATED_OBSTACLE: u8 = 253;
pub const LETHAL_OBSTACLE: u8 = 254;
pub const NO_INFORMATION: u8 = 255;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A costmap shared between whatever updates it and the critics which read it.
pub type SharedCostmap = Arc<RwLock<Costmap>>;

/// Cost Map
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Costmap {
    params: CostmapParams,

    /// Costs indexed as `[[my, mx]]`
    data: Array2<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostmapParams {
    /// Number of cells along the x axis
    pub size_x: usize,

    /// Number of cells along the y axis
    pub size_y: usize,

    /// Side length of one cell in meters
    pub resolution_m: f64,

    /// World position of the corner of cell (0, 0)
    pub origin_m: [f64; 2],

    /// If true, cells with `NO_INFORMATION` are treated as traversable
    #[serde(default)]
    pub track_unknown_space: bool,

    /// Initial cost of every cell
    #[serde(default)]
    pub default_cost: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can arise from processing costs maps.
#[derive(Debug, thiserror::Error)]
pub enum CostmapError {
    #[error("Invalid costmap parameters: {0}")]
    InvalidParams(String),

    #[error("Cell ({0}, {1}) is outside of the {2}x{3} map")]
    CellOutOfBounds(usize, usize, usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Costmap {
    /// Create a new costmap with every cell set to the default cost.
    pub fn new(params: CostmapParams) -> Result<Self, CostmapError> {
        if !(params.resolution_m > 0.0 && params.resolution_m.is_finite()) {
            return Err(CostmapError::InvalidParams(format!(
                "resolution must be positive, got {}",
                params.resolution_m
            )));
        }

        let data = Array2::from_elem((params.size_y, params.size_x), params.default_cost);

        Ok(Self { params, data })
    }

    /// Wrap this costmap so it can be shared with critics.
    pub fn into_shared(self) -> SharedCostmap {
        Arc::new(RwLock::new(self))
    }

    pub fn params(&self) -> &CostmapParams {
        &self.params
    }

    pub fn size_x(&self) -> usize {
        self.params.size_x
    }

    pub fn size_y(&self) -> usize {
        self.params.size_y
    }

    pub fn resolution(&self) -> f64 {
        self.params.resolution_m
    }

    pub fn is_tracking_unknown(&self) -> bool {
        self.params.track_unknown_space
    }

    /// Convert a world position into the cell containing it, or `None` if it's off the map.
    pub fn world_to_map(&self, x_m: f64, y_m: f64) -> Option<(usize, usize)> {
        let fx = (x_m - self.params.origin_m[0]) / self.params.resolution_m;
        let fy = (y_m - self.params.origin_m[1]) / self.params.resolution_m;

        // Also rejects NaN
        if !(fx >= 0.0 && fy >= 0.0) {
            return None;
        }

        let (mx, my) = (fx as usize, fy as usize);

        if mx < self.params.size_x && my < self.params.size_y {
            Some((mx, my))
        } else {
            None
        }
    }

    /// World position of the centre of the given cell.
    pub fn map_to_world(&self, mx: usize, my: usize) -> Vector2<f64> {
        Vector2::new(
            self.params.origin_m[0] + (mx as f64 + 0.5) * self.params.resolution_m,
            self.params.origin_m[1] + (my as f64 + 0.5) * self.params.resolution_m,
        )
    }

    /// Cost of a cell, or `None` if the cell is outside the map.
    pub fn cost(&self, mx: usize, my: usize) -> Option<u8> {
        self.data.get([my, mx]).copied()
    }

    /// Cost of the cell containing a world position.
    pub fn cost_at_world(&self, x_m: f64, y_m: f64) -> Option<u8> {
        let (mx, my) = self.world_to_map(x_m, y_m)?;
        self.cost(mx, my)
    }

    pub fn set_cost(&mut self, mx: usize, my: usize, cost: u8) -> Result<(), CostmapError> {
        let (size_x, size_y) = (self.params.size_x, self.params.size_y);

        match self.data.get_mut([my, mx]) {
            Some(c) => {
                *c = cost;
                Ok(())
            }
            None => Err(CostmapError::CellOutOfBounds(mx, my, size_x, size_y)),
        }
    }

    /// Set the cost of every cell whose centre lies within `radius_m` of `centre_m`.
    ///
    /// Returns the number of cells which were set. Parts of the circle outside the map are
    /// ignored.
    pub fn fill_circle(&mut self, centre_m: Vector2<f64>, radius_m: f64, cost: u8) -> usize {
        let res = self.params.resolution_m;
        let origin = Vector2::new(self.params.origin_m[0], self.params.origin_m[1]);

        // Bounding box of the circle in cell coordinates, clamped to the map
        let min = (centre_m - Vector2::repeat(radius_m) - origin) / res;
        let max = (centre_m + Vector2::repeat(radius_m) - origin) / res;
        let clamp = |v: f64, size: usize| v.floor().max(0.0).min(size as f64) as usize;

        let (min_x, max_x) = (clamp(min.x, self.size_x()), clamp(max.x + 1.0, self.size_x()));
        let (min_y, max_y) = (clamp(min.y, self.size_y()), clamp(max.y + 1.0, self.size_y()));

        let mut num_set = 0;
        for my in min_y..max_y {
            for mx in min_x..max_x {
                if (self.map_to_world(mx, my) - centre_m).norm() <= radius_m {
                    self.data[[my, mx]] = cost;
                    num_set += 1;
                }
            }
        }

        num_set
    }

    /// Reset every cell to the default cost.
    pub fn reset(&mut self) {
        self.data.fill(self.params.default_cost);
    }
}

/// Take a read lock on a shared costmap.
///
/// The map is plain cell data with no invariants a panicking writer could break, so a poisoned
/// lock is read through.
pub fn read_shared(costmap: &SharedCostmap) -> RwLockReadGuard<'_, Costmap> {
    costmap.read().unwrap_or_else(PoisonError::into_inner)
}
