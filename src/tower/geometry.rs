//! Floor geometry - the part of a tower that items depend on
//!
//! Items never hold a reference to their tower. They carry its `TowerId`
//! and receive a `TowerContext` whenever an operation needs placement math.

use crate::core::config::SimulationConfig;
use crate::core::types::{Rectd, Recti, Seconds, TowerId};

/// Construction pacing of one tower
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructionTiming {
    /// Seconds from 0.0 to 1.0 progress
    pub construction_duration: Seconds,
    /// Seconds between worker sprite frames
    pub worker_frame_interval: Seconds,
}

impl ConstructionTiming {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            construction_duration: config.construction_duration,
            worker_frame_interval: config.worker_frame_interval,
        }
    }
}

/// Tower services consumed by items
pub trait TowerContext {
    fn tower_id(&self) -> TowerId;

    /// Width of one grid cell in world units
    fn cell_width(&self) -> f64;

    /// World y coordinate of the bottom of `floor`
    fn floor_y(&self, floor: i32) -> f64;

    /// Height of `floor` in world units
    fn floor_height(&self, floor: i32) -> f64;

    /// Lowest and highest buildable floors, inclusive
    fn floor_range(&self) -> (i32, i32);

    fn construction_timing(&self) -> ConstructionTiming;

    /// True if every floor in `[min_floor, max_floor]` is buildable
    fn spans_valid_floors(&self, min_floor: i32, max_floor: i32) -> bool {
        let (lo, hi) = self.floor_range();
        min_floor >= lo && max_floor <= hi && min_floor <= max_floor
    }

    /// Map a grid rect to world coordinates
    fn world_rect(&self, rect: &Recti) -> Rectd {
        let bottom = self.floor_y(rect.min_y());
        let top = self.floor_y(rect.max_y());
        Rectd::new(
            rect.min_x() as f64 * self.cell_width(),
            bottom,
            rect.width() as f64 * self.cell_width(),
            top - bottom,
        )
    }

    /// Floor containing world height `y`
    fn floor_at(&self, y: f64) -> i32;

    /// Map a world rect back to the grid, snapping to the nearest cells
    fn grid_rect(&self, world: &Rectd) -> Recti {
        let x = (world.origin.x / self.cell_width()).round() as i32;
        let width = (world.size.x / self.cell_width()).round() as i32;
        let min_floor = self.floor_at(world.origin.y + self.floor_height(0) * 0.5);
        let max_floor = self.floor_at(world.max().y - self.floor_height(0) * 0.5);
        Recti::new(x, min_floor, width, max_floor - min_floor + 1)
    }
}

/// Uniform floor geometry
#[derive(Debug, Clone)]
pub struct FloorGeometry {
    tower: TowerId,
    cell_width: f64,
    floor_height: f64,
    min_floor: i32,
    max_floor: i32,
    timing: ConstructionTiming,
}

impl FloorGeometry {
    pub fn new(tower: TowerId, config: &SimulationConfig) -> Self {
        Self {
            tower,
            cell_width: config.cell_width,
            floor_height: config.floor_height,
            min_floor: config.min_floor,
            max_floor: config.max_floor,
            timing: ConstructionTiming::from_config(config),
        }
    }
}

impl TowerContext for FloorGeometry {
    fn tower_id(&self) -> TowerId {
        self.tower
    }

    fn cell_width(&self) -> f64 {
        self.cell_width
    }

    fn floor_y(&self, floor: i32) -> f64 {
        floor as f64 * self.floor_height
    }

    fn floor_height(&self, _floor: i32) -> f64 {
        self.floor_height
    }

    fn floor_range(&self) -> (i32, i32) {
        (self.min_floor, self.max_floor)
    }

    fn construction_timing(&self) -> ConstructionTiming {
        self.timing
    }

    fn floor_at(&self, y: f64) -> i32 {
        (y / self.floor_height).floor() as i32
    }
}
