//! Core type definitions used throughout the codebase

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an owning tower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TowerId(pub Uuid);

impl TowerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TowerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of an item within its tower
///
/// `ItemId::NONE` is the sentinel carried by items that have not been
/// assigned an id by their tower yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl ItemId {
    pub const NONE: ItemId = ItemId(0);

    pub fn is_valid(&self) -> bool {
        *self != Self::NONE
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a person owned by the people subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonId(pub u32);

/// Simulation time in seconds
pub type Seconds = f64;

/// Integer rectangle in tower grid units
///
/// `origin.x` is the leftmost cell column, `origin.y` the lowest floor.
/// Floors grow upwards; floor 0 is the ground floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Recti {
    pub origin: IVec2,
    pub size: IVec2,
}

impl Recti {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: IVec2::new(x, y),
            size: IVec2::new(width, height),
        }
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    pub fn min_x(&self) -> i32 {
        self.origin.x
    }

    /// Exclusive
    pub fn max_x(&self) -> i32 {
        self.origin.x + self.size.x
    }

    pub fn min_y(&self) -> i32 {
        self.origin.y
    }

    /// Exclusive
    pub fn max_y(&self) -> i32 {
        self.origin.y + self.size.y
    }

    pub fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }

    pub fn contains(&self, point: IVec2) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    pub fn intersects(&self, other: &Recti) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }

    /// True if the column ranges overlap
    pub fn overlaps_horizontally(&self, other: &Recti) -> bool {
        self.min_x() < other.max_x() && other.min_x() < self.max_x()
    }
}

/// Floating point rectangle in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectd {
    pub origin: DVec2,
    pub size: DVec2,
}

impl Rectd {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: DVec2::new(x, y),
            size: DVec2::new(width, height),
        }
    }

    pub fn max(&self) -> DVec2 {
        self.origin + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    pub fn intersects(&self, other: &Rectd) -> bool {
        let (a_max, b_max) = (self.max(), other.max());
        !self.is_empty()
            && !other.is_empty()
            && self.origin.x < b_max.x
            && other.origin.x < a_max.x
            && self.origin.y < b_max.y
            && other.origin.y < a_max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_sentinel() {
        assert!(!ItemId::NONE.is_valid());
        assert!(!ItemId::default().is_valid());
        assert!(ItemId(7).is_valid());
    }

    #[test]
    fn test_tower_id_unique() {
        assert_ne!(TowerId::new(), TowerId::new());
    }

    #[test]
    fn test_recti_bounds() {
        let rect = Recti::new(4, -2, 10, 3);
        assert_eq!(rect.min_x(), 4);
        assert_eq!(rect.max_x(), 14);
        assert_eq!(rect.min_y(), -2);
        assert_eq!(rect.max_y(), 1);
        assert!(rect.contains(IVec2::new(13, 0)));
        assert!(!rect.contains(IVec2::new(14, 0)));
    }

    #[test]
    fn test_recti_intersects() {
        let a = Recti::new(0, 0, 4, 1);
        assert!(a.intersects(&Recti::new(3, 0, 4, 1)));
        // Touching edges do not intersect
        assert!(!a.intersects(&Recti::new(4, 0, 4, 1)));
        assert!(!a.intersects(&Recti::new(0, 1, 4, 1)));
        assert!(a.overlaps_horizontally(&Recti::new(0, 1, 4, 1)));
        assert!(!a.intersects(&Recti::new(0, 0, 0, 1)));
    }

    #[test]
    fn test_rectd_intersects() {
        let a = Rectd::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rectd::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rectd::new(10.0, 0.0, 5.0, 5.0)));
        assert!(!a.intersects(&Rectd::new(2.0, 2.0, 0.0, 5.0)));
    }
}
