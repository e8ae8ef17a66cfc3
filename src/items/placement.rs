//! Placement rules - checks a candidate rect against a descriptor

use thiserror::Error;

use crate::core::types::Recti;
use crate::items::descriptor::{Attributes, Descriptor, ItemType};
use crate::tower::geometry::TowerContext;

/// Floor 0 is the ground floor
pub const GROUND_FLOOR: i32 = 0;

/// Spacing of floors that accept sky lobbies
pub const LOBBY_FLOOR_SPACING: i32 = 15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("{item_type:?} cannot be placed with an empty rect")]
    EmptyRect { item_type: ItemType },

    #[error("{item_type:?} width {width} is not allowed (expected {expected})")]
    WrongWidth {
        item_type: ItemType,
        width: i32,
        expected: String,
    },

    #[error("{item_type:?} height {height} is not allowed (expected {min}..={max} floors)")]
    WrongHeight {
        item_type: ItemType,
        height: i32,
        min: i32,
        max: i32,
    },

    #[error("{item_type:?} footprint does not match its occupancy mask")]
    MaskMismatch { item_type: ItemType },

    #[error("{item_type:?} spans floors {min_floor}..={max_floor}, outside the tower")]
    OutsideTower {
        item_type: ItemType,
        min_floor: i32,
        max_floor: i32,
    },

    #[error("{item_type:?} may not be built above ground")]
    AboveGround { item_type: ItemType },

    #[error("{item_type:?} may not be built below ground")]
    BelowGround { item_type: ItemType },

    #[error("{item_type:?} may not be built on the ground floor")]
    OnGround { item_type: ItemType },

    #[error("{item_type:?} must sit on every 15th floor, not floor {floor}")]
    NotOnFifteenthFloor { item_type: ItemType, floor: i32 },
}

/// Check `rect` against the footprint and floor constraints of `descriptor`
pub fn validate_placement(
    descriptor: &Descriptor,
    tower: &dyn TowerContext,
    rect: &Recti,
) -> Result<(), PlacementError> {
    let item_type = descriptor.item_type;

    if rect.is_empty() {
        return Err(PlacementError::EmptyRect { item_type });
    }

    check_width(descriptor, rect.width())?;

    let (min_height, max_height) = (descriptor.min_unit.y, descriptor.cells.y);
    if rect.height() < min_height || rect.height() > max_height {
        return Err(PlacementError::WrongHeight {
            item_type,
            height: rect.height(),
            min: min_height,
            max: max_height,
        });
    }

    if let Some(mask) = &descriptor.mask {
        if mask.bounds() != rect.size {
            return Err(PlacementError::MaskMismatch { item_type });
        }
    }

    let min_floor = rect.min_y();
    let max_floor = rect.max_y() - 1;
    if !tower.spans_valid_floors(min_floor, max_floor) {
        return Err(PlacementError::OutsideTower {
            item_type,
            min_floor,
            max_floor,
        });
    }

    if descriptor.has(Attributes::NOT_ABOVE_GROUND) && max_floor > GROUND_FLOOR {
        return Err(PlacementError::AboveGround { item_type });
    }
    if descriptor.has(Attributes::NOT_BELOW_GROUND) && min_floor < GROUND_FLOOR {
        return Err(PlacementError::BelowGround { item_type });
    }
    let touches_ground = min_floor <= GROUND_FLOOR && GROUND_FLOOR <= max_floor;
    if touches_ground && !descriptor.has(Attributes::ALLOWED_ON_GROUND) {
        return Err(PlacementError::OnGround { item_type });
    }

    if descriptor.has(Attributes::EVERY_15TH_FLOOR)
        && min_floor.rem_euclid(LOBBY_FLOOR_SPACING) != 0
    {
        return Err(PlacementError::NotOnFifteenthFloor {
            item_type,
            floor: min_floor,
        });
    }

    Ok(())
}

fn check_width(descriptor: &Descriptor, width: i32) -> Result<(), PlacementError> {
    let unit = descriptor.min_unit.x;
    if descriptor.has(Attributes::FLEXIBLE_WIDTH) {
        if width < unit || width % unit != 0 {
            return Err(PlacementError::WrongWidth {
                item_type: descriptor.item_type,
                width,
                expected: format!("a multiple of {} cells", unit),
            });
        }
    } else if width != descriptor.cells.x {
        return Err(PlacementError::WrongWidth {
            item_type: descriptor.item_type,
            width,
            expected: format!("exactly {} cells", descriptor.cells.x),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::TowerId;
    use crate::items::descriptor::descriptor_for_item_type;
    use crate::tower::geometry::FloorGeometry;

    fn check(item_type: ItemType, rect: Recti) -> Result<(), PlacementError> {
        let geometry = FloorGeometry::new(TowerId::new(), &SimulationConfig::default());
        let descriptor = descriptor_for_item_type(item_type).unwrap();
        validate_placement(descriptor, &geometry, &rect)
    }

    #[test]
    fn test_fixed_width_must_match() {
        assert!(check(ItemType::Office, Recti::new(0, 1, 9, 1)).is_ok());
        assert!(matches!(
            check(ItemType::Office, Recti::new(0, 1, 8, 1)),
            Err(PlacementError::WrongWidth { width: 8, .. })
        ));
    }

    #[test]
    fn test_flexible_width_relaxes_width() {
        assert!(check(ItemType::Floor, Recti::new(0, 1, 1, 1)).is_ok());
        assert!(check(ItemType::Floor, Recti::new(0, 1, 57, 1)).is_ok());
        assert!(matches!(
            check(ItemType::Floor, Recti::new(0, 1, 57, 2)),
            Err(PlacementError::WrongHeight { .. })
        ));
    }

    #[test]
    fn test_elevator_height_range() {
        assert!(check(ItemType::StandardElevator, Recti::new(0, 0, 4, 2)).is_ok());
        assert!(check(ItemType::StandardElevator, Recti::new(0, 0, 4, 30)).is_ok());
        assert!(check(ItemType::StandardElevator, Recti::new(0, 0, 4, 1)).is_err());
        assert!(check(ItemType::StandardElevator, Recti::new(0, 0, 4, 31)).is_err());
    }

    #[test]
    fn test_empty_rect_rejected() {
        assert_eq!(
            check(ItemType::Floor, Recti::new(0, 1, 0, 1)),
            Err(PlacementError::EmptyRect {
                item_type: ItemType::Floor
            })
        );
    }

    #[test]
    fn test_ground_attributes() {
        // Offices stay above ground and off the lobby floor
        assert!(matches!(
            check(ItemType::Office, Recti::new(0, -1, 9, 1)),
            Err(PlacementError::BelowGround { .. })
        ));
        assert!(matches!(
            check(ItemType::Office, Recti::new(0, 0, 9, 1)),
            Err(PlacementError::OnGround { .. })
        ));

        // Parking spaces are basement-only; ramps may also touch the ground floor
        assert!(check(ItemType::ParkingSpace, Recti::new(0, -1, 4, 1)).is_ok());
        assert!(matches!(
            check(ItemType::ParkingSpace, Recti::new(0, 0, 4, 1)),
            Err(PlacementError::OnGround { .. })
        ));
        assert!(check(ItemType::ParkingRamp, Recti::new(0, 0, 10, 1)).is_ok());
        assert!(matches!(
            check(ItemType::ParkingRamp, Recti::new(0, 1, 10, 1)),
            Err(PlacementError::AboveGround { .. })
        ));
    }

    #[test]
    fn test_lobby_every_15th_floor() {
        assert!(check(ItemType::Lobby, Recti::new(0, 0, 20, 1)).is_ok());
        assert!(check(ItemType::Lobby, Recti::new(0, 15, 20, 1)).is_ok());
        assert_eq!(
            check(ItemType::Lobby, Recti::new(0, 14, 20, 1)),
            Err(PlacementError::NotOnFifteenthFloor {
                item_type: ItemType::Lobby,
                floor: 14
            })
        );
    }

    #[test]
    fn test_outside_tower() {
        assert!(matches!(
            check(ItemType::Office, Recti::new(0, 101, 9, 1)),
            Err(PlacementError::OutsideTower { .. })
        ));
        assert!(matches!(
            check(ItemType::Metro, Recti::new(0, -12, 30, 3)),
            Err(PlacementError::OutsideTower { .. })
        ));
    }

    #[test]
    fn test_mask_shape_enforced() {
        assert!(check(ItemType::Escalator, Recti::new(0, 0, 8, 2)).is_ok());
        assert!(check(ItemType::Escalator, Recti::new(0, 0, 8, 1)).is_err());
    }
}
