//! Transport kinds: stairs, escalators and elevators

use std::any::Any;
use std::collections::BTreeSet;

use crate::core::types::{Rectd, Seconds};
use crate::items::descriptor::{Descriptor, ItemType};
use crate::items::item::{ItemCore, ItemKind};
use crate::items::sprites::{DrawList, Layer, SpriteKey};

/// Seconds per escalator step animation frame
const STEP_FRAME_TIME: Seconds = 0.25;
const STEP_FRAMES: u8 = 4;

/// Stairs and escalators share their two-floor layout
#[derive(Debug)]
pub struct StairsLike {
    item_type: ItemType,
    animated: bool,
    frame: u8,
    frame_timer: Seconds,
    transport_refreshes: u32,
}

impl StairsLike {
    pub fn stairs(descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        Box::new(Self::with(descriptor.item_type, false))
    }

    pub fn escalator(descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        Box::new(Self::with(descriptor.item_type, true))
    }

    fn with(item_type: ItemType, animated: bool) -> Self {
        Self {
            item_type,
            animated,
            frame: 0,
            frame_timer: 0.0,
            transport_refreshes: 0,
        }
    }

    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// Times the surrounding transport layout changed
    pub fn transport_refreshes(&self) -> u32 {
        self.transport_refreshes
    }
}

impl ItemKind for StairsLike {
    fn advance(&mut self, item: &ItemCore, dt: Seconds) {
        // Escalator steps only move while someone is riding
        if !self.animated || item.people().is_empty() {
            return;
        }
        self.frame_timer += dt;
        if self.frame_timer >= STEP_FRAME_TIME {
            let steps = (self.frame_timer / STEP_FRAME_TIME).floor() % f64::from(STEP_FRAMES);
            self.frame_timer %= STEP_FRAME_TIME;
            self.frame = (self.frame + steps as u8) % STEP_FRAMES;
        }
    }

    fn draw(&self, item: &ItemCore, out: &mut DrawList) {
        // Occupied stairs show walkers; escalators show their step frame
        let variant = if self.animated {
            self.frame
        } else {
            u8::from(!item.people().is_empty())
        };
        out.push(
            item.item_id(),
            Layer::Item,
            SpriteKey::Item {
                item_type: self.item_type,
                variant,
            },
            *item.world_rect(),
        );
    }

    fn on_change_transport_items(&mut self, _item: &ItemCore) {
        self.transport_refreshes += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Elevator shaft spanning a contiguous range of floors
#[derive(Debug, Default)]
pub struct Elevator {
    served_floors: BTreeSet<i32>,
    transport_refreshes: u32,
}

impl Elevator {
    pub fn new(_descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        Box::new(Self::default())
    }

    pub fn served_floors(&self) -> &BTreeSet<i32> {
        &self.served_floors
    }

    pub fn transport_refreshes(&self) -> u32 {
        self.transport_refreshes
    }

    fn rebuild_stops(&mut self, item: &ItemCore) {
        self.served_floors = (item.min_floor()..=item.max_floor()).collect();
    }
}

impl ItemKind for Elevator {
    fn init(&mut self, item: &mut ItemCore) {
        self.rebuild_stops(item);
    }

    fn on_change_location(&mut self, item: &ItemCore) {
        self.rebuild_stops(item);
    }

    fn on_change_transport_items(&mut self, _item: &ItemCore) {
        self.transport_refreshes += 1;
    }

    fn draw(&self, item: &ItemCore, out: &mut DrawList) {
        let world = item.world_rect();
        let floors = item.num_floors().max(1) as f64;
        let slice = world.size.y / floors;
        for (i, _floor) in self.served_floors.iter().enumerate() {
            let rect = Rectd::new(
                world.origin.x,
                world.origin.y + i as f64 * slice,
                world.size.x,
                slice,
            );
            out.push(
                item.item_id(),
                Layer::Item,
                SpriteKey::Item {
                    item_type: item.item_type(),
                    variant: 0,
                },
                rect,
            );
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{ItemId, PersonId, Recti, TowerId};
    use crate::items::descriptor::descriptor_for_item_type;
    use crate::items::factory::make_with_rect;
    use crate::tower::geometry::FloorGeometry;

    #[test]
    fn test_escalator_steps_survive_huge_step() {
        let g = FloorGeometry::new(TowerId::new(), &SimulationConfig::default());
        let descriptor = descriptor_for_item_type(ItemType::Escalator).unwrap();
        let mut escalator =
            make_with_rect(&g, descriptor, ItemId(1), Recti::new(0, 0, 8, 2)).unwrap();
        escalator.add_person(PersonId(1));

        escalator.advance(0.5);
        assert_eq!(escalator.kind_as::<StairsLike>().unwrap().frame(), 2);

        escalator.advance(1.0e17);
        assert!(escalator.kind_as::<StairsLike>().unwrap().frame() < STEP_FRAMES);
    }
}
