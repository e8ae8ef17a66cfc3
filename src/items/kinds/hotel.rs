//! Hotel kinds: guest rooms and the housekeeping service

use std::any::Any;

use crate::items::descriptor::{Descriptor, ItemType};
use crate::items::item::{ItemCore, ItemKind};
use crate::items::sprites::{DrawList, Layer, SpriteKey};

/// Visual state of a guest room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Vacant,
    Occupied,
    Dirty,
}

/// Single room, double room or suite
#[derive(Debug)]
pub struct HotelRoom {
    item_type: ItemType,
    beds: u8,
    nights_booked: u32,
    dirty: bool,
}

impl HotelRoom {
    pub fn new(descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        let beds = match descriptor.item_type {
            ItemType::SingleRoom => 1,
            ItemType::DoubleRoom => 2,
            _ => 4,
        };
        Box::new(Self {
            item_type: descriptor.item_type,
            beds,
            nights_booked: 0,
            dirty: false,
        })
    }

    pub fn beds(&self) -> u8 {
        self.beds
    }

    pub fn nights_booked(&self) -> u32 {
        self.nights_booked
    }

    pub fn state(&self, item: &ItemCore) -> RoomState {
        if !item.people().is_empty() {
            RoomState::Occupied
        } else if self.dirty {
            RoomState::Dirty
        } else {
            RoomState::Vacant
        }
    }
}

impl ItemKind for HotelRoom {
    fn on_date_advance(&mut self, item: &ItemCore) {
        // Occupied overnight leaves the room dirty; a vacant day gets it cleaned
        if item.people().is_empty() {
            self.dirty = false;
        } else {
            self.nights_booked += 1;
            self.dirty = true;
        }
    }

    fn draw(&self, item: &ItemCore, out: &mut DrawList) {
        let variant = match self.state(item) {
            RoomState::Vacant => 0,
            RoomState::Occupied => 1,
            RoomState::Dirty => 2,
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

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Housekeeping {
    shifts: u32,
}

impl Housekeeping {
    pub fn new(_descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        Box::new(Self::default())
    }

    pub fn shifts(&self) -> u32 {
        self.shifts
    }
}

impl ItemKind for Housekeeping {
    fn on_date_advance(&mut self, item: &ItemCore) {
        if !item.is_under_construction() {
            self.shifts += 1;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
