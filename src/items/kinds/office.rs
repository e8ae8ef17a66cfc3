//! Office kind

use std::any::Any;

use crate::items::descriptor::{Descriptor, ItemType};
use crate::items::item::{ItemCore, ItemKind};
use crate::items::sprites::{DrawList, Layer, SpriteKey};

#[derive(Debug, Default)]
pub struct Office {
    /// Days on which at least one worker was present
    worked_days: u32,
    vacant_days: u32,
}

impl Office {
    pub fn new(_descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        Box::new(Self::default())
    }

    pub fn worked_days(&self) -> u32 {
        self.worked_days
    }

    pub fn vacant_days(&self) -> u32 {
        self.vacant_days
    }
}

impl ItemKind for Office {
    fn on_date_advance(&mut self, item: &ItemCore) {
        if item.people().is_empty() {
            self.vacant_days += 1;
        } else {
            self.worked_days += 1;
        }
    }

    fn draw(&self, item: &ItemCore, out: &mut DrawList) {
        // Lights are on while anybody is at work
        let variant = u8::from(!item.people().is_empty());
        out.push(
            item.item_id(),
            Layer::Item,
            SpriteKey::Item {
                item_type: ItemType::Office,
                variant,
            },
            *item.world_rect(),
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
