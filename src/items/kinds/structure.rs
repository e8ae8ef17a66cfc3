//! Structural kinds: lobbies and plain floor slabs

use std::any::Any;

use crate::core::types::Seconds;
use crate::items::descriptor::{Descriptor, ItemType};
use crate::items::item::{ItemCore, ItemKind};
use crate::items::sprites::{DrawList, Layer, SpriteKey};

/// Seconds a lobby keeps its "busy" look after the last arrival
const LOBBY_BUSY_LINGER: Seconds = 2.0;

#[derive(Debug, Default)]
pub struct Lobby {
    busy_for: Seconds,
}

impl Lobby {
    pub fn new(_descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        Box::new(Self::default())
    }

    pub fn is_busy(&self) -> bool {
        self.busy_for > 0.0
    }
}

impl ItemKind for Lobby {
    fn init(&mut self, item: &mut ItemCore) {
        // Lobbies are drawn as one continuous hall across their floors
        item.has_union_background = true;
    }

    fn advance(&mut self, item: &ItemCore, dt: Seconds) {
        if item.people().is_empty() {
            self.busy_for = (self.busy_for - dt).max(0.0);
        } else {
            self.busy_for = LOBBY_BUSY_LINGER;
        }
    }

    fn draw(&self, item: &ItemCore, out: &mut DrawList) {
        let variant = u8::from(self.is_busy());
        out.push(
            item.item_id(),
            Layer::Item,
            SpriteKey::Item {
                item_type: ItemType::Lobby,
                variant,
            },
            *item.world_rect(),
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Empty floor slab; relies entirely on the default hooks
#[derive(Debug, Default)]
pub struct Floor;

impl Floor {
    pub fn new(_descriptor: &'static Descriptor) -> Box<dyn ItemKind> {
        Box::new(Self)
    }
}

impl ItemKind for Floor {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
