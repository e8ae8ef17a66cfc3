//! Draw commands emitted by items
//!
//! Items do not render; they describe what should be drawn. The renderer
//! that consumes a `DrawList` lives outside this crate.

use serde::Serialize;

use crate::core::types::{ItemId, Rectd};
use crate::items::descriptor::ItemType;

/// Back-to-front drawing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Layer {
    Background,
    Item,
    Construction,
    Workers,
}

/// What to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpriteKey {
    /// Floor background behind an item
    Background(ItemType),
    /// The item itself; `variant` selects an animation frame or state image
    Item { item_type: ItemType, variant: u8 },
    /// Scaffolding overlay shown while under construction
    ConstructionSite,
    /// One of the construction workers, with its animation frame
    Worker { frame: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpriteCommand {
    pub item: ItemId,
    pub layer: Layer,
    pub sprite: SpriteKey,
    pub rect: Rectd,
}

/// Commands collected for one frame
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<SpriteCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ItemId, layer: Layer, sprite: SpriteKey, rect: Rectd) {
        self.commands.push(SpriteCommand {
            item,
            layer,
            sprite,
            rect,
        });
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Commands sorted back to front, stable within a layer
    pub fn sorted(&self) -> Vec<SpriteCommand> {
        let mut commands = self.commands.clone();
        commands.sort_by_key(|c| c.layer);
        commands
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpriteCommand> {
        self.commands.iter()
    }
}
