//! Item framework - descriptors, the item entity, its kinds and the factory

pub mod descriptor;
pub mod factory;
pub mod item;
pub mod kinds;
pub mod placement;
pub mod sprites;

pub use descriptor::{
    descriptor_for_item_type, descriptors, install_descriptors, Attributes, Descriptor,
    DescriptorTable, ItemCategory, ItemGroup, ItemType,
};
pub use factory::{make, make_with_id, make_with_rect, FactoryError};
pub use item::{AdvanceOutcome, Item, ItemCore, ItemKind, ItemState, Relocation};
pub use placement::PlacementError;
pub use sprites::{DrawList, Layer, SpriteCommand, SpriteKey};
