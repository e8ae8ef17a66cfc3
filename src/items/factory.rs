//! Item factory - the only place items come into existence
//!
//! Each `make*` call looks the descriptor's type up in the kind table,
//! constructs the base item, applies the optional id and rect, then runs
//! `init`. Callers always receive a fully initialized item or an error.

use thiserror::Error;

use crate::core::types::{ItemId, Recti};
use crate::items::descriptor::{Descriptor, ItemType};
use crate::items::item::Item;
use crate::items::kinds::constructor_for;
use crate::items::placement::PlacementError;
use crate::tower::geometry::TowerContext;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("Cannot make an item of the none type")]
    NoneType,

    #[error("No item kind registered for {0:?}")]
    Unregistered(ItemType),

    #[error("Invalid initial placement: {0}")]
    Placement(#[from] PlacementError),
}

/// Make an unplaced item without an id
pub fn make(
    tower: &dyn TowerContext,
    descriptor: &'static Descriptor,
) -> Result<Item, FactoryError> {
    build(tower, descriptor, ItemId::NONE, None)
}

/// Make an unplaced item with a known id
pub fn make_with_id(
    tower: &dyn TowerContext,
    descriptor: &'static Descriptor,
    item_id: ItemId,
) -> Result<Item, FactoryError> {
    build(tower, descriptor, item_id, None)
}

/// Make an item with a known id at `rect`
///
/// The rect goes through the same placement checks as `Item::set_rect`.
pub fn make_with_rect(
    tower: &dyn TowerContext,
    descriptor: &'static Descriptor,
    item_id: ItemId,
    rect: Recti,
) -> Result<Item, FactoryError> {
    build(tower, descriptor, item_id, Some(rect))
}

fn build(
    tower: &dyn TowerContext,
    descriptor: &'static Descriptor,
    item_id: ItemId,
    rect: Option<Recti>,
) -> Result<Item, FactoryError> {
    if descriptor.item_type == ItemType::None {
        return Err(FactoryError::NoneType);
    }
    let constructor = constructor_for(descriptor.item_type)
        .ok_or(FactoryError::Unregistered(descriptor.item_type))?;

    let mut item = Item::construct(tower, descriptor, constructor(descriptor));
    if item_id.is_valid() {
        item.set_item_id(item_id);
    }
    if let Some(rect) = rect {
        item.assign_initial_rect(tower, rect)?;
    }
    item.init(tower);
    Ok(item)
}
