//! Tower - the owning container of all placed items
//!
//! The tower is the only owner of `Item` values and the only code allowed to
//! destroy one. Items refer back to it through its `TowerId` and receive its
//! `FloorGeometry` whenever placement math is needed.

pub mod geometry;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::config::{config, SimulationConfig};
use crate::core::types::{ItemId, PersonId, Rectd, Recti, Seconds, TowerId};
use crate::items::descriptor::{descriptor_for_item_type, ItemCategory, ItemType};
use crate::items::factory::{make_with_rect, FactoryError};
use crate::items::item::{AdvanceOutcome, Item, Relocation};
use crate::items::placement::PlacementError;
use crate::items::sprites::DrawList;

pub use geometry::{FloorGeometry, TowerContext};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TowerError {
    #[error("Item not found: {0}")]
    UnknownItem(ItemId),

    #[error("Item id already in use: {0}")]
    DuplicateId(ItemId),

    #[error("Item belongs to another tower")]
    ForeignItem,

    #[error("No item ids left to assign")]
    IdsExhausted,

    #[error("{1:?} {0} cannot be destroyed")]
    Undestructible(ItemId, ItemType),

    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),
}

/// The game tower
pub struct Tower {
    geometry: FloorGeometry,
    items: BTreeMap<ItemId, Item>,
    /// `None` once `u32::MAX` has been handed out
    next_id: Option<u32>,
    day: u64,
}

impl Tower {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: &SimulationConfig) -> Self {
        Self {
            geometry: FloorGeometry::new(TowerId::new(), config),
            items: BTreeMap::new(),
            next_id: Some(1),
            day: 0,
        }
    }

    pub fn id(&self) -> TowerId {
        self.geometry.tower_id()
    }

    pub fn geometry(&self) -> &FloorGeometry {
        &self.geometry
    }

    pub fn day(&self) -> u64 {
        self.day
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Items in id order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Items with at least one cell on `floor`
    pub fn items_at(&self, floor: i32) -> impl Iterator<Item = &Item> + '_ {
        self.items
            .values()
            .filter(move |item| item.min_floor() <= floor && floor <= item.max_floor())
    }

    fn peek_id(&self) -> Result<ItemId, TowerError> {
        self.next_id.map(ItemId).ok_or(TowerError::IdsExhausted)
    }

    fn allocate_id(&mut self) -> Result<ItemId, TowerError> {
        let id = self.peek_id()?;
        self.reserve_through(id);
        Ok(id)
    }

    /// Keep future ids above `id`
    fn reserve_through(&mut self, id: ItemId) {
        if self.next_id.is_some_and(|next| id.0 >= next) {
            self.next_id = id.0.checked_add(1);
        }
    }

    /// Place a new construction site of `item_type` at `rect`
    pub fn build(&mut self, item_type: ItemType, rect: Recti) -> Result<ItemId, TowerError> {
        let descriptor = descriptor_for_item_type(item_type).ok_or(FactoryError::NoneType)?;
        let id = self.peek_id()?;
        let mut item = make_with_rect(&self.geometry, descriptor, id, rect)?;
        item.set_under_construction(true);
        self.reserve_through(id);

        tracing::info!(
            "Building {:?} {} at {:?} for ${}",
            item_type,
            id,
            rect,
            descriptor.total_price(rect.width())
        );
        let category = item.category();
        self.items.insert(id, item);
        self.notify_neighbours(id, rect, category);
        Ok(id)
    }

    /// Adopt an item made by the factory, assigning an id if it has none
    pub fn insert(&mut self, mut item: Item) -> Result<ItemId, TowerError> {
        if item.tower() != self.id() {
            return Err(TowerError::ForeignItem);
        }
        let id = if item.is_valid() {
            let id = item.item_id();
            if self.items.contains_key(&id) {
                return Err(TowerError::DuplicateId(id));
            }
            self.reserve_through(id);
            id
        } else {
            let id = self.allocate_id()?;
            item.set_item_id(id);
            id
        };

        let (rect, category) = (*item.rect(), item.category());
        self.items.insert(id, item);
        self.notify_neighbours(id, rect, category);
        Ok(id)
    }

    /// Move an item, then notify the items around both its old and new rect
    pub fn place(&mut self, id: ItemId, rect: Recti) -> Result<Relocation, TowerError> {
        let item = self.items.get_mut(&id).ok_or(TowerError::UnknownItem(id))?;
        let relocation = item.set_rect(&self.geometry, rect).map_err(|e| {
            tracing::debug!("Rejected placement of {} at {:?}: {}", id, rect, e);
            e
        })?;

        let category = item.category();
        self.notify_neighbours(id, relocation.previous, category);
        self.notify_neighbours(id, relocation.current, category);
        Ok(relocation)
    }

    /// Remove an item unless its descriptor marks it undestructible
    pub fn destroy(&mut self, id: ItemId) -> Result<Item, TowerError> {
        let item = self.items.get(&id).ok_or(TowerError::UnknownItem(id))?;
        if !item.is_destructible() {
            tracing::warn!("Refusing to destroy undestructible {:?} {}", item.item_type(), id);
            return Err(TowerError::Undestructible(id, item.item_type()));
        }

        let mut item = self
            .items
            .remove(&id)
            .ok_or(TowerError::UnknownItem(id))?;
        item.mark_destroyed();
        self.notify_neighbours(id, *item.rect(), item.category());
        tracing::info!("Destroyed {:?} {}", item.item_type(), id);
        Ok(item)
    }

    /// Tell transport items next to `rect` that their surroundings changed
    ///
    /// Neighbours overlap `rect` horizontally and sit on the same floors or
    /// directly above or below. When the changed item is itself a transport,
    /// facilities next to it are told as well.
    fn notify_neighbours(&mut self, changed: ItemId, rect: Recti, category: ItemCategory) {
        if rect.is_empty() {
            return;
        }
        let changed_is_transport = category == ItemCategory::Transport;

        for (id, item) in self.items.iter_mut() {
            if *id == changed {
                continue;
            }
            let other = item.rect();
            let adjacent = other.overlaps_horizontally(&rect)
                && other.min_y() <= rect.max_y()
                && rect.min_y() <= other.max_y();
            if !adjacent {
                continue;
            }
            if changed_is_transport || item.category() == ItemCategory::Transport {
                item.on_change_transport_items();
            }
        }
    }

    /// Advance every item by `dt`; returns the items that became operational
    pub fn advance(&mut self, dt: Seconds) -> Vec<ItemId> {
        let mut finished = Vec::new();
        for (id, item) in self.items.iter_mut() {
            if item.advance(dt) == AdvanceOutcome::BecameOperational {
                tracing::info!("{:?} {} is now operational", item.item_type(), id);
                finished.push(*id);
            }
        }
        for id in &finished {
            let placed = self.items.get(id).map(|item| (*item.rect(), item.category()));
            if let Some((rect, category)) = placed {
                self.notify_neighbours(*id, rect, category);
            }
        }
        finished
    }

    pub fn update(&mut self) {
        for item in self.items.values_mut() {
            item.update();
        }
    }

    /// Sprite commands for every item intersecting `visible`
    pub fn draw(&self, visible: &Rectd) -> DrawList {
        let mut out = DrawList::new();
        for item in self.items.values() {
            item.draw(visible, &mut out);
        }
        out
    }

    /// Start a new simulated day
    pub fn advance_date(&mut self) -> u64 {
        self.day += 1;
        for item in self.items.values_mut() {
            item.on_date_advance();
        }
        tracing::debug!("Day {} begins", self.day);
        self.day
    }

    pub fn add_person(&mut self, id: ItemId, person: PersonId) -> Result<bool, TowerError> {
        let item = self.items.get_mut(&id).ok_or(TowerError::UnknownItem(id))?;
        Ok(item.add_person(person))
    }

    pub fn remove_person(&mut self, id: ItemId, person: PersonId) -> Result<bool, TowerError> {
        let item = self.items.get_mut(&id).ok_or(TowerError::UnknownItem(id))?;
        Ok(item.remove_person(person))
    }

    /// World rect covering every placed item
    pub fn bounds(&self) -> Rectd {
        let mut rects = self
            .items
            .values()
            .filter(|item| !item.rect().is_empty())
            .map(|item| *item.world_rect());
        let Some(first) = rects.next() else {
            return Rectd::default();
        };
        let (min, max) = rects.fold((first.origin, first.max()), |(min, max), r| {
            (min.min(r.origin), max.max(r.max()))
        });
        Rectd {
            origin: min,
            size: max - min,
        }
    }
}

impl Default for Tower {
    fn default() -> Self {
        Self::new()
    }
}
