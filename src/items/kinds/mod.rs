//! Concrete item kinds and the dispatch table the factory selects from

pub mod hotel;
pub mod office;
pub mod structure;
pub mod transport;

use crate::items::descriptor::{Descriptor, ItemType};
use crate::items::item::ItemKind;

pub use hotel::{HotelRoom, Housekeeping, RoomState};
pub use office::Office;
pub use structure::{Floor, Lobby};
pub use transport::{Elevator, StairsLike};

/// Builds the inert behavior object for one item
pub type KindConstructor = fn(&'static Descriptor) -> Box<dyn ItemKind>;

/// Registered kinds; types missing here cannot be instantiated
const KIND_TABLE: [(ItemType, KindConstructor); 10] = [
    (ItemType::Lobby, Lobby::new),
    (ItemType::Floor, Floor::new),
    (ItemType::Stairs, StairsLike::stairs),
    (ItemType::Escalator, StairsLike::escalator),
    (ItemType::StandardElevator, Elevator::new),
    (ItemType::Office, Office::new),
    (ItemType::SingleRoom, HotelRoom::new),
    (ItemType::DoubleRoom, HotelRoom::new),
    (ItemType::Suite, HotelRoom::new),
    (ItemType::Housekeeping, Housekeeping::new),
];

pub fn constructor_for(item_type: ItemType) -> Option<KindConstructor> {
    KIND_TABLE
        .iter()
        .find(|(t, _)| *t == item_type)
        .map(|(_, constructor)| *constructor)
}

pub fn registered_types() -> impl Iterator<Item = ItemType> {
    KIND_TABLE.iter().map(|(t, _)| *t)
}
