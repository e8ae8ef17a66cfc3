//! Item framework integration tests

use proptest::prelude::*;

use skyscraper_core::core::config::SimulationConfig;
use skyscraper_core::core::types::{ItemId, PersonId, Rectd, Recti, TowerId};
use skyscraper_core::items::descriptor::{
    descriptor_for_index, descriptor_for_item_type, ItemCategory, ItemGroup, ItemType,
};
use skyscraper_core::items::factory::{make, make_with_id, make_with_rect, FactoryError};
use skyscraper_core::items::item::{AdvanceOutcome, Item, ItemState};
use skyscraper_core::items::kinds::{registered_types, Elevator, HotelRoom, Office};
use skyscraper_core::items::sprites::{Layer, SpriteKey};
use skyscraper_core::tower::geometry::{FloorGeometry, TowerContext};

fn geometry() -> FloorGeometry {
    FloorGeometry::new(TowerId::new(), &SimulationConfig::default())
}

fn office_at(geometry: &FloorGeometry, rect: Recti) -> Item {
    let descriptor = descriptor_for_item_type(ItemType::Office).unwrap();
    make_with_rect(geometry, descriptor, ItemId(1), rect).unwrap()
}

// ============================================================================
// Registry and factory
// ============================================================================

#[test]
fn test_every_type_has_matching_descriptor() {
    for t in ItemType::ALL {
        assert_eq!(descriptor_for_item_type(t).unwrap().item_type, t);
    }
    assert!(descriptor_for_item_type(ItemType::None).is_none());
}

#[test]
fn test_make_lobby_reports_type_and_group() {
    let g = geometry();
    let lobby = make(&g, descriptor_for_item_type(ItemType::Lobby).unwrap()).unwrap();
    assert_eq!(lobby.item_type(), ItemType::Lobby);
    assert_eq!(lobby.group(), ItemGroup::Structure);
    assert_eq!(lobby.category(), ItemCategory::Facility);
    assert!(!lobby.is_valid());
}

#[test]
fn test_factory_rejects_types_without_kind() {
    let g = geometry();
    let registered: Vec<ItemType> = registered_types().collect();
    for t in ItemType::ALL {
        let result = make(&g, descriptor_for_item_type(t).unwrap());
        if registered.contains(&t) {
            assert!(result.is_ok(), "{:?} should be constructible", t);
        } else {
            assert_eq!(result.unwrap_err(), FactoryError::Unregistered(t));
        }
    }
}

#[test]
fn test_make_with_rect_wires_world_rect() {
    let g = geometry();
    let office = office_at(&g, Recti::new(3, 4, 9, 1));
    assert_eq!(*office.world_rect(), g.world_rect(&Recti::new(3, 4, 9, 1)));
    assert_eq!(office.item_id(), ItemId(1));
    assert!(office.kind_as::<Office>().is_some());
}

#[test]
fn test_make_with_id_assigns_id() {
    let g = geometry();
    let room = make_with_id(&g, descriptor_for_item_type(ItemType::DoubleRoom).unwrap(), ItemId(42))
        .unwrap();
    assert_eq!(room.item_id(), ItemId(42));
    assert_eq!(room.kind_as::<HotelRoom>().unwrap().beds(), 2);
}

// ============================================================================
// Construction lifecycle
// ============================================================================

#[test]
fn test_construction_reaches_exactly_one() {
    let g = geometry();
    let mut office = office_at(&g, Recti::new(0, 1, 9, 1));
    office.set_under_construction(true);
    assert_eq!(office.state(), ItemState::Constructing);

    let mut flips = 0;
    for _ in 0..500 {
        if office.advance(0.05) == AdvanceOutcome::BecameOperational {
            flips += 1;
        }
        assert!(office.construction_progress() <= 1.0);
    }
    assert_eq!(flips, 1);
    assert_eq!(office.construction_progress(), 1.0);
    assert!(!office.is_under_construction());
}

#[test]
fn test_construction_draws_site_and_workers() {
    let g = geometry();
    let mut office = office_at(&g, Recti::new(0, 1, 9, 1));
    office.set_under_construction(true);

    let mut list = skyscraper_core::items::sprites::DrawList::new();
    office.draw(&Rectd::new(-1000.0, -1000.0, 4000.0, 4000.0), &mut list);
    let sprites: Vec<SpriteKey> = list.iter().map(|c| c.sprite).collect();
    assert!(sprites.contains(&SpriteKey::ConstructionSite));
    let workers = list.iter().filter(|c| c.layer == Layer::Workers).count();
    assert_eq!(workers, 3);
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn test_elevator_relocation_updates_served_floors() {
    let g = geometry();
    let descriptor = descriptor_for_item_type(ItemType::StandardElevator).unwrap();
    let mut shaft = make_with_rect(&g, descriptor, ItemId(7), Recti::new(0, 0, 4, 3)).unwrap();
    assert_eq!(shaft.kind_as::<Elevator>().unwrap().served_floors().len(), 3);

    shaft.set_rect(&g, Recti::new(0, -2, 4, 12)).unwrap();
    let served = shaft.kind_as::<Elevator>().unwrap().served_floors();
    assert_eq!(served.len(), 12);
    assert!(served.contains(&-2) && served.contains(&9));
}

#[test]
fn test_rejected_placement_is_recoverable() {
    let g = geometry();
    let mut office = office_at(&g, Recti::new(0, 1, 9, 1));
    let before = (*office.rect(), *office.world_rect());

    assert!(office.set_rect(&g, Recti::new(0, 1, 10, 1)).is_err());
    assert_eq!((*office.rect(), *office.world_rect()), before);

    // The caller may simply try another spot
    let moved = office.set_rect(&g, Recti::new(20, 2, 9, 1)).unwrap();
    assert_eq!(moved.previous, before.0);
    assert_eq!(*office.rect(), Recti::new(20, 2, 9, 1));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_descriptor_index_lookup(index in 0usize..64) {
        match descriptor_for_index(index) {
            Some(d) => {
                prop_assert!(index > 0 && index < ItemType::COUNT);
                prop_assert_eq!(d.item_type.index(), index);
            }
            None => prop_assert!(index == 0 || index >= ItemType::COUNT),
        }
    }

    #[test]
    fn prop_occupancy_is_a_set(ops in prop::collection::vec((any::<bool>(), 0u32..8), 0..64)) {
        let g = geometry();
        let mut office = office_at(&g, Recti::new(0, 1, 9, 1));
        let mut model = std::collections::BTreeSet::new();
        for (add, person) in ops {
            let person = PersonId(person);
            if add {
                prop_assert_eq!(office.add_person(person), model.insert(person));
            } else {
                prop_assert_eq!(office.remove_person(person), model.remove(&person));
            }
            prop_assert_eq!(office.occupancy(), model.len());
        }
    }

    #[test]
    fn prop_progress_monotonic(steps in prop::collection::vec(0.0f64..0.5, 1..200)) {
        let g = geometry();
        let mut office = office_at(&g, Recti::new(0, 1, 9, 1));
        office.set_under_construction(true);

        let mut last = office.construction_progress();
        let mut finished = false;
        for dt in steps {
            let outcome = office.advance(dt);
            let progress = office.construction_progress();
            prop_assert!(progress >= last);
            prop_assert!(progress <= 1.0);
            if finished {
                prop_assert!(!office.is_under_construction());
                prop_assert_ne!(outcome, AdvanceOutcome::BecameOperational);
            }
            finished |= outcome == AdvanceOutcome::BecameOperational;
            last = progress;
        }
    }
}
