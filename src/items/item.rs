//! Item entity - one placed object in the tower
//!
//! An `Item` is split into shared state (`ItemCore`) and the behavior of
//! its concrete kind (`Box<dyn ItemKind>`). Kinds see the core through their
//! hooks, which keeps the borrow of the kind separate from the data it reads.
//!
//! Items are created only by the factory, which runs the two construction
//! phases back to back: `Item::construct` produces an inert item in the
//! `Uninitialized` state and `Item::init` wires the kind in. No other code
//! can observe an item between the two.

use std::any::Any;
use std::collections::BTreeMap;

use ahash::AHashSet;
use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{ItemId, PersonId, Rectd, Recti, Seconds, TowerId};
use crate::items::descriptor::{Attributes, Descriptor, ItemCategory, ItemGroup, ItemType};
use crate::items::placement::{validate_placement, PlacementError};
use crate::items::sprites::{DrawList, Layer, SpriteKey};
use crate::tower::geometry::{ConstructionTiming, TowerContext};

/// Number of construction worker sprites on a building site
pub const CONSTRUCTION_WORKERS: usize = 3;

/// Lifecycle of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Constructed but not yet initialized by the factory
    Uninitialized,
    /// Under construction, not usable yet
    Constructing,
    /// Fully operational
    Operational,
    /// Removed from its tower
    Destroyed,
}

/// Result of advancing an item by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdvanceOutcome {
    /// Nothing to report
    Idle,
    /// Construction progressed, still under construction
    Building { progress: f64 },
    /// Construction finished during this tick
    BecameOperational,
}

/// Previous and new placement after a successful `set_rect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub previous: Recti,
    pub current: Recti,
}

/// Optional capabilities of a concrete item kind
///
/// Every hook has an empty default. Kinds override only what they need.
pub trait ItemKind: std::fmt::Debug {
    /// Second construction phase, run once by the factory
    fn init(&mut self, _item: &mut ItemCore) {}

    /// Simulation tick
    fn advance(&mut self, _item: &ItemCore, _dt: Seconds) {}

    /// Refresh derived visual state
    fn update(&mut self, _item: &ItemCore) {}

    /// Emit the kind's own sprites
    fn draw(&self, _item: &ItemCore, _out: &mut DrawList) {}

    /// The item's placement changed
    fn on_change_location(&mut self, _item: &ItemCore) {}

    /// A nearby transport item appeared, moved or disappeared
    fn on_change_transport_items(&mut self, _item: &ItemCore) {}

    /// A simulated day passed
    fn on_date_advance(&mut self, _item: &ItemCore) {}

    /// Construction finished
    fn on_operational(&mut self, _item: &ItemCore) {}

    fn as_any(&self) -> &dyn Any;
}

/// Per-floor background image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    pub rect: Rectd,
    pub sprite: SpriteKey,
}

/// Construction progress and the cosmetic worker animation
#[derive(Debug, Clone)]
pub struct Construction {
    progress: f64,
    worker_timer: Seconds,
    worker_frame: u8,
    workers: [DVec2; CONSTRUCTION_WORKERS],
    rng: ChaCha8Rng,
    timing: ConstructionTiming,
}

impl Construction {
    fn new(timing: ConstructionTiming) -> Self {
        Self {
            timing,
            progress: 1.0,
            worker_timer: 0.0,
            worker_frame: 0,
            workers: [DVec2::ZERO; CONSTRUCTION_WORKERS],
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn worker_timer(&self) -> Seconds {
        self.worker_timer
    }

    pub fn worker_frame(&self) -> u8 {
        self.worker_frame
    }

    pub fn timing(&self) -> ConstructionTiming {
        self.timing
    }

    /// Worker positions relative to the item's world origin
    pub fn workers(&self) -> &[DVec2; CONSTRUCTION_WORKERS] {
        &self.workers
    }
}

/// State shared by every item kind
#[derive(Debug, Clone)]
pub struct ItemCore {
    tower: TowerId,
    descriptor: &'static Descriptor,
    item_id: ItemId,
    rect: Recti,
    world_rect: Rectd,
    state: ItemState,
    construction: Construction,
    people: AHashSet<PersonId>,
    backgrounds: BTreeMap<i32, Background>,
    /// One background spanning all floors instead of one per floor
    pub has_union_background: bool,
}

impl ItemCore {
    pub fn tower(&self) -> TowerId {
        self.tower
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        self.descriptor
    }

    pub fn item_type(&self) -> ItemType {
        self.descriptor.item_type
    }

    pub fn group(&self) -> ItemGroup {
        self.descriptor.group
    }

    pub fn category(&self) -> ItemCategory {
        self.descriptor.category
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn rect(&self) -> &Recti {
        &self.rect
    }

    pub fn world_rect(&self) -> &Rectd {
        &self.world_rect
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn is_under_construction(&self) -> bool {
        self.state == ItemState::Constructing
    }

    pub fn construction(&self) -> &Construction {
        &self.construction
    }

    pub fn people(&self) -> &AHashSet<PersonId> {
        &self.people
    }

    pub fn backgrounds(&self) -> &BTreeMap<i32, Background> {
        &self.backgrounds
    }

    pub fn num_floors(&self) -> u32 {
        self.rect.height().max(0) as u32
    }

    pub fn min_floor(&self) -> i32 {
        self.rect.min_y()
    }

    pub fn max_floor(&self) -> i32 {
        self.rect.max_y() - 1
    }

    /// Slice of the item's rect on one floor
    pub fn floor_rect(&self, floor: i32) -> Recti {
        Recti::new(self.rect.min_x(), floor, self.rect.width(), 1)
    }
}

/// A placed entity: shared core plus kind-specific behavior
#[derive(Debug)]
pub struct Item {
    core: ItemCore,
    kind: Box<dyn ItemKind>,
}

impl Item {
    /// First construction phase: inert base state, kind not yet wired
    pub(crate) fn construct(
        tower: &dyn TowerContext,
        descriptor: &'static Descriptor,
        kind: Box<dyn ItemKind>,
    ) -> Self {
        let rect = Recti::default();
        Self {
            core: ItemCore {
                tower: tower.tower_id(),
                descriptor,
                item_id: ItemId::NONE,
                rect,
                world_rect: tower.world_rect(&rect),
                state: ItemState::Uninitialized,
                construction: Construction::new(tower.construction_timing()),
                people: AHashSet::new(),
                backgrounds: BTreeMap::new(),
                has_union_background: false,
            },
            kind,
        }
    }

    /// Second construction phase; only the factory calls this
    ///
    /// Calling it again on an initialized item does nothing.
    pub(crate) fn init(&mut self, tower: &dyn TowerContext) {
        if self.core.state != ItemState::Uninitialized {
            tracing::warn!(
                "Ignoring repeated init of {:?} {}",
                self.core.item_type(),
                self.core.item_id
            );
            return;
        }
        self.core.state = ItemState::Operational;
        self.reseed_workers();
        self.kind.init(&mut self.core);
        self.init_background(tower);
    }

    /// Placement given at creation time, before the kind is wired
    pub(crate) fn assign_initial_rect(
        &mut self,
        tower: &dyn TowerContext,
        rect: Recti,
    ) -> Result<(), PlacementError> {
        validate_placement(self.core.descriptor, tower, &rect)?;
        self.core.rect = rect;
        self.core.world_rect = tower.world_rect(&rect);
        Ok(())
    }

    pub fn core(&self) -> &ItemCore {
        &self.core
    }

    pub fn kind(&self) -> &dyn ItemKind {
        self.kind.as_ref()
    }

    /// Downcast the kind for inspection
    pub fn kind_as<K: ItemKind + 'static>(&self) -> Option<&K> {
        self.kind.as_any().downcast_ref::<K>()
    }

    // === BASIC ATTRIBUTES ===

    pub fn tower(&self) -> TowerId {
        self.core.tower
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        self.core.descriptor
    }

    pub fn item_type(&self) -> ItemType {
        self.core.item_type()
    }

    pub fn group(&self) -> ItemGroup {
        self.core.group()
    }

    pub fn category(&self) -> ItemCategory {
        self.core.category()
    }

    pub fn state(&self) -> ItemState {
        self.core.state
    }

    // === IDENTIFICATION ===

    pub fn item_id(&self) -> ItemId {
        self.core.item_id
    }

    pub fn set_item_id(&mut self, item_id: ItemId) {
        self.core.item_id = item_id;
        self.reseed_workers();
    }

    pub fn is_valid(&self) -> bool {
        self.core.item_id.is_valid()
    }

    // === LOCATION ===

    pub fn rect(&self) -> &Recti {
        &self.core.rect
    }

    pub fn world_rect(&self) -> &Rectd {
        &self.core.world_rect
    }

    pub fn floor_rect(&self, floor: i32) -> Recti {
        self.core.floor_rect(floor)
    }

    pub fn num_floors(&self) -> u32 {
        self.core.num_floors()
    }

    pub fn min_floor(&self) -> i32 {
        self.core.min_floor()
    }

    pub fn max_floor(&self) -> i32 {
        self.core.max_floor()
    }

    /// Move the item to `rect`
    ///
    /// Rejected placements leave the item untouched. On success the world
    /// rect is recomputed from the tower geometry and `on_change_location`
    /// runs; the caller is responsible for notifying neighbouring items.
    pub fn set_rect(
        &mut self,
        tower: &dyn TowerContext,
        rect: Recti,
    ) -> Result<Relocation, PlacementError> {
        debug_assert_eq!(tower.tower_id(), self.core.tower, "item used with a foreign tower");
        validate_placement(self.core.descriptor, tower, &rect)?;

        let previous = self.core.rect;
        self.core.rect = rect;
        self.core.world_rect = tower.world_rect(&rect);
        self.on_change_location(tower);

        Ok(Relocation {
            previous,
            current: rect,
        })
    }

    /// Move the item to the grid rect nearest to `world_rect`
    pub fn set_world_rect(
        &mut self,
        tower: &dyn TowerContext,
        world_rect: Rectd,
    ) -> Result<Relocation, PlacementError> {
        self.set_rect(tower, tower.grid_rect(&world_rect))
    }

    /// Grid cells actually occupied, honouring the descriptor mask
    pub fn occupied_cells(&self) -> Vec<glam::IVec2> {
        let rect = self.core.rect;
        let mask = self.core.descriptor.mask.as_ref();
        let mut cells = Vec::new();
        for y in 0..rect.height() {
            for x in 0..rect.width() {
                let local = glam::IVec2::new(x, y);
                if mask.map_or(true, |m| m.contains(local)) {
                    cells.push(rect.origin + local);
                }
            }
        }
        cells
    }

    fn on_change_location(&mut self, tower: &dyn TowerContext) {
        self.update_background(tower);
        self.kind.on_change_location(&self.core);
    }

    // === BACKGROUNDS ===

    fn init_background(&mut self, tower: &dyn TowerContext) {
        self.update_background(tower);
    }

    fn update_background(&mut self, tower: &dyn TowerContext) {
        let core = &mut self.core;
        core.backgrounds.clear();
        if core.rect.is_empty() {
            return;
        }
        let sprite = SpriteKey::Background(core.descriptor.item_type);
        if core.has_union_background {
            core.backgrounds.insert(
                core.rect.min_y(),
                Background {
                    rect: core.world_rect,
                    sprite,
                },
            );
        } else {
            for floor in core.rect.min_y()..core.rect.max_y() {
                let rect = tower.world_rect(&core.floor_rect(floor));
                core.backgrounds.insert(floor, Background { rect, sprite });
            }
        }
    }

    // === CONSTRUCTION ===

    pub fn is_under_construction(&self) -> bool {
        self.core.is_under_construction()
    }

    pub fn construction_progress(&self) -> f64 {
        self.core.construction.progress
    }

    /// Start or abandon construction
    ///
    /// Starting resets progress to 0.0; ending marks the item complete.
    pub fn set_under_construction(&mut self, under_construction: bool) {
        match (self.core.state, under_construction) {
            (ItemState::Operational, true) => {
                self.core.state = ItemState::Constructing;
                self.core.construction.progress = 0.0;
                self.update_construction_worker_sprites();
            }
            (ItemState::Constructing, false) => self.finish_construction(),
            _ => {}
        }
    }

    fn finish_construction(&mut self) {
        self.core.construction.progress = 1.0;
        self.core.state = ItemState::Operational;
        tracing::debug!(
            "{:?} {} finished construction",
            self.core.item_type(),
            self.core.item_id
        );
        self.kind.on_operational(&self.core);
    }

    fn reseed_workers(&mut self) {
        let seed = ((self.core.item_type() as u64) << 32) | self.core.item_id.0 as u64;
        self.core.construction.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Scatter the workers across the site and step their animation
    pub fn update_construction_worker_sprites(&mut self) {
        let size = self.core.world_rect.size;
        let floors = self.core.num_floors().max(1);
        let floor_height = size.y / floors as f64;
        let construction = &mut self.core.construction;
        construction.worker_frame = construction.worker_frame.wrapping_add(1);
        for worker in construction.workers.iter_mut() {
            let x = if size.x > 0.0 {
                construction.rng.gen_range(0.0..size.x)
            } else {
                0.0
            };
            let floor = construction.rng.gen_range(0..floors);
            *worker = DVec2::new(x, floor as f64 * floor_height);
        }
    }

    // === SIMULATION ===

    /// Advance construction and animation timers by `dt` seconds
    ///
    /// Negative steps count as zero. Non-finite steps are ignored.
    pub fn advance(&mut self, dt: Seconds) -> AdvanceOutcome {
        if matches!(self.core.state, ItemState::Uninitialized | ItemState::Destroyed) {
            return AdvanceOutcome::Idle;
        }
        if !dt.is_finite() {
            tracing::warn!("Ignoring non-finite step {} for item {}", dt, self.core.item_id);
            return AdvanceOutcome::Idle;
        }
        let dt = dt.max(0.0);
        let timing = self.core.construction.timing;

        let construction = &mut self.core.construction;
        construction.worker_timer += dt;
        if construction.worker_timer >= timing.worker_frame_interval {
            let frames = (construction.worker_timer / timing.worker_frame_interval).floor();
            construction.worker_timer %= timing.worker_frame_interval;
            if self.is_under_construction() {
                // Reshuffle once however many frames elapsed
                self.update_construction_worker_sprites();
                let skipped = ((frames - 1.0) % 256.0) as u8;
                let construction = &mut self.core.construction;
                construction.worker_frame = construction.worker_frame.wrapping_add(skipped);
            }
        }

        let outcome = if self.is_under_construction() {
            let construction = &mut self.core.construction;
            construction.progress =
                (construction.progress + dt / timing.construction_duration).min(1.0);
            if construction.progress >= 1.0 {
                self.finish_construction();
                AdvanceOutcome::BecameOperational
            } else {
                AdvanceOutcome::Building {
                    progress: construction.progress,
                }
            }
        } else {
            AdvanceOutcome::Idle
        };

        self.kind.advance(&self.core, dt);
        outcome
    }

    pub fn update(&mut self) {
        self.kind.update(&self.core);
    }

    /// Emit sprites if the item overlaps `visible`
    pub fn draw(&self, visible: &Rectd, out: &mut DrawList) {
        let core = &self.core;
        if !core.world_rect.intersects(visible) {
            return;
        }

        for background in core.backgrounds.values() {
            out.push(core.item_id, Layer::Background, background.sprite, background.rect);
        }

        if core.is_under_construction() {
            out.push(
                core.item_id,
                Layer::Construction,
                SpriteKey::ConstructionSite,
                core.world_rect,
            );
            let floor_height = core.world_rect.size.y / core.num_floors().max(1) as f64;
            for (i, offset) in core.construction.workers.iter().enumerate() {
                let origin = core.world_rect.origin + *offset;
                let frame = core.construction.worker_frame.wrapping_add(i as u8) % 4;
                out.push(
                    core.item_id,
                    Layer::Workers,
                    SpriteKey::Worker { frame },
                    Rectd::new(origin.x, origin.y, 8.0, floor_height * 0.5),
                );
            }
        } else {
            self.kind.draw(core, out);
        }
    }

    // === NOTIFICATIONS ===

    pub fn on_change_transport_items(&mut self) {
        self.kind.on_change_transport_items(&self.core);
    }

    pub fn on_date_advance(&mut self) {
        self.kind.on_date_advance(&self.core);
    }

    // === PEOPLE ===

    /// Record that `person` is inside; returns false if already present
    pub fn add_person(&mut self, person: PersonId) -> bool {
        self.core.people.insert(person)
    }

    /// Record that `person` left; returns false if they were not inside
    pub fn remove_person(&mut self, person: PersonId) -> bool {
        self.core.people.remove(&person)
    }

    pub fn people(&self) -> &AHashSet<PersonId> {
        &self.core.people
    }

    pub fn occupancy(&self) -> usize {
        self.core.people.len()
    }

    // === DESTRUCTION ===

    pub fn is_destructible(&self) -> bool {
        !self.core.descriptor.has(Attributes::UNDESTRUCTIBLE)
    }

    /// Only the owning tower calls this, after checking `is_destructible`
    pub(crate) fn mark_destroyed(&mut self) {
        self.core.state = ItemState::Destroyed;
        self.core.people.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::items::descriptor::descriptor_for_item_type;
    use crate::items::factory::{make, make_with_rect};
    use crate::tower::geometry::FloorGeometry;

    fn geometry() -> FloorGeometry {
        FloorGeometry::new(TowerId::new(), &SimulationConfig::default())
    }

    fn office(geometry: &FloorGeometry) -> Item {
        let descriptor = descriptor_for_item_type(ItemType::Office).unwrap();
        make_with_rect(geometry, descriptor, ItemId(4), Recti::new(0, 1, 9, 1)).unwrap()
    }

    #[test]
    fn test_factory_output_is_initialized() {
        let g = geometry();
        let item = make(&g, descriptor_for_item_type(ItemType::Floor).unwrap()).unwrap();
        assert_eq!(item.state(), ItemState::Operational);
        assert!(!item.is_valid());
        assert_eq!(item.tower(), g.tower_id());
    }

    #[test]
    fn test_repeated_init_is_ignored() {
        let g = geometry();
        let mut item = office(&g);
        item.set_under_construction(true);
        item.init(&g);
        assert_eq!(item.state(), ItemState::Constructing);
    }

    #[test]
    fn test_set_rect_updates_world_rect() {
        let g = geometry();
        let mut item = office(&g);
        let moved = item.set_rect(&g, Recti::new(20, 3, 9, 1)).unwrap();
        assert_eq!(moved.previous, Recti::new(0, 1, 9, 1));
        assert_eq!(*item.world_rect(), g.world_rect(&Recti::new(20, 3, 9, 1)));
        assert_eq!(item.backgrounds_floors(), vec![3]);
    }

    #[test]
    fn test_rejected_rect_leaves_item_untouched() {
        let g = geometry();
        let mut item = office(&g);
        let before_world = *item.world_rect();
        let err = item.set_rect(&g, Recti::new(0, -1, 9, 1)).unwrap_err();
        assert!(matches!(err, PlacementError::BelowGround { .. }));
        assert_eq!(*item.rect(), Recti::new(0, 1, 9, 1));
        assert_eq!(*item.world_rect(), before_world);
    }

    #[test]
    fn test_set_world_rect_snaps_to_grid() {
        let g = geometry();
        let mut item = office(&g);
        let target = g.world_rect(&Recti::new(5, 7, 9, 1));
        item.set_world_rect(&g, target).unwrap();
        assert_eq!(*item.rect(), Recti::new(5, 7, 9, 1));
    }

    #[test]
    fn test_construction_completes_once() {
        let g = geometry();
        let mut item = office(&g);
        item.set_under_construction(true);
        assert_eq!(item.construction_progress(), 0.0);

        let dt = 0.25;
        let mut completions = 0;
        for _ in 0..40 {
            let before = item.construction_progress();
            if item.advance(dt) == AdvanceOutcome::BecameOperational {
                completions += 1;
            }
            assert!(item.construction_progress() >= before);
        }
        assert_eq!(completions, 1);
        assert_eq!(item.construction_progress(), 1.0);
        assert!(!item.is_under_construction());
    }

    #[test]
    fn test_worker_timer_runs_when_operational() {
        let g = geometry();
        let mut item = office(&g);
        item.advance(0.05);
        assert!((item.core().construction().worker_timer() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_huge_step_returns_and_finishes() {
        let g = geometry();
        let mut item = office(&g);
        item.set_under_construction(true);

        assert_eq!(item.advance(1.0e17), AdvanceOutcome::BecameOperational);
        assert_eq!(item.construction_progress(), 1.0);
        let timer = item.core().construction().worker_timer();
        assert!((0.0..0.1).contains(&timer));
    }

    #[test]
    fn test_non_finite_step_is_ignored() {
        let g = geometry();
        let mut item = office(&g);
        item.set_under_construction(true);
        item.advance(0.5);
        let progress = item.construction_progress();

        for dt in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert_eq!(item.advance(dt), AdvanceOutcome::Idle);
        }
        assert_eq!(item.construction_progress(), progress);
        assert!(item.core().construction().worker_timer().is_finite());
    }

    #[test]
    fn test_duration_comes_from_tower() {
        let config = SimulationConfig {
            construction_duration: 100.0,
            ..SimulationConfig::default()
        };
        let g = FloorGeometry::new(TowerId::new(), &config);
        let mut item = office(&g);
        item.set_under_construction(true);
        for _ in 0..3 {
            item.advance(1.0);
        }
        assert_eq!(item.state(), ItemState::Constructing);
        assert!((item.construction_progress() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_workers_are_deterministic() {
        let g = geometry();
        let mut a = office(&g);
        let mut b = office(&g);
        a.set_under_construction(true);
        b.set_under_construction(true);
        for _ in 0..5 {
            a.advance(0.1);
            b.advance(0.1);
        }
        assert_eq!(a.core().construction().workers(), b.core().construction().workers());
    }

    #[test]
    fn test_occupancy_idempotent() {
        let g = geometry();
        let mut item = office(&g);
        assert!(item.add_person(PersonId(1)));
        assert!(!item.add_person(PersonId(1)));
        assert_eq!(item.occupancy(), 1);

        assert!(!item.remove_person(PersonId(2)));
        assert_eq!(item.occupancy(), 1);
        assert!(item.remove_person(PersonId(1)));
        assert!(!item.remove_person(PersonId(1)));
        assert_eq!(item.occupancy(), 0);
    }

    #[test]
    fn test_occupied_cells_follow_mask() {
        let g = geometry();
        let descriptor = descriptor_for_item_type(ItemType::Escalator).unwrap();
        let item = make_with_rect(&g, descriptor, ItemId(1), Recti::new(10, 0, 8, 2)).unwrap();
        let cells = item.occupied_cells();
        assert_eq!(cells.len(), 12);
        assert!(cells.contains(&glam::IVec2::new(10, 0)));
        assert!(!cells.contains(&glam::IVec2::new(10, 1)));
    }

    #[test]
    fn test_draw_culls_invisible_items() {
        let g = geometry();
        let mut item = office(&g);
        let mut out = DrawList::new();
        item.draw(&Rectd::new(10_000.0, 10_000.0, 100.0, 100.0), &mut out);
        assert!(out.is_empty());

        item.set_under_construction(true);
        item.draw(item.world_rect(), &mut out);
        assert!(out.iter().any(|c| c.sprite == SpriteKey::ConstructionSite));
        assert_eq!(
            out.iter().filter(|c| c.layer == Layer::Workers).count(),
            CONSTRUCTION_WORKERS
        );
    }

    impl Item {
        fn backgrounds_floors(&self) -> Vec<i32> {
            self.core.backgrounds.keys().copied().collect()
        }
    }
}
