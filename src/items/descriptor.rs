//! Item descriptors - the immutable per-type specification table
//!
//! Every item type has exactly one `Descriptor`. The table is published once
//! into a process-wide registry and then shared by `&'static` reference with
//! every item of that type; nothing mutates it after publication.

use std::path::Path;
use std::sync::OnceLock;

use glam::IVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Recti;

/// Type of item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ItemType {
    None = 0,

    // Structure
    Lobby,
    Floor,
    Stairs,
    Escalator,

    // Elevator
    StandardElevator,
    ServiceElevator,
    ExpressElevator,

    // Office
    Office,

    // Hotel
    SingleRoom,
    DoubleRoom,
    Suite,

    // Entertainment
    FastFood,
    Restaurant,
    Shop,
    Cinema,
    PartyHall,

    // Infrastructure
    ParkingRamp,
    ParkingSpace,
    RecyclingCenter,
    Metro,

    // Services
    Cathedral,
    Security,
    MedicalCenter,
    Housekeeping,

    // Condo
    Condo,
}

impl ItemType {
    /// Every real item type, in table order (excludes `None`)
    pub const ALL: [ItemType; 25] = [
        ItemType::Lobby,
        ItemType::Floor,
        ItemType::Stairs,
        ItemType::Escalator,
        ItemType::StandardElevator,
        ItemType::ServiceElevator,
        ItemType::ExpressElevator,
        ItemType::Office,
        ItemType::SingleRoom,
        ItemType::DoubleRoom,
        ItemType::Suite,
        ItemType::FastFood,
        ItemType::Restaurant,
        ItemType::Shop,
        ItemType::Cinema,
        ItemType::PartyHall,
        ItemType::ParkingRamp,
        ItemType::ParkingSpace,
        ItemType::RecyclingCenter,
        ItemType::Metro,
        ItemType::Cathedral,
        ItemType::Security,
        ItemType::MedicalCenter,
        ItemType::Housekeeping,
        ItemType::Condo,
    ];

    /// Number of slots in the type table, `None` included
    pub const COUNT: usize = Self::ALL.len() + 1;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Map a raw table index back to a type; out-of-range input yields `None`
    pub fn from_index(index: usize) -> Option<ItemType> {
        match index {
            0 => Some(ItemType::None),
            i => Self::ALL.get(i - 1).copied(),
        }
    }
}

/// Item group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemGroup {
    None,
    Structure,
    Elevator,
    Office,
    Hotel,
    Entertainment,
    Infrastructure,
    Services,
}

/// Item category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Facility,
    Transport,
}

/// Single placement attribute, as written in descriptor files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    #[serde(rename = "flexible_width")]
    FlexibleWidth,
    #[serde(rename = "every_15th_floor")]
    Every15thFloor,
    #[serde(rename = "not_above_ground")]
    NotAboveGround,
    #[serde(rename = "not_below_ground")]
    NotBelowGround,
    #[serde(rename = "allowed_on_ground")]
    AllowedOnGround,
    #[serde(rename = "undestructible")]
    Undestructible,
}

impl Attribute {
    const ALL: [Attribute; 6] = [
        Attribute::FlexibleWidth,
        Attribute::Every15thFloor,
        Attribute::NotAboveGround,
        Attribute::NotBelowGround,
        Attribute::AllowedOnGround,
        Attribute::Undestructible,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Attribute bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Attribute>", into = "Vec<Attribute>")]
pub struct Attributes(u16);

impl Attributes {
    pub const NONE: Attributes = Attributes(0);
    pub const FLEXIBLE_WIDTH: Attributes = Attributes(1 << 0);
    pub const EVERY_15TH_FLOOR: Attributes = Attributes(1 << 1);
    pub const NOT_ABOVE_GROUND: Attributes = Attributes(1 << 2);
    pub const NOT_BELOW_GROUND: Attributes = Attributes(1 << 3);
    pub const ALLOWED_ON_GROUND: Attributes = Attributes(1 << 4);
    pub const UNDESTRUCTIBLE: Attributes = Attributes(1 << 5);

    pub fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl std::ops::BitOr for Attributes {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<Vec<Attribute>> for Attributes {
    fn from(list: Vec<Attribute>) -> Self {
        Self(list.into_iter().fold(0, |bits, a| bits | a.bit()))
    }
}

impl From<Attributes> for Vec<Attribute> {
    fn from(attributes: Attributes) -> Self {
        Attribute::ALL
            .into_iter()
            .filter(|a| attributes.0 & a.bit() != 0)
            .collect()
    }
}

/// Occupancy shape for footprints that are not a plain rectangle
///
/// Cells are relative to the item origin. The bounding box of all parts is
/// the footprint the item must be placed with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RectMask {
    pub parts: Vec<Recti>,
}

impl RectMask {
    pub fn new(parts: Vec<Recti>) -> Self {
        Self { parts }
    }

    /// Size of the bounding box of all parts, measured from the origin
    pub fn bounds(&self) -> IVec2 {
        self.parts
            .iter()
            .fold(IVec2::ZERO, |acc, r| acc.max(IVec2::new(r.max_x(), r.max_y())))
    }

    /// True if the cell (relative to the origin) is occupied
    pub fn contains(&self, cell: IVec2) -> bool {
        self.parts.iter().any(|r| r.contains(cell))
    }
}

/// Immutable per-type item specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub group: ItemGroup,
    pub category: ItemCategory,
    #[serde(default)]
    pub min_rating: u16,
    #[serde(default)]
    pub attributes: Attributes,
    pub price: u32,
    /// Footprint in cells (x) and floors (y)
    pub cells: IVec2,
    /// Smallest footprint the item may be placed with
    pub min_unit: IVec2,
    #[serde(default)]
    pub mask: Option<RectMask>,
}

impl Descriptor {
    pub fn has(&self, attribute: Attributes) -> bool {
        self.attributes.contains(attribute)
    }

    /// Price for placing the item with the given width in cells
    ///
    /// Flexible-width items are priced per `min_unit` column block.
    pub fn total_price(&self, width: i32) -> u64 {
        if self.has(Attributes::FLEXIBLE_WIDTH) && self.min_unit.x > 0 {
            let units = (width / self.min_unit.x).max(1) as u64;
            self.price as u64 * units
        } else {
            self.price as u64
        }
    }
}

#[derive(Error, Debug)]
pub enum DescriptorLoadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("The none type cannot have a descriptor")]
    NoneType,

    #[error("Missing descriptor for {0:?}")]
    MissingType(ItemType),

    #[error("Duplicate descriptor for {0:?}")]
    DuplicateType(ItemType),

    #[error("Invalid footprint for {0:?}: {1}")]
    InvalidFootprint(ItemType, String),
}

/// Complete descriptor table, one slot per item type
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    slots: Vec<Option<Descriptor>>,
}

#[derive(Deserialize)]
struct TomlDescriptors {
    descriptor: Vec<Descriptor>,
}

impl DescriptorTable {
    /// Build a table from entries in any order
    ///
    /// Every real type must be present exactly once.
    pub fn from_descriptors(
        descriptors: Vec<Descriptor>,
    ) -> Result<Self, DescriptorLoadError> {
        let mut slots: Vec<Option<Descriptor>> = vec![None; ItemType::COUNT];

        for descriptor in descriptors {
            let item_type = descriptor.item_type;
            if item_type == ItemType::None {
                return Err(DescriptorLoadError::NoneType);
            }
            validate_footprint(&descriptor)?;
            let slot = &mut slots[item_type.index()];
            if slot.is_some() {
                return Err(DescriptorLoadError::DuplicateType(item_type));
            }
            *slot = Some(descriptor);
        }

        if let Some(missing) = ItemType::ALL
            .into_iter()
            .find(|t| slots[t.index()].is_none())
        {
            return Err(DescriptorLoadError::MissingType(missing));
        }

        Ok(Self { slots })
    }

    /// The table the simulation ships with
    pub fn builtin() -> Self {
        let slots = std::iter::once(None)
            .chain(ItemType::ALL.into_iter().map(|t| Some(builtin_descriptor(t))))
            .collect();
        Self { slots }
    }

    /// Parse a table from TOML (`[[descriptor]]` entries)
    pub fn parse_toml(content: &str) -> Result<Self, DescriptorLoadError> {
        let parsed: TomlDescriptors = toml::from_str(content)?;
        Self::from_descriptors(parsed.descriptor)
    }

    /// Load a table from a TOML file
    pub fn load(path: &Path) -> Result<Self, DescriptorLoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn get(&self, item_type: ItemType) -> Option<&Descriptor> {
        self.slots.get(item_type.index()).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.slots.iter().flatten()
    }
}

fn validate_footprint(descriptor: &Descriptor) -> Result<(), DescriptorLoadError> {
    let fail = |msg: String| DescriptorLoadError::InvalidFootprint(descriptor.item_type, msg);

    if descriptor.min_unit.x <= 0 || descriptor.min_unit.y <= 0 {
        return Err(fail(format!("min_unit {} must be positive", descriptor.min_unit)));
    }
    if descriptor.min_unit.x > descriptor.cells.x || descriptor.min_unit.y > descriptor.cells.y {
        return Err(fail(format!(
            "min_unit {} exceeds cells {}",
            descriptor.min_unit, descriptor.cells
        )));
    }
    if let Some(mask) = &descriptor.mask {
        if mask.bounds() != descriptor.cells {
            return Err(fail(format!(
                "mask bounds {} differ from cells {}",
                mask.bounds(),
                descriptor.cells
            )));
        }
    }
    Ok(())
}

fn entry(
    item_type: ItemType,
    group: ItemGroup,
    category: ItemCategory,
    min_rating: u16,
    attributes: Attributes,
    price: u32,
    cells: (i32, i32),
    min_unit: (i32, i32),
) -> Descriptor {
    Descriptor {
        item_type,
        group,
        category,
        min_rating,
        attributes,
        price,
        cells: IVec2::new(cells.0, cells.1),
        min_unit: IVec2::new(min_unit.0, min_unit.1),
        mask: None,
    }
}

fn builtin_descriptor(item_type: ItemType) -> Descriptor {
    use Attributes as A;
    use ItemCategory::{Facility, Transport};
    use ItemGroup as G;
    use ItemType as T;

    let ground = A::ALLOWED_ON_GROUND;
    let above = A::NOT_BELOW_GROUND;
    let below = A::NOT_ABOVE_GROUND;

    match item_type {
        T::Lobby => entry(
            T::Lobby,
            G::Structure,
            Facility,
            0,
            A::FLEXIBLE_WIDTH | A::EVERY_15TH_FLOOR | ground,
            5_000,
            (1, 1),
            (1, 1),
        ),
        T::Floor => entry(
            T::Floor,
            G::Structure,
            Facility,
            0,
            A::FLEXIBLE_WIDTH | ground,
            500,
            (1, 1),
            (1, 1),
        ),
        T::Stairs => entry(T::Stairs, G::Structure, Transport, 0, ground, 5_000, (8, 2), (8, 2)),
        T::Escalator => Descriptor {
            // Diagonal run: lower landing on the left, upper landing on the right
            mask: Some(RectMask::new(vec![Recti::new(0, 0, 6, 1), Recti::new(2, 1, 6, 1)])),
            ..entry(T::Escalator, G::Structure, Transport, 0, ground, 20_000, (8, 2), (8, 2))
        },
        // Elevator shafts stretch vertically between min_unit.y and cells.y floors
        T::StandardElevator => entry(
            T::StandardElevator,
            G::Elevator,
            Transport,
            0,
            ground,
            200_000,
            (4, 30),
            (4, 2),
        ),
        T::ServiceElevator => entry(
            T::ServiceElevator,
            G::Elevator,
            Transport,
            1,
            ground,
            100_000,
            (4, 30),
            (4, 2),
        ),
        T::ExpressElevator => entry(
            T::ExpressElevator,
            G::Elevator,
            Transport,
            3,
            ground,
            400_000,
            (6, 110),
            (6, 2),
        ),
        T::Office => entry(T::Office, G::Office, Facility, 0, above, 40_000, (9, 1), (9, 1)),
        T::SingleRoom => entry(T::SingleRoom, G::Hotel, Facility, 1, above, 20_000, (4, 1), (4, 1)),
        T::DoubleRoom => entry(T::DoubleRoom, G::Hotel, Facility, 1, above, 50_000, (6, 1), (6, 1)),
        T::Suite => entry(T::Suite, G::Hotel, Facility, 1, above, 100_000, (10, 1), (10, 1)),
        T::FastFood => entry(
            T::FastFood,
            G::Entertainment,
            Facility,
            1,
            ground,
            100_000,
            (16, 1),
            (16, 1),
        ),
        T::Restaurant => entry(
            T::Restaurant,
            G::Entertainment,
            Facility,
            2,
            ground,
            200_000,
            (24, 1),
            (24, 1),
        ),
        T::Shop => entry(T::Shop, G::Entertainment, Facility, 2, ground, 100_000, (12, 1), (12, 1)),
        T::Cinema => entry(
            T::Cinema,
            G::Entertainment,
            Facility,
            3,
            A::NONE,
            500_000,
            (31, 2),
            (31, 2),
        ),
        T::PartyHall => entry(
            T::PartyHall,
            G::Entertainment,
            Facility,
            3,
            A::NONE,
            100_000,
            (27, 2),
            (27, 2),
        ),
        T::ParkingRamp => entry(
            T::ParkingRamp,
            G::Infrastructure,
            Facility,
            2,
            below | ground,
            50_000,
            (10, 1),
            (10, 1),
        ),
        T::ParkingSpace => entry(
            T::ParkingSpace,
            G::Infrastructure,
            Facility,
            2,
            below,
            3_000,
            (4, 1),
            (4, 1),
        ),
        T::RecyclingCenter => entry(
            T::RecyclingCenter,
            G::Infrastructure,
            Facility,
            3,
            below,
            500_000,
            (25, 2),
            (25, 2),
        ),
        T::Metro => entry(
            T::Metro,
            G::Infrastructure,
            Facility,
            4,
            below,
            1_000_000,
            (30, 3),
            (30, 3),
        ),
        T::Cathedral => entry(
            T::Cathedral,
            G::Services,
            Facility,
            5,
            above | A::UNDESTRUCTIBLE,
            3_000_000,
            (30, 5),
            (30, 5),
        ),
        T::Security => entry(
            T::Security,
            G::Services,
            Facility,
            2,
            above,
            100_000,
            (16, 1),
            (16, 1),
        ),
        T::MedicalCenter => entry(
            T::MedicalCenter,
            G::Services,
            Facility,
            3,
            above,
            500_000,
            (26, 1),
            (26, 1),
        ),
        T::Housekeeping => entry(
            T::Housekeeping,
            G::Services,
            Facility,
            2,
            above,
            50_000,
            (15, 1),
            (15, 1),
        ),
        T::Condo => entry(T::Condo, G::Hotel, Facility, 0, above, 80_000, (16, 1), (16, 1)),
        T::None => unreachable!("builtin table never asks for the none type"),
    }
}

// === GLOBAL REGISTRY ACCESS ===

static DESCRIPTORS: OnceLock<DescriptorTable> = OnceLock::new();

/// Get the global descriptor table (installs the builtin table if not set)
pub fn descriptors() -> &'static DescriptorTable {
    DESCRIPTORS.get_or_init(DescriptorTable::builtin)
}

/// Install a custom descriptor table (can only be done once, before first use)
///
/// Returns Err with the rejected table if a table was already published.
pub fn install_descriptors(table: DescriptorTable) -> Result<(), DescriptorTable> {
    DESCRIPTORS.set(table)
}

/// Descriptor for a real item type; `None` for `ItemType::None`
pub fn descriptor_for_item_type(item_type: ItemType) -> Option<&'static Descriptor> {
    descriptors().get(item_type)
}

/// Descriptor for a raw type index; `None` for index 0 or out-of-range input
pub fn descriptor_for_index(index: usize) -> Option<&'static Descriptor> {
    ItemType::from_index(index).and_then(descriptor_for_item_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_slots_match_types() {
        for t in ItemType::ALL {
            let d = descriptor_for_item_type(t).unwrap();
            assert_eq!(d.item_type, t);
        }
    }

    #[test]
    fn test_none_and_out_of_range_fail() {
        assert!(descriptor_for_item_type(ItemType::None).is_none());
        assert!(descriptor_for_index(0).is_none());
        assert!(descriptor_for_index(ItemType::COUNT).is_none());
        assert!(descriptor_for_index(999).is_none());
        assert_eq!(
            descriptor_for_index(ItemType::Lobby.index()).map(|d| d.item_type),
            Some(ItemType::Lobby)
        );
    }

    #[test]
    fn test_from_index_roundtrips_every_type() {
        for t in ItemType::ALL {
            assert_eq!(ItemType::from_index(t.index()), Some(t));
        }
    }

    #[test]
    fn test_builtin_footprints_valid() {
        for d in DescriptorTable::builtin().iter() {
            validate_footprint(d).unwrap();
        }
    }

    #[test]
    fn test_attributes_bitset() {
        let lobby = descriptor_for_item_type(ItemType::Lobby).unwrap();
        assert!(lobby.has(Attributes::FLEXIBLE_WIDTH));
        assert!(lobby.has(Attributes::EVERY_15TH_FLOOR));
        assert!(!lobby.has(Attributes::UNDESTRUCTIBLE));

        let cathedral = descriptor_for_item_type(ItemType::Cathedral).unwrap();
        assert!(cathedral.has(Attributes::UNDESTRUCTIBLE));
        assert_eq!(Attributes::NONE.bits(), 0);
    }

    #[test]
    fn test_attribute_list_conversion() {
        let attrs = Attributes::from(vec![Attribute::FlexibleWidth, Attribute::Undestructible]);
        assert_eq!(attrs, Attributes::FLEXIBLE_WIDTH | Attributes::UNDESTRUCTIBLE);
        let back: Vec<Attribute> = attrs.into();
        assert_eq!(back, vec![Attribute::FlexibleWidth, Attribute::Undestructible]);
    }

    #[test]
    fn test_total_price() {
        let floor = descriptor_for_item_type(ItemType::Floor).unwrap();
        assert_eq!(floor.total_price(20), 10_000);

        let office = descriptor_for_item_type(ItemType::Office).unwrap();
        assert_eq!(office.total_price(9), 40_000);
    }

    #[test]
    fn test_escalator_mask() {
        let escalator = descriptor_for_item_type(ItemType::Escalator).unwrap();
        let mask = escalator.mask.as_ref().unwrap();
        assert_eq!(mask.bounds(), IVec2::new(8, 2));
        assert!(mask.contains(IVec2::new(0, 0)));
        assert!(!mask.contains(IVec2::new(0, 1)));
        assert!(mask.contains(IVec2::new(7, 1)));
    }

    #[test]
    fn test_parse_toml_requires_every_type() {
        let content = r#"
            [[descriptor]]
            type = "lobby"
            group = "structure"
            category = "facility"
            attributes = ["flexible_width", "every_15th_floor", "allowed_on_ground"]
            price = 5000
            cells = [1, 1]
            min_unit = [1, 1]
        "#;
        let err = DescriptorTable::parse_toml(content).unwrap_err();
        assert!(matches!(err, DescriptorLoadError::MissingType(ItemType::Floor)));
    }

    #[test]
    fn test_from_descriptors_rejects_duplicates() {
        let mut all: Vec<Descriptor> = DescriptorTable::builtin().iter().cloned().collect();
        all.push(builtin_descriptor(ItemType::Office));
        let err = DescriptorTable::from_descriptors(all).unwrap_err();
        assert!(matches!(err, DescriptorLoadError::DuplicateType(ItemType::Office)));
    }

    #[test]
    fn test_from_descriptors_accepts_complete_table() {
        let mut all: Vec<Descriptor> = DescriptorTable::builtin().iter().cloned().collect();
        all.reverse();
        let table = DescriptorTable::from_descriptors(all).unwrap();
        assert_eq!(table.get(ItemType::Suite).unwrap().cells, IVec2::new(10, 1));
    }

    #[test]
    fn test_invalid_footprint_rejected() {
        let mut bad = builtin_descriptor(ItemType::Office);
        bad.min_unit = IVec2::new(12, 1);
        assert!(matches!(
            validate_footprint(&bad),
            Err(DescriptorLoadError::InvalidFootprint(ItemType::Office, _))
        ));
    }
}
