//! Static item definitions.
//!
//! Inventory/equipment slots are plain item-id integers (`-1` sentinel =
//! empty), leaving item semantics (stacking, equip slot compatibility) to
//! content data. This module is the lookup table those ids resolve
//! against.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An item type id. `-1` is the empty-slot sentinel used in inventory and
/// equipment arrays; item ids themselves are always `>= 0`.
pub type ItemId = i32;

/// The equipment slot names an `unequipItem` message can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentSlot {
    /// Head slot.
    Head,
    /// Amulet slot.
    Amulet,
    /// Body slot.
    Body,
    /// Legs slot.
    Legs,
    /// Boots slot.
    Boots,
    /// Main hand (weapon) slot.
    MainHand,
    /// Off hand (shield) slot.
    OffHand,
    /// Ring slot.
    Ring,
    /// Cape slot.
    Cape,
}

impl EquipmentSlot {
    /// All nine equipment slots, in the fixed order a character's
    /// `equipment_slots` array uses (9 named slots).
    pub const ALL: [EquipmentSlot; 9] = [
        EquipmentSlot::Head,
        EquipmentSlot::Amulet,
        EquipmentSlot::Body,
        EquipmentSlot::Legs,
        EquipmentSlot::Boots,
        EquipmentSlot::MainHand,
        EquipmentSlot::OffHand,
        EquipmentSlot::Ring,
        EquipmentSlot::Cape,
    ];

    /// The fixed array index this slot occupies in `equipment_slots`.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            EquipmentSlot::Head => 0,
            EquipmentSlot::Amulet => 1,
            EquipmentSlot::Body => 2,
            EquipmentSlot::Legs => 3,
            EquipmentSlot::Boots => 4,
            EquipmentSlot::MainHand => 5,
            EquipmentSlot::OffHand => 6,
            EquipmentSlot::Ring => 7,
            EquipmentSlot::Cape => 8,
        }
    }
}

/// The sentinel value for an empty inventory or equipment slot.
pub const EMPTY_SLOT: ItemId = -1;

/// Static definition of one item type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    /// The item's id, matching the key it is registered under.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Whether multiple units stack into one inventory slot with a count.
    pub stackable: bool,
}

/// A read-only table of item definitions, keyed by id.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: FxHashMap<ItemId, ItemDef>,
}

impl ItemRegistry {
    /// Builds a registry from a list of item definitions.
    #[must_use]
    pub fn new(items: Vec<ItemDef>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
        }
    }

    /// Looks up an item definition by id.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&ItemDef> {
        self.items.get(&id)
    }
}
