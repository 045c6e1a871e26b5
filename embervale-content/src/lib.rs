//! Static game-content registries: NPC types, items, drop tables, skills,
//! and the terrain file format.
//!
//! Plays the same role a registry crate plays for static block/biome/
//! damage-type tables — code that looks data up by static key rather than
//! owning it inline. Here the static data is NPC/item/drop-table
//! definitions instead.

pub mod drop_table;
pub mod item;
pub mod loader;
pub mod npc_type;
pub mod skill;
pub mod terrain_file;

pub use drop_table::{DropEntry, DropTable, DropTableRegistry, RolledDrop, TertiaryDrop};
pub use item::{EquipmentSlot, ItemDef, ItemId, ItemRegistry, EMPTY_SLOT};
pub use loader::load_registries;
pub use npc_type::{NpcTypeDef, NpcTypeId, NpcTypeRegistry};
pub use skill::SkillKind;
pub use terrain_file::ChunkFile;
