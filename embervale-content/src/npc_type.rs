//! Static server-controlled actor ("NPC") type definitions.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A server-controlled actor type id, as referenced from a zone's terrain
/// file definition (`npcType`).
pub type NpcTypeId = i32;

/// Static definition of one actor type, shared by every instance spawned
/// from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcTypeDef {
    /// This type's id.
    pub id: NpcTypeId,
    /// Display name, e.g. "goblin".
    pub name: String,
    /// Starting/maximum hitpoints.
    pub health_base: i32,
    /// Ticks between attacks once cooldown starts, from the type
    /// definition (e.g. 4).
    pub attack_cooldown_ticks: u32,
    /// Euclidean aggro range.
    pub aggro_range: f64,
    /// Whether this type acquires targets unprovoked, vs. only
    /// retaliating. Retaliation is unconditional regardless of this flag;
    /// it only gates *unprovoked* acquisition.
    pub is_aggressive: bool,
    /// Id of the drop table rolled on death.
    pub drop_table_id: u32,
}

/// A read-only table of actor type definitions, keyed by id.
#[derive(Debug, Default)]
pub struct NpcTypeRegistry {
    types: FxHashMap<NpcTypeId, NpcTypeDef>,
}

impl NpcTypeRegistry {
    /// Builds a registry from a list of type definitions.
    #[must_use]
    pub fn new(types: Vec<NpcTypeDef>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    /// Looks up a type definition by id.
    #[must_use]
    pub fn get(&self, id: NpcTypeId) -> Option<&NpcTypeDef> {
        self.types.get(&id)
    }
}
