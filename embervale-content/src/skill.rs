//! Static skill definitions.
//!
//! A `Skill` instance is `{ kind, base_level, current_value, xp,
//! regen_counter }` — that's per-character *instance* state and lives in
//! `embervale-core`. This module only holds the static taxonomy of which
//! skill kinds exist and how fast each regenerates, looked up by key the
//! same way a registry crate holds static game-rule tables.

use serde::{Deserialize, Serialize};

/// The kinds of skill a character can have.
///
/// Combat skills feed the (currently placeholder) damage formula; `Hitpoints`
/// doubles as the character's health pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    /// Hit points. `current_value` is the character's current health.
    Hitpoints,
    /// Melee offensive skill.
    Attack,
    /// Melee defensive skill.
    Defence,
    /// Melee damage-output skill.
    Strength,
}

/// Static per-skill-kind definition.
#[derive(Debug, Clone, Copy)]
pub struct SkillDef {
    /// How many ticks of `regen_counter` accumulate before `current_value`
    /// steps one unit toward `base_level`.
    pub regen_ticks: u32,
}

/// The default regen cadence used for players.
pub const PLAYER_REGEN_TICKS: u32 = 10;

/// The default regen cadence used for server-controlled actors.
pub const NPC_REGEN_TICKS: u32 = 10;

impl SkillKind {
    /// The definition for this skill kind on a player.
    #[must_use]
    pub const fn player_def(self) -> SkillDef {
        SkillDef {
            regen_ticks: PLAYER_REGEN_TICKS,
        }
    }

    /// The definition for this skill kind on a server-controlled actor.
    #[must_use]
    pub const fn npc_def(self) -> SkillDef {
        SkillDef {
            regen_ticks: NPC_REGEN_TICKS,
        }
    }

    /// All skill kinds a fresh player character starts with.
    #[must_use]
    pub const fn all() -> [SkillKind; 4] {
        [
            SkillKind::Hitpoints,
            SkillKind::Attack,
            SkillKind::Defence,
            SkillKind::Strength,
        ]
    }
}
