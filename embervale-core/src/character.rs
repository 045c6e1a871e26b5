//! Shared fields for every simulated actor (player or NPC).
//!
//! A plain struct holding fields common to all living things, embedded by
//! value rather than reached through inheritance. `Player` and `Npc` each
//! embed a `CharacterCore` and expose it directly rather than through a
//! trait, since this world has exactly two character kinds and no modding
//! surface that would need a third.

use std::collections::{HashMap, HashSet};

use embervale_content::{EquipmentSlot, ItemId, SkillKind, EMPTY_SLOT};
use embervale_utils::grid::ChunkKey;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::skill::Skill;

/// A character id, unique within a world for the character's lifetime.
/// Players keep their id for the session; NPC ids are reused by
/// `embervale_utils::ids::WrappingIdPool` once an instance is fully gone.
pub type CharacterId = i32;

/// The trained-stat placeholder every fresh character's Attack/Defence/
/// Strength skills start at. `Hitpoints` is deliberately not one of
/// `CharacterCore::skills`' entries: `health`/`max_health` already serve as
/// that skill's current/base value, and duplicating it as a `Skill` would
/// just be two copies of the same number to keep in sync.
const DEFAULT_COMBAT_SKILL_LEVEL: i32 = 1;

/// The three combat skills tracked per character. `SkillKind::Hitpoints`
/// is intentionally excluded; see [`DEFAULT_COMBAT_SKILL_LEVEL`].
const TRACKED_SKILLS: [SkillKind; 3] = [SkillKind::Attack, SkillKind::Defence, SkillKind::Strength];

/// A player's chosen combat stance. Purely advisory bookkeeping today — no
/// damage formula reads it yet — but the wire protocol and save data
/// already carry it, so it is modeled now rather than bolted on later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackStyle {
    /// Favors damage output.
    Aggressive,
    /// A balanced middle ground.
    Controlled,
    /// Favors avoiding damage.
    Defensive,
}

impl Default for AttackStyle {
    fn default() -> Self {
        AttackStyle::Controlled
    }
}

/// Fields shared by players and NPCs: identity, position, health, and the
/// symmetric targeting relationship maintained by combat.
///
/// **Invariant:** for any two characters `A` and `B`,
/// `A.current_target == Some(B.id)` if and only if `A.id` is present in
/// `B.targeted_by`. Both sides are updated together by
/// [`crate::combat`] and [`CharacterCore::clear_target`]; nothing else
/// may write `current_target` or `targeted_by` directly.
#[derive(Debug, Clone)]
pub struct CharacterCore {
    /// Unique id within this world.
    pub id: CharacterId,
    /// Current world-tile position.
    pub position: (i32, i32),
    /// Current hit points. Never exceeds `max_health`.
    pub health: i32,
    /// Maximum hit points.
    pub max_health: i32,
    /// The character this one is currently attacking, if any.
    pub current_target: Option<CharacterId>,
    /// The set of characters currently targeting this one.
    pub targeted_by: HashSet<CharacterId>,
    /// Tick count remaining on the last hit's retaliation window, or the
    /// tick this character last dealt or received damage. Used by the
    /// death-settlement phase to decide kill credit on simultaneous death.
    pub last_damage_tick: u64,
    /// Whether this character is alive. Set to `false` during death
    /// settlement; cleared again on respawn.
    pub alive: bool,
    /// Ticks remaining before this character may attack again. Decremented
    /// to zero once per tick in the prologue phase.
    pub attack_cooldown_remaining: u32,
    /// The cadence `attack_cooldown_remaining` is reset to after a
    /// successful attack. Zero for character kinds that enforce their own
    /// cooldown elsewhere (NPCs currently track theirs via
    /// `Npc::last_attack_tick`/the NPC type definition instead).
    pub attack_cooldown_ticks: u32,
    /// This character's trained combat skills. Keyed by kind rather than a
    /// fixed-size array since not every character necessarily has every
    /// kind (NPCs currently have none).
    pub skills: HashMap<SkillKind, Skill>,
    /// Running total of damage received this tick from each attacker,
    /// keyed by `"{Player,NPC}_{id}"`. Cleared whenever every skill is back
    /// at its base level (the prologue phase's "fully rested" signal), not
    /// by the death-settlement kill-credit logic, which uses
    /// `crate::damage::DamageLedger` instead.
    pub damage_sources: HashMap<String, i32>,
    /// Damage amounts landed on this character so far this tick.
    pub damage_this_tick: Vec<i32>,
    /// `damage_this_tick` as of the end of the previous tick, handed to
    /// clients alongside the live value so they can render a hitsplat that
    /// only just appeared.
    pub damage_last_tick: Vec<i32>,
    /// Whether anything about this character changed this tick that the
    /// egress phase should include in a per-tick snapshot. Reset in the
    /// epilogue phase after the egress phase has had a chance to read it.
    pub is_dirty: bool,
}

impl CharacterCore {
    /// Creates a new, full-health, untargeted character at `position`, with
    /// `Attack`/`Defence`/`Strength` skills at
    /// [`DEFAULT_COMBAT_SKILL_LEVEL`].
    #[must_use]
    pub fn new(id: CharacterId, position: (i32, i32), max_health: i32) -> Self {
        let skills = TRACKED_SKILLS.into_iter().map(|kind| (kind, Skill::new(kind, DEFAULT_COMBAT_SKILL_LEVEL))).collect();
        Self {
            id,
            position,
            health: max_health,
            max_health,
            current_target: None,
            targeted_by: HashSet::new(),
            last_damage_tick: 0,
            alive: true,
            attack_cooldown_remaining: 0,
            attack_cooldown_ticks: 0,
            skills,
            damage_sources: HashMap::new(),
            damage_this_tick: Vec::new(),
            damage_last_tick: Vec::new(),
            is_dirty: true,
        }
    }

    /// The `ChunkKey` this character currently occupies.
    #[must_use]
    pub fn chunk_key(&self) -> ChunkKey {
        ChunkKey::from_world(self.position.0, self.position.1)
    }

    /// Applies `amount` of damage, clamping health at zero, and records the
    /// tick it happened on. Returns `true` if this damage brought health to
    /// zero for the first time (the caller still owns death processing).
    pub fn apply_damage(&mut self, amount: i32, tick: u64) -> bool {
        let amount = amount.max(0);
        let was_alive = self.health > 0;
        self.health = (self.health - amount).max(0);
        self.last_damage_tick = tick;
        self.damage_this_tick.push(amount);
        self.is_dirty = true;
        was_alive && self.health == 0
    }

    /// Records `amount` of damage as having come from `attacker_key`
    /// (`"{Player,NPC}_{id}"`), for the prologue phase's full-rest clear.
    /// Additive, non-authoritative bookkeeping: kill credit is still
    /// decided by `crate::damage::DamageLedger`.
    pub fn attribute_damage(&mut self, attacker_key: &str, amount: i32) {
        *self.damage_sources.entry(attacker_key.to_string()).or_insert(0) += amount.max(0);
    }

    /// Heals by `amount`, clamping at `max_health`.
    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount.max(0)).min(self.max_health);
    }

    /// Resets to full health, alive, untargeted, at `position`. Used by
    /// both player and NPC respawn.
    pub fn reset_for_respawn(&mut self, position: (i32, i32)) {
        self.position = position;
        self.health = self.max_health;
        self.alive = true;
        self.current_target = None;
        self.targeted_by.clear();
        self.attack_cooldown_remaining = 0;
        self.damage_sources.clear();
        self.damage_this_tick.clear();
        self.damage_last_tick.clear();
        self.is_dirty = true;
    }
}

/// Ticks between a player's successful attacks.
pub const PLAYER_ATTACK_COOLDOWN_TICKS: u32 = 3;

/// The number of inventory slots a player has.
pub const INVENTORY_SIZE: usize = 30;

/// A player's maximum number of tick-gated actions (move, attack, item
/// use) per tick.
pub const MAX_TICK_ACTIONS: u32 = 3;

/// Per-player fields layered on top of [`CharacterCore`].
#[derive(Debug, Clone)]
pub struct Player {
    /// Shared actor fields.
    pub core: CharacterCore,
    /// The account this character belongs to.
    pub account_id: i64,
    /// Display name.
    pub name: String,
    /// The visibility radius `R` this player's client requested, or the
    /// world default.
    pub visibility_radius: u32,
    /// Characters visible to this player as of the last visibility-diff
    /// phase, used to compute the next tick's appear/disappear sets.
    pub last_visible: HashSet<CharacterId>,
    /// Ground items visible to this player as of the last visibility-diff
    /// phase.
    pub visible_ground_items: HashSet<i32>,
    /// Tile this player respawns at after death.
    pub respawn_position: (i32, i32),
    /// Inventory slots; `EMPTY_SLOT` marks an empty one.
    pub inventory: [ItemId; INVENTORY_SIZE],
    /// Equipment slots, indexed by `EquipmentSlot::index()`; `EMPTY_SLOT`
    /// marks an empty one.
    pub equipment_slots: [ItemId; EquipmentSlot::ALL.len()],
    /// The player's current combat stance.
    pub attack_style: AttackStyle,
    /// Opaque appearance data saved during character creation, echoed back
    /// verbatim on future `saveCharacterLookAttributes` reads. Not
    /// interpreted by the world simulation.
    pub appearance_attrs: serde_json::Value,
    /// Whether this character has completed the character-creation flow.
    pub character_creator_completed: bool,
    /// How many tick-gated actions this player has already spent this
    /// tick. Reset to zero in the epilogue phase.
    pub tick_actions_used: u32,
}

impl Player {
    /// Creates a new player character at `position` with full health.
    #[must_use]
    pub fn new(
        id: CharacterId,
        account_id: i64,
        name: impl Into<String>,
        position: (i32, i32),
        max_health: i32,
        visibility_radius: u32,
    ) -> Self {
        let mut core = CharacterCore::new(id, position, max_health);
        core.attack_cooldown_ticks = PLAYER_ATTACK_COOLDOWN_TICKS;
        Self {
            core,
            account_id,
            name: name.into(),
            visibility_radius,
            last_visible: HashSet::new(),
            visible_ground_items: HashSet::new(),
            respawn_position: position,
            inventory: [EMPTY_SLOT; INVENTORY_SIZE],
            equipment_slots: [EMPTY_SLOT; EquipmentSlot::ALL.len()],
            attack_style: AttackStyle::default(),
            appearance_attrs: serde_json::Value::Null,
            character_creator_completed: false,
            tick_actions_used: 0,
        }
    }
}

/// Per-NPC fields layered on top of [`CharacterCore`].
#[derive(Debug, Clone)]
pub struct Npc {
    /// Shared actor fields.
    pub core: CharacterCore,
    /// The content registry type this NPC was spawned from.
    pub npc_type_id: embervale_content::NpcTypeId,
    /// The zone this NPC belongs to and will respawn inside.
    pub home_zone_id: i32,
    /// Tile this NPC last spawned or respawned at, used as the pursuit
    /// leash anchor and as the position restored if a zone forces a reset.
    pub spawn_position: (i32, i32),
    /// Tick on which the NPC last performed an attack; combat enforces
    /// `attack_cooldown_ticks` between consecutive attacks per NPC type.
    pub last_attack_tick: u64,
    /// The short path currently being followed while pursuing a target,
    /// most recently computed tile first. Recomputed on pursuit entry and
    /// whenever it is exhausted.
    pub pursuit_path: SmallVec<[(i32, i32); 8]>,
}

impl Npc {
    /// Spawns a new NPC of `npc_type_id` belonging to `home_zone_id` at
    /// `spawn_position`.
    #[must_use]
    pub fn new(
        id: CharacterId,
        npc_type_id: embervale_content::NpcTypeId,
        home_zone_id: i32,
        spawn_position: (i32, i32),
        max_health: i32,
    ) -> Self {
        Self {
            core: CharacterCore::new(id, spawn_position, max_health),
            npc_type_id,
            home_zone_id,
            spawn_position,
            last_attack_tick: 0,
            pursuit_path: SmallVec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_damage_clamps_at_zero_and_reports_death_once() {
        let mut core = CharacterCore::new(1, (0, 0), 10);
        assert!(!core.apply_damage(4, 1));
        assert_eq!(core.health, 6);
        assert!(core.apply_damage(100, 2));
        assert_eq!(core.health, 0);
        // Already dead: further damage does not re-report death.
        assert!(!core.apply_damage(1, 3));
    }

    #[test]
    fn heal_clamps_at_max_health() {
        let mut core = CharacterCore::new(1, (0, 0), 10);
        core.apply_damage(9, 1);
        core.heal(100);
        assert_eq!(core.health, 10);
    }

    #[test]
    fn reset_for_respawn_clears_targeting_state() {
        let mut core = CharacterCore::new(1, (0, 0), 10);
        core.current_target = Some(2);
        core.targeted_by.insert(3);
        core.apply_damage(10, 1);

        core.reset_for_respawn((5, 5));

        assert_eq!(core.position, (5, 5));
        assert_eq!(core.health, 10);
        assert!(core.alive);
        assert_eq!(core.current_target, None);
        assert!(core.targeted_by.is_empty());
    }

    #[test]
    fn reset_for_respawn_clears_damage_bookkeeping() {
        let mut core = CharacterCore::new(1, (0, 0), 10);
        core.attribute_damage("Player_2", 4);
        core.apply_damage(4, 1);
        core.attack_cooldown_remaining = 2;

        core.reset_for_respawn((0, 0));

        assert!(core.damage_sources.is_empty());
        assert!(core.damage_this_tick.is_empty());
        assert_eq!(core.attack_cooldown_remaining, 0);
    }

    #[test]
    fn fresh_character_tracks_attack_defence_strength_but_not_hitpoints() {
        let core = CharacterCore::new(1, (0, 0), 10);
        assert_eq!(core.skills.len(), 3);
        assert!(core.skills.contains_key(&SkillKind::Attack));
        assert!(!core.skills.contains_key(&SkillKind::Hitpoints));
    }

    #[test]
    fn fresh_player_has_empty_inventory_and_equipment() {
        let player = Player::new(1, 10, "tester", (0, 0), 10, 1);
        assert!(player.inventory.iter().all(|&slot| slot == EMPTY_SLOT));
        assert!(player.equipment_slots.iter().all(|&slot| slot == EMPTY_SLOT));
        assert_eq!(player.core.attack_cooldown_ticks, PLAYER_ATTACK_COOLDOWN_TICKS);
    }
}
