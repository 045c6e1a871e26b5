//! The `World` struct and the fixed-cadence tick orchestrator.
//!
//! The tick loop itself is a `loop` that sleeps until the next scheduled
//! tick instant, ticks, then records timing, with a `CancellationToken`
//! checked at both the top and bottom of the loop body. The ten-phase
//! breakdown inside one tick has no equivalent in a typical per-entity
//! update pass — it is its own design — but the "run the unit of work,
//! time it, warn if slow" shape of the loop follows established practice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

use embervale_content::{DropTableRegistry, EquipmentSlot, ItemId, ItemRegistry, NpcTypeId, NpcTypeRegistry, SkillKind, EMPTY_SLOT};
use embervale_path::WalkabilityGrid;
use embervale_utils::grid::ChunkKey;
use embervale_utils::ids::WrappingIdPool;

use crate::admin::{AdminCommand, AdminCommandContext};
use crate::ai::{self, AiState};
use crate::character::{AttackStyle, CharacterId, Npc, Player, MAX_TICK_ACTIONS};
use crate::chunk::{ChunkLifecycle, ChunkStore};
use crate::combat::{self, AttackOutcome};
use crate::config::WorldConfig;
use crate::damage::DamageLedger;
use crate::error::{WorldError, WorldResult};
use crate::player_state::PlayerIntents;
use crate::session::SessionTable;

/// Ticks between a character's death and a scheduled NPC respawn or
/// player respawn-availability, independent of a zone's configured
/// `respawn_ticks` (players always use this fixed value).
pub const PLAYER_RESPAWN_DELAY_TICKS: u64 = 4; // 2 seconds at 500ms/tick.

/// Ticks a dropped item survives on the ground before despawning.
pub const GROUND_ITEM_LIFETIME_TICKS: u64 = 180; // 90 seconds at 500ms/tick.

/// How long an NPC's loot drop stays reserved for the player who gets kill
/// credit before becoming visible to everyone else.
pub const LOOT_RESERVATION_TICKS: u32 = 20;

/// Which kind of character a [`CharacterSnapshot`] describes, so the
/// network layer can split a combined players+NPCs roster into the wire
/// protocol's separate `clientsToLoad`/`npcsToLoad` and `players`/`npcs`
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterKind {
    /// A player character.
    Player,
    /// A server-controlled NPC.
    Npc,
}

/// One skill's public value, carried on a player's [`CharacterSnapshot`]
/// for the `spawnPlayer.playerSkills` egress field.
#[derive(Debug, Clone, Copy)]
pub struct SkillSnapshot {
    /// Which skill this is.
    pub kind: SkillKind,
    /// The current usable value.
    pub current_value: i32,
    /// The trained ceiling.
    pub base_level: i32,
}

/// A snapshot of a player's or NPC's public state, handed back across a
/// [`ControlMessage::Connect`] reply (players only) or built fresh each
/// tick for egress, so the network layer can render `auth`/`spawnPlayer`/
/// `state` without reaching into `World` directly.
#[derive(Debug, Clone)]
pub struct CharacterSnapshot {
    /// The character id the connection is now attached to.
    pub id: CharacterId,
    /// Current position.
    pub position: (i32, i32),
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Whether this is a player or an NPC.
    pub kind: CharacterKind,
    /// Trained skill values. Empty for NPCs.
    pub skills: Vec<SkillSnapshot>,
    /// Whether character creation has been completed. Meaningless (always
    /// `false`) for NPCs.
    pub character_creator_completed: bool,
}

/// Whether a [`ControlMessage::Connect`] created a brand new character or
/// resumed one that was soft-disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new character was inserted into the world.
    New,
    /// An existing character's mailbox was swapped for the new connection's.
    Reclaimed,
}

/// Everything needed to spawn a brand new player character, short of the
/// `CharacterId` itself, which `World` allocates from its own pool so the
/// network layer never has to coordinate id assignment with it.
#[derive(Debug, Clone)]
pub struct NewPlayerSpec {
    /// Display name, loaded from (or freshly created in) persistence.
    pub name: String,
    /// Spawn/resume position.
    pub position: (i32, i32),
    /// Maximum health.
    pub max_health: i32,
    /// Requested visibility radius, or the world default.
    pub visibility_radius: u32,
}

/// What a [`ControlMessage::Connect`] is asking the world to do.
pub enum ConnectRequest {
    /// Allocate a character id and insert a freshly built player.
    New(NewPlayerSpec),
    /// Reattach the caller's mailbox to the account's existing character.
    Reclaim,
}

/// A control-plane request from the network layer, processed once per
/// tick in the prologue phase alongside player intents. Unlike an
/// [`Intent`], a connect needs a reply, since the caller cannot proceed
/// (or knows its connection was rejected) until the tick loop has
/// resolved it.
pub enum ControlMessage {
    /// A freshly authenticated connection.
    Connect {
        /// The authenticated account.
        account_id: i64,
        /// What to do for this account.
        request: ConnectRequest,
        /// The connection's ingress mailbox, registered on success.
        mailbox: crossbeam::channel::Receiver<Intent>,
        /// Where to send the outcome.
        reply: tokio::sync::oneshot::Sender<WorldResult<(CharacterSnapshot, ConnectOutcome)>>,
    },
    /// The connection's transport closed; move the account's session to
    /// `SoftDisconnected` rather than despawning immediately.
    Disconnect {
        /// The account whose transport closed.
        account_id: i64,
    },
}

/// What an `itemAction` message asks the world to do with an inventory
/// slot. Only `Drop` is currently wired up to a world effect; the others
/// are accepted and otherwise ignored until item-type metadata (equip-slot
/// compatibility, consumable effects) exists to act on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemActionKind {
    /// Drops the item onto the ground at the player's current tile.
    Drop,
    /// Uses a non-consumable item.
    Use,
    /// Eats a food item.
    Eat,
    /// Drinks a potion.
    Drink,
    /// Equips the item into its compatible equipment slot.
    Equip,
    /// Unequips whatever sits in this slot (rare; `UnequipItem` with an
    /// explicit `EquipmentSlot` is the usual path).
    Unequip,
}

/// A message drained from a player's ingress mailbox at the start of a
/// tick. `embervale-net` decodes wire messages into these.
#[derive(Debug, Clone)]
pub enum Intent {
    /// Request to walk toward a tile.
    Move {
        /// Destination tile.
        destination: (i32, i32),
    },
    /// Request to attack another character.
    Attack {
        /// The character to attack.
        target: CharacterId,
    },
    /// An explicit client heartbeat with no other payload.
    Heartbeat,
    /// The client's transport closed.
    Disconnect,
    /// An administrative command. `embervale-net` only emits this for
    /// accounts its own configuration marks as operators.
    Admin(AdminCommand),
    /// Changes the player's combat stance.
    SetAttackStyle {
        /// The new stance.
        style: AttackStyle,
    },
    /// Acts on one inventory slot.
    ItemAction {
        /// The inventory slot index.
        slot_index: usize,
        /// What to do with it.
        action: ItemActionKind,
    },
    /// Unequips a named equipment slot back into the first open inventory
    /// slot (or onto the ground if the inventory is full).
    UnequipItem {
        /// The slot to clear.
        slot: EquipmentSlot,
    },
    /// A chat message to broadcast.
    Chat {
        /// The message text.
        contents: String,
        /// Client-supplied timestamp, echoed back verbatim.
        timestamp: i64,
    },
    /// Marks character creation as finished.
    CompleteCharacterCreation,
    /// Saves the player's appearance attributes.
    SaveCharacterLookAttributes {
        /// Opaque appearance payload, not interpreted by the world.
        appearance: serde_json::Value,
    },
}

/// An item lying on the ground, aging toward despawn.
#[derive(Debug, Clone, Copy)]
pub struct GroundItem {
    /// Unique id for this drop.
    pub id: i32,
    /// The item registry id.
    pub item_id: ItemId,
    /// How many of `item_id` this stack holds.
    pub count: i32,
    /// World tile position.
    pub position: (i32, i32),
    /// Tick this item was dropped.
    pub spawned_tick: u64,
    /// Ticks this item has spent on the ground, aged once per tick and
    /// checked against [`GROUND_ITEM_LIFETIME_TICKS`] independent of
    /// whether its chunk stays loaded.
    pub on_ground_ticks: u64,
    /// If set, only this account can see or pick up the item until
    /// `reservation_ticks_remaining` reaches zero. Used for NPC kill loot;
    /// player death drops are always public.
    pub reserved_for_account_id: Option<i64>,
    /// Ticks remaining on the reservation above. Meaningless if
    /// `reserved_for_account_id` is `None`.
    pub reservation_ticks_remaining: u32,
}

/// Something that happened during a tick, for the network layer to turn
/// into egress messages.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    /// A character's position changed.
    CharacterMoved {
        /// The character that moved.
        id: CharacterId,
        /// Its new position.
        position: (i32, i32),
    },
    /// An attack landed.
    DamageDealt {
        /// Who dealt the damage.
        attacker_id: CharacterId,
        /// Who received it.
        defender_id: CharacterId,
        /// How much.
        amount: i32,
    },
    /// A character died.
    CharacterDied {
        /// The character that died.
        id: CharacterId,
        /// Who gets kill credit, if anyone.
        killer_id: Option<CharacterId>,
    },
    /// A character respawned.
    CharacterRespawned {
        /// The character that respawned.
        id: CharacterId,
        /// Its respawn position.
        position: (i32, i32),
    },
    /// An item appeared on the ground.
    ItemDropped(GroundItem),
    /// A ground item aged out and was removed.
    ItemExpired {
        /// The expired item's id.
        id: i32,
    },
    /// A chat message was submitted for broadcast.
    ChatMessage {
        /// The sender's character id.
        sender_id: CharacterId,
        /// The message text.
        contents: String,
        /// The client-supplied timestamp, echoed verbatim.
        timestamp: i64,
    },
}

/// Per-player egress: the visibility diff plus any events relevant to that
/// player this tick (the network layer filters/serializes these further).
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Every event produced during this tick, in phase order.
    pub events: Vec<WorldEvent>,
    /// Per-player visibility diffs over players and NPCs, keyed by player
    /// character id.
    pub visibility: FxHashMap<CharacterId, crate::visibility::VisibilityDiff>,
    /// Per-player visibility diffs over ground items, keyed by player
    /// character id. Kept separate from `visibility` since ground item ids
    /// and character ids are drawn from different id pools.
    pub ground_item_visibility: FxHashMap<CharacterId, crate::visibility::VisibilityDiff>,
    /// Account ids that were fully logged out this tick (reclaim window
    /// expired), for the caller to persist and tear down.
    pub logged_out_accounts: Vec<(i64, CharacterId)>,
    /// Every player's and NPC's current position/health, for the network
    /// layer to render a client's `clientsToLoad` set without a second
    /// round trip into the world.
    pub character_snapshots: FxHashMap<CharacterId, CharacterSnapshot>,
    /// Every ground item currently on the ground, for the network layer to
    /// render a client's `groundItemsToLoad` set.
    pub ground_item_snapshots: FxHashMap<i32, GroundItem>,
    /// The world's tick counter after this tick completed, for heartbeat
    /// replies that echo elapsed ticks as a stand-in for time of day.
    pub tick_count: u64,
}

/// Builds a player's [`CharacterSnapshot`], including its skills and
/// character-creation flag.
fn player_character_snapshot(p: &Player) -> CharacterSnapshot {
    CharacterSnapshot {
        id: p.core.id,
        position: p.core.position,
        health: p.core.health,
        max_health: p.core.max_health,
        kind: CharacterKind::Player,
        skills: p
            .core
            .skills
            .values()
            .map(|s| SkillSnapshot { kind: s.kind, current_value: s.current_value, base_level: s.base_level })
            .collect(),
        character_creator_completed: p.character_creator_completed,
    }
}

/// Builds an NPC's [`CharacterSnapshot`]. NPCs carry no skills and are
/// never "character-creator completed".
fn npc_character_snapshot(n: &Npc) -> CharacterSnapshot {
    CharacterSnapshot {
        id: n.core.id,
        position: n.core.position,
        health: n.core.health,
        max_health: n.core.max_health,
        kind: CharacterKind::Npc,
        skills: Vec::new(),
        character_creator_completed: false,
    }
}

/// Decrements a character's attack cooldown, steps every tracked skill's
/// regen counter via `regen_ticks_for`, and clears `damage_sources` once
/// every skill has walked back to its base level.
fn step_character_regen(core: &mut crate::character::CharacterCore, regen_ticks_for: impl Fn(SkillKind) -> u32) {
    core.attack_cooldown_remaining = core.attack_cooldown_remaining.saturating_sub(1);
    let mut all_at_base = true;
    for skill in core.skills.values_mut() {
        if !skill.step_regen(regen_ticks_for(skill.kind)) {
            all_at_base = false;
        }
    }
    if all_at_base {
        core.damage_sources.clear();
    }
}

/// Rolls one character's per-tick damage bookkeeping over at the end of a
/// tick: this tick's hits become "last tick" for the client hitsplat, and
/// the dirty flag clears now that the egress phase has already read it.
fn roll_over_tick_bookkeeping(core: &mut crate::character::CharacterCore) {
    core.damage_last_tick = std::mem::take(&mut core.damage_this_tick);
    core.is_dirty = false;
}

/// A read-only walkability view over whatever chunks happen to be
/// resident right now, falling back to the world's configured default for
/// anything not loaded. Built fresh each time it's needed rather than
/// stored, since it only borrows `World`.
struct WorldGrid<'a> {
    chunks: &'a ChunkStore,
    missing_chunk_is_walkable: bool,
}

impl WalkabilityGrid for WorldGrid<'_> {
    fn is_walkable(&self, x: i32, y: i32) -> bool {
        let key = ChunkKey::from_world(x, y);
        match self.chunks.get(key) {
            Some(chunk) => chunk.is_walkable_world_tile(x, y),
            None => self.missing_chunk_is_walkable,
        }
    }
}

/// The full mutable state of one simulated world, owned exclusively by
/// the tick task: nothing outside this struct's own methods may mutate it;
/// ingress tasks only enqueue [`Intent`]s.
pub struct World {
    config: Arc<WorldConfig>,
    tick_count: u64,
    rng: StdRng,

    chunks: ChunkStore,
    players: FxHashMap<CharacterId, Player>,
    player_intents: FxHashMap<CharacterId, PlayerIntents>,
    player_mailboxes: FxHashMap<CharacterId, crossbeam::channel::Receiver<Intent>>,
    player_id_pool: WrappingIdPool,
    control_rx: crossbeam::channel::Receiver<ControlMessage>,

    npcs: FxHashMap<CharacterId, Npc>,
    npc_ai: FxHashMap<CharacterId, AiState>,
    npc_id_pool: WrappingIdPool,
    /// `(due_tick, npc_id)` pairs awaiting respawn, populated by death
    /// settlement and drained by respawn processing.
    npc_respawns: Vec<(u64, CharacterId)>,

    damage_ledgers: FxHashMap<CharacterId, DamageLedger>,
    sessions: SessionTable,

    ground_items: Vec<GroundItem>,
    ground_item_id_pool: WrappingIdPool,

    npc_types: Arc<NpcTypeRegistry>,
    items: Arc<ItemRegistry>,
    drop_tables: Arc<DropTableRegistry>,
}

impl World {
    /// Builds an empty world with no players or NPCs loaded yet, returning
    /// it alongside the control-plane sender the network layer uses to
    /// submit connects and disconnects.
    #[must_use]
    pub fn new(
        config: Arc<WorldConfig>,
        npc_types: Arc<NpcTypeRegistry>,
        items: Arc<ItemRegistry>,
        drop_tables: Arc<DropTableRegistry>,
        rng_seed: u64,
    ) -> (Self, crossbeam::channel::Sender<ControlMessage>) {
        let (control_tx, control_rx) = crossbeam::channel::unbounded();
        let world = Self {
            config,
            tick_count: 0,
            rng: StdRng::seed_from_u64(rng_seed),
            chunks: ChunkStore::new(),
            players: FxHashMap::default(),
            player_intents: FxHashMap::default(),
            player_mailboxes: FxHashMap::default(),
            player_id_pool: WrappingIdPool::player_instance_ids(),
            control_rx,
            npcs: FxHashMap::default(),
            npc_ai: FxHashMap::default(),
            npc_id_pool: WrappingIdPool::npc_instance_ids(),
            npc_respawns: Vec::new(),
            damage_ledgers: FxHashMap::default(),
            sessions: SessionTable::new(),
            ground_items: Vec::new(),
            ground_item_id_pool: WrappingIdPool::ground_item_ids(),
            npc_types,
            items,
            drop_tables,
        };
        (world, control_tx)
    }

    /// The current tick counter.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Looks up a dropped item's display name, for the network layer to
    /// render ground-item events without re-querying the content registry.
    #[must_use]
    pub fn item_name(&self, id: ItemId) -> Option<&str> {
        self.items.get(id).map(|def| def.name.as_str())
    }

    /// Registers a connected player and its ingress mailbox.
    fn add_player(&mut self, player: Player, mailbox: crossbeam::channel::Receiver<Intent>) {
        let id = player.core.id;
        self.players.insert(id, player);
        self.player_intents.insert(id, PlayerIntents::default());
        self.player_mailboxes.insert(id, mailbox);
        self.damage_ledgers.insert(id, DamageLedger::new());
    }

    fn player_snapshot(&self, id: CharacterId) -> Option<CharacterSnapshot> {
        self.players.get(&id).map(player_character_snapshot)
    }

    /// Builds a [`WorldGrid`] borrowing only `chunks`, never the rest of
    /// `self`. Deliberately a free function rather than a `&self` method:
    /// the latter would tie the returned borrow to the whole struct and
    /// block the disjoint `&mut self.player_intents`/`&mut self.npcs`
    /// borrows callers need while `grid` is still alive.
    fn world_grid(chunks: &ChunkStore, missing_chunk_is_walkable: bool) -> WorldGrid<'_> {
        WorldGrid { chunks, missing_chunk_is_walkable }
    }

    /// Runs one full tick, advancing `tick_count` and returning everything
    /// that happened for the network layer to relay.
    #[tracing::instrument(level = "trace", skip(self), fields(tick = self.tick_count))]
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.phase_prologue(&mut report);
        self.phase_player_movement(&mut report);
        self.phase_npc_movement(&mut report);
        self.phase_player_combat(&mut report);
        self.phase_npc_combat(&mut report);
        self.phase_death_settlement(&mut report);
        self.phase_respawn_processing(&mut report);
        self.phase_ground_item_aging(&mut report);
        self.phase_visibility_diff_and_egress(&mut report);
        self.phase_epilogue();

        self.tick_count += 1;
        report.tick_count = self.tick_count;
        report
    }

    /// Phase 1: process pending connects/disconnects, drain every player's
    /// ingress mailbox into their intents, expire stale soft-disconnected
    /// sessions, and load/mark hot any chunk covered by a connected
    /// player's visibility square.
    fn phase_prologue(&mut self, report: &mut TickReport) {
        for player in self.players.values_mut() {
            step_character_regen(&mut player.core, |kind| kind.player_def().regen_ticks);
        }
        for npc in self.npcs.values_mut() {
            step_character_regen(&mut npc.core, |kind| kind.npc_def().regen_ticks);
        }

        let reconnect_window = self.reconnect_window_ticks();
        while let Ok(message) = self.control_rx.try_recv() {
            match message {
                ControlMessage::Connect { account_id, request, mailbox, reply } => {
                    let outcome = match &request {
                        ConnectRequest::New(_) => ConnectOutcome::New,
                        ConnectRequest::Reclaim => ConnectOutcome::Reclaimed,
                    };
                    let result = match request {
                        ConnectRequest::New(_) if self.players.len() >= self.config.max_players => {
                            Err(WorldError::WorldFull)
                        }
                        ConnectRequest::New(spec) => {
                            let allocated_id = {
                                let players = &self.players;
                                self.player_id_pool.next(|candidate| players.contains_key(&candidate))
                            };
                            match allocated_id {
                                Some(id) => {
                                    let player =
                                        Player::new(id, account_id, spec.name, spec.position, spec.max_health, spec.visibility_radius);
                                    self.sessions.login(account_id, id).map(|()| {
                                        self.add_player(player, mailbox);
                                        id
                                    })
                                }
                                None => Err(WorldError::WorldFull),
                            }
                        }
                        ConnectRequest::Reclaim => {
                            self.sessions.reclaim(account_id, self.tick_count, reconnect_window).map(|id| {
                                self.player_mailboxes.insert(id, mailbox);
                                id
                            })
                        }
                    };
                    let _ = reply.send(result.map(|id| {
                        (self.player_snapshot(id).expect("connected player has a snapshot"), outcome)
                    }));
                }
                ControlMessage::Disconnect { account_id } => {
                    self.sessions.disconnect(account_id, self.tick_count);
                }
            }
        }

        let mut admin_commands = Vec::new();
        for (&player_id, mailbox) in &self.player_mailboxes {
            let Some(intents) = self.player_intents.get_mut(&player_id) else { continue };
            while let Ok(intent) = mailbox.try_recv() {
                match intent {
                    Intent::Move { destination } => intents.movement.destination = Some(destination),
                    Intent::Attack { target } => intents.combat.target_id = Some(target),
                    Intent::Admin(command) => admin_commands.push(command),
                    Intent::Heartbeat | Intent::Disconnect => {}
                    Intent::SetAttackStyle { style } => {
                        if let Some(player) = self.players.get_mut(&player_id) {
                            player.attack_style = style;
                        }
                    }
                    Intent::ItemAction { slot_index, action } => {
                        let Some(player) = self.players.get_mut(&player_id) else { continue };
                        if player.tick_actions_used >= MAX_TICK_ACTIONS {
                            continue;
                        }
                        let Some(slot) = player.inventory.get(slot_index).copied() else { continue };
                        if slot == EMPTY_SLOT {
                            continue;
                        }
                        if action == ItemActionKind::Drop {
                            let position = player.core.position;
                            player.inventory[slot_index] = EMPTY_SLOT;
                            player.tick_actions_used += 1;
                            let live_ids: Vec<i32> = self.ground_items.iter().map(|g| g.id).collect();
                            if let Some(ground_id) = self.ground_item_id_pool.next(|candidate| live_ids.contains(&candidate)) {
                                let ground_item = GroundItem {
                                    id: ground_id,
                                    item_id: slot,
                                    count: 1,
                                    position,
                                    spawned_tick: self.tick_count,
                                    on_ground_ticks: 0,
                                    reserved_for_account_id: None,
                                    reservation_ticks_remaining: 0,
                                };
                                self.ground_items.push(ground_item);
                                report.events.push(WorldEvent::ItemDropped(ground_item));
                            }
                        }
                        // `Use`/`Eat`/`Drink`/`Equip` wait on item-type
                        // metadata that does not exist yet.
                    }
                    Intent::UnequipItem { slot } => {
                        let Some(player) = self.players.get_mut(&player_id) else { continue };
                        if player.tick_actions_used >= MAX_TICK_ACTIONS {
                            continue;
                        }
                        let equipped = player.equipment_slots[slot.index()];
                        if equipped == EMPTY_SLOT {
                            continue;
                        }
                        if let Some(open_slot) = player.inventory.iter_mut().find(|slot| **slot == EMPTY_SLOT) {
                            *open_slot = equipped;
                            player.equipment_slots[slot.index()] = EMPTY_SLOT;
                            player.tick_actions_used += 1;
                        } else {
                            let position = player.core.position;
                            player.equipment_slots[slot.index()] = EMPTY_SLOT;
                            player.tick_actions_used += 1;
                            let live_ids: Vec<i32> = self.ground_items.iter().map(|g| g.id).collect();
                            if let Some(ground_id) = self.ground_item_id_pool.next(|candidate| live_ids.contains(&candidate)) {
                                let ground_item = GroundItem {
                                    id: ground_id,
                                    item_id: equipped,
                                    count: 1,
                                    position,
                                    spawned_tick: self.tick_count,
                                    on_ground_ticks: 0,
                                    reserved_for_account_id: None,
                                    reservation_ticks_remaining: 0,
                                };
                                self.ground_items.push(ground_item);
                                report.events.push(WorldEvent::ItemDropped(ground_item));
                            }
                        }
                    }
                    Intent::Chat { contents, timestamp } => {
                        report.events.push(WorldEvent::ChatMessage { sender_id: player_id, contents, timestamp });
                    }
                    Intent::CompleteCharacterCreation => {
                        if let Some(player) = self.players.get_mut(&player_id) {
                            player.character_creator_completed = true;
                        }
                    }
                    Intent::SaveCharacterLookAttributes { appearance } => {
                        if let Some(player) = self.players.get_mut(&player_id) {
                            player.appearance_attrs = appearance;
                        }
                    }
                }
            }
        }
        for command in admin_commands {
            if let Err(err) = command.execute(self) {
                tracing::warn!(?err, "admin command failed");
            }
        }

        let expired = self.sessions.expire_stale(self.tick_count, self.reconnect_window_ticks());
        for &(_, player_id) in &expired {
            self.players.remove(&player_id);
            self.player_intents.remove(&player_id);
            self.player_mailboxes.remove(&player_id);
            self.damage_ledgers.remove(&player_id);
        }
        report.logged_out_accounts = expired;

        let terrain_dir = self.config.terrain_dir.clone();
        let missing_is_walkable = self.config.missing_chunk_is_walkable;
        let visibility_keys: Vec<ChunkKey> = self
            .players
            .values()
            .flat_map(|p| ChunkKey::from_world(p.core.position.0, p.core.position.1).visibility_square(1))
            .collect();
        for key in visibility_keys {
            if let Ok(chunk) = self.chunks.get_or_load(key, &terrain_dir, missing_is_walkable) {
                chunk.mark_hot();
            }
        }
    }

    fn reconnect_window_ticks(&self) -> u64 {
        let tick_ms = self.config.tick_interval.as_millis().max(1) as u64;
        (self.config.reconnect_window_seconds * 1000) / tick_ms
    }

    /// Phase 2: move every player one step toward its movement intent.
    fn phase_player_movement(&mut self, report: &mut TickReport) {
        let grid = Self::world_grid(&self.chunks, self.config.missing_chunk_is_walkable);
        let mut moves = Vec::new();
        for (&id, intents) in &mut self.player_intents {
            let Some(player) = self.players.get(&id) else { continue };
            let Some(destination) = intents.movement.destination else { continue };
            if player.core.position == destination {
                intents.movement.clear();
                continue;
            }
            if let embervale_path::Step::Move(next) =
                embervale_path::greedy_step(player.core.position, destination, &grid)
            {
                moves.push((id, next));
            } else {
                intents.movement.clear();
            }
        }
        drop(grid);

        for (id, next) in moves {
            if let Some(player) = self.players.get_mut(&id) {
                player.core.position = next;
                report.events.push(WorldEvent::CharacterMoved { id, position: next });
                if player.core.position
                    == self.player_intents.get(&id).and_then(|i| i.movement.destination).unwrap_or(next)
                {
                    if let Some(intents) = self.player_intents.get_mut(&id) {
                        intents.movement.clear();
                    }
                }
            }
        }
    }

    /// Phase 3: advance every NPC's idle/aggro/pursue state machine one
    /// step.
    fn phase_npc_movement(&mut self, report: &mut TickReport) {
        let grid = Self::world_grid(&self.chunks, self.config.missing_chunk_is_walkable);
        let npc_ids: Vec<CharacterId> = self.npcs.keys().copied().collect();

        for id in npc_ids {
            let Some(npc) = self.npcs.get(&id) else { continue };
            if !npc.core.alive {
                continue;
            }
            let Some(npc_type) = self.npc_types.get(npc.npc_type_id) else { continue };
            let state = self.npc_ai.get(&id).copied().unwrap_or(AiState::Idle);

            let current_target_pos = npc
                .core
                .current_target
                .and_then(|t| self.players.get(&t))
                .map(|p| (p.core.id, p.core.position));
            let nearest_candidate = self
                .players
                .values()
                .filter(|p| p.core.alive)
                .map(|p| (p.core.id, p.core.position))
                .min_by_key(|(_, pos)| embervale_utils::geometry::chebyshev_distance(npc.core.position, *pos));

            let decision = ai::decide(
                state,
                npc.core.position,
                npc.spawn_position,
                npc_type.is_aggressive,
                npc_type.aggro_range,
                nearest_candidate,
                current_target_pos,
                &grid,
            );

            self.npc_ai.insert(id, decision.next_state);
            if let Some(next) = decision.step {
                if let Some(npc) = self.npcs.get_mut(&id) {
                    npc.core.position = next;
                    report.events.push(WorldEvent::CharacterMoved { id, position: next });
                }
            }

            if let AiState::Pursuing { target_id } = decision.next_state {
                if let (Some(npc), Some(player)) = (self.npcs.get_mut(&id), self.players.get_mut(&target_id)) {
                    if npc.core.current_target != Some(target_id) {
                        combat::set_target(&mut npc.core, &mut player.core);
                    }
                }
            }
        }
    }

    /// Phase 4: resolve attacks initiated by players this tick.
    fn phase_player_combat(&mut self, report: &mut TickReport) {
        let player_ids: Vec<CharacterId> = self.players.keys().copied().collect();
        for id in player_ids {
            let Some(target_id) = self.player_intents.get(&id).and_then(|i| i.combat.target_id) else { continue };
            self.resolve_player_attack(id, target_id, report);
        }
    }

    fn resolve_player_attack(&mut self, attacker_id: CharacterId, target_id: CharacterId, report: &mut TickReport) {
        if attacker_id == target_id {
            return;
        }
        let Some(attacker) = self.players.get(&attacker_id) else { return };
        if !attacker.core.alive || attacker.core.attack_cooldown_remaining > 0 {
            return;
        }
        let attacker_pos = attacker.core.position;

        if let Some(npc) = self.npcs.get(&target_id) {
            if !npc.core.alive || embervale_utils::geometry::chebyshev_distance(attacker_pos, npc.core.position) > 1 {
                return;
            }
        } else if let Some(defender) = self.players.get(&target_id) {
            if !defender.core.alive || embervale_utils::geometry::chebyshev_distance(attacker_pos, defender.core.position) > 1 {
                return;
            }
        } else {
            return;
        }

        // `attacker` and `target` may both live in `self.players`, so the
        // symmetric target relationship is set as two independent
        // single-field mutations rather than one call borrowing both.
        if let Some(attacker) = self.players.get_mut(&attacker_id) {
            combat::set_attacker_target(&mut attacker.core, target_id);
        }
        if let Some(npc) = self.npcs.get_mut(&target_id) {
            combat::add_targeted_by(&mut npc.core, attacker_id);
        } else if let Some(defender) = self.players.get_mut(&target_id) {
            combat::add_targeted_by(&mut defender.core, attacker_id);
        }

        let tick = self.tick_count;
        let attacker_key = format!("Player_{attacker_id}");
        let outcome = if let Some(npc) = self.npcs.get_mut(&target_id) {
            let ledger = self.damage_ledgers.entry(target_id).or_default();
            combat::execute_attack(attacker_id, &attacker_key, &mut npc.core, ledger, tick, &mut self.rng)
        } else if let Some(defender) = self.players.get_mut(&target_id) {
            let ledger = self.damage_ledgers.entry(target_id).or_default();
            combat::execute_attack(attacker_id, &attacker_key, &mut defender.core, ledger, tick, &mut self.rng)
        } else {
            return;
        };
        if let Some(attacker) = self.players.get_mut(&attacker_id) {
            attacker.core.attack_cooldown_remaining = attacker.core.attack_cooldown_ticks;
        }

        report.events.push(WorldEvent::DamageDealt { attacker_id, defender_id: target_id, amount: outcome.damage_dealt });
        self.retaliate(target_id, attacker_id, outcome);
    }

    /// An NPC that was attacked always fights back, regardless of its
    /// `is_aggressive` flag.
    fn retaliate(&mut self, defender_id: CharacterId, attacker_id: CharacterId, outcome: AttackOutcome) {
        if outcome.defender_died {
            return;
        }
        let already_engaged = self.npcs.get(&defender_id).is_some_and(|n| n.core.current_target.is_some());
        if already_engaged {
            return;
        }
        if let (Some(npc), Some(player)) = (self.npcs.get_mut(&defender_id), self.players.get_mut(&attacker_id)) {
            self.npc_ai.insert(defender_id, AiState::Pursuing { target_id: attacker_id });
            combat::set_target(&mut npc.core, &mut player.core);
        }
    }

    /// Phase 5: resolve attacks NPCs make against their current target.
    fn phase_npc_combat(&mut self, report: &mut TickReport) {
        let npc_ids: Vec<CharacterId> = self.npcs.keys().copied().collect();
        for id in npc_ids {
            let Some(npc) = self.npcs.get(&id) else { continue };
            if !npc.core.alive {
                continue;
            }
            let Some(target_id) = npc.core.current_target else { continue };
            let Some(npc_type) = self.npc_types.get(npc.npc_type_id) else { continue };
            let cooldown_elapsed = self.tick_count.saturating_sub(npc.last_attack_tick) >= u64::from(npc_type.attack_cooldown_ticks);
            if !cooldown_elapsed {
                continue;
            }

            let in_range = self
                .players
                .get(&target_id)
                .map(|p| p.core.alive && embervale_utils::geometry::chebyshev_distance(npc.core.position, p.core.position) <= 1)
                .unwrap_or(false);
            if !in_range {
                continue;
            }

            let tick = self.tick_count;
            let attacker_key = format!("NPC_{id}");
            let outcome = {
                let Some(defender) = self.players.get_mut(&target_id) else { continue };
                let ledger = self.damage_ledgers.entry(target_id).or_default();
                combat::execute_attack(id, &attacker_key, &mut defender.core, ledger, tick, &mut self.rng)
            };
            if let Some(npc) = self.npcs.get_mut(&id) {
                npc.last_attack_tick = tick;
            }
            report.events.push(WorldEvent::DamageDealt { attacker_id: id, defender_id: target_id, amount: outcome.damage_dealt });
        }
    }

    /// Phase 6: for every character whose health hit zero this tick,
    /// settle death: credit the killer, clear targeting, drop loot for
    /// NPCs, and schedule a respawn.
    fn phase_death_settlement(&mut self, report: &mut TickReport) {
        self.settle_player_deaths(report);
        self.settle_npc_deaths(report);
    }

    fn settle_player_deaths(&mut self, report: &mut TickReport) {
        let dying: Vec<CharacterId> = self
            .players
            .values()
            .filter(|p| p.core.alive && p.core.health == 0)
            .map(|p| p.core.id)
            .collect();

        for id in dying {
            let killer_id = self.damage_ledgers.get(&id).and_then(|l| l.killer(&mut self.rng));

            let targeters: Vec<CharacterId> = self
                .players
                .get(&id)
                .map(|p| p.core.targeted_by.iter().copied().collect())
                .unwrap_or_default();
            for attacker_id in targeters {
                self.clear_any_target(attacker_id, id);
            }
            let death_position = self.players.get(&id).map(|p| p.core.position);
            let dropped_items: Vec<ItemId> = self
                .players
                .get_mut(&id)
                .map(|player| {
                    let mut dropped = Vec::new();
                    for slot in player.inventory.iter_mut().chain(player.equipment_slots.iter_mut()) {
                        if *slot != EMPTY_SLOT {
                            dropped.push(*slot);
                            *slot = EMPTY_SLOT;
                        }
                    }
                    dropped
                })
                .unwrap_or_default();
            if let Some(player) = self.players.get_mut(&id) {
                player.core.alive = false;
                player.core.current_target = None;
            }
            if let Some(position) = death_position {
                for item_id in dropped_items {
                    let live_ids: Vec<i32> = self.ground_items.iter().map(|g| g.id).collect();
                    let Some(ground_id) = self.ground_item_id_pool.next(|candidate| live_ids.contains(&candidate)) else {
                        tracing::warn!("ground item id pool exhausted, dropping death loot silently");
                        continue;
                    };
                    let ground_item = GroundItem {
                        id: ground_id,
                        item_id,
                        count: 1,
                        position,
                        spawned_tick: self.tick_count,
                        on_ground_ticks: 0,
                        reserved_for_account_id: None,
                        reservation_ticks_remaining: 0,
                    };
                    self.ground_items.push(ground_item);
                    report.events.push(WorldEvent::ItemDropped(ground_item));
                }
            }
            if let Some(ledger) = self.damage_ledgers.get_mut(&id) {
                ledger.clear();
            }
            if let Some(intents) = self.player_intents.get_mut(&id) {
                intents.respawn.schedule(self.tick_count, PLAYER_RESPAWN_DELAY_TICKS);
            }
            report.events.push(WorldEvent::CharacterDied { id, killer_id });
        }
    }

    fn settle_npc_deaths(&mut self, report: &mut TickReport) {
        let dying: Vec<CharacterId> = self
            .npcs
            .values()
            .filter(|n| n.core.alive && n.core.health == 0)
            .map(|n| n.core.id)
            .collect();

        for id in dying {
            let killer_id = self.damage_ledgers.get(&id).and_then(|l| l.killer(&mut self.rng));
            let (npc_type_id, position, home_zone_id) = match self.npcs.get_mut(&id) {
                Some(npc) => {
                    npc.core.alive = false;
                    npc.core.current_target = None;
                    (npc.npc_type_id, npc.core.position, npc.home_zone_id)
                }
                None => continue,
            };

            let targeters: Vec<CharacterId> = self
                .npcs
                .get(&id)
                .map(|n| n.core.targeted_by.iter().copied().collect())
                .unwrap_or_default();
            for attacker_id in targeters {
                self.clear_any_target(attacker_id, id);
            }

            if let Some(ledger) = self.damage_ledgers.get_mut(&id) {
                ledger.clear();
            }

            let reserved_for_account_id = killer_id.and_then(|k| self.players.get(&k)).map(|p| p.account_id);
            if let Some(npc_type) = self.npc_types.get(npc_type_id) {
                let rolled = self.drop_tables.roll(npc_type.drop_table_id, &mut self.rng);
                for drop in rolled {
                    let live_ids: Vec<i32> = self.ground_items.iter().map(|g| g.id).collect();
                    let Some(item_id) = self.ground_item_id_pool.next(|candidate| live_ids.contains(&candidate)) else {
                        tracing::warn!("ground item id pool exhausted, dropping loot silently");
                        continue;
                    };
                    let ground_item = GroundItem {
                        id: item_id,
                        item_id: drop.item_id,
                        count: drop.count as i32,
                        position,
                        spawned_tick: self.tick_count,
                        on_ground_ticks: 0,
                        reserved_for_account_id,
                        reservation_ticks_remaining: if reserved_for_account_id.is_some() { LOOT_RESERVATION_TICKS } else { 0 },
                    };
                    self.ground_items.push(ground_item);
                    report.events.push(WorldEvent::ItemDropped(ground_item));
                }
            }

            self.schedule_npc_respawn(id, home_zone_id);
            report.events.push(WorldEvent::CharacterDied { id, killer_id });
        }
    }

    fn clear_any_target(&mut self, attacker_id: CharacterId, former_target_id: CharacterId) {
        if let Some(npc) = self.npcs.get_mut(&attacker_id) {
            if npc.core.current_target == Some(former_target_id) {
                npc.core.current_target = None;
            }
        }
        if let Some(player) = self.players.get_mut(&attacker_id) {
            if player.core.current_target == Some(former_target_id) {
                player.core.current_target = None;
            }
        }
    }

    /// Only a zone whose root chunk is `Hot` right now gets a scheduled
    /// respawn; a zone nobody is near does not need its NPC back until a
    /// player returns, at which point [`Self::spawn_new_zone_npcs`] tops it
    /// back up to `max_count` on its own.
    fn schedule_npc_respawn(&mut self, npc_id: CharacterId, home_zone_id: i32) {
        if let Some(zone) = self.chunks_zones_mut().find(|z| z.id == home_zone_id) {
            zone.record_despawn(npc_id);
        }
        if !self.zone_root_chunk_is_hot(home_zone_id) {
            return;
        }
        self.npc_respawns.push((self.tick_count + self.npc_respawn_delay(home_zone_id), npc_id));
    }

    fn npc_respawn_delay(&self, home_zone_id: i32) -> u64 {
        self.chunks_zones().find(|z| z.id == home_zone_id).map(|z| z.respawn_ticks).unwrap_or(60)
    }

    /// Whether `home_zone_id`'s root chunk is currently `Hot`. A zone whose
    /// chunk has gone cold (and was dropped from `self.chunks` entirely) is
    /// not hot either.
    fn zone_root_chunk_is_hot(&self, home_zone_id: i32) -> bool {
        self.chunks_zones_with_root().any(|(root_chunk, zone)| {
            zone.id == home_zone_id && matches!(self.chunks.get(root_chunk).map(|c| c.lifecycle), Some(ChunkLifecycle::Hot))
        })
    }

    fn chunks_zones(&self) -> impl Iterator<Item = &crate::zone::Zone> {
        self.chunks.resident_keys().collect::<Vec<_>>().into_iter().filter_map(move |k| self.chunks.get(k)).flat_map(|c| c.zones.iter())
    }

    fn chunks_zones_with_root(&self) -> impl Iterator<Item = (ChunkKey, &crate::zone::Zone)> {
        self.chunks
            .resident_keys()
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(move |k| self.chunks.get(k).map(|c| (k, c)))
            .flat_map(|(k, c)| c.zones.iter().map(move |z| (k, z)))
    }

    fn chunks_zones_mut(&mut self) -> impl Iterator<Item = &mut crate::zone::Zone> {
        let keys: Vec<ChunkKey> = self.chunks.resident_keys().collect();
        keys.into_iter().filter_map(move |k| self.chunks.get_mut(k)).flat_map(|c| c.zones.iter_mut())
    }

    /// Phase 7: respawn players whose delay has elapsed, and spawn fresh
    /// NPC instances for any zone with open slots and a due respawn.
    fn phase_respawn_processing(&mut self, report: &mut TickReport) {
        let due_players: Vec<CharacterId> = self
            .player_intents
            .iter_mut()
            .filter(|(_, intents)| intents.respawn.is_due(self.tick_count))
            .map(|(id, _)| *id)
            .collect();
        for id in due_players {
            if let Some(player) = self.players.get_mut(&id) {
                let respawn_position = player.respawn_position;
                player.core.reset_for_respawn(respawn_position);
                report.events.push(WorldEvent::CharacterRespawned { id, position: respawn_position });
            }
        }

        let tick = self.tick_count;
        let (due, pending): (Vec<_>, Vec<_>) =
            self.npc_respawns.drain(..).partition(|&(due_tick, _)| due_tick <= tick);
        self.npc_respawns = pending;

        for (_, npc_id) in due {
            let Some(npc) = self.npcs.get(&npc_id) else { continue };
            let home_zone_id = npc.home_zone_id;
            if !self.zone_root_chunk_is_hot(home_zone_id) {
                // The zone went cold while this respawn was pending; leave
                // the instance dead. `spawn_new_zone_npcs` tops the zone
                // back up with a fresh instance once a player returns.
                continue;
            }
            let Some(npc) = self.npcs.get_mut(&npc_id) else { continue };
            let spawn_position = npc.spawn_position;
            npc.core.reset_for_respawn(spawn_position);
            self.npc_ai.insert(npc_id, AiState::Idle);
            report.events.push(WorldEvent::CharacterRespawned { id: npc_id, position: spawn_position });
            if let Some(zone) = self.chunks_zones_mut().find(|z| z.id == home_zone_id) {
                zone.record_spawn(npc_id);
            }
        }

        self.spawn_new_zone_npcs();
    }

    /// Tops up every loaded zone with open slots up to `max_count`, e.g.
    /// the first tick a zone's chunk goes hot. Scheduled respawns
    /// (`npc_respawns`) reuse an existing instance's id; this instead
    /// allocates fresh ids for capacity a zone has never filled.
    fn spawn_new_zone_npcs(&mut self) {
        let candidates: Vec<(i32, NpcTypeId, (i32, i32), (i32, i32), u32)> = self
            .chunks_zones_with_root()
            .filter(|(root_chunk, _)| matches!(self.chunks.get(*root_chunk).map(|c| c.lifecycle), Some(ChunkLifecycle::Hot)))
            .map(|(_, z)| (z.id, z.npc_type_id, z.min, z.max, z.open_slots()))
            .collect();

        let grid = Self::world_grid(&self.chunks, self.config.missing_chunk_is_walkable);
        let mut spawns: Vec<(i32, NpcTypeId, (i32, i32))> = Vec::new();
        for (zone_id, npc_type_id, min, max, open_slots) in candidates {
            if self.npc_types.get(npc_type_id).is_none() {
                continue;
            }
            for _ in 0..open_slots {
                let tile = (0..8)
                    .map(|_| (self.rng.gen_range(min.0..=max.0), self.rng.gen_range(min.1..=max.1)))
                    .find(|&(x, y)| grid.is_walkable(x, y))
                    .unwrap_or(min);
                spawns.push((zone_id, npc_type_id, tile));
            }
        }
        drop(grid);

        for (zone_id, npc_type_id, position) in spawns {
            let Some(npc_type) = self.npc_types.get(npc_type_id) else { continue };
            let health_base = npc_type.health_base;
            let npcs = &self.npcs;
            let Some(id) = self.npc_id_pool.next(|candidate| npcs.contains_key(&candidate)) else {
                tracing::warn!("npc instance id pool exhausted, skipping zone spawn");
                continue;
            };
            self.npcs.insert(id, Npc::new(id, npc_type_id, zone_id, position, health_base));
            self.npc_ai.insert(id, AiState::Idle);
            self.damage_ledgers.insert(id, DamageLedger::new());
            if let Some(zone) = self.chunks_zones_mut().find(|z| z.id == zone_id) {
                zone.record_spawn(id);
            }
        }
    }

    /// Phase 8: despawn ground items older than
    /// [`GROUND_ITEM_LIFETIME_TICKS`].
    fn phase_ground_item_aging(&mut self, report: &mut TickReport) {
        let mut still_alive = Vec::with_capacity(self.ground_items.len());
        for mut item in self.ground_items.drain(..) {
            item.on_ground_ticks += 1;
            if item.reservation_ticks_remaining > 0 {
                item.reservation_ticks_remaining -= 1;
                if item.reservation_ticks_remaining == 0 {
                    item.reserved_for_account_id = None;
                }
            }
            if item.on_ground_ticks >= GROUND_ITEM_LIFETIME_TICKS {
                report.events.push(WorldEvent::ItemExpired { id: item.id });
            } else {
                still_alive.push(item);
            }
        }
        self.ground_items = still_alive;
    }

    /// Phase 9: compute each player's visibility diff against every other
    /// character and ground item in range.
    ///
    /// Visibility is rostered by chunk, not by tile distance: a player sees
    /// every character whose chunk falls in the `(2R+1)x(2R+1)` square of
    /// chunks centered on the player's own chunk, regardless of exactly
    /// where within that square each character's tile sits.
    fn phase_visibility_diff_and_egress(&mut self, report: &mut TickReport) {
        let mut players_on_chunk: std::collections::HashMap<ChunkKey, Vec<CharacterId>> = std::collections::HashMap::new();
        for p in self.players.values() {
            players_on_chunk.entry(p.core.chunk_key()).or_default().push(p.core.id);
        }
        let mut npcs_on_chunk: std::collections::HashMap<ChunkKey, Vec<CharacterId>> = std::collections::HashMap::new();
        for n in self.npcs.values() {
            npcs_on_chunk.entry(n.core.chunk_key()).or_default().push(n.core.id);
        }
        let mut items_on_chunk: std::collections::HashMap<ChunkKey, Vec<i32>> = std::collections::HashMap::new();
        for item in &self.ground_items {
            items_on_chunk.entry(ChunkKey::from_world(item.position.0, item.position.1)).or_default().push(item.id);
        }

        report.character_snapshots =
            self.players.values().map(|p| (p.core.id, player_character_snapshot(p))).chain(self.npcs.values().map(|n| (n.core.id, npc_character_snapshot(n)))).collect();
        report.ground_item_snapshots = self.ground_items.iter().map(|item| (item.id, *item)).collect();

        for player in self.players.values_mut() {
            let square = player.core.chunk_key().visibility_square(player.visibility_radius as i32);

            let currently_visible: std::collections::HashSet<CharacterId> = square
                .iter()
                .flat_map(|key| players_on_chunk.get(key).into_iter().chain(npcs_on_chunk.get(key)))
                .flatten()
                .copied()
                .filter(|&id| id != player.core.id)
                .collect();
            let diff = crate::visibility::diff_and_advance(&mut player.last_visible, currently_visible);
            if !diff.is_empty() {
                report.visibility.insert(player.core.id, diff);
            }

            let currently_visible_items: std::collections::HashSet<i32> = square
                .iter()
                .flat_map(|key| items_on_chunk.get(key).into_iter().flatten())
                .copied()
                .filter(|id| {
                    report
                        .ground_item_snapshots
                        .get(id)
                        .is_some_and(|item| item.reserved_for_account_id.is_none() || item.reserved_for_account_id == Some(player.account_id))
                })
                .collect();
            let item_diff = crate::visibility::diff_and_advance(&mut player.visible_ground_items, currently_visible_items);
            if !item_diff.is_empty() {
                report.ground_item_visibility.insert(player.core.id, item_diff);
            }
        }
    }

    /// Phase 10: roll each character's per-tick damage bookkeeping over,
    /// reset dirty/action-budget flags, and unload any chunk that has gone
    /// cold.
    fn phase_epilogue(&mut self) {
        for player in self.players.values_mut() {
            roll_over_tick_bookkeeping(&mut player.core);
            player.tick_actions_used = 0;
        }
        for npc in self.npcs.values_mut() {
            roll_over_tick_bookkeeping(&mut npc.core);
        }

        let tick = self.tick_count;
        let resident: Vec<ChunkKey> = self.chunks.resident_keys().collect();
        let hot_now: std::collections::HashSet<ChunkKey> = self
            .players
            .values()
            .flat_map(|p| ChunkKey::from_world(p.core.position.0, p.core.position.1).visibility_square(1))
            .collect();

        for key in resident {
            let Some(chunk) = self.chunks.get_mut(key) else { continue };
            if hot_now.contains(&key) {
                chunk.mark_hot();
            } else {
                chunk.mark_warm(tick);
                if chunk.is_due_for_unload(tick) {
                    self.chunks.unload(key);
                }
            }
        }
    }

    /// Runs the fixed-cadence tick loop until `cancel_token` fires.
    /// Consumes `self` since nothing besides this task ever touches world
    /// state again.
    pub async fn run(mut self, cancel_token: CancellationToken, on_tick: impl Fn(TickReport) + Send + 'static) {
        let tick_interval = self.config.tick_interval;
        let mut next_tick_time = Instant::now();

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            let now = Instant::now();
            if now < next_tick_time {
                tokio::select! {
                    () = cancel_token.cancelled() => break,
                    () = tokio::time::sleep(next_tick_time - now) => {}
                }
            }
            next_tick_time += tick_interval;

            if cancel_token.is_cancelled() {
                break;
            }

            let tick_start = Instant::now();
            let report = self.tick();
            let elapsed = tick_start.elapsed();
            if elapsed > Duration::from_millis(100) {
                tracing::warn!(tick = self.tick_count, ?elapsed, "tick running slow");
            }

            on_tick(report);
        }
    }
}

impl AdminCommandContext for World {
    fn kill_character(&mut self, id: CharacterId) -> WorldResult<()> {
        let tick = self.tick_count;
        if let Some(player) = self.players.get_mut(&id) {
            player.core.apply_damage(player.core.health, tick);
            return Ok(());
        }
        if let Some(npc) = self.npcs.get_mut(&id) {
            npc.core.apply_damage(npc.core.health, tick);
            return Ok(());
        }
        Err(WorldError::UnknownCharacter(id))
    }

    fn teleport_character(&mut self, id: CharacterId, position: (i32, i32)) -> WorldResult<()> {
        if let Some(player) = self.players.get_mut(&id) {
            player.core.position = position;
            return Ok(());
        }
        if let Some(npc) = self.npcs.get_mut(&id) {
            npc.core.position = position;
            return Ok(());
        }
        Err(WorldError::UnknownCharacter(id))
    }
}
