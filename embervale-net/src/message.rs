//! Wire message envelopes.
//!
//! Every message is a JSON object with a mandatory `type` discriminator;
//! unknown types are ignored rather than rejected. `serde`'s internally
//! tagged enum representation gives this for free: [`ClientMessage`] and
//! [`ServerMessage`] both tag on `type`, and a malformed or unrecognized
//! payload fails to deserialize into the enum at all, which the transport
//! layer treats as "drop this message" rather than a connection error.

use embervale_content::EquipmentSlot;
use embervale_core::admin::AdminCommand;
use embervale_core::character::{AttackStyle, CharacterId};
use embervale_core::tick::{CharacterSnapshot, Intent, ItemActionKind, SkillSnapshot, WorldEvent};
use serde::{Deserialize, Serialize};

/// A message received from a connected client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Presents a bearer token to authenticate the connection.
    #[serde(rename = "auth")]
    Auth {
        /// The bearer token issued by the external auth service.
        token: String,
    },
    /// Requests movement toward a destination tile.
    #[serde(rename = "move")]
    Move {
        /// Destination tile X.
        dx: i32,
        /// Destination tile Y.
        dy: i32,
    },
    /// Sets or clears the player's current combat target.
    #[serde(rename = "setTarget")]
    SetTarget {
        /// The target's character id, if `action` is `attack`.
        #[serde(rename = "targetId")]
        target_id: Option<CharacterId>,
        /// What to do with the target.
        action: TargetAction,
    },
    /// A client-initiated heartbeat carrying a round-trip timestamp.
    #[serde(rename = "ping")]
    Ping {
        /// Echoed back verbatim in the `pong` reply.
        timestamp: i64,
    },
    /// Requests periodic `tick` messages even with no state changes.
    #[serde(rename = "enable_heartbeat")]
    EnableHeartbeat,
    /// Stops periodic `tick` messages.
    #[serde(rename = "disable_heartbeat")]
    DisableHeartbeat,
    /// Clean disconnect request.
    #[serde(rename = "quit")]
    Quit,
    /// Alias for `quit` accepted by some older clients.
    #[serde(rename = "logout")]
    Logout,
    /// An administrative command. Only honored for accounts the bin
    /// crate's configuration marks as operators.
    #[serde(rename = "adminCommand")]
    AdminCommand {
        /// Which admin command to run.
        command: AdminCommandName,
        /// The command's positional arguments.
        #[serde(default)]
        args: Vec<i32>,
    },
    /// Changes the player's combat stance.
    #[serde(rename = "setAttackStyle")]
    SetAttackStyle {
        /// The new stance.
        style: AttackStyle,
    },
    /// Acts on one inventory slot.
    #[serde(rename = "itemAction")]
    ItemAction {
        /// The inventory slot index.
        #[serde(rename = "slotIndex")]
        slot_index: usize,
        /// What to do with it.
        action: ItemActionKind,
    },
    /// Unequips a named equipment slot.
    #[serde(rename = "unequipItem")]
    UnequipItem {
        /// The slot to clear.
        slot: EquipmentSlot,
    },
    /// A chat message to broadcast.
    #[serde(rename = "chat")]
    Chat {
        /// The message text.
        contents: String,
        /// Client-supplied timestamp, echoed back verbatim.
        timestamp: i64,
    },
    /// Marks character creation as finished.
    #[serde(rename = "completeCharacterCreation")]
    CompleteCharacterCreation,
    /// Saves the player's appearance attributes.
    #[serde(rename = "saveCharacterLookAttributes")]
    SaveCharacterLookAttributes {
        /// Opaque appearance payload, not interpreted by the world.
        appearance: serde_json::Value,
    },
}

/// What a `setTarget` message should do with the named target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAction {
    /// Clears the current target.
    None,
    /// Attacks the named target every tick it remains in range.
    Attack,
}

/// The admin commands exposed over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminCommandName {
    /// `args: [target]`.
    Kill,
    /// `args: [target, x, y]`.
    Teleport,
}

impl ClientMessage {
    /// Converts this message into a [`Intent`] for the tick orchestrator's
    /// mailbox, if it is one (auth/heartbeat/admin messages are handled
    /// by the transport layer directly and never reach the world).
    #[must_use]
    pub fn into_intent(self) -> Option<Intent> {
        match self {
            Self::Move { dx, dy } => Some(Intent::Move { destination: (dx, dy) }),
            Self::SetTarget { target_id: Some(target), action: TargetAction::Attack } => {
                Some(Intent::Attack { target })
            }
            Self::SetTarget { .. } => None,
            Self::Quit | Self::Logout => Some(Intent::Disconnect),
            Self::Ping { .. } | Self::EnableHeartbeat | Self::DisableHeartbeat => Some(Intent::Heartbeat),
            Self::AdminCommand { command, args } => admin_command_from_args(command, &args).map(Intent::Admin),
            Self::Auth { .. } => None,
            Self::SetAttackStyle { style } => Some(Intent::SetAttackStyle { style }),
            Self::ItemAction { slot_index, action } => Some(Intent::ItemAction { slot_index, action }),
            Self::UnequipItem { slot } => Some(Intent::UnequipItem { slot }),
            Self::Chat { contents, timestamp } => Some(Intent::Chat { contents, timestamp }),
            Self::CompleteCharacterCreation => Some(Intent::CompleteCharacterCreation),
            Self::SaveCharacterLookAttributes { appearance } => Some(Intent::SaveCharacterLookAttributes { appearance }),
        }
    }
}

/// Builds an [`AdminCommand`] from a wire `adminCommand`'s name and
/// positional args. Returns `None` if the arity is wrong rather than
/// erroring, consistent with the rest of the protocol dropping malformed
/// messages instead of tearing down the connection.
fn admin_command_from_args(command: AdminCommandName, args: &[i32]) -> Option<AdminCommand> {
    match (command, args) {
        (AdminCommandName::Kill, &[target]) => Some(AdminCommand::Kill { target }),
        (AdminCommandName::Teleport, &[target, x, y]) => Some(AdminCommand::Teleport { target, position: (x, y) }),
        _ => None,
    }
}

/// A message sent to a connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to an `auth` message.
    #[serde(rename = "auth")]
    Auth {
        /// Whether authentication succeeded.
        success: bool,
        /// A machine-readable failure code, if `success` is `false`.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// The authenticated character's id, if `success` is `true`.
        #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
        user_id: Option<CharacterId>,
        /// The character's spawn position, if `success` is `true`.
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
    },
    /// A refusal, carrying one of the documented error codes.
    #[serde(rename = "error")]
    Error {
        /// One of `ALREADY_LOGGED_IN`, `WORLD_FULL`, `BANNED`, `SESSION_ERROR`.
        code: String,
        /// A human-readable message.
        message: String,
    },
    /// The initial full state handed to a freshly spawned player.
    #[serde(rename = "spawnPlayer")]
    SpawnPlayer {
        /// The player's own record.
        player: PlayerView,
        /// The player's trained skill values.
        #[serde(rename = "playerSkills")]
        player_skills: Vec<SkillView>,
        /// Whether this character has completed the character-creation
        /// flow.
        #[serde(rename = "characterCreatorCompleted")]
        character_creator_completed: bool,
    },
    /// An aggregated per-tick state diff. Only non-empty fields are sent.
    #[serde(rename = "state")]
    State {
        /// Characters that entered visibility this tick.
        #[serde(rename = "clientsToLoad", skip_serializing_if = "Vec::is_empty")]
        clients_to_load: Vec<CharacterId>,
        /// Characters that left visibility this tick.
        #[serde(rename = "clientsToUnload", skip_serializing_if = "Vec::is_empty")]
        clients_to_unload: Vec<CharacterId>,
        /// Positions/health of players that moved or took damage.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        players: Vec<PlayerView>,
        /// NPCs that entered visibility this tick.
        #[serde(rename = "npcsToLoad", skip_serializing_if = "Vec::is_empty")]
        npcs_to_load: Vec<CharacterId>,
        /// NPCs that left visibility this tick.
        #[serde(rename = "npcsToUnload", skip_serializing_if = "Vec::is_empty")]
        npcs_to_unload: Vec<CharacterId>,
        /// Positions/health of NPCs that moved or took damage.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        npcs: Vec<PlayerView>,
        /// Ground items that appeared this tick.
        #[serde(rename = "groundItemsToLoad", skip_serializing_if = "Vec::is_empty")]
        ground_items_to_load: Vec<GroundItemView>,
        /// Ground items that despawned this tick.
        #[serde(rename = "groundItemsToUnload", skip_serializing_if = "Vec::is_empty")]
        ground_items_to_unload: Vec<i32>,
    },
    /// Sent every tick to clients that requested heartbeats.
    #[serde(rename = "tick")]
    Tick {
        /// Ticks elapsed since world start, standing in for time-of-day.
        #[serde(rename = "timeOfDay")]
        time_of_day: u64,
    },
    /// A character (player or NPC) left visibility for good.
    #[serde(rename = "quitPlayer")]
    QuitPlayer {
        /// The departed character's id.
        id: CharacterId,
    },
    /// Reply to a `ping`.
    #[serde(rename = "pong")]
    Pong {
        /// Echoes the `ping`'s timestamp.
        timestamp: i64,
    },
    /// A broadcast chat message.
    #[serde(rename = "chat")]
    Chat {
        /// The sender's character id.
        #[serde(rename = "senderId")]
        sender_id: CharacterId,
        /// The message text.
        contents: String,
        /// The sender's client-supplied timestamp, echoed verbatim.
        timestamp: i64,
    },
}

/// A tile position, serialized as `{ x, y }`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Position {
    /// Tile X.
    pub x: i32,
    /// Tile Y.
    pub y: i32,
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// The egress view of one player or NPC's visible state.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    /// Character id.
    pub id: CharacterId,
    /// Current position.
    pub position: Position,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    #[serde(rename = "maxHealth")]
    pub max_health: i32,
}

impl From<CharacterSnapshot> for PlayerView {
    fn from(snapshot: CharacterSnapshot) -> Self {
        Self { id: snapshot.id, position: snapshot.position.into(), health: snapshot.health, max_health: snapshot.max_health }
    }
}

/// The egress view of one trained skill, sent on `spawnPlayer`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SkillView {
    /// Which skill this is.
    pub kind: embervale_content::SkillKind,
    /// The current usable value.
    #[serde(rename = "currentValue")]
    pub current_value: i32,
    /// The trained ceiling.
    #[serde(rename = "baseLevel")]
    pub base_level: i32,
}

impl From<SkillSnapshot> for SkillView {
    fn from(snapshot: SkillSnapshot) -> Self {
        Self { kind: snapshot.kind, current_value: snapshot.current_value, base_level: snapshot.base_level }
    }
}

/// The egress view of one dropped item.
#[derive(Debug, Clone, Serialize)]
pub struct GroundItemView {
    /// Ground-item id.
    pub id: i32,
    /// The item registry id.
    #[serde(rename = "itemId")]
    pub item_id: i32,
    /// Stack count.
    pub count: i32,
    /// Tile position.
    pub position: Position,
}

/// Converts one tick's [`WorldEvent`]s plus visibility diffs into the
/// per-client `state`/`quitPlayer` messages. Called once per connected
/// player by the dispatch layer.
#[must_use]
pub fn damage_dealt_events(events: &[WorldEvent]) -> Vec<(CharacterId, CharacterId, i32)> {
    events
        .iter()
        .filter_map(|event| match *event {
            WorldEvent::DamageDealt { attacker_id, defender_id, amount } => Some((attacker_id, defender_id, amount)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_message_decodes_to_a_move_intent() {
        let json = r#"{"type":"move","dx":3,"dy":4}"#;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        let intent = message.into_intent().unwrap();
        assert!(matches!(intent, Intent::Move { destination: (3, 4) }));
    }

    #[test]
    fn set_target_attack_decodes_to_an_attack_intent() {
        let json = r#"{"type":"setTarget","targetId":7,"action":"attack"}"#;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        let intent = message.into_intent().unwrap();
        assert!(matches!(intent, Intent::Attack { target: 7 }));
    }

    #[test]
    fn clearing_a_target_produces_no_intent() {
        let json = r#"{"type":"setTarget","targetId":null,"action":"none"}"#;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(message.into_intent().is_none());
    }

    #[test]
    fn quit_decodes_to_a_disconnect_intent() {
        let message: ClientMessage = serde_json::from_str(r#"{"type":"quit"}"#).unwrap();
        assert!(matches!(message.into_intent(), Some(Intent::Disconnect)));
    }

    #[test]
    fn admin_kill_decodes_to_an_admin_intent() {
        let json = r#"{"type":"adminCommand","command":"kill","args":[7]}"#;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        let intent = message.into_intent().unwrap();
        assert!(matches!(intent, Intent::Admin(AdminCommand::Kill { target: 7 })));
    }

    #[test]
    fn admin_command_with_wrong_arity_produces_no_intent() {
        let json = r#"{"type":"adminCommand","command":"teleport","args":[7]}"#;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(message.into_intent().is_none());
    }

    #[test]
    fn auth_message_never_becomes_an_intent() {
        let json = r#"{"type":"auth","token":"abc"}"#;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(message.into_intent().is_none());
    }

    #[test]
    fn server_error_message_serializes_with_the_documented_shape() {
        let message = ServerMessage::Error { code: "WORLD_FULL".into(), message: "world is full".into() };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains("WORLD_FULL"));
    }
}
