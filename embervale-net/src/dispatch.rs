//! Shared server state, connect/login orchestration, and per-tick egress
//! fan-out.
//!
//! `World` is owned exclusively by the tick task; everything here talks to
//! it only through `embervale_core::tick::ControlMessage`s and `Intent`
//! mailboxes, and learns what happened through the `TickReport` handed to
//! `World::run`'s `on_tick` callback.

use std::collections::HashSet;
use std::sync::Arc;

use embervale_core::character::CharacterId;
use embervale_core::config::WorldConfig;
use embervale_core::tick::{
    CharacterKind, CharacterSnapshot, ConnectOutcome, ConnectRequest, ControlMessage, Intent, NewPlayerSpec, TickReport,
    WorldEvent,
};
use embervale_core::WorldError;
use embervale_db::{AccountStore, CharacterStore, DbError};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use crate::message::{damage_dealt_events, GroundItemView, PlayerView, ServerMessage};

/// Everything one running world's connection handlers need: a way to talk
/// to the tick task, and the persistence stores backing login/character
/// state.
pub struct ServerState {
    /// Sends [`ControlMessage`]s into the tick task's control channel.
    pub control_tx: crossbeam::channel::Sender<ControlMessage>,
    /// This world's tunables, shared read-only with every connection.
    pub config: Arc<WorldConfig>,
    /// Account/session persistence.
    pub accounts: AccountStore,
    /// Character persistence.
    pub characters: CharacterStore,
    /// Per-connection egress fan-out.
    pub egress: Arc<EgressRegistry>,
}

/// What went wrong trying to bring a connection into the world.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The bearer token was malformed or failed verification.
    #[error("invalid bearer token")]
    InvalidToken,
    /// The account is currently banned.
    #[error("account is banned: {0}")]
    Banned(String),
    /// A database error occurred while checking ban/session state or
    /// loading the character record.
    #[error(transparent)]
    Db(#[from] DbError),
    /// The world rejected the connect outright.
    #[error(transparent)]
    World(#[from] WorldError),
}

impl ConnectError {
    /// The wire error code this failure maps to, per the documented
    /// `ALREADY_LOGGED_IN`/`WORLD_FULL`/`BANNED`/`SESSION_ERROR` taxonomy.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Banned(_) => "BANNED",
            Self::World(WorldError::DuplicateLogin(_)) => "ALREADY_LOGGED_IN",
            Self::World(WorldError::WorldFull) => "WORLD_FULL",
            Self::InvalidToken | Self::Db(_) | Self::World(_) => "SESSION_ERROR",
        }
    }
}

impl ServerState {
    /// Authenticates `token`, loads or creates the account's character, and
    /// submits a [`ControlMessage::Connect`] to the tick task. Returns the
    /// resulting character snapshot plus the ingress-mailbox sender the
    /// caller should forward decoded [`Intent`]s into.
    pub async fn connect(
        &self,
        token: &str,
    ) -> Result<(i64, CharacterSnapshot, ConnectOutcome, crossbeam::channel::Sender<Intent>), ConnectError> {
        let account_id =
            embervale_db::decode_account_id(token, self.config.jwt_secret.as_deref()).map_err(|_| ConnectError::InvalidToken)?;

        if let Some(reason) = self.accounts.ban_reason(account_id).await? {
            return Err(ConnectError::Banned(reason));
        }

        let upsert = self.accounts.upsert_session(account_id).await?;
        let Some(upsert) = upsert else {
            return Err(ConnectError::World(WorldError::DuplicateLogin(0)));
        };

        let request = match upsert {
            embervale_db::SessionUpsert::Reclaimed => ConnectRequest::Reclaim,
            embervale_db::SessionUpsert::Created => {
                let record = match self.characters.load(account_id).await? {
                    Some(record) => record,
                    None => self.characters.create(account_id, &format!("Player{account_id}"), (0, 0), 100).await?,
                };
                ConnectRequest::New(NewPlayerSpec {
                    name: record.name,
                    position: record.position,
                    max_health: record.max_health,
                    visibility_radius: record.visibility_radius.map_or(self.config.default_visibility_radius, |r| r as u32),
                })
            }
        };

        let (mailbox_tx, mailbox_rx) = crossbeam::channel::unbounded();
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.control_tx
            .send(ControlMessage::Connect { account_id, request, mailbox: mailbox_rx, reply: reply_tx })
            .map_err(|_| ConnectError::World(WorldError::WorldFull))?;

        let (snapshot, outcome) = reply_rx.await.map_err(|_| ConnectError::World(WorldError::WorldFull))??;
        Ok((account_id, snapshot, outcome, mailbox_tx))
    }

    /// Notifies the tick task that `account_id`'s transport closed.
    pub fn disconnect(&self, account_id: i64) {
        let _ = self.control_tx.send(ControlMessage::Disconnect { account_id });
    }

    /// Whether `account_id` may issue `adminCommand` messages.
    #[must_use]
    pub fn is_operator(&self, account_id: i64) -> bool {
        self.config.operator_account_ids.contains(&account_id)
    }
}

type EgressSender = mpsc::UnboundedSender<ServerMessage>;

/// Tracks one egress sender per connected character, plus which ones asked
/// for periodic `tick` heartbeats.
#[derive(Default)]
pub struct EgressRegistry {
    senders: Mutex<FxHashMap<CharacterId, EgressSender>>,
    heartbeats: Mutex<HashSet<CharacterId>>,
}

impl EgressRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers (or replaces, on reclaim) the egress channel for `id`.
    pub fn register(&self, id: CharacterId, sender: EgressSender) {
        self.senders.lock().insert(id, sender);
    }

    /// Drops `id`'s registration, e.g. once it has been fully logged out.
    pub fn unregister(&self, id: CharacterId) {
        self.senders.lock().remove(&id);
        self.heartbeats.lock().remove(&id);
    }

    /// Turns periodic `tick` heartbeats for `id` on or off.
    pub fn set_heartbeat(&self, id: CharacterId, enabled: bool) {
        let mut heartbeats = self.heartbeats.lock();
        if enabled {
            heartbeats.insert(id);
        } else {
            heartbeats.remove(&id);
        }
    }

    fn send(&self, id: CharacterId, message: ServerMessage) {
        if let Some(sender) = self.senders.lock().get(&id) {
            let _ = sender.send(message);
        }
    }

    /// Sends `message` to every connected client, used for chat.
    fn broadcast(&self, message: ServerMessage) {
        for sender in self.senders.lock().values() {
            let _ = sender.send(message.clone());
        }
    }
}

/// Turns one tick's [`TickReport`] into per-connection egress messages.
/// Called from the `on_tick` closure passed to `World::run`, which runs
/// synchronously on the tick task — this must never block.
pub fn relay_tick(registry: &EgressRegistry, report: &TickReport) {
    let changed: HashSet<CharacterId> = report
        .events
        .iter()
        .filter_map(|event| match *event {
            WorldEvent::CharacterMoved { id, .. } => Some(id),
            _ => None,
        })
        .chain(damage_dealt_events(&report.events).into_iter().flat_map(|(attacker, defender, _)| [attacker, defender]))
        .collect();

    for (&player_id, diff) in &report.visibility {
        let mut clients_to_load = Vec::new();
        let mut npcs_to_load = Vec::new();
        for &id in &diff.appeared {
            match report.character_snapshots.get(&id).map(|s| s.kind) {
                Some(CharacterKind::Npc) => npcs_to_load.push(id),
                _ => clients_to_load.push(id),
            }
        }
        let mut clients_to_unload = Vec::new();
        let mut npcs_to_unload = Vec::new();
        for &id in &diff.disappeared {
            match report.character_snapshots.get(&id).map(|s| s.kind) {
                Some(CharacterKind::Npc) => npcs_to_unload.push(id),
                _ => clients_to_unload.push(id),
            }
        }

        let mut changed_ids: Vec<CharacterId> =
            diff.appeared.iter().chain(changed.iter().filter(|id| !diff.disappeared.contains(*id))).copied().collect();
        changed_ids.sort_unstable();
        changed_ids.dedup();

        let mut players: Vec<PlayerView> = Vec::new();
        let mut npcs: Vec<PlayerView> = Vec::new();
        for id in changed_ids {
            let Some(snapshot) = report.character_snapshots.get(&id) else { continue };
            match snapshot.kind {
                CharacterKind::Player => players.push(PlayerView::from(snapshot.clone())),
                CharacterKind::Npc => npcs.push(PlayerView::from(snapshot.clone())),
            }
        }

        let item_diff = report.ground_item_visibility.get(&player_id);
        let ground_items_to_load: Vec<GroundItemView> = item_diff
            .map(|d| d.appeared.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| report.ground_item_snapshots.get(id))
            .map(|item| GroundItemView { id: item.id, item_id: item.item_id.into(), count: item.count, position: item.position.into() })
            .collect();
        let ground_items_to_unload: Vec<i32> = item_diff.map(|d| d.disappeared.clone()).unwrap_or_default();

        if clients_to_load.is_empty()
            && clients_to_unload.is_empty()
            && npcs_to_load.is_empty()
            && npcs_to_unload.is_empty()
            && players.is_empty()
            && npcs.is_empty()
            && ground_items_to_load.is_empty()
            && ground_items_to_unload.is_empty()
        {
            continue;
        }

        registry.send(
            player_id,
            ServerMessage::State {
                clients_to_load,
                clients_to_unload,
                players,
                npcs_to_load,
                npcs_to_unload,
                npcs,
                ground_items_to_load,
                ground_items_to_unload,
            },
        );
    }

    for &id in registry.heartbeats.lock().iter() {
        registry.send(id, ServerMessage::Tick { time_of_day: report.tick_count });
    }

    for event in &report.events {
        if let WorldEvent::ChatMessage { sender_id, contents, timestamp } = event {
            registry.broadcast(ServerMessage::Chat { sender_id: *sender_id, contents: contents.clone(), timestamp: *timestamp });
        }
    }

    for &(_, player_id) in &report.logged_out_accounts {
        registry.send(player_id, ServerMessage::QuitPlayer { id: player_id });
        registry.unregister(player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_login_maps_to_already_logged_in() {
        let error = ConnectError::World(WorldError::DuplicateLogin(1));
        assert_eq!(error.code(), "ALREADY_LOGGED_IN");
    }

    #[test]
    fn world_full_maps_to_world_full_code() {
        let error = ConnectError::World(WorldError::WorldFull);
        assert_eq!(error.code(), "WORLD_FULL");
    }

    #[test]
    fn ban_maps_to_banned_code() {
        let error = ConnectError::Banned("griefing".to_string());
        assert_eq!(error.code(), "BANNED");
    }
}
