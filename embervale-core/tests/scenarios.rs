//! End-to-end scenarios driving a `World` directly, tick by tick, the way
//! the tick task itself would: submit `ControlMessage`s and `Intent`s over
//! plain channels, call `tick()`, and assert on the resulting
//! `TickReport`s. No network or persistence layer involved.

use std::path::Path;
use std::sync::Arc;

use embervale_content::terrain_file::{ChunkFile, ZoneFileEntry};
use embervale_content::drop_table::WeightedDropEntry;
use embervale_content::{DropEntry, DropTable, DropTableRegistry, ItemRegistry, NpcTypeDef, NpcTypeRegistry};
use embervale_core::character::PLAYER_ATTACK_COOLDOWN_TICKS;
use embervale_core::config::WorldConfig;
use embervale_core::tick::{
    CharacterSnapshot, ConnectOutcome, ConnectRequest, ControlMessage, Intent, NewPlayerSpec, World, WorldEvent,
    PLAYER_RESPAWN_DELAY_TICKS,
};
use embervale_core::WorldResult;
use embervale_utils::grid::ChunkKey;

fn empty_world(dir: &Path) -> (World, crossbeam::channel::Sender<ControlMessage>) {
    let config = Arc::new(WorldConfig::with_terrain_dir(dir));
    World::new(
        config,
        Arc::new(NpcTypeRegistry::new(Vec::new())),
        Arc::new(ItemRegistry::new(Vec::new())),
        Arc::new(DropTableRegistry::new(Vec::new())),
        42,
    )
}

fn new_player_spec(position: (i32, i32)) -> NewPlayerSpec {
    NewPlayerSpec { name: "tester".to_string(), position, max_health: 10, visibility_radius: 1 }
}

type ConnectReply = tokio::sync::oneshot::Receiver<WorldResult<(CharacterSnapshot, ConnectOutcome)>>;

fn submit_connect(
    control_tx: &crossbeam::channel::Sender<ControlMessage>,
    account_id: i64,
    spec: NewPlayerSpec,
) -> (ConnectReply, crossbeam::channel::Sender<Intent>) {
    let (mailbox_tx, mailbox_rx) = crossbeam::channel::unbounded();
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    control_tx
        .send(ControlMessage::Connect { account_id, request: ConnectRequest::New(spec), mailbox: mailbox_rx, reply: reply_tx })
        .expect("world task still draining its control channel");
    (reply_rx, mailbox_tx)
}

fn resolve(reply: ConnectReply) -> (CharacterSnapshot, ConnectOutcome) {
    reply.try_recv().expect("tick() drained the reply").expect("connect accepted")
}

#[test]
fn connecting_spawns_a_player_at_full_health_with_no_visibility_peers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut world, control_tx) = empty_world(dir.path());
    let (reply, _mailbox) = submit_connect(&control_tx, 1, new_player_spec((5, 5)));

    let report = world.tick();
    let (snapshot, outcome) = resolve(reply);

    assert_eq!(outcome, ConnectOutcome::New);
    assert_eq!(snapshot.position, (5, 5));
    assert_eq!(snapshot.health, 10);
    assert_eq!(snapshot.max_health, 10);
    assert!(report.visibility.is_empty(), "a lone player has nothing to see appear");
    assert_eq!(report.tick_count, 1);
}

#[test]
fn two_players_within_radius_see_each_other_appear_on_the_same_tick() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut world, control_tx) = empty_world(dir.path());
    let (reply_a, _mailbox_a) = submit_connect(&control_tx, 1, new_player_spec((0, 0)));
    let (reply_b, _mailbox_b) = submit_connect(&control_tx, 2, new_player_spec((1, 1)));

    let report = world.tick();
    let (a, _) = resolve(reply_a);
    let (b, _) = resolve(reply_b);

    let diff_a = report.visibility.get(&a.id).expect("a should see b appear");
    assert_eq!(diff_a.appeared, vec![b.id]);
    assert!(diff_a.disappeared.is_empty());

    let diff_b = report.visibility.get(&b.id).expect("b should see a appear");
    assert_eq!(diff_b.appeared, vec![a.id]);
}

#[test]
fn player_out_of_radius_stays_invisible() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut world, control_tx) = empty_world(dir.path());
    let (reply_a, _mailbox_a) = submit_connect(&control_tx, 1, new_player_spec((0, 0)));
    // Several chunks away: well outside even the chunk-square visibility
    // radius's 3x3 chunk neighborhood.
    let (reply_b, _mailbox_b) = submit_connect(&control_tx, 2, new_player_spec((50, 50)));

    let report = world.tick();
    let (a, _) = resolve(reply_a);
    let (b, _) = resolve(reply_b);

    assert!(report.visibility.get(&a.id).is_none());
    assert!(report.visibility.get(&b.id).is_none());
}

#[test]
fn players_in_different_chunks_of_the_same_visibility_square_see_each_other() {
    // Visibility is a (2R+1)x(2R+1) square of *chunks*, not a tile-distance
    // check: these two players are 12 tiles apart (outside a radius-1 tile
    // square) but their chunks are adjacent, so they should still appear to
    // each other.
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut world, control_tx) = empty_world(dir.path());
    let (reply_a, _mailbox_a) = submit_connect(&control_tx, 1, new_player_spec((0, 0)));
    let (reply_b, _mailbox_b) = submit_connect(&control_tx, 2, new_player_spec((12, 12)));

    let report = world.tick();
    let (a, _) = resolve(reply_a);
    let (b, _) = resolve(reply_b);

    let diff_a = report.visibility.get(&a.id).expect("a should see b appear despite the tile distance");
    assert_eq!(diff_a.appeared, vec![b.id]);
}

#[test]
fn player_moves_one_tile_per_tick_toward_destination_and_stops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut world, control_tx) = empty_world(dir.path());
    let (reply, mailbox_tx) = submit_connect(&control_tx, 1, new_player_spec((0, 0)));
    world.tick();
    let (player, _) = resolve(reply);

    mailbox_tx.send(Intent::Move { destination: (3, 0) }).expect("mailbox open");

    let mut positions = Vec::new();
    for _ in 0..4 {
        let report = world.tick();
        positions.push(report.character_snapshots[&player.id].position);
    }

    assert_eq!(positions, vec![(1, 0), (2, 0), (3, 0), (3, 0)]);
}

#[test]
fn attacking_an_adjacent_player_to_death_schedules_a_respawn_after_the_delay() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut world, control_tx) = empty_world(dir.path());
    let (reply_attacker, attacker_mailbox) = submit_connect(&control_tx, 1, new_player_spec((0, 0)));
    let (reply_defender, _defender_mailbox) = submit_connect(&control_tx, 2, new_player_spec((1, 0)));
    world.tick();
    let (attacker, _) = resolve(reply_attacker);
    let (defender, _) = resolve(reply_defender);

    attacker_mailbox.send(Intent::Attack { target: defender.id }).expect("mailbox open");

    let mut died_tick = None;
    // The attacker only lands a hit every PLAYER_ATTACK_COOLDOWN_TICKS
    // ticks, so give this far more room than the old uncapped cadence did.
    for _ in 0..300 {
        let report = world.tick();
        let died = report.events.iter().any(|e| matches!(e, WorldEvent::CharacterDied { id, .. } if *id == defender.id));
        if died {
            died_tick = Some(report.tick_count);
            break;
        }
    }
    let died_tick = died_tick.expect("the defender should die within 300 attack ticks");

    let mut respawned_at = None;
    for _ in 0..PLAYER_RESPAWN_DELAY_TICKS {
        let report = world.tick();
        let respawned = report.events.iter().any(|e| {
            matches!(e, WorldEvent::CharacterRespawned { id, position } if *id == defender.id && *position == (1, 0))
        });
        if respawned {
            respawned_at = Some(report.tick_count);
        }
    }

    assert_eq!(respawned_at, Some(died_tick + PLAYER_RESPAWN_DELAY_TICKS));
}

fn write_single_zone_chunk(dir: &Path, key: ChunkKey, zone: ZoneFileEntry) {
    let file = ChunkFile { heights: vec![0.0; 17 * 17], walkability: vec![true; 16 * 16], zones: vec![zone] };
    std::fs::write(dir.join(key.file_name()), serde_json::to_string(&file).expect("serialize")).expect("write chunk file");
}

#[test]
fn a_players_chunk_going_hot_spawns_its_zone_npcs_up_to_capacity() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_single_zone_chunk(
        dir.path(),
        ChunkKey { x: 0, y: 0 },
        ZoneFileEntry { id: 1, min_x: 1, min_y: 1, max_x: 1, max_y: 1, npc_type: 7, max_count: 1, respawn_seconds: 30 },
    );

    let npc_types = vec![NpcTypeDef {
        id: 7,
        name: "training dummy".to_string(),
        health_base: 5,
        attack_cooldown_ticks: 4,
        aggro_range: 0.0,
        is_aggressive: false,
        drop_table_id: 0,
    }];
    let config = Arc::new(WorldConfig::with_terrain_dir(dir.path()));
    let (mut world, control_tx) = World::new(
        config,
        Arc::new(NpcTypeRegistry::new(npc_types)),
        Arc::new(ItemRegistry::new(Vec::new())),
        Arc::new(DropTableRegistry::new(Vec::new())),
        7,
    );

    let (reply, _mailbox) = submit_connect(&control_tx, 1, new_player_spec((1, 1)));
    let report = world.tick();
    let (player, _) = resolve(reply);

    let npc_id = report
        .character_snapshots
        .keys()
        .copied()
        .find(|id| *id != player.id)
        .expect("the zone's single slot should have been filled by the time the chunk went hot");
    let npc = &report.character_snapshots[&npc_id];
    assert_eq!(npc.position, (1, 1));
    assert_eq!(npc.max_health, 5);

    // The zone only had room for one; a second tick must not spawn another.
    let report = world.tick();
    let npc_count = report.character_snapshots.len() - 1; // minus the player itself
    assert_eq!(npc_count, 1, "zone capacity of 1 must not be exceeded");
}

#[test]
fn player_attacks_are_throttled_to_the_cooldown_cadence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut world, control_tx) = empty_world(dir.path());
    let (reply_attacker, attacker_mailbox) = submit_connect(&control_tx, 1, new_player_spec((0, 0)));
    // A generous health pool so the defender survives the whole window
    // regardless of how the damage rolls land.
    let defender_spec = NewPlayerSpec { name: "tester".to_string(), position: (1, 0), max_health: 1000, visibility_radius: 1 };
    let (reply_defender, _defender_mailbox) = submit_connect(&control_tx, 2, defender_spec);
    world.tick();
    let (attacker, _) = resolve(reply_attacker);
    let (defender, _) = resolve(reply_defender);

    attacker_mailbox.send(Intent::Attack { target: defender.id }).expect("mailbox open");

    let mut attack_ticks = Vec::new();
    for _ in 0..9 {
        let report = world.tick();
        let attacked = report.events.iter().any(|e| {
            matches!(e, WorldEvent::DamageDealt { attacker_id, defender_id, .. } if *attacker_id == attacker.id && *defender_id == defender.id)
        });
        if attacked {
            attack_ticks.push(report.tick_count);
        }
    }

    assert_eq!(attack_ticks.len(), 3, "one attack should land every cooldown window over 9 ticks");
    for pair in attack_ticks.windows(2) {
        assert_eq!(pair[1] - pair[0], u64::from(PLAYER_ATTACK_COOLDOWN_TICKS));
    }
}

#[test]
fn npc_loot_is_reserved_for_the_killer_before_becoming_public() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_single_zone_chunk(
        dir.path(),
        ChunkKey { x: 0, y: 0 },
        ZoneFileEntry { id: 1, min_x: 1, min_y: 1, max_x: 1, max_y: 1, npc_type: 7, max_count: 1, respawn_seconds: 30 },
    );

    let npc_types = vec![NpcTypeDef {
        id: 7,
        name: "training dummy".to_string(),
        health_base: 1,
        attack_cooldown_ticks: 4,
        aggro_range: 0.0,
        is_aggressive: false,
        drop_table_id: 1,
    }];
    let drop_tables = vec![DropTable {
        id: 1,
        entries: vec![WeightedDropEntry { entry: DropEntry::Item { item_id: 42, min: 1, max: 1 }, weight: 1 }],
        tertiary: Vec::new(),
    }];
    let config = Arc::new(WorldConfig::with_terrain_dir(dir.path()));
    let (mut world, control_tx) = World::new(
        config,
        Arc::new(NpcTypeRegistry::new(npc_types)),
        Arc::new(ItemRegistry::new(Vec::new())),
        Arc::new(DropTableRegistry::new(drop_tables)),
        11,
    );

    let (reply_killer, killer_mailbox) = submit_connect(&control_tx, 1, new_player_spec((1, 1)));
    let (reply_bystander, _bystander_mailbox) = submit_connect(&control_tx, 2, new_player_spec((1, 2)));
    let report = world.tick();
    let (killer, _) = resolve(reply_killer);
    let (bystander, _) = resolve(reply_bystander);

    let npc_id = report
        .character_snapshots
        .keys()
        .copied()
        .find(|id| *id != killer.id && *id != bystander.id)
        .expect("the zone's npc should have spawned");

    killer_mailbox.send(Intent::Attack { target: npc_id }).expect("mailbox open");

    // Run until the npc dies and drops loot; on that very tick, the killer
    // must see it appear and the bystander (same chunk, one tile away) must
    // not, since it starts out reserved.
    let mut item_id = None;
    for _ in 0..20 {
        let report = world.tick();
        let dropped = report.events.iter().find_map(|event| match event {
            WorldEvent::ItemDropped(item) => Some(item.id),
            _ => None,
        });
        if let Some(id) = dropped {
            assert!(
                report.ground_item_visibility.get(&killer.id).is_some_and(|d| d.appeared.contains(&id)),
                "the killer should see their own reserved drop appear immediately"
            );
            assert!(
                !report.ground_item_visibility.get(&bystander.id).is_some_and(|d| d.appeared.contains(&id)),
                "loot reserved for the killer must not appear to a bystander yet"
            );
            item_id = Some(id);
            break;
        }
    }
    let item_id = item_id.expect("the npc should have died and dropped loot within 20 ticks");

    let mut bystander_saw_it = false;
    for _ in 0..(embervale_core::tick::LOOT_RESERVATION_TICKS + 2) {
        let report = world.tick();
        if report.ground_item_visibility.get(&bystander.id).is_some_and(|d| d.appeared.contains(&item_id)) {
            bystander_saw_it = true;
            break;
        }
    }
    assert!(bystander_saw_it, "loot should become visible to everyone once the reservation window lapses");
}
