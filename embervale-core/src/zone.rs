//! NPC spawn zones.
//!
//! A zone is a rectangle of tiles, rooted at the chunk its terrain file was
//! loaded from, that maintains up to `max_count` live NPCs of one type and
//! respawns them `respawn_seconds` after each death.

use embervale_content::terrain_file::ZoneFileEntry;
use embervale_content::NpcTypeId;
use embervale_utils::grid::ChunkKey;
use smallvec::SmallVec;

use crate::character::CharacterId;

/// One NPC spawn zone.
#[derive(Debug, Clone)]
pub struct Zone {
    /// Zone id, unique within its root chunk.
    pub id: i32,
    /// The chunk this zone's terrain file entry was loaded from.
    pub root_chunk: ChunkKey,
    /// Inclusive rectangle bounds, in world tile coordinates.
    pub min: (i32, i32),
    /// Inclusive rectangle bounds, in world tile coordinates.
    pub max: (i32, i32),
    /// The NPC type spawned in this zone.
    pub npc_type_id: NpcTypeId,
    /// Maximum simultaneous live NPCs.
    pub max_count: u32,
    /// Ticks between an NPC's death and its respawn.
    pub respawn_ticks: u64,
    /// NPC instance ids currently alive and belonging to this zone.
    pub live_npc_ids: SmallVec<[CharacterId; 8]>,
}

impl Zone {
    /// Builds a `Zone` from its on-disk representation, rooted at the
    /// chunk it was read from.
    #[must_use]
    pub fn from_file_entry(root_chunk: ChunkKey, entry: ZoneFileEntry) -> Self {
        Self {
            id: entry.id,
            root_chunk,
            min: (entry.min_x, entry.min_y),
            max: (entry.max_x, entry.max_y),
            npc_type_id: entry.npc_type,
            max_count: entry.max_count,
            respawn_ticks: u64::from(entry.respawn_seconds) * 2, // 500ms ticks.
            live_npc_ids: SmallVec::new(),
        }
    }

    /// Whether `(x, y)` falls inside this zone's rectangle, inclusive.
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min.0 && x <= self.max.0 && y >= self.min.1 && y <= self.max.1
    }

    /// Number of additional NPCs this zone may spawn right now.
    #[must_use]
    pub fn open_slots(&self) -> u32 {
        self.max_count.saturating_sub(self.live_npc_ids.len() as u32)
    }

    /// A uniformly random walkable-looking tile inside the zone rectangle.
    /// Callers are responsible for walkability checks; this only samples
    /// the rectangle's coordinate space.
    pub fn random_tile(&self, rng: &mut impl rand::Rng) -> (i32, i32) {
        let x = rng.gen_range(self.min.0..=self.max.0);
        let y = rng.gen_range(self.min.1..=self.max.1);
        (x, y)
    }

    /// Records a newly spawned NPC as belonging to this zone.
    pub fn record_spawn(&mut self, npc_id: CharacterId) {
        self.live_npc_ids.push(npc_id);
    }

    /// Removes an NPC from this zone's live roster, e.g. on death.
    pub fn record_despawn(&mut self, npc_id: CharacterId) {
        self.live_npc_ids.retain(|id| *id != npc_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> ZoneFileEntry {
        ZoneFileEntry {
            id: 1,
            min_x: 0,
            min_y: 0,
            max_x: 4,
            max_y: 4,
            npc_type: 7,
            max_count: 3,
            respawn_seconds: 10,
        }
    }

    #[test]
    fn respawn_seconds_converts_to_half_second_ticks() {
        let zone = Zone::from_file_entry(ChunkKey { x: 0, y: 0 }, sample_entry());
        assert_eq!(zone.respawn_ticks, 20);
    }

    #[test]
    fn open_slots_tracks_live_roster() {
        let mut zone = Zone::from_file_entry(ChunkKey { x: 0, y: 0 }, sample_entry());
        assert_eq!(zone.open_slots(), 3);
        zone.record_spawn(101);
        zone.record_spawn(102);
        assert_eq!(zone.open_slots(), 1);
        zone.record_despawn(101);
        assert_eq!(zone.open_slots(), 2);
    }

    #[test]
    fn contains_is_inclusive_of_bounds() {
        let zone = Zone::from_file_entry(ChunkKey { x: 0, y: 0 }, sample_entry());
        assert!(zone.contains(0, 0));
        assert!(zone.contains(4, 4));
        assert!(!zone.contains(5, 4));
        assert!(!zone.contains(-1, 0));
    }
}
