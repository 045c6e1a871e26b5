//! Terrain chunk file format.
//!
//! `chunk_<X>_<Y>.json` with fields `heights: float[17*17]`, `walkability:
//! bool[16*16]` (row-major, `index = y*16 + x`), optional `zones: [ { id,
//! minX, minY, maxX, maxY, npcType, maxCount } ]`.

use serde::{Deserialize, Serialize};

/// Number of height samples per axis: one more than the tile grid so
/// heights can be interpolated at tile corners.
pub const HEIGHT_SAMPLES_PER_AXIS: usize = 17;
/// Number of walkability cells per axis.
pub const WALKABILITY_CELLS_PER_AXIS: usize = 16;

/// A zone definition as it appears embedded in its root chunk's file.
///
/// `respawn_seconds` is included with a sensible default so terrain files
/// missing the field still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneFileEntry {
    /// Zone id, unique within its root chunk.
    pub id: i32,
    /// Rectangle min X (world tile coordinates).
    #[serde(rename = "minX")]
    pub min_x: i32,
    /// Rectangle min Y.
    #[serde(rename = "minY")]
    pub min_y: i32,
    /// Rectangle max X.
    #[serde(rename = "maxX")]
    pub max_x: i32,
    /// Rectangle max Y.
    #[serde(rename = "maxY")]
    pub max_y: i32,
    /// Actor type spawned in this zone.
    #[serde(rename = "npcType")]
    pub npc_type: i32,
    /// Maximum simultaneous live actors in this zone.
    #[serde(rename = "maxCount")]
    pub max_count: u32,
    /// Seconds between a death in this zone and that actor's respawn.
    #[serde(default = "default_respawn_seconds")]
    pub respawn_seconds: u32,
}

const fn default_respawn_seconds() -> u32 {
    30
}

/// The on-disk shape of one terrain chunk file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFile {
    /// Height samples, row-major, `17*17` entries.
    pub heights: Vec<f32>,
    /// Walkability flags, row-major, `16*16` entries
    /// (`index = local_y * 16 + local_x`).
    pub walkability: Vec<bool>,
    /// Zones rooted at this chunk, if any.
    #[serde(default)]
    pub zones: Vec<ZoneFileEntry>,
}

impl ChunkFile {
    /// Whether this file's `heights`/`walkability` arrays have the expected
    /// lengths for a well-formed chunk.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.heights.len() == HEIGHT_SAMPLES_PER_AXIS * HEIGHT_SAMPLES_PER_AXIS
            && self.walkability.len() == WALKABILITY_CELLS_PER_AXIS * WALKABILITY_CELLS_PER_AXIS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let file = ChunkFile {
            heights: vec![0.0; HEIGHT_SAMPLES_PER_AXIS * HEIGHT_SAMPLES_PER_AXIS],
            walkability: vec![true; WALKABILITY_CELLS_PER_AXIS * WALKABILITY_CELLS_PER_AXIS],
            zones: vec![ZoneFileEntry {
                id: 1,
                min_x: 0,
                min_y: 0,
                max_x: 15,
                max_y: 15,
                npc_type: 3,
                max_count: 2,
                respawn_seconds: 45,
            }],
        };
        let json = serde_json::to_string(&file).expect("serialize");
        let back: ChunkFile = serde_json::from_str(&json).expect("deserialize");
        assert!(back.is_well_formed());
        assert_eq!(back.zones[0].respawn_seconds, 45);
    }

    #[test]
    fn zone_without_respawn_seconds_gets_default() {
        let json = r#"{
            "heights": [],
            "walkability": [],
            "zones": [{"id":1,"minX":0,"minY":0,"maxX":1,"maxY":1,"npcType":1,"maxCount":1}]
        }"#;
        let file: ChunkFile = serde_json::from_str(json).expect("deserialize");
        assert_eq!(file.zones[0].respawn_seconds, 30);
    }
}
