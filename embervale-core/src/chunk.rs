//! Chunk loading and the hot/warm/cold lifecycle.
//!
//! Chunk data is loaded from disk on demand; the `WorldError` plumbing
//! follows the convention of converting an `io::Error` into a domain error
//! rather than panicking.

use std::collections::HashMap;
use std::path::Path;

use embervale_content::terrain_file::{ChunkFile, WALKABILITY_CELLS_PER_AXIS};
use embervale_utils::grid::{walkability_index, ChunkKey, CHUNK_SIZE};

use crate::error::{WorldError, WorldResult};
use crate::zone::Zone;

/// How long a chunk with no players in range stays `Warm` (still simulated)
/// before dropping to `Cold` (unloaded).
pub const WARM_TO_COLD_TICKS: u64 = 200;

/// A chunk's position in the hot/warm/cold lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLifecycle {
    /// At least one player's visibility square currently covers this chunk.
    /// NPCs in this chunk run their full AI tick.
    Hot,
    /// No player covers this chunk right now, but it was hot recently
    /// enough to stay resident. NPCs here are not ticked, but their state
    /// is preserved in memory.
    Warm {
        /// The tick this chunk last transitioned out of `Hot`.
        went_warm_at_tick: u64,
    },
    /// Not resident. A cold chunk has no in-memory `Chunk` value at all;
    /// this variant exists only as a transient marker returned by
    /// lifecycle transition helpers.
    Cold,
}

/// One loaded terrain chunk: its static walkability grid plus the zones
/// rooted in it and the lifecycle state driving whether its NPCs tick.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// This chunk's grid coordinates.
    pub key: ChunkKey,
    /// Row-major walkability, `index = local_y * 16 + local_x`.
    pub walkability: Vec<bool>,
    /// Zones whose root chunk is this one.
    pub zones: Vec<Zone>,
    /// Current lifecycle state.
    pub lifecycle: ChunkLifecycle,
}

impl Chunk {
    /// Whether the world tile `(x, y)` — which must fall inside this
    /// chunk — is walkable.
    #[must_use]
    pub fn is_walkable_world_tile(&self, x: i32, y: i32) -> bool {
        let local_x = x.rem_euclid(CHUNK_SIZE);
        let local_y = y.rem_euclid(CHUNK_SIZE);
        walkability_index(local_x, local_y)
            .and_then(|i| self.walkability.get(i).copied())
            .unwrap_or(false)
    }

    /// Marks this chunk hot, clearing any warm-since bookkeeping.
    pub fn mark_hot(&mut self) {
        self.lifecycle = ChunkLifecycle::Hot;
    }

    /// Transitions a hot chunk to warm as of `tick`. No-op if already warm
    /// or cold.
    pub fn mark_warm(&mut self, tick: u64) {
        if matches!(self.lifecycle, ChunkLifecycle::Hot) {
            self.lifecycle = ChunkLifecycle::Warm { went_warm_at_tick: tick };
        }
    }

    /// Whether this chunk has been warm long enough to be unloaded.
    #[must_use]
    pub fn is_due_for_unload(&self, tick: u64) -> bool {
        match self.lifecycle {
            ChunkLifecycle::Warm { went_warm_at_tick } => {
                tick.saturating_sub(went_warm_at_tick) >= WARM_TO_COLD_TICKS
            }
            _ => false,
        }
    }
}

/// Loads terrain chunks on demand from `terrain_dir`, holding every chunk
/// it has ever loaded in memory (nothing here evicts a loaded [`Chunk`];
/// eviction is the tick orchestrator's job once a chunk goes `Cold`).
#[derive(Debug, Default)]
pub struct ChunkStore {
    loaded: HashMap<ChunkKey, Chunk>,
}

impl ChunkStore {
    /// An empty store with nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self { loaded: HashMap::new() }
    }

    /// Returns the chunk at `key`, loading it from `terrain_dir` first if
    /// it is not already resident.
    pub fn get_or_load(
        &mut self,
        key: ChunkKey,
        terrain_dir: &Path,
        missing_chunk_is_walkable: bool,
    ) -> WorldResult<&mut Chunk> {
        if !self.loaded.contains_key(&key) {
            let chunk = Self::load_from_disk(key, terrain_dir, missing_chunk_is_walkable)?;
            self.loaded.insert(key, chunk);
        }
        Ok(self.loaded.get_mut(&key).expect("just inserted"))
    }

    /// Returns the chunk at `key` if it is already resident, without
    /// touching disk.
    #[must_use]
    pub fn get(&self, key: ChunkKey) -> Option<&Chunk> {
        self.loaded.get(&key)
    }

    #[must_use]
    pub fn get_mut(&mut self, key: ChunkKey) -> Option<&mut Chunk> {
        self.loaded.get_mut(&key)
    }

    /// Drops a chunk from memory. Called once a chunk's lifecycle reaches
    /// `Cold`; any NPCs it held must have already been despawned or
    /// reassigned by the caller.
    pub fn unload(&mut self, key: ChunkKey) {
        self.loaded.remove(&key);
    }

    /// All currently resident chunk keys.
    pub fn resident_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.loaded.keys().copied()
    }

    fn load_from_disk(
        key: ChunkKey,
        terrain_dir: &Path,
        missing_chunk_is_walkable: bool,
    ) -> WorldResult<Chunk> {
        let path = terrain_dir.join(key.file_name());
        let file = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Chunk {
                    key,
                    walkability: vec![missing_chunk_is_walkable; WALKABILITY_CELLS_PER_AXIS * WALKABILITY_CELLS_PER_AXIS],
                    zones: Vec::new(),
                    lifecycle: ChunkLifecycle::Cold,
                });
            }
            Err(err) => return Err(WorldError::ChunkIo(key, err)),
        };

        let parsed: ChunkFile = serde_json::from_str(&file)
            .map_err(|err| WorldError::MalformedChunkFile(key, err.to_string()))?;
        if !parsed.is_well_formed() {
            return Err(WorldError::MalformedChunkFile(
                key,
                "heights/walkability array length mismatch".to_string(),
            ));
        }

        let zones = parsed
            .zones
            .into_iter()
            .map(|z| Zone::from_file_entry(key, z))
            .collect();

        Ok(Chunk {
            key,
            walkability: parsed.walkability,
            zones,
            lifecycle: ChunkLifecycle::Cold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_chunk_file(dir: &Path, key: ChunkKey, walkable_everywhere: bool) {
        let file = ChunkFile {
            heights: vec![0.0; 17 * 17],
            walkability: vec![walkable_everywhere; 16 * 16],
            zones: vec![],
        };
        let path = dir.join(key.file_name());
        let mut f = std::fs::File::create(path).expect("create");
        f.write_all(serde_json::to_string(&file).unwrap().as_bytes()).expect("write");
    }

    #[test]
    fn missing_chunk_falls_back_to_configured_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = ChunkStore::new();
        let key = ChunkKey { x: 0, y: 0 };

        let chunk = store.get_or_load(key, dir.path(), true).expect("load");
        assert!(chunk.walkability.iter().all(|w| *w));

        store.unload(key);
        let chunk = store.get_or_load(key, dir.path(), false).expect("load");
        assert!(chunk.walkability.iter().all(|w| !*w));
    }

    #[test]
    fn loads_a_real_chunk_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = ChunkKey { x: 2, y: -1 };
        write_chunk_file(dir.path(), key, true);

        let mut store = ChunkStore::new();
        let chunk = store.get_or_load(key, dir.path(), false).expect("load");
        assert_eq!(chunk.key, key);
        assert!(chunk.is_walkable_world_tile(key.x * 16, key.y * 16));
    }

    #[test]
    fn malformed_chunk_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = ChunkKey { x: 0, y: 0 };
        std::fs::write(dir.path().join(key.file_name()), "not json").expect("write");

        let mut store = ChunkStore::new();
        let result = store.get_or_load(key, dir.path(), true);
        assert!(matches!(result, Err(WorldError::MalformedChunkFile(_, _))));
    }

    #[test]
    fn warm_chunk_is_due_for_unload_after_threshold() {
        let mut chunk = Chunk {
            key: ChunkKey { x: 0, y: 0 },
            walkability: vec![true; 256],
            zones: vec![],
            lifecycle: ChunkLifecycle::Hot,
        };
        chunk.mark_warm(100);
        assert!(!chunk.is_due_for_unload(100 + WARM_TO_COLD_TICKS - 1));
        assert!(chunk.is_due_for_unload(100 + WARM_TO_COLD_TICKS));
    }
}
