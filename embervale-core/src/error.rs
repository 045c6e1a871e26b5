//! World-layer error type.
//!
//! One `thiserror` enum per crate, rather than one error type shared
//! across the whole workspace.

use embervale_utils::grid::ChunkKey;

/// Everything that can go wrong inside a running world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A terrain file on disk failed to parse or had malformed dimensions.
    #[error("chunk {0:?} terrain file is malformed: {1}")]
    MalformedChunkFile(ChunkKey, String),

    /// A terrain file's `io::Error` while loading a chunk from disk.
    #[error("chunk {0:?} could not be read: {1}")]
    ChunkIo(ChunkKey, #[source] std::io::Error),

    /// A move, attack, or other intent referenced a character id that is
    /// not present in the world.
    #[error("unknown character id {0}")]
    UnknownCharacter(i32),

    /// A zone referenced an NPC type id absent from the content registry.
    #[error("zone {zone_id} references unknown npc type {npc_type_id}")]
    UnknownNpcType {
        /// The zone that referenced the missing type.
        zone_id: i32,
        /// The npc type id that could not be resolved.
        npc_type_id: i32,
    },

    /// The NPC instance id pool is exhausted; no new NPC can be spawned
    /// this tick.
    #[error("npc instance id pool exhausted")]
    NpcIdPoolExhausted,

    /// A session operation was attempted against a player not currently
    /// tracked by the session table.
    #[error("no session for player {0}")]
    UnknownSession(i32),

    /// A duplicate login was attempted while an existing session is still
    /// `Connected` or within its reclaim window.
    #[error("player {0} is already connected")]
    DuplicateLogin(i32),

    /// A new login was refused because the world is already at
    /// `WorldConfig::max_players`.
    #[error("world is at capacity")]
    WorldFull,
}

/// Convenience alias for fallible world operations.
pub type WorldResult<T> = Result<T, WorldError>;
