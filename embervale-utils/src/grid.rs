//! Chunk-coordinate math.
//!
//! A chunk is a 16x16 tile rectangle. World tile `(0, 0)` is *not* the
//! corner of chunk `(0, 0)` — chunks are offset by 8 tiles so that the
//! origin sits near the middle of its chunk.

/// Width and height, in tiles, of one terrain chunk.
pub const CHUNK_SIZE: i32 = 16;

/// Identifies one terrain chunk by its chunk-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    /// Chunk-space X coordinate.
    pub x: i32,
    /// Chunk-space Y coordinate.
    pub y: i32,
}

impl ChunkKey {
    /// Creates a new chunk key.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The chunk containing the given world tile position.
    #[must_use]
    pub fn from_world(world_x: i32, world_y: i32) -> Self {
        Self::new(world_to_chunk(world_x), world_to_chunk(world_y))
    }

    /// Returns the file name this chunk is persisted under, e.g.
    /// `chunk_3_-1.json`.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("chunk_{}_{}.json", self.x, self.y)
    }

    /// All chunk keys in the `(2r+1)x(2r+1)` square centered on this chunk.
    #[must_use]
    pub fn visibility_square(self, radius: i32) -> Vec<ChunkKey> {
        let mut keys = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                keys.push(ChunkKey::new(self.x + dx, self.y + dy));
            }
        }
        keys
    }
}

/// Converts one world-tile axis coordinate into the containing chunk's
/// coordinate on that axis: `floor((world + 8) / 16)`.
#[must_use]
pub fn world_to_chunk(world: i32) -> i32 {
    (world + 8).div_euclid(CHUNK_SIZE)
}

/// Converts one world-tile axis coordinate into its local (within-chunk)
/// coordinate on that axis, normalized into `[0, 16)`.
#[must_use]
pub fn world_to_local(world: i32) -> i32 {
    (world + 8).rem_euclid(CHUNK_SIZE)
}

/// Converts a world tile position into `(chunk, local)` pairs for both axes.
#[must_use]
pub fn world_to_chunk_local(world_x: i32, world_y: i32) -> (ChunkKey, i32, i32) {
    (
        ChunkKey::from_world(world_x, world_y),
        world_to_local(world_x),
        world_to_local(world_y),
    )
}

/// Row-major index into a 16x16 walkability grid: `local_y * 16 + local_x`.
///
/// Returns `None` if either local coordinate is out of `[0, 16)`.
#[must_use]
pub fn walkability_index(local_x: i32, local_y: i32) -> Option<usize> {
    if !(0..CHUNK_SIZE).contains(&local_x) || !(0..CHUNK_SIZE).contains(&local_y) {
        return None;
    }
    Some((local_y * CHUNK_SIZE + local_x) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_chunk_contains_origin() {
        // world (0,0) -> shifted (8,8) -> chunk (0,0), local (8,8)
        assert_eq!(world_to_chunk(0), 0);
        assert_eq!(world_to_local(0), 8);
    }

    #[test]
    fn negative_world_coords_floor_correctly() {
        // world -9 -> shifted -1 -> floor(-1/16) = -1
        assert_eq!(world_to_chunk(-9), -1);
        // local = (-1).rem_euclid(16) = 15
        assert_eq!(world_to_local(-9), 15);
    }

    #[test]
    fn chunk_boundary_is_exclusive_on_local() {
        // world 8 -> shifted 16 -> chunk 1, local 0
        assert_eq!(world_to_chunk(8), 1);
        assert_eq!(world_to_local(8), 0);
        // world 7 -> shifted 15 -> chunk 0, local 15
        assert_eq!(world_to_chunk(7), 0);
        assert_eq!(world_to_local(7), 15);
    }

    #[test]
    fn visibility_square_has_correct_size_and_center() {
        let center = ChunkKey::new(5, 5);
        let square = center.visibility_square(1);
        assert_eq!(square.len(), 9);
        assert!(square.contains(&center));
        assert!(square.contains(&ChunkKey::new(4, 4)));
        assert!(square.contains(&ChunkKey::new(6, 6)));
        assert!(!square.contains(&ChunkKey::new(7, 5)));
    }

    #[test]
    fn walkability_index_row_major() {
        assert_eq!(walkability_index(0, 0), Some(0));
        assert_eq!(walkability_index(1, 0), Some(1));
        assert_eq!(walkability_index(0, 1), Some(16));
        assert_eq!(walkability_index(16, 0), None);
        assert_eq!(walkability_index(-1, 0), None);
    }
}
