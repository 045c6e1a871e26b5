//! Wrapping id allocators.
//!
//! NPC instance ids wrap at 100,000 and never reuse 0; ground-item uids
//! wrap at `i32::MAX`. An id still referenced by a live `targeted_by`
//! pointer must never be handed back out — callers pass an `is_live`
//! predicate into [`WrappingIdPool::next`] so the allocator can skip over
//! any id that's still in use.

/// A monotonic id counter that wraps back to its floor once it reaches its
/// ceiling, skipping any id a caller-supplied predicate reports as still in
/// use.
#[derive(Debug, Clone)]
pub struct WrappingIdPool {
    current: i32,
    floor: i32,
    /// Exclusive upper bound; the next id after `ceiling - 1` wraps to `floor`.
    ceiling: i32,
}

impl WrappingIdPool {
    /// Creates a pool that hands out ids in `[floor, ceiling)`, wrapping
    /// around once it reaches the ceiling.
    ///
    /// # Panics
    /// Panics if `floor >= ceiling`.
    #[must_use]
    pub fn new(floor: i32, ceiling: i32) -> Self {
        assert!(floor < ceiling, "id pool range must be non-empty");
        Self {
            current: floor,
            floor,
            ceiling,
        }
    }

    /// The pool used for server-controlled actor instance ids: wraps at
    /// 100,000, never yields 0 (0 is reserved to mean "no target").
    #[must_use]
    pub fn npc_instance_ids() -> Self {
        Self::new(1, 100_000)
    }

    /// The pool used for ground-item instance uids: wraps at `i32::MAX`.
    #[must_use]
    pub fn ground_item_ids() -> Self {
        Self::new(1, i32::MAX)
    }

    /// The pool used for connected player character ids: a disjoint band
    /// above the NPC range so a player and an NPC can never collide in the
    /// same `CharacterId` namespace.
    #[must_use]
    pub fn player_instance_ids() -> Self {
        Self::new(100_000, 1_000_000)
    }

    /// Allocates the next id not reported live by `is_live`.
    ///
    /// Scans at most one full lap of the range; if every id in range is
    /// live (pool exhausted) returns `None` rather than reusing a live id.
    pub fn next(&mut self, is_live: impl Fn(i32) -> bool) -> Option<i32> {
        let span = self.ceiling - self.floor;
        for _ in 0..span {
            let candidate = self.current;
            self.current = if self.current + 1 >= self.ceiling {
                self.floor
            } else {
                self.current + 1
            };
            if !is_live(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequentially() {
        let mut pool = WrappingIdPool::new(1, 5);
        assert_eq!(pool.next(|_| false), Some(1));
        assert_eq!(pool.next(|_| false), Some(2));
        assert_eq!(pool.next(|_| false), Some(3));
        assert_eq!(pool.next(|_| false), Some(4));
        assert_eq!(pool.next(|_| false), Some(1));
    }

    #[test]
    fn never_reuses_a_live_id() {
        let mut pool = WrappingIdPool::new(1, 4);
        assert_eq!(pool.next(|_| false), Some(1));
        assert_eq!(pool.next(|_| false), Some(2));
        // id 3 is still "live" (e.g. still referenced by a targeted_by set);
        // the pool must skip it and wrap around to 1 instead of handing it out.
        assert_eq!(pool.next(|id| id == 3), Some(1));
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let mut pool = WrappingIdPool::new(1, 3);
        assert_eq!(pool.next(|_| true), None);
    }

    #[test]
    fn npc_pool_never_yields_zero() {
        let mut pool = WrappingIdPool::npc_instance_ids();
        for _ in 0..10 {
            assert_ne!(pool.next(|_| false), Some(0));
        }
    }
}
