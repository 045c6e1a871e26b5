//! Pure-function pathfinding.
//!
//! The pathfinder is a pure function of `(start, goal, walkability
//! provider)`; implementations must not mutate global state. Nothing in
//! this crate holds world state; both the tick task and ingress tasks
//! doing move-intent preprocessing may call it directly.
//!
//! Shaped as one successors-closure-style trait plus one `astar` free
//! function, reimplemented in-house rather than pulled in as a dependency
//! since the zone/walkability rules need a grid-specific successors
//! function anyway.

pub mod astar;
pub mod greedy;

pub use astar::astar;
pub use greedy::{greedy_step, Step};

/// A pure query surface over a walkability grid. Implementors own no state
/// that changes as a result of being queried.
pub trait WalkabilityGrid {
    /// Whether the tile at `(x, y)` may be stepped onto.
    fn is_walkable(&self, x: i32, y: i32) -> bool;
}

/// A `WalkabilityGrid` backed by a closure, for tests and ad-hoc callers.
impl<F: Fn(i32, i32) -> bool> WalkabilityGrid for F {
    fn is_walkable(&self, x: i32, y: i32) -> bool {
        self(x, y)
    }
}
