//! NPC idle/aggro/pursue state machine.
//!
//! Kept as a set of pure functions over explicit state, the way
//! `embervale-path` is a pure function of `(start, goal, grid)`: nothing
//! here reaches into `World` directly, so the tick orchestrator's NPC
//! movement phase stays the only place that reads and writes live world
//! state, and this logic is exercised directly in unit tests without
//! constructing a `World`.

use embervale_path::{greedy_step, Step, WalkabilityGrid};
use embervale_utils::geometry::chebyshev_distance;

use crate::character::CharacterId;

/// An NPC's behavioral mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    /// Standing at or near its spawn tile, watching for a target to
    /// aggro onto.
    Idle,
    /// Actively pursuing `target_id`.
    Pursuing {
        /// The character currently being chased.
        target_id: CharacterId,
    },
    /// Lost its target (out of leash range, target died, or target
    /// disappeared) and is walking back toward `spawn_position`.
    Returning,
}

/// The result of one AI decision: where the NPC should move this tick, if
/// anywhere, and what state it should carry into the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiDecision {
    /// The new state to store on the NPC.
    pub next_state: AiState,
    /// A single-tile move to make this tick, if any.
    pub step: Option<(i32, i32)>,
}

/// Maximum Chebyshev distance from `spawn_position` an NPC will chase a
/// target before giving up and returning home.
pub const LEASH_RANGE: i32 = 10;

/// Decides one tick's worth of NPC behavior.
///
/// `nearest_aggro_candidate` is the id and position of the closest living
/// player within `aggro_range` of `position`, if any (the caller computes
/// this via the chunk's hot-player index; it is not this function's job to
/// search the world).
#[allow(clippy::too_many_arguments)]
pub fn decide(
    state: AiState,
    position: (i32, i32),
    spawn_position: (i32, i32),
    is_aggressive: bool,
    aggro_range: i32,
    nearest_aggro_candidate: Option<(CharacterId, (i32, i32))>,
    current_target: Option<(CharacterId, (i32, i32))>,
    grid: &impl WalkabilityGrid,
) -> AiDecision {
    match state {
        AiState::Idle => {
            if is_aggressive {
                if let Some((id, target_pos)) = nearest_aggro_candidate {
                    if chebyshev_distance(position, target_pos) <= aggro_range {
                        return pursue(id, position, target_pos, grid);
                    }
                }
            }
            AiDecision { next_state: AiState::Idle, step: None }
        }
        AiState::Pursuing { target_id } => {
            let Some((id, target_pos)) = current_target.filter(|(id, _)| *id == target_id) else {
                return head_home(position, spawn_position, grid);
            };
            if chebyshev_distance(spawn_position, position) > LEASH_RANGE {
                return head_home(position, spawn_position, grid);
            }
            pursue(id, position, target_pos, grid)
        }
        AiState::Returning => {
            if position == spawn_position {
                return AiDecision { next_state: AiState::Idle, step: None };
            }
            head_home(position, spawn_position, grid)
        }
    }
}

fn pursue(target_id: CharacterId, position: (i32, i32), target_pos: (i32, i32), grid: &impl WalkabilityGrid) -> AiDecision {
    let step = match greedy_step(position, target_pos, grid) {
        Step::Move(next) => Some(next),
        Step::NoMove => None,
    };
    AiDecision { next_state: AiState::Pursuing { target_id }, step }
}

fn head_home(position: (i32, i32), spawn_position: (i32, i32), grid: &impl WalkabilityGrid) -> AiDecision {
    let step = match greedy_step(position, spawn_position, grid) {
        Step::Move(next) => Some(next),
        Step::NoMove => None,
    };
    AiDecision { next_state: AiState::Returning, step }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_walkable(_x: i32, _y: i32) -> bool {
        true
    }

    #[test]
    fn idle_non_aggressive_npc_never_engages() {
        let decision = decide(
            AiState::Idle,
            (0, 0),
            (0, 0),
            false,
            5,
            Some((42, (1, 0))),
            None,
            &all_walkable,
        );
        assert_eq!(decision.next_state, AiState::Idle);
        assert_eq!(decision.step, None);
    }

    #[test]
    fn idle_aggressive_npc_engages_within_range() {
        let decision = decide(
            AiState::Idle,
            (0, 0),
            (0, 0),
            true,
            5,
            Some((42, (3, 0))),
            None,
            &all_walkable,
        );
        assert_eq!(decision.next_state, AiState::Pursuing { target_id: 42 });
        assert_eq!(decision.step, Some((1, 0)));
    }

    #[test]
    fn idle_aggressive_npc_ignores_target_outside_aggro_range() {
        let decision = decide(
            AiState::Idle,
            (0, 0),
            (0, 0),
            true,
            2,
            Some((42, (10, 0))),
            None,
            &all_walkable,
        );
        assert_eq!(decision.next_state, AiState::Idle);
    }

    #[test]
    fn pursuing_npc_returns_home_when_target_vanishes() {
        let decision = decide(
            AiState::Pursuing { target_id: 42 },
            (3, 0),
            (0, 0),
            true,
            5,
            None,
            None,
            &all_walkable,
        );
        assert_eq!(decision.next_state, AiState::Returning);
        assert_eq!(decision.step, Some((2, 0)));
    }

    #[test]
    fn pursuing_npc_returns_home_when_leash_exceeded() {
        let decision = decide(
            AiState::Pursuing { target_id: 42 },
            (11, 0),
            (0, 0),
            true,
            50,
            Some((42, (12, 0))),
            Some((42, (12, 0))),
            &all_walkable,
        );
        assert_eq!(decision.next_state, AiState::Returning);
    }

    #[test]
    fn returning_npc_becomes_idle_on_arrival() {
        let decision = decide(
            AiState::Returning,
            (0, 0),
            (0, 0),
            false,
            5,
            None,
            None,
            &all_walkable,
        );
        assert_eq!(decision.next_state, AiState::Idle);
        assert_eq!(decision.step, None);
    }
}
