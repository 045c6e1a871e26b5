//! Greedy single-tile pursuit step.
//!
//! Given integer positions `from` and `to`, return the single-tile move
//! that most reduces Chebyshev distance while never stepping onto the
//! target tile and never onto an unwalkable tile.

use crate::WalkabilityGrid;

/// A one-tile move, or a decision not to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Move to the given absolute tile position.
    Move((i32, i32)),
    /// No candidate move was accepted.
    NoMove,
}

fn sign(v: i32) -> i32 {
    match v.cmp(&0) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

/// Computes one greedy pursuit step from `from` toward `to`:
///
/// 1. `from == to` → no-move.
/// 2. `(step_x, step_y) = (sign(tx-fx), sign(ty-fy))`.
/// 3. If both nonzero, try the diagonal; accept if walkable and not `to`.
/// 4. Otherwise pick the longer axis (ties favor Y); try its cardinal step.
/// 5. Fall back to the other axis under the same conditions.
/// 6. No candidate accepted → no-move.
pub fn greedy_step(from: (i32, i32), to: (i32, i32), grid: &impl WalkabilityGrid) -> Step {
    if from == to {
        return Step::NoMove;
    }

    let (fx, fy) = from;
    let (tx, ty) = to;
    let step_x = sign(tx - fx);
    let step_y = sign(ty - fy);

    let accept = |candidate: (i32, i32)| -> bool { candidate != to && grid.is_walkable(candidate.0, candidate.1) };

    if step_x != 0 && step_y != 0 {
        let diagonal = (fx + step_x, fy + step_y);
        if accept(diagonal) {
            return Step::Move(diagonal);
        }
        // A blocked diagonal still falls through to axis-preference below,
        // matching "otherwise decide an axis" for the case where a single
        // component is nonzero after the diagonal attempt fails.
    }

    let dx = (tx - fx).abs();
    let dy = (ty - fy).abs();
    let prefer_y = dy >= dx; // tie prefers Y axis.

    let (primary, secondary) = if prefer_y {
        ((fx, fy + step_y), (fx + step_x, fy))
    } else {
        ((fx + step_x, fy), (fx, fy + step_y))
    };

    if step_y != 0 && prefer_y && accept(primary) {
        return Step::Move(primary);
    }
    if step_x != 0 && !prefer_y && accept(primary) {
        return Step::Move(primary);
    }
    if prefer_y {
        if step_x != 0 && accept(secondary) {
            return Step::Move(secondary);
        }
    } else if step_y != 0 && accept(secondary) {
        return Step::Move(secondary);
    }

    Step::NoMove
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_walkable(_x: i32, _y: i32) -> bool {
        true
    }

    #[test]
    fn already_at_target_is_no_move() {
        assert_eq!(greedy_step((5, 5), (5, 5), &all_walkable), Step::NoMove);
    }

    #[test]
    fn prefers_diagonal_when_both_axes_differ() {
        assert_eq!(greedy_step((0, 0), (3, 3), &all_walkable), Step::Move((1, 1)));
        assert_eq!(greedy_step((0, 0), (-3, 3), &all_walkable), Step::Move((-1, 1)));
    }

    #[test]
    fn never_steps_onto_the_target_tile() {
        // Adjacent cardinal: diagonal isn't applicable (one axis is zero),
        // cardinal step would land exactly on `to`, which must be rejected.
        assert_eq!(greedy_step((5, 5), (6, 5), &all_walkable), Step::NoMove);
    }

    #[test]
    fn falls_back_to_cardinal_when_diagonal_blocked() {
        let blocked_diagonal = |x: i32, y: i32| !(x == 1 && y == 1);
        // from (0,0) to (3,3): diagonal (1,1) blocked, longer axis tie -> Y preferred.
        assert_eq!(greedy_step((0, 0), (3, 3), &blocked_diagonal), Step::Move((0, 1)));
    }

    #[test]
    fn prefers_longer_axis_when_not_diagonal_candidate() {
        // from (0,0) to (5,1): dx=5 > dy=1 on a cardinal-only approach once
        // adjacent on y; verify the longer (x) axis is preferred early on.
        assert_eq!(greedy_step((0, 0), (5, 1), &all_walkable), Step::Move((1, 1)));
    }

    #[test]
    fn falls_back_to_other_axis_when_preferred_blocked() {
        // Block every tile with y == 1 so the Y-preferred step is rejected,
        // forcing the X fallback.
        let blocked = |_x: i32, y: i32| y != 1;
        assert_eq!(greedy_step((0, 0), (1, 3), &blocked), Step::Move((1, 0)));
    }

    #[test]
    fn no_move_when_every_candidate_blocked() {
        let nothing_walkable = |_x: i32, _y: i32| false;
        assert_eq!(greedy_step((0, 0), (3, 3), &nothing_walkable), Step::NoMove);
    }

    #[test]
    fn bounded_termination_reaches_adjacency_on_open_grid() {
        fn chebyshev(a: (i32, i32), b: (i32, i32)) -> i32 {
            (a.0 - b.0).abs().max((a.1 - b.1).abs())
        }

        let from = (0, 0);
        let to = (10, 4);
        let max_steps = (to.0 - from.0).abs() + (to.1 - from.1).abs();
        let mut pos = from;
        let mut steps_taken = 0;
        loop {
            if chebyshev(pos, to) <= 1 {
                break;
            }
            match greedy_step(pos, to, &all_walkable) {
                Step::Move(next) => pos = next,
                Step::NoMove => break,
            }
            steps_taken += 1;
            assert!(steps_taken <= max_steps, "greedy step did not terminate in bound");
        }
    }
}
