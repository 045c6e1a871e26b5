//! Tile-grid distance helpers.
//!
//! Positions in embervale are integer tile coordinates, not 3D float
//! vectors, so there is no need for a `glam`-style vector type here — a
//! bare `(i32, i32)` tuple is the natural representation and keeps these
//! functions trivially `const`-friendly.

/// Manhattan (taxicab) distance between two tile positions.
#[must_use]
pub fn manhattan_distance(a: (i32, i32), b: (i32, i32)) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

/// Chebyshev (chessboard) distance between two tile positions.
#[must_use]
pub fn chebyshev_distance(a: (i32, i32), b: (i32, i32)) -> i32 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

/// Euclidean distance between two tile positions, used for aggro-range
/// checks.
#[must_use]
pub fn euclidean_distance(a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = f64::from(a.0 - b.0);
    let dy = f64::from(a.1 - b.1);
    dx.hypot(dy)
}

/// Two tiles are adjacent-cardinal iff their Manhattan distance is exactly 1
/// (no diagonals). Attacks require this; movement does not.
#[must_use]
pub fn is_adjacent_cardinal(a: (i32, i32), b: (i32, i32)) -> bool {
    manhattan_distance(a, b) == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_taxicab() {
        assert_eq!(manhattan_distance((0, 0), (3, 4)), 7);
    }

    #[test]
    fn chebyshev_is_chessboard() {
        assert_eq!(chebyshev_distance((0, 0), (3, 4)), 4);
        assert_eq!(chebyshev_distance((0, 0), (-5, 2)), 5);
    }

    #[test]
    fn euclidean_matches_pythagoras() {
        assert!((euclidean_distance((0, 0), (3, 4)) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn adjacent_cardinal_excludes_diagonals() {
        assert!(is_adjacent_cardinal((5, 5), (5, 6)));
        assert!(is_adjacent_cardinal((5, 5), (6, 5)));
        assert!(!is_adjacent_cardinal((5, 5), (6, 6)));
        assert!(!is_adjacent_cardinal((5, 5), (5, 5)));
        assert!(!is_adjacent_cardinal((5, 5), (5, 7)));
    }
}
