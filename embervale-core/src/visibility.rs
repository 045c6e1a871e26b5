//! Per-player visibility diffing.
//!
//! Each player sees every character inside a
//! `(2R+1)x(2R+1)` square centered on their own tile (`R` = the player's
//! requested visibility radius, defaulting to
//! [`crate::config::WorldConfig::default_visibility_radius`]). Every tick,
//! the egress phase computes which characters entered or left that square
//! since the previous tick and sends only the diff to the client.

use std::collections::HashSet;

use crate::character::CharacterId;

/// The set of characters that appeared or disappeared from a player's
/// visibility square this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityDiff {
    /// Characters now visible that were not visible last tick.
    pub appeared: Vec<CharacterId>,
    /// Characters visible last tick that are no longer visible.
    pub disappeared: Vec<CharacterId>,
}

impl VisibilityDiff {
    /// Whether this diff carries anything worth sending to the client.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.disappeared.is_empty()
    }
}

/// Whether `other` falls inside the `(2R+1)x(2R+1)` square centered on
/// `center`.
#[must_use]
pub fn is_within_visibility(center: (i32, i32), radius: u32, other: (i32, i32)) -> bool {
    let radius = radius as i32;
    (other.0 - center.0).abs() <= radius && (other.1 - center.1).abs() <= radius
}

/// Computes the appear/disappear diff between `previously_visible` and
/// `currently_visible`, then overwrites `previously_visible` with
/// `currently_visible` so the next tick's diff is relative to this one.
pub fn diff_and_advance(
    previously_visible: &mut HashSet<CharacterId>,
    currently_visible: HashSet<CharacterId>,
) -> VisibilityDiff {
    let appeared = currently_visible.difference(previously_visible).copied().collect();
    let disappeared = previously_visible.difference(&currently_visible).copied().collect();
    *previously_visible = currently_visible;
    VisibilityDiff { appeared, disappeared }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_square_uses_chebyshev_shape_not_a_circle() {
        assert!(is_within_visibility((0, 0), 1, (1, 1)));
        assert!(!is_within_visibility((0, 0), 1, (2, 0)));
        assert!(!is_within_visibility((0, 0), 1, (0, 2)));
    }

    #[test]
    fn diff_reports_new_arrivals_and_departures() {
        let mut previous: HashSet<CharacterId> = [1, 2, 3].into_iter().collect();
        let current: HashSet<CharacterId> = [2, 3, 4].into_iter().collect();

        let mut diff = diff_and_advance(&mut previous, current);
        diff.appeared.sort_unstable();
        diff.disappeared.sort_unstable();

        assert_eq!(diff.appeared, vec![4]);
        assert_eq!(diff.disappeared, vec![1]);
        assert_eq!(previous, [2, 3, 4].into_iter().collect());
    }

    #[test]
    fn unchanged_visibility_produces_an_empty_diff() {
        let mut previous: HashSet<CharacterId> = [1, 2].into_iter().collect();
        let current: HashSet<CharacterId> = [1, 2].into_iter().collect();
        let diff = diff_and_advance(&mut previous, current);
        assert!(diff.is_empty());
    }
}
