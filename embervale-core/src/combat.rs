//! Attack resolution and the targeting-symmetry invariant.
//!
//! An attack requires the attacker and defender to be
//! within one tile of each other (Chebyshev distance 1, matching the
//! adjacency the pathfinder and AI already use), deals
//! [`crate::damage::roll_melee_damage`], and maintains
//! `current_target`/`targeted_by` as a symmetric pair.

use rand::Rng;

use crate::character::CharacterCore;
use crate::damage::{roll_melee_damage, DamageLedger, DamageSource};

/// Outcome of one resolved attack.
#[derive(Debug, Clone, Copy)]
pub struct AttackOutcome {
    /// Damage actually dealt this attack.
    pub damage_dealt: i32,
    /// Whether this attack brought the defender's health to zero.
    pub defender_died: bool,
}

/// Whether `attacker` is close enough to `defender` to attack this tick.
#[must_use]
pub fn is_in_melee_range(attacker: &CharacterCore, defender: &CharacterCore) -> bool {
    embervale_utils::geometry::chebyshev_distance(attacker.position, defender.position) <= 1
}

/// Sets `attacker` to target `defender`, maintaining the symmetric
/// `current_target`/`targeted_by` relationship. If `attacker` already had
/// a different target, that old target's `targeted_by` entry is removed
/// first so the invariant never has a dangling reference on either side.
///
/// The caller must pass both characters even when only setting one side's
/// `current_target`, since clearing the old target also requires mutating
/// that old target's `targeted_by` set — callers without access to the
/// old target's `CharacterCore` should use [`clear_target`] first.
pub fn set_target(attacker: &mut CharacterCore, defender: &mut CharacterCore) {
    attacker.current_target = Some(defender.id);
    defender.targeted_by.insert(attacker.id);
}

/// Removes `attacker`'s current target relationship with `former_target`,
/// clearing both `attacker.current_target` and
/// `former_target.targeted_by`.
pub fn clear_target(attacker: &mut CharacterCore, former_target: &mut CharacterCore) {
    if attacker.current_target == Some(former_target.id) {
        attacker.current_target = None;
    }
    former_target.targeted_by.remove(&attacker.id);
}

/// Half of [`set_target`]: points `attacker.current_target` at
/// `defender_id` without touching the defender. Pairs with
/// [`add_targeted_by`] when attacker and defender live in the same
/// collection and cannot both be borrowed mutably at once — the caller is
/// responsible for calling both halves to keep the invariant symmetric.
pub fn set_attacker_target(attacker: &mut CharacterCore, defender_id: i32) {
    attacker.current_target = Some(defender_id);
}

/// The other half of [`set_target`]: records `attacker_id` in
/// `defender.targeted_by` without touching the attacker.
pub fn add_targeted_by(defender: &mut CharacterCore, attacker_id: i32) {
    defender.targeted_by.insert(attacker_id);
}

/// Resolves one attack from `attacker` against `defender`, rolling
/// damage, applying it, and recording the hit in `defender_ledger` for
/// later kill-credit attribution. `attacker_key` (`"{Player,NPC}_{id}"`) is
/// mirrored into `defender.damage_sources` for the prologue phase's
/// full-rest clear; it is not used for kill-credit, which stays on
/// `defender_ledger` alone. Does not check range or cooldown; callers
/// (the player-combat and NPC-combat tick phases) own those preconditions
/// since they differ between players and NPCs.
pub fn execute_attack(
    attacker_id: i32,
    attacker_key: &str,
    defender: &mut CharacterCore,
    defender_ledger: &mut DamageLedger,
    tick: u64,
    rng: &mut impl Rng,
) -> AttackOutcome {
    let amount = roll_melee_damage(rng);
    let defender_died = defender.apply_damage(amount, tick);
    defender.attribute_damage(attacker_key, amount);
    defender_ledger.record(DamageSource { attacker_id, amount, tick });

    AttackOutcome { damage_dealt: amount, defender_died }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn melee_range_is_chebyshev_adjacency() {
        let a = CharacterCore::new(1, (0, 0), 10);
        let mut b = CharacterCore::new(2, (1, 1), 10);
        assert!(is_in_melee_range(&a, &b));
        b.position = (2, 2);
        assert!(!is_in_melee_range(&a, &b));
        let _ = &mut a;
    }

    #[test]
    fn set_target_is_symmetric() {
        let mut a = CharacterCore::new(1, (0, 0), 10);
        let mut b = CharacterCore::new(2, (1, 0), 10);
        set_target(&mut a, &mut b);
        assert_eq!(a.current_target, Some(2));
        assert!(b.targeted_by.contains(&1));
    }

    #[test]
    fn clear_target_removes_both_sides() {
        let mut a = CharacterCore::new(1, (0, 0), 10);
        let mut b = CharacterCore::new(2, (1, 0), 10);
        set_target(&mut a, &mut b);
        clear_target(&mut a, &mut b);
        assert_eq!(a.current_target, None);
        assert!(!b.targeted_by.contains(&1));
    }

    #[test]
    fn retargeting_does_not_leave_a_stale_targeted_by_entry() {
        let mut a = CharacterCore::new(1, (0, 0), 10);
        let mut old_target = CharacterCore::new(2, (1, 0), 10);
        let mut new_target = CharacterCore::new(3, (0, 1), 10);

        set_target(&mut a, &mut old_target);
        clear_target(&mut a, &mut old_target);
        set_target(&mut a, &mut new_target);

        assert!(!old_target.targeted_by.contains(&1));
        assert!(new_target.targeted_by.contains(&1));
        assert_eq!(a.current_target, Some(3));
    }

    #[test]
    fn execute_attack_records_a_hit_and_reports_death() {
        let mut defender = CharacterCore::new(2, (1, 0), 2);
        let mut ledger = DamageLedger::new();
        let mut rng = StdRng::seed_from_u64(3);

        let mut died = false;
        for _ in 0..20 {
            let outcome = execute_attack(1, "Player_1", &mut defender, &mut ledger, 1, &mut rng);
            if outcome.defender_died {
                died = true;
                break;
            }
        }
        assert!(died, "expected the defender to die within 20 attacks at 2 hp");
        assert_eq!(defender.health, 0);
    }

    #[test]
    fn execute_attack_mirrors_damage_into_the_defenders_damage_sources() {
        let mut defender = CharacterCore::new(2, (1, 0), 10);
        let mut ledger = DamageLedger::new();
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = execute_attack(1, "Player_1", &mut defender, &mut ledger, 1, &mut rng);
        assert_eq!(defender.damage_sources.get("Player_1"), Some(&outcome.damage_dealt));
    }
}
