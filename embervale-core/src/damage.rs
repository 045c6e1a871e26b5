//! Damage rolls and kill-credit attribution.
//!
//! `DamageSource` is a small value type describing who dealt damage,
//! carried alongside the hit rather than looked up later. Kill credit
//! needs to remember every attacker who contributed to a kill, not just
//! the most recent one, so each character accumulates a short
//! [`DamageLedger`] instead of a single `DamageSource` field.

use rand::Rng;

use crate::character::CharacterId;

/// One hit recorded against a character, for later kill-credit attribution.
#[derive(Debug, Clone, Copy)]
pub struct DamageSource {
    /// The character that dealt the damage.
    pub attacker_id: CharacterId,
    /// The amount dealt.
    pub amount: i32,
    /// The tick the hit landed on.
    pub tick: u64,
}

/// Rolls melee damage: a uniform integer in `0..=3` inclusive, independent
/// of attacker or defender stats.
///
/// Kept as its own function (rather than inlined into combat resolution)
/// so a future damage model — accuracy rolls, weapon tiers, defence
/// mitigation — has a single seam to extend without touching the combat
/// phase's control flow.
pub fn roll_melee_damage(rng: &mut impl Rng) -> i32 {
    rng.gen_range(0..=3)
}

/// Accumulates recent damage contributions against one character so that,
/// on death, credit can be assigned to whoever dealt the most damage.
#[derive(Debug, Clone, Default)]
pub struct DamageLedger {
    hits: Vec<DamageSource>,
}

impl DamageLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self { hits: Vec::new() }
    }

    /// Records a hit.
    pub fn record(&mut self, source: DamageSource) {
        self.hits.push(source);
    }

    /// Clears all recorded hits, e.g. after death settlement or respawn.
    pub fn clear(&mut self) {
        self.hits.clear();
    }

    /// Determines the killer: the attacker with the greatest total damage
    /// dealt. Ties are broken uniformly at random among the tied
    /// attackers. Returns `None` if no hits were recorded.
    pub fn killer(&self, rng: &mut impl Rng) -> Option<CharacterId> {
        if self.hits.is_empty() {
            return None;
        }

        let mut totals: Vec<(CharacterId, i32)> = Vec::new();
        for hit in &self.hits {
            match totals.iter_mut().find(|(id, _)| *id == hit.attacker_id) {
                Some((_, total)) => *total += hit.amount,
                None => totals.push((hit.attacker_id, hit.amount)),
            }
        }

        let max_total = totals.iter().map(|(_, total)| *total).max()?;
        let tied: Vec<CharacterId> = totals
            .iter()
            .filter(|(_, total)| *total == max_total)
            .map(|(id, _)| *id)
            .collect();

        if tied.len() == 1 {
            Some(tied[0])
        } else {
            let index = rng.gen_range(0..tied.len());
            Some(tied[index])
        }
    }
}
