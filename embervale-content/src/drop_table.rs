//! Drop-table rolling.
//!
//! Each table is a weighted list of entries; each entry is either
//! `Item(item_id, min, max)` or `Table(ref_id)`. A single roll selects one
//! entry by total weight; `Table` entries recurse with a depth cap of 10.
//! Tertiary drops are independent 1-in-N rolls applied in addition to the
//! main roll.

use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::item::ItemId;

/// The recursion depth cap on `Table` entries.
pub const MAX_TABLE_DEPTH: u32 = 10;

/// One weighted entry in a drop table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DropEntry {
    /// Drops between `min` and `max` (inclusive) units of `item_id`.
    Item {
        /// Item type to drop.
        item_id: ItemId,
        /// Minimum count, inclusive.
        min: u32,
        /// Maximum count, inclusive.
        max: u32,
    },
    /// Nothing drops. Included in the weighted list like any other entry so
    /// tables can express "usually nothing".
    Nothing,
    /// Recurses into another table by id.
    Table(u32),
}

/// One entry plus its selection weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedDropEntry {
    /// The entry itself.
    pub entry: DropEntry,
    /// Relative weight; selection probability is `weight / total_weight`.
    pub weight: u32,
}

/// An independent "1-in-N" tertiary roll, applied in addition to whatever
/// the main weighted roll produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TertiaryDrop {
    /// Item dropped if the roll succeeds.
    pub item_id: ItemId,
    /// Count dropped if the roll succeeds.
    pub count: u32,
    /// Denominator of the independent roll: succeeds with probability `1/n`.
    pub one_in: u32,
}

/// A complete drop table definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DropTable {
    /// This table's id, used as the target of `DropEntry::Table` references.
    pub id: u32,
    /// The main weighted roll.
    pub entries: Vec<WeightedDropEntry>,
    /// Independent 1-in-N rolls applied alongside the main roll.
    pub tertiary: Vec<TertiaryDrop>,
}

/// A materialized drop: one item type and a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolledDrop {
    /// Item type.
    pub item_id: ItemId,
    /// Count.
    pub count: u32,
}

/// A read-only table of drop tables, keyed by id, so `Table(ref_id)` entries
/// can recurse into siblings.
#[derive(Debug, Default)]
pub struct DropTableRegistry {
    tables: FxHashMap<u32, DropTable>,
}

impl DropTableRegistry {
    /// Builds a registry from a list of drop tables.
    #[must_use]
    pub fn new(tables: Vec<DropTable>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    /// Rolls the table with the given id, resolving `Table` references
    /// recursively up to [`MAX_TABLE_DEPTH`], and applying any tertiary
    /// rolls. Returns the empty vec if the table id is unknown.
    pub fn roll(&self, table_id: u32, rng: &mut impl Rng) -> Vec<RolledDrop> {
        let mut drops = Vec::new();
        self.roll_main(table_id, rng, 0, &mut drops);
        if let Some(table) = self.tables.get(&table_id) {
            for tertiary in &table.tertiary {
                if rng.gen_range(0..tertiary.one_in) == 0 {
                    drops.push(RolledDrop {
                        item_id: tertiary.item_id,
                        count: tertiary.count,
                    });
                }
            }
        }
        drops
    }

    fn roll_main(&self, table_id: u32, rng: &mut impl Rng, depth: u32, out: &mut Vec<RolledDrop>) {
        if depth >= MAX_TABLE_DEPTH {
            tracing::warn!(table_id, depth, "drop table recursion depth cap reached");
            return;
        }
        let Some(table) = self.tables.get(&table_id) else {
            return;
        };
        let total_weight: u32 = table.entries.iter().map(|e| e.weight).sum();
        if total_weight == 0 {
            return;
        }
        let mut roll = rng.gen_range(0..total_weight);
        for weighted in &table.entries {
            if roll < weighted.weight {
                match &weighted.entry {
                    DropEntry::Nothing => {}
                    DropEntry::Item { item_id, min, max } => {
                        let count = if min == max {
                            *min
                        } else {
                            rng.gen_range(*min..=*max)
                        };
                        out.push(RolledDrop {
                            item_id: *item_id,
                            count,
                        });
                    }
                    DropEntry::Table(ref_id) => {
                        self.roll_main(*ref_id, rng, depth + 1, out);
                    }
                }
                return;
            }
            roll -= weighted.weight;
        }
    }
}
