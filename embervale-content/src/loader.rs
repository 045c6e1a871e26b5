//! Loads the three static registries from JSON files on disk.
//!
//! Mirrors the `chunk_<X>_<Y>.json` convention [`crate::terrain_file`]
//! uses for terrain: plain JSON arrays, one file per registry, missing
//! files treated as an empty registry rather than an error so a world can
//! boot with no content configured yet.

use std::path::Path;

use crate::drop_table::DropTable;
use crate::item::ItemDef;
use crate::npc_type::NpcTypeDef;
use crate::{DropTableRegistry, ItemRegistry, NpcTypeRegistry};

/// Reads `items.json`, `npc_types.json`, and `drop_tables.json` from
/// `dir`, building the three content registries. A missing file yields an
/// empty registry; a present-but-malformed file is an error.
pub fn load_registries(dir: &Path) -> std::io::Result<(ItemRegistry, NpcTypeRegistry, DropTableRegistry)> {
    let items: Vec<ItemDef> = load_json_array(&dir.join("items.json"))?;
    let npc_types: Vec<NpcTypeDef> = load_json_array(&dir.join("npc_types.json"))?;
    let drop_tables: Vec<DropTable> = load_json_array(&dir.join("drop_tables.json"))?;
    Ok((ItemRegistry::new(items), NpcTypeRegistry::new(npc_types), DropTableRegistry::new(drop_tables)))
}

fn load_json_array<T: serde::de::DeserializeOwned>(path: &Path) -> std::io::Result<Vec<T>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(std::io::Error::from),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_yields_empty_registries() {
        let (items, npc_types, drop_tables) = load_registries(Path::new("/nonexistent/content/dir")).unwrap();
        assert!(items.get(0).is_none());
        assert!(npc_types.get(0).is_none());
        assert!(drop_tables.roll(0, &mut rand::thread_rng()).is_empty());
    }
}
