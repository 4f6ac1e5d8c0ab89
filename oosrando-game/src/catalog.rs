use anyhow::{bail, Result};
use hashbrown::HashMap;
use log::info;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::{read_json, CollectMode, IndexedVec, Season, SubId, TreasureId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Treasure {
    pub name: String,
    pub id: TreasureId,
    #[serde(default)]
    pub sub_id: SubId,
    // Whether the item graphics can be drawn in a cutscene ("scene") slot
    #[serde(default = "default_true")]
    pub scene_ok: bool,
    // Only set for seed items: the season in which their tree bears them
    #[serde(default)]
    pub season: Option<Season>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSlot {
    pub name: String,
    pub treasure: String, // Vanilla contents
    pub collect_mode: CollectMode,
    #[serde(default)]
    pub scene: bool,
    // The slot's code never writes the sub ID, so it is left zeroed
    #[serde(default)]
    pub zero_sub_id: bool,
}

/// A seed tree slot. The tree bears a seed if the seed's season matches the
/// tree's native season, if the tree grows in all seasons (`native_season` is
/// `None`), or if the player can reach the tree in another season: every node
/// in any one of the `season_change` groups is reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedTree {
    pub slot: String,
    #[serde(default)]
    pub native_season: Option<Season>,
    #[serde(default)]
    pub season_change: Vec<Vec<String>>,
}

/// Items which may be placed without immediately unlocking a new step, because
/// other items only become useful once they are in hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressExemptions {
    pub harvest_node: String,
    pub seed_node: String,
    pub harvest_items: Vec<String>,
    pub first_gale_seed: String,
}

impl Default for ProgressExemptions {
    fn default() -> Self {
        ProgressExemptions {
            harvest_node: "harvest item".to_string(),
            seed_node: "seed item".to_string(),
            harvest_items: vec![
                "satchel".to_string(),
                "slingshot L-1".to_string(),
                "slingshot L-2".to_string(),
            ],
            first_gale_seed: "gale tree seeds 1".to_string(),
        }
    }
}

/// Per-item and per-slot compatibility queries used to prune placements.
pub trait CompatibilityOracle {
    fn can_render_in_slot(&self, item: &str, slot: &str) -> bool;
    fn sub_id_of(&self, item: &str) -> SubId;
    fn is_seed_item(&self, item: &str) -> bool;
    fn season_of(&self, item: &str) -> Option<Season>;
    fn seed_tree(&self, slot: &str) -> Option<&SeedTree>;
    fn requires_zero_sub_id(&self, slot: &str) -> bool;

    fn is_seed_tree(&self, slot: &str) -> bool {
        self.seed_tree(slot).is_some()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct CatalogFile {
    treasures: Vec<Treasure>,
    #[serde(default)]
    slots: Vec<ItemSlot>,
    #[serde(default)]
    seed_trees: Vec<SeedTree>,
    items: Vec<String>,
}

/// Placeable items and the slots they can go into. Names not present in the
/// catalog are treated as unconstrained: sub ID zero, not a seed, drawable
/// anywhere.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub treasure_isv: IndexedVec<String>,
    pub treasures: Vec<Treasure>,
    pub slot_isv: IndexedVec<String>,
    pub slots: Vec<ItemSlot>,
    pub seed_trees: HashMap<String, SeedTree>,
    pub items: Vec<String>, // The item pool; each item name appears once
}

impl Catalog {
    pub fn new(
        treasures: Vec<Treasure>,
        slots: Vec<ItemSlot>,
        seed_trees: Vec<SeedTree>,
        items: Vec<String>,
    ) -> Result<Self> {
        let mut treasure_isv: IndexedVec<String> = IndexedVec::default();
        for t in &treasures {
            if treasure_isv.get(&t.name).is_some() {
                bail!("duplicate treasure: {}", t.name);
            }
            treasure_isv.add(&t.name);
        }
        let mut slot_isv: IndexedVec<String> = IndexedVec::default();
        for s in &slots {
            if slot_isv.get(&s.name).is_some() {
                bail!("duplicate slot: {}", s.name);
            }
            if treasure_isv.get(&s.treasure).is_none() {
                bail!("slot {} holds unknown treasure {}", s.name, s.treasure);
            }
            slot_isv.add(&s.name);
        }
        let mut tree_map: HashMap<String, SeedTree> = HashMap::new();
        for tree in seed_trees {
            if slot_isv.get(&tree.slot).is_none() {
                bail!("seed tree {} is not a known slot", tree.slot);
            }
            tree_map.insert(tree.slot.clone(), tree);
        }
        for item in &items {
            if treasure_isv.get(item).is_none() {
                bail!("item pool entry {} has no treasure", item);
            }
        }
        Ok(Catalog {
            treasure_isv,
            treasures,
            slot_isv,
            slots,
            seed_trees: tree_map,
            items,
        })
    }

    pub fn from_json_str(json_str: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json_str)?;
        Self::new(file.treasures, file.slots, file.seed_trees, file.items)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file: CatalogFile = read_json(path)?;
        let catalog = Self::new(file.treasures, file.slots, file.seed_trees, file.items)?;
        info!(
            "Loaded {} treasures and {} slots from {}",
            catalog.treasures.len(),
            catalog.slots.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn treasure(&self, name: &str) -> Option<&Treasure> {
        self.treasure_isv.get(name).map(|i| &self.treasures[i])
    }

    pub fn slot(&self, name: &str) -> Option<&ItemSlot> {
        self.slot_isv.get(name).map(|i| &self.slots[i])
    }
}

impl CompatibilityOracle for Catalog {
    fn can_render_in_slot(&self, item: &str, slot: &str) -> bool {
        match (self.slot(slot), self.treasure(item)) {
            (Some(s), Some(t)) if s.scene => t.scene_ok,
            _ => true,
        }
    }

    fn sub_id_of(&self, item: &str) -> SubId {
        self.treasure(item).map(|t| t.sub_id).unwrap_or(0)
    }

    fn is_seed_item(&self, item: &str) -> bool {
        self.season_of(item).is_some()
    }

    fn season_of(&self, item: &str) -> Option<Season> {
        self.treasure(item).and_then(|t| t.season)
    }

    fn seed_tree(&self, slot: &str) -> Option<&SeedTree> {
        self.seed_trees.get(slot)
    }

    fn requires_zero_sub_id(&self, slot: &str) -> bool {
        self.slot(slot).map(|s| s.zero_sub_id).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_catalog() -> Catalog {
        let json = r#"{
            "treasures": [
                {"name": "sword L-1", "id": 5, "sub_id": 0},
                {"name": "round jewel", "id": 77, "sub_id": 0, "scene_ok": false},
                {"name": "boomerang L-2", "id": 6, "sub_id": 1},
                {"name": "scent tree seeds", "id": 34, "scene_ok": false, "season": "spring"}
            ],
            "slots": [
                {"name": "d0 sword chest", "treasure": "sword L-1", "collect_mode": 56, "scene": true},
                {"name": "star ore spot", "treasure": "round jewel", "collect_mode": 10, "zero_sub_id": true},
                {"name": "scent tree", "treasure": "scent tree seeds", "collect_mode": 0}
            ],
            "seed_trees": [
                {"slot": "scent tree", "native_season": "spring", "season_change": [["spring", "ghastly stump"]]}
            ],
            "items": ["sword L-1", "round jewel", "boomerang L-2", "scent tree seeds"]
        }"#;
        Catalog::from_json_str(json).unwrap()
    }

    #[test]
    fn test_oracle_queries() {
        let catalog = test_catalog();
        assert!(catalog.can_render_in_slot("sword L-1", "d0 sword chest"));
        assert!(!catalog.can_render_in_slot("round jewel", "d0 sword chest"));
        assert!(catalog.can_render_in_slot("round jewel", "star ore spot"));
        assert_eq!(catalog.sub_id_of("boomerang L-2"), 1);
        assert!(catalog.requires_zero_sub_id("star ore spot"));
        assert!(!catalog.requires_zero_sub_id("d0 sword chest"));
        assert!(catalog.is_seed_item("scent tree seeds"));
        assert_eq!(catalog.season_of("scent tree seeds"), Some(Season::Spring));
        assert!(!catalog.is_seed_item("sword L-1"));
        assert!(catalog.is_seed_tree("scent tree"));
        assert!(!catalog.is_seed_tree("star ore spot"));
    }

    #[test]
    fn test_unknown_names_are_unconstrained() {
        let catalog = Catalog::default();
        assert!(catalog.can_render_in_slot("itemA", "slot1"));
        assert_eq!(catalog.sub_id_of("itemA"), 0);
        assert!(!catalog.is_seed_item("itemA"));
        assert!(!catalog.is_seed_tree("slot1"));
        assert!(!catalog.requires_zero_sub_id("slot1"));
    }

    #[test]
    fn test_rejects_inconsistent_catalog() {
        let treasures = vec![Treasure {
            name: "feather".to_string(),
            id: 0x17,
            sub_id: 0,
            scene_ok: true,
            season: None,
        }];
        assert!(Catalog::new(treasures.clone(), vec![], vec![], vec!["flippers".to_string()]).is_err());
        let tree = SeedTree {
            slot: "ember tree".to_string(),
            native_season: None,
            season_change: vec![],
        };
        assert!(Catalog::new(treasures, vec![], vec![tree], vec![]).is_err());
    }
}
