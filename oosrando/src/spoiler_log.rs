use anyhow::{Context, Result};
use oosrando_game::{Catalog, CollectMode, SubId, TreasureId};
use serde::{Deserialize, Serialize};

use crate::settings::RandomizerSettings;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub item: String,
    pub slot: String,
}

/// A successful assignment, in placement order.
#[derive(Debug, Clone)]
pub struct Randomization {
    pub placements: Vec<Placement>,
    pub reached: Vec<String>, // Nodes reachable from the start once everything is placed
    pub seed: usize,
    pub tries: usize,
}

/// What a slot needs to hand out its new item: the item's treasure IDs and the
/// slot's own collect mode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SlotTreasure {
    pub slot: String,
    pub item: String,
    pub id: TreasureId,
    pub sub_id: SubId,
    pub collect_mode: CollectMode,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpoilerLog {
    pub seed: usize,
    pub tries: usize,
    pub start: Vec<String>,
    pub goal: Vec<String>,
    pub forbid: Vec<String>,
    pub placements: Vec<Placement>,
    pub treasures: Vec<SlotTreasure>,
}

impl Randomization {
    pub fn slot_treasures(&self, catalog: &Catalog) -> Result<Vec<SlotTreasure>> {
        let mut out = Vec::with_capacity(self.placements.len());
        for p in &self.placements {
            let treasure = catalog
                .treasure(&p.item)
                .with_context(|| format!("no treasure for item {}", p.item))?;
            let slot = catalog
                .slot(&p.slot)
                .with_context(|| format!("no catalog entry for slot {}", p.slot))?;
            out.push(SlotTreasure {
                slot: p.slot.clone(),
                item: p.item.clone(),
                id: treasure.id,
                sub_id: treasure.sub_id,
                collect_mode: slot.collect_mode,
            });
        }
        Ok(out)
    }

    pub fn spoiler_log(
        &self,
        settings: &RandomizerSettings,
        catalog: &Catalog,
    ) -> Result<SpoilerLog> {
        Ok(SpoilerLog {
            seed: self.seed,
            tries: self.tries,
            start: settings.start.clone(),
            goal: settings.goal.clone(),
            forbid: settings.forbid.clone(),
            placements: self.placements.clone(),
            treasures: self.slot_treasures(catalog)?,
        })
    }
}
