// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod catalog;
pub mod prenode;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use std::{fs::File, hash::Hash, path::Path};
use strum_macros::{Display, EnumString, VariantNames};

pub use catalog::{Catalog, CompatibilityOracle, ItemSlot, ProgressExemptions, SeedTree, Treasure};
pub use prenode::{Prenode, PrenodeSet, PrenodeType};

pub type TreasureId = u8; // Treasure ID as used by the game's item-giving routines
pub type SubId = u8; // Treasure sub ID (level, variant, or jewel shape)
pub type CollectMode = u8; // How a slot hands its treasure to the player (chest, gift, fall, ...)

#[derive(Default, Clone, Debug, PartialEq)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl IndexedVec<String> {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.index_by_key.get(name).copied()
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
    let json_str = std::io::read_to_string(file)
        .with_context(|| format!("unable to read {}", path.display()))?;
    let data = serde_json::from_str(&json_str)
        .with_context(|| format!("unable to parse {}", path.display()))?;
    Ok(data)
}
