use anyhow::{bail, Result};
use log::info;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;
use strum_macros::{Display, EnumString};

use crate::{read_json, IndexedVec};

/// Declarative node type, as written in the logic data. Slot types mark item
/// slots (which are also steps), step types mark progress milestones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PrenodeType {
    And,
    AndSlot,
    AndStep,
    Or,
    OrSlot,
    OrStep,
    Root,
}

impl PrenodeType {
    pub fn is_slot(self) -> bool {
        matches!(self, PrenodeType::AndSlot | PrenodeType::OrSlot)
    }

    pub fn is_step(self) -> bool {
        matches!(
            self,
            PrenodeType::AndSlot | PrenodeType::AndStep | PrenodeType::OrSlot | PrenodeType::OrStep
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prenode {
    pub name: String,
    #[serde(rename = "type")]
    pub prenode_type: PrenodeType,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl Prenode {
    pub fn new(name: &str, prenode_type: PrenodeType, parents: &[&str]) -> Self {
        Prenode {
            name: name.to_string(),
            prenode_type,
            parents: parents.iter().map(|x| x.to_string()).collect(),
        }
    }

    pub fn root(name: &str) -> Self {
        Prenode::new(name, PrenodeType::Root, &[])
    }

    pub fn and(name: &str, parents: &[&str]) -> Self {
        Prenode::new(name, PrenodeType::And, parents)
    }

    pub fn or(name: &str, parents: &[&str]) -> Self {
        Prenode::new(name, PrenodeType::Or, parents)
    }
}

#[derive(Deserialize)]
struct PrenodeFile {
    nodes: Vec<Prenode>,
}

/// The full set of logic definitions, keyed by node name. Parent names are
/// guaranteed to resolve to nodes in the set.
#[derive(Clone, Debug, Default)]
pub struct PrenodeSet {
    pub name_isv: IndexedVec<String>,
    pub prenodes: Vec<Prenode>,
}

impl PrenodeSet {
    pub fn new(prenodes: Vec<Prenode>) -> Result<Self> {
        let mut name_isv: IndexedVec<String> = IndexedVec::default();
        for pn in &prenodes {
            if name_isv.get(&pn.name).is_some() {
                bail!("duplicate node definition: {}", pn.name);
            }
            name_isv.add(&pn.name);
        }
        for pn in &prenodes {
            if pn.prenode_type == PrenodeType::Root && !pn.parents.is_empty() {
                bail!("root node {} has parents", pn.name);
            }
            for parent in &pn.parents {
                if name_isv.get(parent).is_none() {
                    bail!("unknown parent {} of node {}", parent, pn.name);
                }
            }
        }
        Ok(PrenodeSet { name_isv, prenodes })
    }

    pub fn from_json_str(json_str: &str) -> Result<Self> {
        let file: PrenodeFile = serde_json::from_str(json_str)?;
        Self::new(file.nodes)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file: PrenodeFile = read_json(path)?;
        let set = Self::new(file.nodes)?;
        info!("Loaded {} logic nodes from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.prenodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prenodes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Prenode> {
        self.name_isv.get(name).map(|i| &self.prenodes[i])
    }

    /// Turns the named node into a given: a parentless root that is always
    /// satisfied. Other nodes may still list it as a parent.
    pub fn make_given(&mut self, name: &str) -> Result<()> {
        let Some(idx) = self.name_isv.get(name) else {
            bail!("unknown start node: {}", name);
        };
        let pn = &mut self.prenodes[idx];
        pn.prenode_type = PrenodeType::Root;
        pn.parents.clear();
        Ok(())
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.prenodes
            .iter()
            .filter(|pn| pn.prenode_type.is_slot())
            .map(|pn| pn.name.as_str())
    }
}
