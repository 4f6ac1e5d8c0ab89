use anyhow::{bail, Result};
use hashbrown::HashSet;
use oosrando_game::{Catalog, PrenodeSet};
use oosrando_logic::{Graph, NodeIdx, NodeKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("orphan node: {0}")]
    Orphan(String),
    #[error("childless node: {0}")]
    Childless(String),
    #[error("self-dependent node: {0}")]
    SelfDependent(String),
}

/// A logic graph together with the open slots and the item pool to be placed
/// into them. The graph's edges change during a search; the slot and item
/// lists do not.
#[derive(Clone, Debug)]
pub struct Route {
    pub graph: Graph,
    pub slots: Vec<NodeIdx>,
    pub items: Vec<NodeIdx>,
    pub start: Vec<NodeIdx>,
    is_slot: Vec<bool>,
    is_item: Vec<bool>,
}

impl Route {
    /// Builds the graph from the logic definitions, with the nodes named in
    /// `start` functioning as givens (always satisfied).
    pub fn new(prenodes: &PrenodeSet, start: &[String], items: &[String]) -> Result<Route> {
        let mut prenodes = prenodes.clone();
        for name in start {
            prenodes.make_given(name)?;
        }
        let graph = Graph::from_prenodes(&prenodes);

        let slots: Vec<NodeIdx> = prenodes
            .slot_names()
            .map(|name| graph.node_isv.index_by_key[name])
            .collect();
        let start: Vec<NodeIdx> = start
            .iter()
            .map(|name| graph.node_isv.index_by_key[name])
            .collect();

        let mut seen: HashSet<NodeIdx> = HashSet::new();
        let mut item_idxs: Vec<NodeIdx> = Vec::with_capacity(items.len());
        for name in items {
            let Some(idx) = graph.idx(name) else {
                bail!("item {} has no logic node", name);
            };
            if !seen.insert(idx) {
                bail!("item {} listed more than once", name);
            }
            if !graph.node(idx).parents.is_empty() {
                bail!("item node {} already has parents", name);
            }
            if graph.node(idx).kind == NodeKind::Root {
                bail!("item node {} is a given", name);
            }
            item_idxs.push(idx);
        }

        let mut is_slot = vec![false; graph.len()];
        for &s in &slots {
            is_slot[s] = true;
        }
        let mut is_item = vec![false; graph.len()];
        for &i in &item_idxs {
            is_item[i] = true;
        }
        Ok(Route {
            graph,
            slots,
            items: item_idxs,
            start,
            is_slot,
            is_item,
        })
    }

    pub fn is_slot(&self, idx: NodeIdx) -> bool {
        self.is_slot.get(idx).copied().unwrap_or(false)
    }

    pub fn is_item(&self, idx: NodeIdx) -> bool {
        self.is_item.get(idx).copied().unwrap_or(false)
    }

    /// Returns an error for each orphan and childless node in the graph,
    /// ignoring nodes which are supposed to be that way: roots and unplaced
    /// items have no parents, slots have no children. Also reports nodes on a
    /// dependency cycle that stay unreached even with every item in hand.
    pub fn check_graph(&self) -> Vec<GraphError> {
        let mut errs = vec![];
        for (idx, node) in self.graph.nodes.iter().enumerate() {
            let name = self.graph.name(idx);
            if node.parents.is_empty() && node.kind != NodeKind::Root && !self.is_item(idx) {
                errs.push(GraphError::Orphan(name.to_string()));
            }
            if node.children.is_empty() && !self.is_slot(idx) {
                errs.push(GraphError::Childless(name.to_string()));
            }
        }
        let mut given = self.start.clone();
        given.extend(&self.items);
        for idx in self.graph.self_dependent_nodes(&given) {
            errs.push(GraphError::SelfDependent(self.graph.name(idx).to_string()));
        }
        errs
    }

    /// Fails if `check_graph` finds anything.
    pub fn validate(&self) -> Result<()> {
        let errs = self.check_graph();
        if !errs.is_empty() {
            let msgs: Vec<String> = errs.iter().map(|e| e.to_string()).collect();
            bail!("graph has {} error(s): {}", errs.len(), msgs.join("; "));
        }
        Ok(())
    }

    /// Checks that every slot and item the search may touch is described by the
    /// catalog, so that the resulting placements can be written out.
    pub fn check_catalog(&self, catalog: &Catalog) -> Result<()> {
        let mut missing = vec![];
        for &s in &self.slots {
            let name = self.graph.name(s);
            if catalog.slot(name).is_none() {
                missing.push(format!("slot {name}"));
            }
        }
        for &i in &self.items {
            let name = self.graph.name(i);
            if catalog.treasure(name).is_none() {
                missing.push(format!("item {name}"));
            }
        }
        if !missing.is_empty() {
            bail!("not in catalog: {}", missing.join(", "));
        }
        if self.items.len() < self.slots.len() {
            bail!(
                "{} items cannot fill {} slots",
                self.items.len(),
                self.slots.len()
            );
        }
        Ok(())
    }
}
