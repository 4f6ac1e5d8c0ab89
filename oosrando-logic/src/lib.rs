pub mod explore;

use oosrando_game::{IndexedVec, PrenodeSet, PrenodeType};
use serde::{Deserialize, Serialize};

pub use explore::Reached;

pub type NodeIdx = usize; // Index into Graph.nodes (and Graph.node_isv.keys)

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    And,  // all parents reached (and at least one parent)
    Or,   // any parent reached
    Root, // always reached
}

impl From<PrenodeType> for NodeKind {
    fn from(t: PrenodeType) -> Self {
        match t {
            PrenodeType::And | PrenodeType::AndSlot | PrenodeType::AndStep => NodeKind::And,
            PrenodeType::Or | PrenodeType::OrSlot | PrenodeType::OrStep => NodeKind::Or,
            PrenodeType::Root => NodeKind::Root,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub is_step: bool,
    pub parents: Vec<NodeIdx>,
    pub children: Vec<NodeIdx>,
}

/// Arena of logic nodes. Edges are kept in insertion order on both ends, so
/// removing the most recently added edge restores the exact prior state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub node_isv: IndexedVec<String>,
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn from_prenodes(prenodes: &PrenodeSet) -> Self {
        let mut graph = Graph::new();
        for pn in &prenodes.prenodes {
            graph.add_node(&pn.name, pn.prenode_type.into(), pn.prenode_type.is_step());
        }
        for (child, pn) in prenodes.prenodes.iter().enumerate() {
            for parent_name in &pn.parents {
                // PrenodeSet guarantees parent names resolve.
                let parent = prenodes.name_isv.index_by_key[parent_name];
                graph.add_parent(child, parent);
            }
        }
        graph
    }

    /// Adds a node, or redefines the kind of an existing node with the same
    /// name (keeping its edges).
    pub fn add_node(&mut self, name: &str, kind: NodeKind, is_step: bool) -> NodeIdx {
        let idx = self.node_isv.add(name);
        if idx == self.nodes.len() {
            self.nodes.push(Node {
                kind,
                is_step,
                parents: vec![],
                children: vec![],
            });
        } else {
            self.nodes[idx].kind = kind;
            self.nodes[idx].is_step = is_step;
        }
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn idx(&self, name: &str) -> Option<NodeIdx> {
        self.node_isv.get(name)
    }

    pub fn name(&self, idx: NodeIdx) -> &str {
        &self.node_isv.keys[idx]
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx]
    }

    /// Returns false (and changes nothing) if the edge already exists.
    pub fn add_parent(&mut self, child: NodeIdx, parent: NodeIdx) -> bool {
        if self.nodes[child].parents.contains(&parent) {
            return false;
        }
        self.nodes[child].parents.push(parent);
        self.nodes[parent].children.push(child);
        true
    }

    pub fn remove_parent(&mut self, child: NodeIdx, parent: NodeIdx) -> bool {
        let Some(i) = self.nodes[child].parents.iter().position(|&p| p == parent) else {
            return false;
        };
        self.nodes[child].parents.remove(i);
        if let Some(j) = self.nodes[parent].children.iter().rposition(|&c| c == child) {
            self.nodes[parent].children.remove(j);
        }
        true
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.parents.len()).sum()
    }

    /// Nodes lying on a dependency cycle that stay unreached even with every
    /// node in `given` reached. Such a node needs itself in order to be
    /// reached.
    pub fn self_dependent_nodes(&self, given: &[NodeIdx]) -> Vec<NodeIdx> {
        // Tarjan's strongly connected components over parent edges.
        struct Tarjan<'g> {
            graph: &'g Graph,
            index: Vec<Option<usize>>,
            lowlink: Vec<usize>,
            on_stack: Vec<bool>,
            stack: Vec<NodeIdx>,
            next_index: usize,
            out: Vec<NodeIdx>,
        }

        impl Tarjan<'_> {
            fn visit(&mut self, v: NodeIdx) {
                self.index[v] = Some(self.next_index);
                self.lowlink[v] = self.next_index;
                self.next_index += 1;
                self.stack.push(v);
                self.on_stack[v] = true;

                let graph = self.graph;
                for &w in &graph.nodes[v].parents {
                    match self.index[w] {
                        None => {
                            self.visit(w);
                            self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
                        }
                        Some(wi) if self.on_stack[w] => {
                            self.lowlink[v] = self.lowlink[v].min(wi);
                        }
                        _ => {}
                    }
                }

                if Some(self.lowlink[v]) == self.index[v] {
                    let mut component = vec![];
                    while let Some(w) = self.stack.pop() {
                        self.on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    if component.len() > 1 || graph.nodes[v].parents.contains(&v) {
                        self.out.extend(component);
                    }
                }
            }
        }

        let n = self.nodes.len();
        let mut tarjan = Tarjan {
            graph: self,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: vec![],
            next_index: 0,
            out: vec![],
        };
        for v in 0..n {
            if tarjan.index[v].is_none() {
                tarjan.visit(v);
            }
        }
        let reached = self.explore(&Reached::default(), given);
        let mut out: Vec<NodeIdx> = tarjan.out.into_iter().filter(|&v| !reached.contains(v)).collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oosrando_game::Prenode;

    #[test]
    fn test_from_prenodes() {
        let prenodes = PrenodeSet::new(vec![
            Prenode::root("start"),
            Prenode::or("horon village", &["start"]),
            Prenode::new("shop", PrenodeType::OrSlot, &["horon village"]),
            Prenode::new("d1 entrance", PrenodeType::AndStep, &["horon village", "key"]),
            Prenode::or("key", &[]),
        ])
        .unwrap();
        let g = Graph::from_prenodes(&prenodes);
        assert_eq!(g.len(), 5);
        let village = g.idx("horon village").unwrap();
        let shop = g.idx("shop").unwrap();
        let entrance = g.idx("d1 entrance").unwrap();
        assert_eq!(g.node(shop).kind, NodeKind::Or);
        assert!(g.node(shop).is_step);
        assert_eq!(g.node(entrance).kind, NodeKind::And);
        assert_eq!(g.node(village).children, vec![shop, entrance]);
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_add_remove_parent() {
        let mut g = Graph::new();
        let slot = g.add_node("slot", NodeKind::Or, true);
        let item = g.add_node("item", NodeKind::Or, false);
        let before = g.clone();
        assert!(g.add_parent(item, slot));
        assert!(!g.add_parent(item, slot));
        assert_eq!(g.node(item).parents, vec![slot]);
        assert_eq!(g.node(slot).children, vec![item]);
        assert!(g.remove_parent(item, slot));
        assert!(!g.remove_parent(item, slot));
        assert_eq!(g, before);
    }

    #[test]
    fn test_self_dependent_nodes() {
        let mut g = Graph::new();
        let start = g.add_node("start", NodeKind::Root, false);
        let a = g.add_node("a", NodeKind::And, false);
        let b = g.add_node("b", NodeKind::And, false);
        let c = g.add_node("c", NodeKind::Or, false);
        let d = g.add_node("d", NodeKind::Or, false);
        g.add_parent(a, b);
        g.add_parent(b, a);
        // Two areas connected both ways, one of them reachable from the start.
        g.add_parent(c, d);
        g.add_parent(d, c);
        g.add_parent(c, start);
        assert_eq!(g.self_dependent_nodes(&[]), vec![a, b]);
        let e = g.add_node("e", NodeKind::And, false);
        g.add_parent(e, e);
        assert_eq!(g.self_dependent_nodes(&[]), vec![a, b, e]);
    }

    #[test]
    fn test_self_dependent_through_or() {
        let prenodes = PrenodeSet::new(vec![
            Prenode::root("start"),
            Prenode::and("gate", &["start", "ledge"]),
            Prenode::or("ledge", &["gate"]),
            Prenode::new("chest", PrenodeType::OrSlot, &["ledge"]),
            Prenode::or("key", &[]),
            Prenode::or("door", &["gate", "key"]),
        ])
        .unwrap();
        let g = Graph::from_prenodes(&prenodes);
        let gate = g.idx("gate").unwrap();
        let ledge = g.idx("ledge").unwrap();
        assert_eq!(g.self_dependent_nodes(&[]), vec![gate, ledge]);

        // A cycle that some given breaks into is fine.
        let mut g = g;
        let key = g.idx("key").unwrap();
        g.add_parent(ledge, key);
        assert!(g.self_dependent_nodes(&[]).contains(&gate));
        assert!(g.self_dependent_nodes(&[key]).is_empty());
    }
}
