use std::collections::VecDeque;

use crate::{Graph, NodeIdx, NodeKind};

/// The set of nodes satisfiable under the current wiring. Indexed by NodeIdx;
/// indices past the end are unreached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reached {
    bits: Vec<bool>,
}

impl Reached {
    pub fn new(num_nodes: usize) -> Self {
        Reached {
            bits: vec![false; num_nodes],
        }
    }

    pub fn contains(&self, idx: NodeIdx) -> bool {
        self.bits.get(idx).copied().unwrap_or(false)
    }

    /// Returns true if the node was not already reached.
    pub fn insert(&mut self, idx: NodeIdx) -> bool {
        if idx >= self.bits.len() {
            self.bits.resize(idx + 1, false);
        }
        !std::mem::replace(&mut self.bits[idx], true)
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&x| x).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &x)| x)
            .map(|(i, _)| i)
    }

    pub fn is_superset(&self, other: &Reached) -> bool {
        other.iter().all(|i| self.contains(i))
    }

    pub fn count_steps(&self, graph: &Graph) -> usize {
        self.iter()
            .filter(|&i| i < graph.len() && graph.nodes[i].is_step)
            .count()
    }
}

impl Graph {
    fn is_satisfied(&self, idx: NodeIdx, reached: &Reached) -> bool {
        let node = &self.nodes[idx];
        match node.kind {
            NodeKind::Root => true,
            NodeKind::And => {
                !node.parents.is_empty() && node.parents.iter().all(|&p| reached.contains(p))
            }
            NodeKind::Or => node.parents.iter().any(|&p| reached.contains(p)),
        }
    }

    /// Computes the least fixed point of reachability, starting from `prior`
    /// with every node in `given` forced reached. Nodes already in `prior` stay
    /// reached.
    pub fn explore(&self, prior: &Reached, given: &[NodeIdx]) -> Reached {
        let mut reached = prior.clone();
        reached.bits.resize(self.nodes.len().max(reached.bits.len()), false);
        let mut queue: VecDeque<NodeIdx> = VecDeque::new();

        for &idx in given {
            if reached.insert(idx) {
                queue.push_back(idx);
            }
        }
        // Anything newly satisfied by `prior` alone (roots, or edges wired
        // since `prior` was computed):
        for idx in 0..self.nodes.len() {
            if !reached.contains(idx) && self.is_satisfied(idx, &reached) {
                reached.insert(idx);
                queue.push_back(idx);
            }
        }
        // A node can only become satisfied once one of its parents is reached,
        // so propagating along child edges finds the whole fixed point.
        while let Some(idx) = queue.pop_front() {
            for &child in &self.nodes[idx].children {
                if !reached.contains(child) && self.is_satisfied(child, &reached) {
                    reached.insert(child);
                    queue.push_back(child);
                }
            }
        }
        reached
    }

    /// Same fixed point as `explore`, computed by repeated full scans visiting
    /// nodes in the given order until a scan adds nothing.
    pub fn explore_by_scan(&self, prior: &Reached, given: &[NodeIdx], order: &[NodeIdx]) -> Reached {
        let mut reached = prior.clone();
        for &idx in given {
            reached.insert(idx);
        }
        loop {
            let mut changed = false;
            for &idx in order {
                if !reached.contains(idx) && self.is_satisfied(idx, &reached) {
                    reached.insert(idx);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        reached.bits.resize(self.nodes.len().max(reached.bits.len()), false);
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    fn three_parent_graph(kind: NodeKind) -> (Graph, Vec<NodeIdx>, NodeIdx) {
        let mut g = Graph::new();
        let parents: Vec<NodeIdx> = ["p1", "p2", "p3"]
            .iter()
            .map(|name| g.add_node(name, NodeKind::Or, false))
            .collect();
        let target = g.add_node("target", kind, false);
        for &p in &parents {
            g.add_parent(target, p);
        }
        (g, parents, target)
    }

    #[test]
    fn test_and_semantics() {
        let (g, parents, target) = three_parent_graph(NodeKind::And);
        for mask in 0..8usize {
            let given: Vec<NodeIdx> = (0..3usize).filter(|&i| mask & (1 << i) != 0).map(|i| parents[i]).collect();
            let reached = g.explore(&Reached::default(), &given);
            assert_eq!(reached.contains(target), mask == 7, "mask={mask}");
        }
    }

    #[test]
    fn test_or_semantics() {
        let (g, parents, target) = three_parent_graph(NodeKind::Or);
        for mask in 0..8usize {
            let given: Vec<NodeIdx> = (0..3usize).filter(|&i| mask & (1 << i) != 0).map(|i| parents[i]).collect();
            let reached = g.explore(&Reached::default(), &given);
            assert_eq!(reached.contains(target), mask != 0, "mask={mask}");
        }
    }

    #[test]
    fn test_root_always_reached() {
        let mut g = Graph::new();
        let root = g.add_node("start", NodeKind::Root, false);
        let orphan_and = g.add_node("orphan", NodeKind::And, false);
        let orphan_or = g.add_node("item", NodeKind::Or, false);
        let reached = g.explore(&Reached::default(), &[]);
        assert!(reached.contains(root));
        assert!(!reached.contains(orphan_and));
        assert!(!reached.contains(orphan_or));
        assert_eq!(reached.count(), 1);
    }

    #[test]
    fn test_chain_and_steps() {
        let mut g = Graph::new();
        let start = g.add_node("start", NodeKind::Root, false);
        let village = g.add_node("village", NodeKind::Or, false);
        let slot = g.add_node("shop", NodeKind::Or, true);
        let item = g.add_node("feather", NodeKind::Or, false);
        let beach = g.add_node("beach", NodeKind::And, true);
        g.add_parent(village, start);
        g.add_parent(slot, village);
        g.add_parent(beach, village);
        g.add_parent(beach, item);

        let r1 = g.explore(&Reached::default(), &[]);
        assert_eq!(r1.count_steps(&g), 1);
        assert!(!r1.contains(beach));

        g.add_parent(item, slot);
        let r2 = g.explore(&r1, &[item]);
        assert!(r2.contains(beach));
        assert_eq!(r2.count_steps(&g), 2);
        assert!(r2.is_superset(&r1));
    }

    fn random_graph(seed: u64, num_nodes: usize, num_edges: usize) -> Graph {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut g = Graph::new();
        for i in 0..num_nodes {
            let kind = match rng.gen_range(0..10) {
                0 => NodeKind::Root,
                1..=4 => NodeKind::And,
                _ => NodeKind::Or,
            };
            g.add_node(&format!("n{i}"), kind, rng.gen_bool(0.3));
        }
        for _ in 0..num_edges {
            let child = rng.gen_range(0..num_nodes);
            let parent = rng.gen_range(0..num_nodes);
            if g.nodes[child].kind != NodeKind::Root {
                g.add_parent(child, parent);
            }
        }
        g
    }

    proptest! {
        #[test]
        fn explore_is_independent_of_scan_order(
            seed in any::<u64>(),
            num_nodes in 1usize..40,
            edge_factor in 0usize..4,
            given_mask in any::<u64>(),
            prior_mask in any::<u64>(),
        ) {
            let g = random_graph(seed, num_nodes, num_nodes * edge_factor);
            let given: Vec<NodeIdx> = (0..num_nodes).filter(|i| given_mask & (1 << (i % 64)) != 0 && i % 3 == 0).collect();
            let prior_given: Vec<NodeIdx> = (0..num_nodes).filter(|i| prior_mask & (1 << (i % 64)) != 0 && i % 4 == 1).collect();
            let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);

            for prior in [Reached::default(), g.explore(&Reached::default(), &prior_given)] {
                let expected = g.explore(&prior, &given);
                let mut order: Vec<NodeIdx> = (0..num_nodes).collect();
                for _ in 0..4 {
                    order.shuffle(&mut rng);
                    let scanned = g.explore_by_scan(&prior, &given, &order);
                    prop_assert_eq!(&scanned, &expected);
                }
            }
        }

        #[test]
        fn explore_is_monotone(
            seed in any::<u64>(),
            num_nodes in 1usize..40,
            first in any::<u64>(),
            second in any::<u64>(),
        ) {
            let g = random_graph(seed, num_nodes, num_nodes * 2);
            let given1: Vec<NodeIdx> = (0..num_nodes).filter(|i| first & (1 << (i % 64)) != 0).collect();
            let given2: Vec<NodeIdx> = (0..num_nodes).filter(|i| second & (1 << (i % 64)) != 0).collect();
            let prior = g.explore(&Reached::default(), &given1);
            let next = g.explore(&prior, &given2);
            prop_assert!(next.is_superset(&prior));
            for &i in &given2 {
                prop_assert!(next.contains(i));
            }
        }
    }
}
