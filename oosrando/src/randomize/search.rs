use std::collections::VecDeque;

use oosrando_logic::{Graph, NodeIdx};

/// One reversible change made while descending the search tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrailEntry {
    UseSlot(NodeIdx),
    UseItem(NodeIdx),
    Wire { item: NodeIdx, slot: NodeIdx },
}

/// Mutable state of one search try. Every change to the graph or to the
/// used/unused collections goes through a method here that records it on the
/// trail, and `rewind` undoes changes newest-first back to a mark.
///
/// The unused items and slots are rings: a slot is probed by rotating the back
/// to the front, an item is taken from the back and returned to the front. The
/// rotation itself is deliberately not undone, so sibling branches start from
/// a different slot and item.
pub struct Search<'g> {
    pub graph: &'g mut Graph,
    pub items: VecDeque<NodeIdx>,
    pub slots: VecDeque<NodeIdx>,
    // Parallel: used_items[i] was placed into used_slots[i]
    pub used_items: Vec<NodeIdx>,
    pub used_slots: Vec<NodeIdx>,
    pub iteration: usize,
    trail: Vec<TrailEntry>,
}

impl<'g> Search<'g> {
    pub fn new(graph: &'g mut Graph, items: Vec<NodeIdx>, slots: Vec<NodeIdx>) -> Self {
        Search {
            graph,
            items: items.into(),
            slots: slots.into(),
            used_items: vec![],
            used_slots: vec![],
            iteration: 0,
            trail: vec![],
        }
    }

    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    /// Moves the back slot to the front and returns it.
    pub fn rotate_slots(&mut self) -> Option<NodeIdx> {
        let slot = self.slots.pop_back()?;
        self.slots.push_front(slot);
        Some(slot)
    }

    /// Moves the front slot (the one just rotated in) to the used list.
    pub fn use_front_slot(&mut self) -> Option<NodeIdx> {
        let slot = self.slots.pop_front()?;
        self.used_slots.push(slot);
        self.trail.push(TrailEntry::UseSlot(slot));
        Some(slot)
    }

    pub fn use_back_item(&mut self) -> Option<NodeIdx> {
        let item = self.items.pop_back()?;
        self.used_items.push(item);
        self.trail.push(TrailEntry::UseItem(item));
        Some(item)
    }

    /// Makes the slot the item's parent: the item is reached exactly when the
    /// slot is.
    pub fn wire(&mut self, item: NodeIdx, slot: NodeIdx) {
        if self.graph.add_parent(item, slot) {
            self.trail.push(TrailEntry::Wire { item, slot });
        }
    }

    pub fn rewind(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some(entry) = self.trail.pop() else {
                break;
            };
            match entry {
                TrailEntry::Wire { item, slot } => {
                    self.graph.remove_parent(item, slot);
                }
                TrailEntry::UseItem(item) => {
                    let popped = self.used_items.pop();
                    debug_assert_eq!(popped, Some(item));
                    self.items.push_front(item);
                }
                TrailEntry::UseSlot(slot) => {
                    let popped = self.used_slots.pop();
                    debug_assert_eq!(popped, Some(slot));
                    self.slots.push_front(slot);
                }
            }
        }
    }

    pub fn placements(&self) -> Vec<(NodeIdx, NodeIdx)> {
        self.used_items
            .iter()
            .copied()
            .zip(self.used_slots.iter().copied())
            .collect()
    }

    pub fn item_sequence(&self) -> String {
        let names: Vec<&str> = self.used_items.iter().map(|&i| self.graph.name(i)).collect();
        names.join(" -> ")
    }
}
