use oosrando_game::CompatibilityOracle;
use oosrando_logic::{Graph, NodeIdx, Reached};

pub const JEWEL_SUFFIX: &str = " jewel";

// The jewels are functionally identical: nothing that needs one needs a
// particular one.
pub fn is_jewel(name: &str) -> bool {
    name.ends_with(JEWEL_SUFFIX)
}

/// Returns true if the item should not be tried in the slot. `jewel_checked`
/// tracks whether a jewel has already been tried in this slot; only the first
/// jewel that passes the other rules is.
pub fn should_skip_item(
    oracle: &dyn CompatibilityOracle,
    graph: &Graph,
    reached: &Reached,
    item: NodeIdx,
    slot: NodeIdx,
    jewel_checked: &mut bool,
    fill_unused: bool,
) -> bool {
    let item_name = graph.name(item);
    let slot_name = graph.name(slot);

    // The slot's code doesn't set the sub ID at all, leaving it zeroed.
    if oracle.requires_zero_sub_id(slot_name) && oracle.sub_id_of(item_name) != 0 {
        return true;
    }
    if !oracle.can_render_in_slot(item_name, slot_name) {
        return true;
    }
    // Seeds go in seed trees and nothing else does.
    match (oracle.is_seed_item(item_name), oracle.is_seed_tree(slot_name)) {
        (true, true) => {
            if !fill_unused && !can_reach_in_season_seeds(oracle, graph, reached, item, slot) {
                return true;
            }
        }
        (true, false) | (false, true) => return true,
        (false, false) => {}
    }

    if is_jewel(item_name) {
        if *jewel_checked {
            return true;
        }
        *jewel_checked = true;
    }
    false
}

/// A seed should not be placed in a tree if the player can't actually harvest
/// it there: seeds only grow in their own season. Assumes the tree itself is
/// already reachable.
pub fn can_reach_in_season_seeds(
    oracle: &dyn CompatibilityOracle,
    graph: &Graph,
    reached: &Reached,
    item: NodeIdx,
    slot: NodeIdx,
) -> bool {
    let Some(tree) = oracle.seed_tree(graph.name(slot)) else {
        return false;
    };
    let Some(season) = oracle.season_of(graph.name(item)) else {
        return false;
    };
    match tree.native_season {
        None => true,
        Some(native) if native == season => true,
        Some(_) => tree.season_change.iter().any(|group| {
            group
                .iter()
                .all(|name| graph.idx(name).is_some_and(|idx| reached.contains(idx)))
        }),
    }
}
