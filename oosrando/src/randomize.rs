pub mod placement;
pub mod search;

use anyhow::{bail, Result};
use log::{debug, info, log_enabled, Level};
use oosrando_game::CompatibilityOracle;
use oosrando_logic::{Graph, NodeIdx, Reached};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use thiserror::Error;

use crate::{
    route::Route,
    settings::RandomizerSettings,
    softlock::SoftlockCheck,
    spoiler_log::{Placement, Randomization},
};
use placement::{is_jewel, should_skip_item};
use search::Search;

/// Why a single try of the search did not produce an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttemptError {
    // Worth retrying with a different shuffle.
    #[error("routing took too long ({iterations} iterations)")]
    Inconclusive { iterations: usize },
    // Every candidate at the top level failed: retrying won't help.
    #[error("no slot/item combination worked")]
    Unsatisfiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Indeterminate,
    FillUnused, // Goals reached, some slots still open
    Success,
    Invalid,
}

// Progress exemptions, resolved to nodes present in the graph.
struct Exemptions {
    harvest_node: Option<NodeIdx>,
    seed_node: Option<NodeIdx>,
    harvest_items: Vec<NodeIdx>,
    first_gale_seed: Option<NodeIdx>,
}

pub struct Randomizer<'a> {
    pub oracle: &'a dyn CompatibilityOracle,
    pub softlock: &'a dyn SoftlockCheck,
    pub settings: &'a RandomizerSettings,
    goal: Vec<NodeIdx>,
    forbid: Vec<NodeIdx>,
    exemptions: Exemptions,
    max_len: usize,
}

fn resolve(graph: &Graph, names: &[String], what: &str) -> Result<Vec<NodeIdx>> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match graph.idx(name) {
            Some(idx) => out.push(idx),
            None => bail!("unknown {} node: {}", what, name),
        }
    }
    Ok(out)
}

impl<'a> Randomizer<'a> {
    pub fn new(
        route: &Route,
        oracle: &'a dyn CompatibilityOracle,
        softlock: &'a dyn SoftlockCheck,
        settings: &'a RandomizerSettings,
    ) -> Result<Self> {
        settings.check()?;
        let graph = &route.graph;
        let start = resolve(graph, &settings.start, "start")?;
        if start != route.start {
            bail!("settings start nodes do not match the route's givens");
        }
        let goal = resolve(graph, &settings.goal, "goal")?;
        let forbid = resolve(graph, &settings.forbid, "forbidden")?;
        if let Some(&f) = forbid.iter().find(|f| goal.contains(f)) {
            bail!("node {} is both a goal and forbidden", graph.name(f));
        }
        let ex = &settings.progress_exemptions;
        let exemptions = Exemptions {
            harvest_node: graph.idx(&ex.harvest_node),
            seed_node: graph.idx(&ex.seed_node),
            harvest_items: ex.harvest_items.iter().filter_map(|x| graph.idx(x)).collect(),
            first_gale_seed: graph.idx(&ex.first_gale_seed),
        };
        Ok(Randomizer {
            oracle,
            softlock,
            settings,
            goal,
            forbid,
            exemptions,
            max_len: settings.max_len.unwrap_or(route.slots.len()),
        })
    }

    /// Runs tries until one succeeds. A try that hits the iteration ceiling is
    /// retried with a fresh shuffle; a try that exhausts every candidate means
    /// no assignment exists, and is fatal.
    pub fn randomize(&self, route: &mut Route, seed: usize) -> Result<Randomization> {
        let mut rng_seed = [0u8; 32];
        rng_seed[..8].copy_from_slice(&seed.to_le_bytes());
        let mut rng = rand::rngs::StdRng::from_seed(rng_seed);

        let max_tries = self.settings.max_tries;
        for attempt_num in 1..=max_tries {
            info!(
                "[attempt {attempt_num}] routing {} items into {} slots",
                route.items.len(),
                route.slots.len()
            );
            match self.attempt(route, attempt_num, &mut rng) {
                Ok(placements) => {
                    info!("[attempt {attempt_num}] success");
                    let randomization = self.get_randomization(route, &placements, seed, attempt_num);
                    for p in &randomization.placements {
                        info!("{} <- {}", p.item, p.slot);
                    }
                    return Ok(randomization);
                }
                Err(AttemptError::Inconclusive { iterations }) => {
                    info!("[attempt {attempt_num}] routing took too long ({iterations} iterations); retrying");
                }
                Err(AttemptError::Unsatisfiable) => {
                    bail!("could not find route: {}", self.diagnose(route));
                }
            }
        }
        bail!(
            "could not find route after {max_tries} tries: {}",
            self.diagnose(route)
        )
    }

    /// One try: shuffle the item and slot stacks and search from scratch. The
    /// graph is left wired with the assignment on success and restored on
    /// failure.
    pub fn attempt<R: Rng>(
        &self,
        route: &mut Route,
        attempt_num: usize,
        rng: &mut R,
    ) -> Result<Vec<(NodeIdx, NodeIdx)>, AttemptError> {
        let mut items = route.items.clone();
        let mut slots = route.slots.clone();
        items.shuffle(rng);
        slots.shuffle(rng);
        let start = route.start.clone();

        let mut search = Search::new(&mut route.graph, items, slots);
        let result =
            self.try_explore_targets(&mut search, &Reached::default(), &start, self.max_len);
        match result {
            Ok(true) => Ok(search.placements()),
            Ok(false) => {
                debug!("[attempt {attempt_num}] no slot/item combination worked");
                search.rewind(0);
                Err(AttemptError::Unsatisfiable)
            }
            Err(e) => {
                search.rewind(0);
                Err(e)
            }
        }
    }

    // Tries to reach all the goals using the current graph. If they are not
    // reached yet, tries placing each unused item in each reachable unused
    // slot and recurses. Returns Ok(false) if no combination works.
    fn try_explore_targets(
        &self,
        search: &mut Search,
        start: &Reached,
        add: &[NodeIdx],
        max_len: usize,
    ) -> Result<bool, AttemptError> {
        search.iteration += 1;
        if search.iteration > self.settings.max_iterations {
            debug!("-- false; maximum iterations reached");
            return Err(AttemptError::Inconclusive {
                iterations: search.iteration - 1,
            });
        }
        debug!("iteration {}", search.iteration);

        let reached = search.graph.explore(start, add);
        debug!("{} steps reached", reached.count_steps(search.graph));

        let fill_unused = match self.check_route_state(search, start, &reached, add, max_len) {
            RouteState::Success => return Ok(true),
            RouteState::Invalid => return Ok(false),
            RouteState::FillUnused => true,
            RouteState::Indeterminate => false,
        };

        for _ in 0..search.slots.len() {
            let Some(slot) = search.rotate_slots() else {
                break;
            };
            // The slot must be reachable, unless the goals are and we're just
            // filling the rest.
            if !reached.contains(slot) && !fill_unused {
                continue;
            }
            let slot_mark = search.mark();
            search.use_front_slot();

            let mut jewel_checked = false;
            for _ in 0..search.items.len() {
                let item_mark = search.mark();
                let Some(item) = search.use_back_item() else {
                    break;
                };
                search.wire(item, slot);
                if log_enabled!(Level::Debug) {
                    debug!("trying {}", search.item_sequence());
                }

                let skip = should_skip_item(
                    self.oracle,
                    search.graph,
                    &reached,
                    item,
                    slot,
                    &mut jewel_checked,
                    fill_unused,
                );
                if !skip {
                    debug!("trying slot {}", search.graph.name(slot));
                    if self.try_explore_targets(
                        search,
                        &reached,
                        &[item],
                        max_len.saturating_sub(1),
                    )? {
                        return Ok(true);
                    }
                }
                // Unslot the item and return it to the front of the ring.
                search.rewind(item_mark);
            }
            search.rewind(slot_mark);
        }

        debug!("-- false; no slot/item combination worked");
        Ok(false)
    }

    pub fn check_route_state(
        &self,
        search: &Search,
        start: &Reached,
        reached: &Reached,
        add: &[NodeIdx],
        max_len: usize,
    ) -> RouteState {
        let graph: &Graph = &*search.graph;
        if let Some(&node) = self.forbid.iter().find(|&&f| reached.contains(f)) {
            debug!("-- false; reached forbidden node {}", graph.name(node));
            return RouteState::Invalid;
        }

        if let Some(err) = self.softlock.check(graph, reached) {
            debug!("-- false; {}", err);
            return RouteState::Invalid;
        }

        // Success if all goal nodes are reached *and* all slots are filled.
        if let Some(&node) = self.goal.iter().find(|&&g| !reached.contains(g)) {
            debug!("-- have not reached goal node {}", graph.name(node));
        } else {
            if search.slots.is_empty() {
                debug!("-- true; all goals reached and slots filled");
                return RouteState::Success;
            }
            debug!("-- all goals reached; filling extra slots");
            return RouteState::FillUnused;
        }

        if let Some(&added) = add.first() {
            if self.needs_progress(search, reached, added) {
                let (steps, start_steps) = (reached.count_steps(graph), start.count_steps(graph));
                if steps <= start_steps {
                    debug!("-- false; reached steps {steps} <= start steps {start_steps}");
                    return RouteState::Invalid;
                }
            }
        }

        if max_len == 0 {
            debug!("-- false; placed max_len items");
            return RouteState::Invalid;
        }

        RouteState::Indeterminate
    }

    // Whether adding this node must increase the number of reached steps for
    // the branch to continue. Exempt are: jewels, which reach nothing until
    // enough of them are placed; the first item of a try, which may be needed
    // together with later ones; and, once the player can harvest, seed
    // carriers and the first gale seed (once a seed carrier is reachable),
    // since seeds are useless without them.
    fn needs_progress(&self, search: &Search, reached: &Reached, added: NodeIdx) -> bool {
        if is_jewel(search.graph.name(added)) {
            return false;
        }
        if search.used_items.len() == 1 {
            return false;
        }
        let ex = &self.exemptions;
        if ex.harvest_node.is_some_and(|h| reached.contains(h)) {
            if ex.harvest_items.contains(&added) {
                return false;
            }
            if ex.first_gale_seed == Some(added) && ex.seed_node.is_some_and(|s| reached.contains(s))
            {
                return false;
            }
        }
        true
    }

    fn get_randomization(
        &self,
        route: &Route,
        placements: &[(NodeIdx, NodeIdx)],
        seed: usize,
        tries: usize,
    ) -> Randomization {
        let graph = &route.graph;
        let reached = graph.explore(&Reached::default(), &route.start);
        Randomization {
            placements: placements
                .iter()
                .map(|&(item, slot)| Placement {
                    item: graph.name(item).to_string(),
                    slot: graph.name(slot).to_string(),
                })
                .collect(),
            reached: reached.iter().map(|i| graph.name(i).to_string()).collect(),
            seed,
            tries,
        }
    }

    /// Describes what stands in the way, judged with every item available at
    /// once: goals that still can't be reached, and forbidden nodes that can.
    pub fn diagnose(&self, route: &Route) -> String {
        let graph = &route.graph;
        let mut given = route.start.clone();
        given.extend(&route.items);
        let reached = graph.explore(&Reached::default(), &given);
        let unreachable: Vec<&str> = self
            .goal
            .iter()
            .filter(|&&g| !reached.contains(g))
            .map(|&g| graph.name(g))
            .collect();
        let forbidden: Vec<&str> = self
            .forbid
            .iter()
            .filter(|&&f| reached.contains(f))
            .map(|&f| graph.name(f))
            .collect();
        let mut parts = vec![];
        if !unreachable.is_empty() {
            parts.push(format!("goal nodes unreachable with all items: {}", unreachable.join(", ")));
        }
        if !forbidden.is_empty() {
            parts.push(format!("forbidden nodes reachable with all items: {}", forbidden.join(", ")));
        }
        if route.items.len() < route.slots.len() {
            parts.push(format!(
                "{} items for {} slots",
                route.items.len(),
                route.slots.len()
            ));
        }
        if parts.is_empty() {
            parts.push("placement constraints rule out every assignment".to_string());
        }
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::softlock::NoSoftlock;
    use oosrando_game::{Catalog, Prenode, PrenodeSet, PrenodeType};

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    // One reachable slot, one item: placing it anywhere reaches the goal.
    fn single_route() -> Route {
        let prenodes = PrenodeSet::new(vec![
            Prenode::root("start"),
            Prenode::new("chest", PrenodeType::OrSlot, &["start"]),
            Prenode::or("key", &[]),
            Prenode::and("door", &["key"]),
        ])
        .unwrap();
        Route::new(&prenodes, &names(&["start"]), &names(&["key"])).unwrap()
    }

    #[test]
    fn test_attempt_single_placement() {
        let mut route = single_route();
        let settings = RandomizerSettings::new(&["start"], &["door"], &[]);
        let catalog = Catalog::default();
        let rando = Randomizer::new(&route, &catalog, &NoSoftlock, &settings).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let placements = rando.attempt(&mut route, 1, &mut rng).unwrap();
        let key = route.graph.idx("key").unwrap();
        let chest = route.graph.idx("chest").unwrap();
        assert_eq!(placements, vec![(key, chest)]);
        assert_eq!(route.graph.node(key).parents, vec![chest]);
    }

    #[test]
    fn test_attempt_restores_graph_on_failure() {
        let mut route = single_route();
        let settings = RandomizerSettings::new(&["start"], &["door"], &["door"]);
        let catalog = Catalog::default();
        assert!(Randomizer::new(&route, &catalog, &NoSoftlock, &settings).is_err());

        let settings = RandomizerSettings::new(&["start"], &["door"], &["key"]);
        let rando = Randomizer::new(&route, &catalog, &NoSoftlock, &settings).unwrap();
        let before = route.graph.clone();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert_eq!(
            rando.attempt(&mut route, 1, &mut rng),
            Err(AttemptError::Unsatisfiable)
        );
        assert_eq!(route.graph, before);
        assert!(rando.diagnose(&route).contains("forbidden nodes reachable with all items: key"));
    }

    #[test]
    fn test_iteration_ceiling_is_inconclusive() {
        let mut route = single_route();
        let mut settings = RandomizerSettings::new(&["start"], &["door"], &[]);
        settings.max_iterations = 1;
        let catalog = Catalog::default();
        let rando = Randomizer::new(&route, &catalog, &NoSoftlock, &settings).unwrap();
        let before = route.graph.clone();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert_eq!(
            rando.attempt(&mut route, 1, &mut rng),
            Err(AttemptError::Inconclusive { iterations: 1 })
        );
        assert_eq!(route.graph, before);
        let err = rando.randomize(&mut route, 7).unwrap_err();
        assert!(err.to_string().contains("after 10 tries"));
    }

    #[test]
    fn test_unknown_goal_is_fatal() {
        let route = single_route();
        let settings = RandomizerSettings::new(&["start"], &["maku tree"], &[]);
        let catalog = Catalog::default();
        assert!(Randomizer::new(&route, &catalog, &NoSoftlock, &settings).is_err());
    }
}
