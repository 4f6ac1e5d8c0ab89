use oosrando_logic::{Graph, Reached};

/// Safety oracle consulted at every search step. Returns a description of
/// the problem if some currently reachable combination of states could leave
/// the goal unreachable forever. Must not modify anything.
pub trait SoftlockCheck {
    fn check(&self, graph: &Graph, reached: &Reached) -> Option<String>;
}

/// For graphs with no irreversible actions.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoSoftlock;

impl SoftlockCheck for NoSoftlock {
    fn check(&self, _graph: &Graph, _reached: &Reached) -> Option<String> {
        None
    }
}

impl<F> SoftlockCheck for F
where
    F: Fn(&Graph, &Reached) -> Option<String>,
{
    fn check(&self, graph: &Graph, reached: &Reached) -> Option<String> {
        self(graph, reached)
    }
}
