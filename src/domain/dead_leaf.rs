//! Dead-leaf elimination: app-defined call chains that never reach a
//! platform or third-party API carry no behavior and are removed.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::graph::{EdgeTriple, KnowledgeGraph, NodeId, Relation};

/// What a node calls in the KG, ignoring excluded callees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalleeKind {
    NoCallee,
    SelfOnly,
    HasApi,
}

pub struct DeadLeafEliminator<'g> {
    graph: &'g KnowledgeGraph,
}

impl<'g> DeadLeafEliminator<'g> {
    pub fn new(graph: &'g KnowledgeGraph) -> Self {
        Self { graph }
    }

    pub fn classify(&self, node: NodeId, excluded: Option<&HashSet<NodeId>>) -> CalleeKind {
        let mut remaining = self
            .graph
            .call_targets(node)
            .iter()
            .filter(|t| excluded.map_or(true, |ex| !ex.contains(*t)))
            .peekable();
        if remaining.peek().is_none() {
            return CalleeKind::NoCallee;
        }
        if remaining.all(|&t| self.graph.is_app_defined(t)) {
            CalleeKind::SelfOnly
        } else {
            CalleeKind::HasApi
        }
    }

    /// Edges of `edges` that belong to dead call chains.
    pub fn eliminate(&self, edges: &BTreeSet<EdgeTriple>) -> HashSet<EdgeTriple> {
        let mut candidates: Vec<(NodeId, NodeId)> = edges
            .iter()
            .filter(|e| {
                e.relation == Relation::Call
                    && self.graph.is_app_defined(e.from)
                    && self.graph.is_app_defined(e.to)
            })
            .map(|e| (e.from, e.to))
            .collect();
        let mut excluded: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
        let mut dead_callees: HashSet<NodeId> = HashSet::new();

        loop {
            let before = candidates.len();
            let mut remaining = Vec::with_capacity(candidates.len());
            for (caller, callee) in candidates {
                if self.classify(callee, excluded.get(&callee)) == CalleeKind::NoCallee {
                    dead_callees.insert(callee);
                    excluded.entry(caller).or_default().insert(callee);
                } else {
                    remaining.push((caller, callee));
                }
            }
            candidates = remaining;
            if candidates.len() == before {
                break;
            }
        }

        edges
            .iter()
            .filter(|e| dead_callees.contains(&e.to))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::Node;

    /// 0 -> 1 -> 2 (leaf), 0 -> 3 -> 9 (api), 4 -> 5 <-> 6 (cycle)
    fn fixture() -> KnowledgeGraph {
        let mut nodes: Vec<Node> = (0..9)
            .map(|i| Node::method(format!("<com.app.C: void m{i}()>")))
            .collect();
        nodes.push(Node::library_method("<android.util.Pair: void create()>", "android.util"));
        let edges = [(0, 1), (1, 2), (0, 3), (3, 9), (4, 5), (5, 6), (6, 5)]
            .into_iter()
            .map(|(f, t)| EdgeTriple::new(f, t, Relation::Call))
            .collect();
        KnowledgeGraph::build(nodes, edges, false).unwrap()
    }

    fn calls(pairs: &[(usize, usize)]) -> BTreeSet<EdgeTriple> {
        pairs
            .iter()
            .map(|&(f, t)| EdgeTriple::new(f, t, Relation::Call))
            .collect()
    }

    #[test]
    fn test_classify() {
        let g = fixture();
        let dl = DeadLeafEliminator::new(&g);
        assert_eq!(dl.classify(2, None), CalleeKind::NoCallee);
        assert_eq!(dl.classify(1, None), CalleeKind::SelfOnly);
        assert_eq!(dl.classify(3, None), CalleeKind::HasApi);
        assert_eq!(dl.classify(1, Some(&HashSet::from([2]))), CalleeKind::NoCallee);
    }

    #[test]
    fn test_dead_chain_is_removed_transitively() {
        let g = fixture();
        let edges = calls(&[(0, 1), (1, 2), (0, 3), (3, 9)]);
        let removed = DeadLeafEliminator::new(&g).eliminate(&edges);
        assert_eq!(removed, HashSet::from([
            EdgeTriple::new(0, 1, Relation::Call),
            EdgeTriple::new(1, 2, Relation::Call),
        ]));
    }

    #[test]
    fn test_cycles_and_api_paths_survive() {
        let g = fixture();
        let edges = calls(&[(4, 5), (5, 6), (6, 5), (0, 3), (3, 9)]);
        assert!(DeadLeafEliminator::new(&g).eliminate(&edges).is_empty());
    }

    #[test]
    fn test_rerun_on_output_removes_nothing() {
        let g = fixture();
        let dl = DeadLeafEliminator::new(&g);
        let edges = calls(&[(0, 1), (1, 2), (0, 3), (3, 9), (4, 5), (5, 6)]);
        let removed = dl.eliminate(&edges);
        let survivors: BTreeSet<EdgeTriple> = edges.difference(&removed.into_iter().collect()).copied().collect();
        assert!(dl.eliminate(&survivors).is_empty());
    }

    #[test]
    fn test_non_call_edges_to_dead_callee_are_removed() {
        let mut nodes: Vec<Node> = (0..3)
            .map(|i| Node::method(format!("<com.app.C: void m{i}()>")))
            .collect();
        nodes.push(Node::widget("EditText", "main.xml", 7));
        let g = KnowledgeGraph::build(
            nodes,
            vec![EdgeTriple::new(0, 1, Relation::Call), EdgeTriple::new(3, 1, Relation::Use)],
            false,
        )
        .unwrap();
        let edges: BTreeSet<EdgeTriple> = [
            EdgeTriple::new(0, 1, Relation::Call),
            EdgeTriple::new(3, 1, Relation::Use),
        ]
        .into();
        assert_eq!(DeadLeafEliminator::new(&g).eliminate(&edges).len(), 2);
    }
}
