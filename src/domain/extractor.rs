//! Reachability extraction.
//!
//! For every UI control with an event listener, walks the KG from each event
//! callback and collects the subgraph that the event can reach.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::domain::behavior::RawBehavior;
use crate::domain::graph::{EdgeTriple, KnowledgeGraph, NodeId, Relation};
use crate::domain::noise::NoiseClassifier;

/// Traversal options for one extraction run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Hops allowed past the first third-party/API call; `None` is unlimited.
    pub native_hop: Option<u32>,
    /// When false, mundane nodes are expanded like any other node.
    pub noise_filter: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            native_hop: None,
            noise_filter: true,
        }
    }
}

/// Per-DFS scratch state.
#[derive(Default)]
struct Walk {
    visited: HashSet<NodeId>,
    stack: Vec<NodeId>,
    edges: BTreeSet<EdgeTriple>,
    api_depth: HashMap<NodeId, i64>,
}

pub struct ReachabilityExtractor<'g> {
    graph: &'g KnowledgeGraph,
    noise: &'g NoiseClassifier,
    options: ExtractOptions,
}

impl<'g> ReachabilityExtractor<'g> {
    pub fn new(graph: &'g KnowledgeGraph, noise: &'g NoiseClassifier, options: ExtractOptions) -> Self {
        Self {
            graph,
            noise,
            options,
        }
    }

    /// One raw behavior per retained (control, callback) pair, ordered by
    /// control id then adjacency order of the callbacks.
    pub fn extract_all(&self) -> Vec<RawBehavior> {
        let mut behaviors = Vec::new();
        for &ui in self.graph.ui_controls_act() {
            for callback in self.event_callbacks(ui) {
                if let Some(behavior) = self.extract(ui, callback) {
                    behaviors.push(behavior);
                }
            }
        }
        debug!(
            controls = self.graph.ui_controls_act().len(),
            behaviors = behaviors.len(),
            "extraction finished"
        );
        behaviors
    }

    /// Distinct callbacks reachable through `event` edges from `ui`.
    pub fn event_callbacks(&self, ui: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.graph
            .neighbors(ui)
            .iter()
            .filter(|(_, relation)| *relation == Relation::Event)
            .map(|&(callee, _)| callee)
            .filter(|callee| seen.insert(*callee))
            .collect()
    }

    /// Build the behavior for `ui` firing `callback`. Returns `None` when the
    /// subgraph is too small to describe anything beyond the trigger edge.
    pub fn extract(&self, ui: NodeId, callback: NodeId) -> Option<RawBehavior> {
        let mut walk = Walk::default();
        walk.visited.insert(callback);
        walk.stack.push(callback);
        self.dfs(&mut walk);

        // ui -> code links whose code side was reached
        for edge in self.graph.ui_code_edges() {
            if edge.relation >= Relation::Use && walk.visited.contains(&edge.to) {
                walk.edges.insert(*edge);
            }
        }

        let mut cuid = self.subsumed_controls(&walk.edges);
        walk.edges.insert(EdgeTriple::new(ui, callback, Relation::Event));
        cuid.remove(&ui);

        // ui -> app code -> at least one more hop
        if walk.edges.len() <= 1 {
            debug!(ui, callback, "discarding trivial behavior");
            return None;
        }
        Some(RawBehavior::new(ui, callback, walk.edges, cuid))
    }

    fn dfs(&self, walk: &mut Walk) {
        while let Some(node) = walk.stack.pop() {
            for &(child, relation) in self.graph.neighbors(node) {
                if self.options.noise_filter && self.noise.is_noise(self.graph.name_of(child)) {
                    continue;
                }
                if relation == Relation::Call && !self.within_hop_limit(walk, node, child) {
                    continue;
                }
                walk.edges.insert(EdgeTriple::new(node, child, relation));
                if walk.visited.insert(child) {
                    walk.stack.push(child);
                }
            }
        }
    }

    /// Track how deep a call chain runs past the app/library boundary. The
    /// first library callee of app code sits at depth 0.
    fn within_hop_limit(&self, walk: &mut Walk, node: NodeId, child: NodeId) -> bool {
        let Some(limit) = self.options.native_hop else {
            return true;
        };
        if self.graph.is_app_defined(child) {
            return true;
        }
        let parent_depth = if self.graph.is_app_defined(node) {
            walk.api_depth.insert(node, -1);
            -1
        } else {
            *walk.api_depth.entry(node).or_insert(0)
        };
        let depth = parent_depth + 1;
        walk.api_depth.insert(child, depth);
        depth <= i64::from(limit)
    }

    /// UI nodes whose whole outgoing adjacency is already inside `edges`.
    fn subsumed_controls(&self, edges: &BTreeSet<EdgeTriple>) -> BTreeSet<NodeId> {
        let mut cuid = BTreeSet::new();
        for edge in self.graph.ui_code_edges() {
            let ui = edge.from;
            if cuid.contains(&ui) || self.graph.neighbors(ui).is_empty() {
                continue;
            }
            if self.graph.outgoing(ui).all(|e| edges.contains(&e)) {
                cuid.insert(ui);
            }
        }
        cuid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::Node;
    use crate::domain::noise::KeywordSet;

    const ON_CLICK: &str = "<com.app.Main: void onClick(android.view.View)>";

    /// Ids are dense, so the fixture pads unused rows with filler methods.
    fn graph(named: &[(usize, Node)], edges: &[(usize, usize, Relation)]) -> KnowledgeGraph {
        let len = named.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
        let mut nodes: Vec<Node> = (0..len)
            .map(|i| Node::method(format!("<com.app.Filler: void f{i}()>")))
            .collect();
        for (id, node) in named {
            nodes[*id] = node.clone();
        }
        let edges = edges.iter().map(|&(f, t, r)| EdgeTriple::new(f, t, r)).collect();
        KnowledgeGraph::build(nodes, edges, false).unwrap()
    }

    fn scenario_nodes() -> Vec<(usize, Node)> {
        vec![
            (5, Node::widget("Button", "main.xml", 2131230821)),
            (10, Node::method(ON_CLICK)),
            (11, Node::method("<com.app.Session: void logout()>")),
            (12, Node::method("<com.app.Session: java.lang.String toString()>")),
            (
                99,
                Node::library_method(
                    "<android.content.Context: void startActivity(android.content.Intent)>",
                    "android.content",
                ),
            ),
        ]
    }

    fn edge(f: usize, t: usize, r: Relation) -> EdgeTriple {
        EdgeTriple::new(f, t, r)
    }

    #[test]
    fn test_single_event_chain() {
        let g = graph(
            &scenario_nodes(),
            &[
                (5, 10, Relation::Event),
                (10, 11, Relation::Call),
                (11, 99, Relation::Call),
            ],
        );
        let noise = NoiseClassifier::permissive();
        let behaviors = ReachabilityExtractor::new(&g, &noise, ExtractOptions::default()).extract_all();

        assert_eq!(behaviors.len(), 1);
        let b = &behaviors[0];
        assert_eq!((b.uid, b.eid), (5, 10));
        assert_eq!(
            b.edges,
            BTreeSet::from([
                edge(5, 10, Relation::Event),
                edge(10, 11, Relation::Call),
                edge(11, 99, Relation::Call),
            ])
        );
        assert_eq!((b.size.node, b.size.edge), (4, 3));
    }

    #[test]
    fn test_noise_nodes_are_not_traversed() {
        let g = graph(
            &scenario_nodes(),
            &[
                (5, 10, Relation::Event),
                (10, 11, Relation::Call),
                (11, 99, Relation::Call),
                (11, 12, Relation::Call),
            ],
        );
        let noise = NoiseClassifier::new(KeywordSet::new(["toString"]), KeywordSet::new(Vec::<String>::new()));
        let b = ReachabilityExtractor::new(&g, &noise, ExtractOptions::default())
            .extract(5, 10)
            .unwrap();
        assert!(b.edges.iter().all(|e| e.to != 12 && e.from != 12));
        assert_eq!(b.size.edge, 3);

        let unfiltered = ExtractOptions {
            noise_filter: false,
            ..ExtractOptions::default()
        };
        let b = ReachabilityExtractor::new(&g, &noise, unfiltered).extract(5, 10).unwrap();
        assert!(b.edges.contains(&edge(11, 12, Relation::Call)));
    }

    #[test]
    fn test_hop_limit_stops_inside_libraries() {
        let mut nodes = scenario_nodes();
        nodes.push((100, Node::library_method("<android.app.Activity: void finish()>", "android.app")));
        nodes.push((101, Node::library_method("<android.app.Activity: void onDestroy()>", "android.app")));
        let edges = [
            (5, 10, Relation::Event),
            (10, 11, Relation::Call),
            (11, 99, Relation::Call),
            (99, 100, Relation::Call),
            (100, 101, Relation::Call),
        ];
        let g = graph(&nodes, &edges);
        let noise = NoiseClassifier::permissive();

        let hop0 = ExtractOptions {
            native_hop: Some(0),
            noise_filter: true,
        };
        let b = ReachabilityExtractor::new(&g, &noise, hop0).extract(5, 10).unwrap();
        assert!(b.edges.contains(&edge(11, 99, Relation::Call)));
        assert!(!b.edges.contains(&edge(99, 100, Relation::Call)));
        assert!(!b.node_ids().contains(&101));

        let hop1 = ExtractOptions {
            native_hop: Some(1),
            noise_filter: true,
        };
        let b = ReachabilityExtractor::new(&g, &noise, hop1).extract(5, 10).unwrap();
        assert!(b.edges.contains(&edge(99, 100, Relation::Call)));
        assert!(!b.edges.contains(&edge(100, 101, Relation::Call)));

        let b = ReachabilityExtractor::new(&g, &noise, ExtractOptions::default())
            .extract(5, 10)
            .unwrap();
        assert!(b.edges.contains(&edge(100, 101, Relation::Call)));
    }

    #[test]
    fn test_use_edges_and_subsumed_controls() {
        let mut nodes = scenario_nodes();
        nodes.push((6, Node::widget("EditText", "main.xml", 2131230822)));
        let g = graph(
            &nodes,
            &[
                (5, 10, Relation::Event),
                (10, 11, Relation::Call),
                (11, 99, Relation::Call),
                (6, 11, Relation::Use),
            ],
        );
        let noise = NoiseClassifier::permissive();
        let b = ReachabilityExtractor::new(&g, &noise, ExtractOptions::default())
            .extract(5, 10)
            .unwrap();
        assert!(b.edges.contains(&edge(6, 11, Relation::Use)));
        assert_eq!(b.cuid, BTreeSet::from([6]));
    }

    #[test]
    fn test_trigger_is_never_its_own_child() {
        let g = graph(
            &scenario_nodes(),
            &[(5, 10, Relation::Event), (10, 11, Relation::Call)],
        );
        let noise = NoiseClassifier::permissive();
        let b = ReachabilityExtractor::new(&g, &noise, ExtractOptions::default())
            .extract(5, 10)
            .unwrap();
        assert!(b.cuid.is_empty());
    }

    #[test]
    fn test_trivial_behavior_is_discarded() {
        let g = graph(&scenario_nodes(), &[(5, 10, Relation::Event)]);
        let noise = NoiseClassifier::permissive();
        let extractor = ReachabilityExtractor::new(&g, &noise, ExtractOptions::default());
        assert!(extractor.extract(5, 10).is_none());
        assert!(extractor.extract_all().is_empty());
    }
}
