//! Switch-noise resolution.
//!
//! Whole-program analysis links a switch site to every case it could take.
//! The coverage data names the case the triggering control actually selects;
//! every other case, and what only it reaches, is noise for this behavior.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::domain::auxiliary::{BranchCoverage, ResourceTable, SwitchCase};
use crate::domain::behavior::RawBehavior;
use crate::domain::graph::{EdgeTriple, KnowledgeGraph, NodeId, Relation};

/// Edges to drop plus the callees that could only be tied to a superclass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwitchNoise {
    pub removed: HashSet<EdgeTriple>,
    pub inherit_methods: BTreeSet<String>,
}

/// `(caller, callee)` pairs confirmed by coverage.
#[derive(Debug, Default)]
struct TakenCases {
    edges: BTreeSet<(NodeId, NodeId)>,
    inherit_methods: BTreeSet<String>,
}

pub struct BranchNoiseResolver<'a> {
    graph: &'a KnowledgeGraph,
    coverage: &'a BranchCoverage,
    resources: &'a ResourceTable,
}

impl<'a> BranchNoiseResolver<'a> {
    pub fn new(graph: &'a KnowledgeGraph, coverage: &'a BranchCoverage, resources: &'a ResourceTable) -> Self {
        Self {
            graph,
            coverage,
            resources,
        }
    }

    /// Find the switch noise of `raw`. `base` is the behavior's edge set with
    /// event edges removed; sweeps walk the full raw edge set.
    pub fn resolve(&self, raw: &RawBehavior, base: &BTreeSet<EdgeTriple>) -> SwitchNoise {
        let cases = self.locate_cases(raw.uid, raw.eid);
        if cases.is_empty() {
            return SwitchNoise::default();
        }

        let raw_out = outgoing_index(&raw.edges);
        let taken = self.taken_cases(cases, &raw_out);
        let mut noise = SwitchNoise {
            removed: HashSet::new(),
            inherit_methods: taken.inherit_methods,
        };
        if taken.edges.is_empty() {
            return noise;
        }

        let callers: HashSet<NodeId> = taken.edges.iter().map(|&(caller, _)| caller).collect();
        let kept_callees: HashSet<NodeId> = taken.edges.iter().map(|&(_, callee)| callee).collect();
        let kept: HashSet<EdgeTriple> = taken
            .edges
            .iter()
            .map(|&(caller, callee)| EdgeTriple::new(caller, callee, Relation::Call))
            .collect();

        let mut visited: HashSet<NodeId> = HashSet::new();
        for candidate in base
            .iter()
            .filter(|e| callers.contains(&e.from) && !kept.contains(e))
        {
            noise.removed.insert(*candidate);
            let mut stack = vec![candidate.to];
            while let Some(current) = stack.pop() {
                if kept_callees.contains(&current) {
                    continue;
                }
                visited.insert(current);
                for edge in raw_out.get(&current).into_iter().flatten() {
                    noise.removed.insert(*edge);
                    if !visited.contains(&edge.to) {
                        stack.push(edge.to);
                    }
                }
            }
        }
        debug!(
            uid = raw.uid,
            eid = raw.eid,
            removed = noise.removed.len(),
            "switch noise resolved"
        );
        noise
    }

    /// Coverage records of the layout the trigger belongs to.
    fn locate_cases(&self, uid: NodeId, eid: NodeId) -> &'a [SwitchCase] {
        if self.coverage.is_empty() {
            return &[];
        }
        let Some(element_id) = self.graph.node(uid).and_then(|n| n.ui_element_id) else {
            return &[];
        };
        let layout_id = self
            .graph
            .node(uid)
            .and_then(|n| n.layout_name())
            .and_then(|name| self.resources.layout_id(name));
        if let Some(layout_id) = layout_id {
            let key = BranchCoverage::composite_key(element_id, layout_id);
            if let Some(cases) = self.coverage.get(&key) {
                return cases;
            }
        }

        // same widget id in another layout: pick the one driven by our callback
        let element_key = element_id.to_string();
        let event_name = self.graph.name_of(eid);
        for (key, cases) in self.coverage.with_element_id(&element_key) {
            if cases.iter().any(|c| c.caller == event_name) {
                debug!(
                    uid,
                    element_id,
                    ?layout_id,
                    substitute = key,
                    "determined layout from event callback"
                );
                return cases;
            }
        }
        &[]
    }

    fn taken_cases(&self, cases: &[SwitchCase], raw_out: &HashMap<NodeId, Vec<EdgeTriple>>) -> TakenCases {
        let mut taken = TakenCases::default();
        for case in cases {
            let Some(descriptor) = enclosing_signature(&case.callee) else {
                continue;
            };
            let Some(&caller) = self.graph.ids_by_name(&case.caller).first() else {
                taken.inherit_methods.insert(descriptor.to_string());
                continue;
            };
            if let Some(&callee) = self.graph.ids_by_name(descriptor).first() {
                taken.edges.insert((caller, callee));
                continue;
            }
            // callee declared on a superclass: match by member signature,
            // lowest id wins
            let member = descriptor.find(':').map_or(descriptor, |i| &descriptor[i..]);
            let inherited = raw_out
                .get(&caller)
                .into_iter()
                .flatten()
                .map(|e| e.to)
                .filter(|&callee| self.graph.name_of(callee).contains(member))
                .min();
            if let Some(callee) = inherited {
                taken.edges.insert((caller, callee));
            }
        }
        taken
    }
}

fn outgoing_index(edges: &BTreeSet<EdgeTriple>) -> HashMap<NodeId, Vec<EdgeTriple>> {
    let mut index: HashMap<NodeId, Vec<EdgeTriple>> = HashMap::new();
    for edge in edges {
        index.entry(edge.from).or_default().push(*edge);
    }
    index
}

/// The `<...>` method signature inside an invoke expression, with nested
/// brackets such as `<init>` kept intact.
pub fn enclosing_signature(expr: &str) -> Option<&str> {
    let start = expr.find('<')?;
    let mut depth = 0usize;
    for (offset, ch) in expr[start..].char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&expr[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
