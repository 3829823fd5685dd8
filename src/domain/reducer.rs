//! Reduction orchestrator.
//!
//! Runs the cleanup stages over every raw behavior of an app:
//! 1. optional interest filter
//! 2. drop events fired by other controls
//! 3. switch noise
//! 4. dead leaves (when enabled)

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use tracing::debug;

use crate::domain::behavior::{
    BehaviorSize, RawBehavior, ReduceReport, ReducedBehavior, ReducedBehaviors, ReducedSize,
    ReductionHeader,
};
use crate::domain::branch::BranchNoiseResolver;
use crate::domain::dead_leaf::DeadLeafEliminator;
use crate::domain::graph::{EdgeTriple, Relation};
use crate::domain::interest::InterestFilter;

pub struct BehaviorReducer<'a> {
    branch: BranchNoiseResolver<'a>,
    dead_leaf: Option<DeadLeafEliminator<'a>>,
    interest: Option<InterestFilter<'a>>,
}

impl<'a> BehaviorReducer<'a> {
    pub fn new(branch: BranchNoiseResolver<'a>) -> Self {
        Self {
            branch,
            dead_leaf: None,
            interest: None,
        }
    }

    /// Enable the dead-leaf stage.
    pub fn with_dead_leaf(mut self, eliminator: DeadLeafEliminator<'a>) -> Self {
        self.dead_leaf = Some(eliminator);
        self
    }

    /// Enable the interest pre-filter.
    pub fn with_interest(mut self, filter: InterestFilter<'a>) -> Self {
        self.interest = Some(filter);
        self
    }

    /// Reduce every behavior; filtered-out behaviors are dropped.
    pub fn reduce_all(&self, raw: &[RawBehavior]) -> ReducedBehaviors {
        let start = Instant::now();
        let behaviors: Vec<ReducedBehavior> = raw.iter().filter_map(|b| self.reduce(b)).collect();
        debug!(
            raw = raw.len(),
            kept = behaviors.len(),
            "reduction finished"
        );
        ReducedBehaviors {
            header: ReductionHeader {
                time: start.elapsed().as_secs_f64(),
            },
            behaviors,
        }
    }

    pub fn reduce(&self, raw: &RawBehavior) -> Option<ReducedBehavior> {
        let start = Instant::now();
        if let Some(filter) = &self.interest {
            if !filter.should_keep(raw.uid, raw.node_ids()) {
                debug!(uid = raw.uid, eid = raw.eid, "behavior filtered out");
                return None;
            }
        }

        // events fired by other controls go; our own trigger edges come back
        let base: BTreeSet<EdgeTriple> = raw
            .edges
            .iter()
            .filter(|e| e.relation != Relation::Event)
            .copied()
            .collect();
        let trigger = raw.edges.iter().filter(|e| e.from == raw.uid).copied();

        let switch = self.branch.resolve(raw, &base);
        let dead: HashSet<EdgeTriple> = self
            .dead_leaf
            .as_ref()
            .map(|dl| dl.eliminate(&base))
            .unwrap_or_default();

        let surviving: BTreeSet<EdgeTriple> = base
            .iter()
            .filter(|e| !dead.contains(e))
            .copied()
            .chain(trigger)
            .collect();
        let edges: BTreeSet<EdgeTriple> = surviving
            .iter()
            .filter(|e| !switch.removed.contains(e))
            .copied()
            .collect();

        let size = BehaviorSize::of(&edges);
        let inherit_methods = (!switch.inherit_methods.is_empty()).then_some(switch.inherit_methods);
        Some(ReducedBehavior {
            uid: raw.uid,
            eid: raw.eid,
            size: ReducedSize {
                node: size.node,
                edge: size.edge,
                old: raw.size,
            },
            reduce: ReduceReport {
                time: start.elapsed().as_secs_f64(),
                switch_noise: surviving.len() - edges.len(),
                sleaf: self.dead_leaf.as_ref().map(|_| dead.len()),
            },
            edges,
            cuid: raw.cuid.clone(),
            inherit_methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auxiliary::{BranchCoverage, ResourceTable, SwitchCase, UiContext};
    use crate::domain::graph::{KnowledgeGraph, Node};
    use crate::domain::noise::KeywordSet;
    use std::collections::BTreeMap;

    const ON_CLICK: &str = "<com.app.Main: void onClick(android.view.View)>";

    fn fixture() -> KnowledgeGraph {
        let mut nodes: Vec<Node> = (0..20)
            .map(|i| Node::method(format!("<com.app.Main: void m{i}()>")))
            .collect();
        nodes[5] = Node::widget("Button", "main.xml", 42);
        nodes[6] = Node::widget("Other", "main.xml", 43);
        nodes[10] = Node::method(ON_CLICK);
        nodes.push(Node::library_method("<android.app.Activity: void finish()>", "android.app"));
        let edges = [(10, 11), (11, 20), (10, 13), (13, 20), (10, 14)]
            .into_iter()
            .map(|(f, t)| EdgeTriple::new(f, t, Relation::Call))
            .collect();
        KnowledgeGraph::build(nodes, edges, false).unwrap()
    }

    fn raw() -> RawBehavior {
        let edges = [
            (5, 10, Relation::Event),
            (6, 10, Relation::Event),
            (10, 11, Relation::Call),
            (11, 20, Relation::Call),
            (10, 13, Relation::Call),
            (13, 20, Relation::Call),
            (10, 14, Relation::Call),
        ]
        .into_iter()
        .map(|(f, t, r)| EdgeTriple::new(f, t, r))
        .collect();
        RawBehavior::new(5, 10, edges, BTreeSet::new())
    }

    fn coverage() -> BranchCoverage {
        BranchCoverage::new(BTreeMap::from([(
            "42$7".to_string(),
            vec![SwitchCase {
                caller: ON_CLICK.to_string(),
                callee: "virtualinvoke r0.<com.app.Main: void m11()>()".to_string(),
            }],
        )]))
    }

    fn resources() -> ResourceTable {
        let mut table = ResourceTable::default();
        table.insert("main", 7);
        table
    }

    #[test]
    fn test_foreign_events_are_dropped() {
        let g = fixture();
        let cov = BranchCoverage::default();
        let res = ResourceTable::default();
        let reducer = BehaviorReducer::new(BranchNoiseResolver::new(&g, &cov, &res));
        let reduced = reducer.reduce(&raw()).unwrap();
        assert!(reduced.edges.contains(&EdgeTriple::new(5, 10, Relation::Event)));
        assert!(!reduced.edges.contains(&EdgeTriple::new(6, 10, Relation::Event)));
        assert_eq!(reduced.size.old, raw().size);
        assert_eq!(reduced.reduce.sleaf, None);
    }

    #[test]
    fn test_all_stages_together() {
        let g = fixture();
        let cov = coverage();
        let res = resources();
        let reducer =
            BehaviorReducer::new(BranchNoiseResolver::new(&g, &cov, &res))
            .with_dead_leaf(DeadLeafEliminator::new(&g));
        let raw = raw();
        let reduced = reducer.reduce(&raw).unwrap();

        let expected: BTreeSet<EdgeTriple> = [
            EdgeTriple::new(5, 10, Relation::Event),
            EdgeTriple::new(10, 11, Relation::Call),
            EdgeTriple::new(11, 20, Relation::Call),
        ]
        .into();
        assert_eq!(reduced.edges, expected);
        assert_eq!(reduced.size.edge, 3);
        assert_eq!(reduced.size.node, 4);
        // 10 -> 14 is a dead leaf, 10 -> 13 -> 20 is switch noise
        assert_eq!(reduced.reduce.sleaf, Some(1));
        assert_eq!(reduced.reduce.switch_noise, 2);
        assert!(reduced.edges.is_subset(&raw.edges));
    }

    #[test]
    fn test_interest_filter_drops_uninteresting() {
        let g = fixture();
        let cov = BranchCoverage::default();
        let res = ResourceTable::default();
        let ctx = UiContext::default();
        let texts = KeywordSet::new(["logout"]);
        let methods = KeywordSet::new(["logout"]);
        let reducer = BehaviorReducer::new(BranchNoiseResolver::new(&g, &cov, &res))
            .with_interest(InterestFilter::new(&g, &ctx, &texts, &methods));
        let out = reducer.reduce_all(&[raw()]);
        assert!(out.behaviors.is_empty());
        assert!(out.header.time >= 0.0);
    }
}
