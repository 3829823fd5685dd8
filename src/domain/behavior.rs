//! Behavior records: one extracted subgraph per (UI control, event callback).

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::graph::{EdgeTriple, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSize {
    pub node: usize,
    pub edge: usize,
}

impl BehaviorSize {
    /// Distinct endpoints and cardinality of `edges`.
    pub fn of<'a>(edges: impl IntoIterator<Item = &'a EdgeTriple>) -> Self {
        let mut nodes: HashSet<NodeId> = HashSet::new();
        let mut edge = 0;
        for e in edges {
            nodes.insert(e.from);
            nodes.insert(e.to);
            edge += 1;
        }
        Self {
            node: nodes.len(),
            edge,
        }
    }
}

/// Output of the reachability extractor (`uhg_full.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBehavior {
    /// Triggering UI node.
    pub uid: NodeId,
    /// Event callback the subgraph starts from.
    pub eid: NodeId,
    pub size: BehaviorSize,
    pub edges: BTreeSet<EdgeTriple>,
    /// Child UI nodes fully subsumed by this behavior.
    pub cuid: BTreeSet<NodeId>,
}

impl RawBehavior {
    pub fn new(uid: NodeId, eid: NodeId, edges: BTreeSet<EdgeTriple>, cuid: BTreeSet<NodeId>) -> Self {
        let size = BehaviorSize::of(&edges);
        Self {
            uid,
            eid,
            size,
            edges,
            cuid,
        }
    }

    /// Every node touched by the behavior.
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.edges.iter().flat_map(|e| [e.from, e.to]).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedSize {
    pub node: usize,
    pub edge: usize,
    /// Size before reduction.
    pub old: BehaviorSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReduceReport {
    /// Seconds spent on this behavior.
    pub time: f64,
    #[serde(rename = "switch noise")]
    pub switch_noise: usize,
    /// Edges removed as dead leaves; present only when the eliminator ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleaf: Option<usize>,
}

/// A cleaned behavior (`uhg.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedBehavior {
    pub uid: NodeId,
    pub eid: NodeId,
    pub size: ReducedSize,
    pub reduce: ReduceReport,
    pub edges: BTreeSet<EdgeTriple>,
    pub cuid: BTreeSet<NodeId>,
    /// Callee signatures whose caller only exists on a superclass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_methods: Option<BTreeSet<String>>,
}

/// Leading element of `uhg.json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReductionHeader {
    /// Seconds spent reducing the whole app.
    pub time: f64,
}

/// One element of the reduced file array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReducedEntry {
    Behavior(ReducedBehavior),
    Header(ReductionHeader),
}

/// Contents of `uhg.json`: a header followed by behaviors.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedBehaviors {
    pub header: ReductionHeader,
    pub behaviors: Vec<ReducedBehavior>,
}

impl ReducedBehaviors {
    pub fn into_entries(self) -> Vec<ReducedEntry> {
        std::iter::once(ReducedEntry::Header(self.header))
            .chain(self.behaviors.into_iter().map(ReducedEntry::Behavior))
            .collect()
    }

    /// Rebuild from file entries; headers after the first position are ignored.
    pub fn from_entries(entries: Vec<ReducedEntry>) -> Self {
        let mut header = ReductionHeader { time: 0.0 };
        let mut behaviors = Vec::with_capacity(entries.len().saturating_sub(1));
        for (i, entry) in entries.into_iter().enumerate() {
            match entry {
                ReducedEntry::Header(h) if i == 0 => header = h,
                ReducedEntry::Header(_) => {}
                ReducedEntry::Behavior(b) => behaviors.push(b),
            }
        }
        Self { header, behaviors }
    }
}
