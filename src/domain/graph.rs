//! Knowledge graph model.
//!
//! Nodes and edges live in arena vectors indexed by the dense row id the
//! analyzer assigned. The adjacency index is built once per app and never
//! mutated afterwards.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::error::{EngineError, Result};

/// Dense row id of a node within one app.
pub type NodeId = usize;

/// Package marker of app-defined code.
pub const APP_PACKAGE: &str = "-";

/// Relation kinds of the KG. The discriminants are the wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    Call = 0,
    Find = 1,
    Hold = 2,
    Use = 3,
    Event = 4,
}

impl Relation {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<i64> for Relation {
    type Error = EngineError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Relation::Call),
            1 => Ok(Relation::Find),
            2 => Ok(Relation::Hold),
            3 => Ok(Relation::Use),
            4 => Ok(Relation::Event),
            _ => Err(EngineError::InvalidRelation { code }),
        }
    }
}

/// A KG node. Method nodes use `<Class: member-signature>` names, widgets use
/// their label.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub hash: Option<String>,
    pub is_ui: bool,
    /// Layout XML file the widget comes from.
    pub xml: Option<String>,
    /// Widget id, unique within its layout.
    pub ui_element_id: Option<i64>,
    pub package: String,
    pub class: Option<String>,
    pub java_api: bool,
    pub android_api: bool,
}

impl Node {
    /// An app-defined method node.
    pub fn method(name: impl Into<String>) -> Self {
        Self::library_method(name, APP_PACKAGE)
    }

    /// A method node owned by `package` (platform or third-party unless `-`).
    pub fn library_method(name: impl Into<String>, package: impl Into<String>) -> Self {
        let name = name.into();
        let class = name
            .strip_prefix('<')
            .and_then(|rest| rest.split(':').next())
            .map(str::to_string);
        Self {
            name,
            hash: None,
            is_ui: false,
            xml: None,
            ui_element_id: None,
            package: package.into(),
            class,
            java_api: false,
            android_api: false,
        }
    }

    /// A widget declared in `xml` with element id `element_id`.
    pub fn widget(name: impl Into<String>, xml: impl Into<String>, element_id: i64) -> Self {
        Self {
            name: name.into(),
            hash: None,
            is_ui: true,
            xml: Some(xml.into()),
            ui_element_id: Some(element_id),
            package: APP_PACKAGE.to_string(),
            class: None,
            java_api: false,
            android_api: false,
        }
    }

    pub fn is_app_defined(&self) -> bool {
        self.package == APP_PACKAGE
    }

    pub fn is_api(&self) -> bool {
        self.java_api || self.android_api
    }

    /// Layout resource name: the XML file name without its extension.
    pub fn layout_name(&self) -> Option<&str> {
        let xml = self.xml.as_deref()?;
        Some(xml.split(".xml").next().unwrap_or(xml))
    }
}

/// `(from, to, relation)`; wire form is `"<from> <to> <code>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeTriple {
    pub from: NodeId,
    pub to: NodeId,
    pub relation: Relation,
}

impl EdgeTriple {
    pub fn new(from: NodeId, to: NodeId, relation: Relation) -> Self {
        Self { from, to, relation }
    }
}

impl fmt::Display for EdgeTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.from, self.to, self.relation.code())
    }
}

impl FromStr for EdgeTriple {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || EngineError::MalformedEdge(s.to_string());
        let mut parts = s.split(' ');
        let mut next_number = || -> Result<i64> {
            parts
                .next()
                .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|p| p.parse::<i64>().ok())
                .ok_or_else(malformed)
        };
        let from = next_number()?;
        let to = next_number()?;
        let relation = Relation::try_from(next_number()?)?;
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self::new(from as NodeId, to as NodeId, relation))
    }
}

impl Serialize for EdgeTriple {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EdgeTriple {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The whole-app graph plus the indices traversal needs.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    nodes: Vec<Node>,
    edges: Vec<EdgeTriple>,
    adjacency: Vec<Vec<(NodeId, Relation)>>,
    /// Raw `call` targets per caller, as stored in the edge table.
    call_targets: Vec<Vec<NodeId>>,
    ui_code_edges: BTreeSet<EdgeTriple>,
    ui_controls_all: BTreeSet<NodeId>,
    ui_controls_act: BTreeSet<NodeId>,
    name_index: HashMap<String, Vec<NodeId>>,
}

impl KnowledgeGraph {
    /// Build the adjacency index. `find` edges are ignored unless `track_find`.
    pub fn build(nodes: Vec<Node>, edges: Vec<EdgeTriple>, track_find: bool) -> Result<Self> {
        let len = nodes.len();
        let mut adjacency = vec![Vec::new(); len];
        let mut call_targets = vec![Vec::new(); len];
        let mut ui_code_edges = BTreeSet::new();
        let mut ui_controls_all = BTreeSet::new();
        let mut ui_controls_act = BTreeSet::new();

        for edge in &edges {
            for id in [edge.from, edge.to] {
                if id >= len {
                    return Err(EngineError::NodeOutOfRange { id, len });
                }
            }
            let (head, tail) = (edge.from, edge.to);
            match edge.relation {
                Relation::Hold => {
                    // stored child -> parent, traversed parent -> child
                    ui_controls_all.insert(tail);
                    adjacency[tail].push((head, Relation::Hold));
                }
                Relation::Find if !track_find => continue,
                Relation::Find | Relation::Use | Relation::Event => {
                    ui_controls_all.insert(head);
                    if edge.relation == Relation::Event {
                        ui_controls_act.insert(head);
                    }
                    ui_code_edges.insert(*edge);
                    adjacency[head].push((tail, edge.relation));
                }
                Relation::Call => {
                    adjacency[head].push((tail, Relation::Call));
                    call_targets[head].push(tail);
                }
            }
        }

        let mut name_index: HashMap<String, Vec<NodeId>> = HashMap::with_capacity(len);
        for (id, node) in nodes.iter().enumerate() {
            name_index.entry(node.name.clone()).or_default().push(id);
        }

        Ok(Self {
            nodes,
            edges,
            adjacency,
            call_targets,
            ui_code_edges,
            ui_controls_all,
            ui_controls_act,
            name_index,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn name_of(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("", |n| n.name.as_str())
    }

    pub fn package_of(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("", |n| n.package.as_str())
    }

    pub fn is_app_defined(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(Node::is_app_defined)
    }

    /// Traversal neighbours of `id` (hold edges already inverted).
    pub fn neighbors(&self, id: NodeId) -> &[(NodeId, Relation)] {
        self.adjacency.get(id).map_or(&[], Vec::as_slice)
    }

    /// Outgoing adjacency entries of `id` as edge triples.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = EdgeTriple> + '_ {
        self.neighbors(id)
            .iter()
            .map(move |&(to, relation)| EdgeTriple::new(id, to, relation))
    }

    /// Raw call targets of `id` in the KG edge table.
    pub fn call_targets(&self, id: NodeId) -> &[NodeId] {
        self.call_targets.get(id).map_or(&[], Vec::as_slice)
    }

    /// Ids carrying exactly `name`, ascending.
    pub fn ids_by_name(&self, name: &str) -> &[NodeId] {
        self.name_index.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn edges(&self) -> &[EdgeTriple] {
        &self.edges
    }

    pub fn ui_code_edges(&self) -> &BTreeSet<EdgeTriple> {
        &self.ui_code_edges
    }

    pub fn ui_controls_all(&self) -> &BTreeSet<NodeId> {
        &self.ui_controls_all
    }

    /// UI nodes that are the source of at least one event edge.
    pub fn ui_controls_act(&self) -> &BTreeSet<NodeId> {
        &self.ui_controls_act
    }
}
