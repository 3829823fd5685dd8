//! Loads the node and edge tables of an app into a [`KnowledgeGraph`].
//!
//! Tables are memory-mapped and streamed through the `csv` reader. Columns
//! are matched by header name, so extra columns (such as a leading index
//! written by dataframe tooling) are ignored.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use serde::Deserialize;
use tracing::debug;

use crate::common::{EngineError, Result};
use crate::domain::graph::{EdgeTriple, KnowledgeGraph, Node, Relation};
use crate::infrastructure::layout::AppLayout;

#[derive(Debug, Deserialize)]
struct NodeRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash", default)]
    hash: Option<String>,
    #[serde(rename = "UI", default, deserialize_with = "csv::invalid_option")]
    ui: Option<i64>,
    #[serde(rename = "XML", default)]
    xml: Option<String>,
    #[serde(rename = "UId", default, deserialize_with = "csv::invalid_option")]
    element_id: Option<i64>,
    #[serde(rename = "Package", default)]
    package: Option<String>,
    #[serde(rename = "Class", default)]
    class: Option<String>,
    #[serde(rename = "Java", default)]
    java: Option<String>,
    #[serde(rename = "Android", default)]
    android: Option<String>,
}

impl From<NodeRow> for Node {
    fn from(row: NodeRow) -> Self {
        Node {
            name: row.name,
            hash: row.hash.filter(|h| !h.is_empty()),
            is_ui: row.ui == Some(1),
            xml: row.xml.filter(|x| !x.is_empty()),
            // -1 marks "no element id"
            ui_element_id: row.element_id.filter(|&id| id != -1),
            // only "-" marks app code; an empty cell is an unknown library
            package: row.package.unwrap_or_default(),
            class: row.class.filter(|c| !c.is_empty()),
            java_api: flag(row.java.as_deref()),
            android_api: flag(row.android.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EdgeRow {
    #[serde(rename = "From")]
    from: usize,
    #[serde(rename = "To")]
    to: usize,
    #[serde(rename = "Type")]
    relation: i64,
}

/// Boolean cells are written as `1`/`0` or `True`/`False`.
fn flag(cell: Option<&str>) -> bool {
    match cell.map(str::trim) {
        Some(v) => v == "1" || v.eq_ignore_ascii_case("true") || v == "1.0",
        None => false,
    }
}

/// Map a table read-only. Empty tables are treated as missing.
fn map_table(path: &Path) -> Result<Mmap> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let len = file.metadata().map_err(|e| EngineError::io(path, e))?.len();
    if len == 0 {
        return Err(EngineError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    // SAFETY: read-only mapping; input tables are not modified during a run.
    unsafe { Mmap::map(&file) }.map_err(|e| EngineError::io(path, e))
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mmap = map_table(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(&mmap[..]);
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()
        .map_err(|source| EngineError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_nodes(path: &Path) -> Result<Vec<Node>> {
    Ok(read_rows::<NodeRow>(path)?.into_iter().map(Node::from).collect())
}

pub fn load_edges(path: &Path) -> Result<Vec<EdgeTriple>> {
    read_rows::<EdgeRow>(path)?
        .into_iter()
        .map(|row| Ok(EdgeTriple::new(row.from, row.to, Relation::try_from(row.relation)?)))
        .collect()
}

/// Load both tables of `layout` and build the adjacency index.
pub fn load_knowledge_graph(layout: &AppLayout, track_find: bool) -> Result<KnowledgeGraph> {
    let nodes = load_nodes(&layout.node_table())?;
    let edges = load_edges(&layout.edge_table())?;
    debug!(
        app = %layout.name(),
        nodes = nodes.len(),
        edges = edges.len(),
        "knowledge graph loaded"
    );
    KnowledgeGraph::build(nodes, edges, track_find)
}
