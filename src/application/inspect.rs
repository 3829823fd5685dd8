//! Human-readable view of a reduced behavior file.

use std::fmt::Write as _;

use anyhow::{bail, Context, Result};

use crate::domain::behavior::ReducedBehavior;
use crate::domain::graph::{Node, Relation};
use crate::infrastructure::kg_loader::load_nodes;
use crate::infrastructure::{AppLayout, JsonBehaviorStore};
use crate::ports::BehaviorStore;

/// Render one behavior (`index`) or a listing of all of them.
pub fn inspect(layout: &AppLayout, index: Option<usize>) -> Result<String> {
    let nodes = load_nodes(&layout.node_table())
        .with_context(|| format!("cannot load nodes of {}", layout.name()))?;
    let reduced = JsonBehaviorStore::new(layout)
        .load_reduced()
        .with_context(|| format!("cannot load reduced behaviors of {}", layout.name()))?;

    let mut out = String::new();
    match index {
        Some(i) => {
            let Some(behavior) = reduced.behaviors.get(i) else {
                bail!("behavior {i} out of range ({} behaviors)", reduced.behaviors.len());
            };
            describe(&mut out, &nodes, behavior)?;
        }
        None => {
            writeln!(out, "{} behaviors, reduced in {:.3}s", reduced.behaviors.len(), reduced.header.time)?;
            for (i, b) in reduced.behaviors.iter().enumerate() {
                writeln!(
                    out,
                    "#{i:<4} {} -> {}  nodes {} ({}) edges {} ({})",
                    label(&nodes, b.uid),
                    label(&nodes, b.eid),
                    b.size.node,
                    b.size.old.node,
                    b.size.edge,
                    b.size.old.edge,
                )?;
            }
        }
    }
    Ok(out)
}

fn describe(out: &mut String, nodes: &[Node], b: &ReducedBehavior) -> std::fmt::Result {
    if let Some(widget) = nodes.get(b.uid) {
        writeln!(out, "widget  {} [{}]", widget.name, b.uid)?;
        writeln!(out, "  hash    {}", widget.hash.as_deref().unwrap_or("-"))?;
        writeln!(out, "  layout  {}", widget.xml.as_deref().unwrap_or("-"))?;
        match widget.ui_element_id {
            Some(id) => writeln!(out, "  element {id} (0x{id:x})")?,
            None => writeln!(out, "  element -")?,
        }
    }
    if let Some(event) = nodes.get(b.eid) {
        writeln!(out, "event   {} [{}]", event.name, b.eid)?;
        writeln!(out, "  hash    {}", event.hash.as_deref().unwrap_or("-"))?;
        writeln!(out, "  class   {}", event.class.as_deref().unwrap_or("-"))?;
    }
    writeln!(
        out,
        "size    {} nodes / {} edges (was {} / {}), switch noise {}, dead leaves {}",
        b.size.node,
        b.size.edge,
        b.size.old.node,
        b.size.old.edge,
        b.reduce.switch_noise,
        b.reduce.sleaf.map_or_else(|| "-".to_string(), |n| n.to_string()),
    )?;
    if !b.cuid.is_empty() {
        let children: Vec<String> = b.cuid.iter().map(|&id| label(nodes, id)).collect();
        writeln!(out, "cuid    {}", children.join(", "))?;
    }
    for method in b.inherit_methods.iter().flatten() {
        writeln!(out, "inherit {method}")?;
    }
    writeln!(out, "edges")?;
    for e in &b.edges {
        writeln!(
            out,
            "  {:<5} {} -> {}",
            relation_name(e.relation),
            label(nodes, e.from),
            label(nodes, e.to)
        )?;
    }
    Ok(())
}

fn label(nodes: &[Node], id: usize) -> String {
    match nodes.get(id) {
        Some(node) => format!("{}[{id}]", node.name),
        None => format!("?[{id}]"),
    }
}

fn relation_name(relation: Relation) -> &'static str {
    match relation {
        Relation::Call => "call",
        Relation::Find => "find",
        Relation::Hold => "hold",
        Relation::Use => "use",
        Relation::Event => "event",
    }
}
