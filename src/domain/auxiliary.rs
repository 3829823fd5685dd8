//! Auxiliary data emitted next to the KG: switch/case coverage, layout
//! resource ids and the textual context of widgets.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// One exercised switch/case transfer: `caller` took the branch calling `callee`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwitchCase {
    #[serde(rename = "_1", alias = "caller")]
    pub caller: String,
    #[serde(rename = "_2", alias = "callee")]
    pub callee: String,
}

/// Branch coverage keyed by `"<element id>$<layout id>"`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BranchCoverage {
    #[serde(rename = "switchEdges", default)]
    switch_edges: BTreeMap<String, Vec<SwitchCase>>,
}

impl BranchCoverage {
    pub fn new(switch_edges: BTreeMap<String, Vec<SwitchCase>>) -> Self {
        Self { switch_edges }
    }

    pub fn composite_key(element_id: i64, layout_id: i64) -> String {
        format!("{element_id}${layout_id}")
    }

    pub fn is_empty(&self) -> bool {
        self.switch_edges.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[SwitchCase]> {
        self.switch_edges.get(key).map(Vec::as_slice)
    }

    /// Entries whose key starts with `element_id`, in key order.
    pub fn with_element_id(&self, element_id: &str) -> Vec<(&str, &[SwitchCase])> {
        self.switch_edges
            .iter()
            .filter(|(key, _)| key.split('$').next() == Some(element_id))
            .map(|(key, cases)| (key.as_str(), cases.as_slice()))
            .collect()
    }
}

/// Layout resource name -> integer id, from the public resource descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTable {
    layouts: HashMap<String, i64>,
}

impl ResourceTable {
    pub fn insert(&mut self, name: impl Into<String>, id: i64) {
        self.layouts.insert(name.into(), id);
    }

    pub fn layout_id(&self, name: &str) -> Option<i64> {
        self.layouts.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// Sentinel the analyzer writes when a string resource could not be resolved.
pub const TEXT_NOT_FOUND: &str = "NOT_FOUND";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WidgetContext {
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl WidgetContext {
    /// Resolved hint and text values.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        [self.hint.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .filter(|v| *v != TEXT_NOT_FOUND)
    }
}

/// Layout file -> element id -> widget context.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct UiContext {
    layouts: BTreeMap<String, BTreeMap<String, WidgetContext>>,
}

impl UiContext {
    pub fn insert(&mut self, layout: impl Into<String>, element_id: impl Into<String>, ctx: WidgetContext) {
        self.layouts
            .entry(layout.into())
            .or_default()
            .insert(element_id.into(), ctx);
    }

    /// Exact lookup, then the first layout (by name) declaring the element id.
    pub fn lookup(&self, layout: Option<&str>, element_id: &str) -> Option<&WidgetContext> {
        layout
            .and_then(|l| self.layouts.get(l))
            .and_then(|widgets| widgets.get(element_id))
            .or_else(|| self.layouts.values().find_map(|widgets| widgets.get(element_id)))
    }
}
